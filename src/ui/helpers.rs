//! Helper functions shared by the input and event handlers: background
//! request spawning, per-screen loaders and small formatting utilities.

use crate::api::{ApiError, ArticleQuery, DeleteScope, RemoteId};
use crate::app::{App, AppEvent, LoginMode, Screen};
use crate::util::{catch_task_panic, validate_url_for_open};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::future::Future;
use tokio::sync::mpsc;

/// Error message for articles without a source address
pub(super) const ERR_ARTICLE_NO_URL: &str = "Article has no source URL";

/// Run one backend call on a background task.
///
/// The result (or the panic message, as `TaskPanicked`) is delivered as a
/// single event on the loop's channel.
pub(super) fn spawn_request<T, F, W>(
    event_tx: &mpsc::Sender<AppEvent>,
    task: &'static str,
    call: F,
    wrap: W,
) where
    T: Send + 'static,
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
    W: FnOnce(Result<T, String>) -> AppEvent + Send + 'static,
{
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let event = match catch_task_panic(call).await {
            Ok(result) => {
                if let Err(e) = &result {
                    tracing::warn!(task, error = %e, "Backend request failed");
                }
                wrap(result.map_err(|e| e.to_string()))
            }
            Err(error) => {
                tracing::error!(task, error = %error, "Background task panicked");
                AppEvent::TaskPanicked { task, error }
            }
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(task, error = %e, "Channel send failed (receiver dropped)");
        }
    });
}

// ============================================================================
// Screen loaders
// ============================================================================

/// Submit the login or register form.
pub(super) fn submit_login(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let generation = app.begin_request();
    let Screen::Login(form) = &mut app.screen else {
        return;
    };
    let name = form.account.trim().to_owned();
    if name.is_empty() || form.password().is_empty() {
        app.set_status("Enter both fields first");
        return;
    }
    let password = form.take_password();
    form.busy = true;
    let mode = form.mode;
    let api = app.api.clone();

    match mode {
        LoginMode::Login => spawn_request(
            event_tx,
            "login",
            async move { api.login(&name, &password).await },
            move |result| AppEvent::LoggedIn { generation, result },
        ),
        LoginMode::Register => spawn_request(
            event_tx,
            "register",
            async move { api.register(&name, &password).await },
            move |result| AppEvent::Registered { generation, result },
        ),
    }
}

/// (Re)load the page the task list screen is on.
pub(super) fn load_tasks(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(user_id) = app.user_id().cloned() else {
        return;
    };
    let generation = app.begin_request();
    let per_page = app.per_page;
    let Screen::TaskList(state) = &mut app.screen else {
        return;
    };
    state.loading = true;
    let (kind, page) = (state.kind, state.page);
    let search = Some(state.search.clone()).filter(|s| !s.is_empty());
    let api = app.api.clone();
    tracing::debug!(?kind, page, generation, "Loading tasks");

    spawn_request(
        event_tx,
        "load_tasks",
        async move { api.tasks(kind, &user_id, page, per_page, search.as_deref()).await },
        move |result| AppEvent::TasksLoaded { generation, result },
    );
}

pub(super) fn load_task_articles(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(user_id) = app.user_id().cloned() else {
        return;
    };
    let generation = app.begin_request();
    let Screen::TaskDetail(state) = &mut app.screen else {
        return;
    };
    state.loading = true;
    let kind = state.kind;
    let task_id = state.task_id.clone();
    let api = app.api.clone();

    spawn_request(
        event_tx,
        "load_task_articles",
        async move { api.task_articles(kind, &user_id, &task_id).await },
        move |result| AppEvent::TaskArticlesLoaded { generation, result },
    );
}

pub(super) fn load_articles(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(user_id) = app.user_id().cloned() else {
        return;
    };
    let generation = app.begin_request();
    let per_page = app.per_page;
    let Screen::ArticleList(state) = &mut app.screen else {
        return;
    };
    if state.categories.is_empty() {
        state.articles.clear();
        state.selected = 0;
        state.loading = false;
        return;
    }
    state.loading = true;
    let query = ArticleQuery {
        page: state.page,
        per_page,
        categories: state.categories.clone(),
        search: Some(state.search.clone()).filter(|s| !s.is_empty()),
    };
    let api = app.api.clone();

    spawn_request(
        event_tx,
        "load_articles",
        async move { api.articles_by_category(&user_id, &query).await },
        move |result| AppEvent::ArticlesLoaded { generation, result },
    );
}

pub(super) fn load_report(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(user_id) = app.user_id().cloned() else {
        return;
    };
    let generation = app.begin_request();
    let Screen::Report(state) = &app.screen else {
        return;
    };
    let task_id = state.task_id.clone();
    let api = app.api.clone();

    spawn_request(
        event_tx,
        "load_report",
        async move { api.keyword_report(&user_id, &task_id).await },
        move |result| AppEvent::ReportLoaded { generation, result },
    );
}

pub(super) fn spawn_delete(
    app: &mut App,
    scope: DeleteScope,
    article_id: RemoteId,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let Some(user_id) = app.user_id().cloned() else {
        return;
    };
    let api = app.api.clone();
    let ids = vec![article_id.clone()];

    spawn_request(
        event_tx,
        "delete_article",
        async move { api.delete_articles(scope, &user_id, &ids).await },
        move |result| AppEvent::ArticleDeleted { article_id, result },
    );
}

pub(super) fn spawn_process(app: &mut App, task_id: RemoteId, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(user_id) = app.user_id().cloned() else {
        return;
    };
    let api = app.api.clone();
    let id = task_id.clone();

    spawn_request(
        event_tx,
        "process_task",
        async move { api.process_task(&user_id, &id).await },
        move |result| AppEvent::ProcessFinished { task_id, result },
    );
}

// ============================================================================
// Misc
// ============================================================================

/// Open `url` in the system browser after validating it.
pub(super) fn open_in_browser(app: &mut App, url: Option<&str>) {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        app.set_status(ERR_ARTICLE_NO_URL);
        return;
    };
    match validate_url_for_open(url) {
        Err(e) => app.set_status(e.to_string()),
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                app.set_status(format!("Failed to open browser: {e}"));
            } else {
                app.set_status("Opened in browser");
            }
        }
    }
}

/// Format a backend timestamp relative to now.
///
/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS` (taken as local time). Anything
/// else is shown as sent.
pub fn format_relative_time(raw: Option<&str>) -> String {
    format_relative_time_at(raw, Utc::now())
}

fn format_relative_time_at(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    let Some(when) = parse_timestamp(raw) else {
        return raw.to_owned();
    };

    let diff = (now - when).num_seconds();
    if diff < 60 {
        return "now".to_string();
    }
    if diff < 3600 {
        return format!("{}m", diff / 60);
    }
    if diff < 86400 {
        return format!("{}h", diff / 3600);
    }
    if diff < 604800 {
        return format!("{}d", diff / 86400);
    }
    when.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
