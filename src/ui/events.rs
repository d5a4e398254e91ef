//! Application event handling.
//!
//! Applies background task completions to the app state. Screen loads are
//! checked against the request generation first so a response for a screen
//! the user already left never lands on the current one.

use crate::api::{Article, RemoteId, TaskPage, UserInfo};
use crate::app::{App, AppEvent, LoginMode, Screen};
use crate::reader::Applied;
use crate::util::strip_control_chars;
use tokio::sync::mpsc;

use super::helpers::load_articles;

/// Handle application events from background tasks.
///
/// `event_tx` is used when an outcome triggers a follow-up load.
pub(super) fn handle_app_event(
    app: &mut App,
    event: AppEvent,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match event {
        AppEvent::LoggedIn { generation, result } => {
            if accept(app, generation, "login") {
                handle_logged_in(app, result);
            }
        }
        AppEvent::Registered { generation, result } => {
            if accept(app, generation, "register") {
                handle_registered(app, result);
            }
        }
        AppEvent::TasksLoaded { generation, result } => {
            if accept(app, generation, "tasks") {
                handle_tasks_loaded(app, result);
            }
        }
        AppEvent::TaskArticlesLoaded { generation, result } => {
            if accept(app, generation, "task_articles") {
                handle_task_articles_loaded(app, result);
            }
        }
        AppEvent::ArticlesLoaded { generation, result } => {
            if accept(app, generation, "articles") {
                handle_articles_loaded(app, result);
            }
        }
        AppEvent::ReportLoaded { generation, result } => {
            if accept(app, generation, "report") {
                match result {
                    Ok(report) => {
                        if let Screen::Report(state) = &mut app.screen {
                            state.report = Some(report.sanitized());
                        }
                    }
                    Err(e) => {
                        app.go_back();
                        app.set_status(format!("Could not load report: {e}"));
                    }
                }
            }
        }
        AppEvent::ArticleDeleted { article_id, result } => {
            handle_article_deleted(app, article_id, result, event_tx);
        }
        AppEvent::ProcessFinished { task_id, result } => match result {
            Ok(message) => {
                tracing::info!(task_id = %task_id, "Task processed");
                app.set_status(message.unwrap_or_else(|| format!("Task {task_id} processed")));
            }
            Err(e) => app.set_status(format!("Processing task {task_id} failed: {e}")),
        },
        AppEvent::Simplify(event) => match app.reader.on_outcome(event) {
            Applied::Simplified => {
                if let Screen::Reader(view) = &mut app.screen {
                    view.scroll = 0;
                }
                app.set_status("Simplified");
            }
            Applied::Failed { message } => {
                app.set_status(format!("Simplify failed: {message}"));
            }
            Applied::Discarded => {}
        },
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error, "Background task panicked");
            // A report screen has nothing to show without its report.
            if matches!(&app.screen, Screen::Report(s) if s.report.is_none()) {
                app.go_back();
            }
            clear_loading(app);
            app.set_status(format!("Internal error in {task} task"));
        }
    }
    app.needs_redraw = true;
}

/// Check a screen response against the newest request generation.
fn accept(app: &App, generation: u64, what: &'static str) -> bool {
    if app.is_current(generation) {
        return true;
    }
    tracing::debug!(
        expected = app.request_generation,
        got = generation,
        what,
        "Ignoring stale response (generation mismatch)"
    );
    false
}

fn clear_loading(app: &mut App) {
    match &mut app.screen {
        Screen::Login(form) => form.busy = false,
        Screen::TaskList(s) => s.loading = false,
        Screen::TaskDetail(s) => s.loading = false,
        Screen::ArticleList(s) => s.loading = false,
        _ => {}
    }
}

fn handle_logged_in(app: &mut App, result: Result<UserInfo, String>) {
    match result {
        Ok(user) => {
            app.set_status(format!("Welcome, {}", user.display_name()));
            app.session = Some(user);
            app.history.clear();
            app.screen = Screen::Home { selected: 0 };
        }
        Err(e) => {
            clear_loading(app);
            app.set_status(format!("Login failed: {e}"));
        }
    }
}

fn handle_registered(app: &mut App, result: Result<RemoteId, String>) {
    let Screen::Login(form) = &mut app.screen else {
        return;
    };
    form.busy = false;
    match result {
        Ok(account) => {
            // Log in next with the account the backend assigned.
            form.mode = LoginMode::Login;
            form.account = account.to_string();
            app.set_status(format!("Registered. Your login account is {account}"));
        }
        Err(e) => app.set_status(format!("Registration failed: {e}")),
    }
}

fn handle_tasks_loaded(app: &mut App, result: Result<TaskPage, String>) {
    let per_page = app.per_page;
    let Screen::TaskList(state) = &mut app.screen else {
        return;
    };
    state.loading = false;
    match result {
        Ok(page) => {
            state.tasks = page.tasks;
            state.total = page.total;
            state.page = state.page.min(state.page_count(per_page).max(1));
            state.selected = state.selected.min(state.tasks.len().saturating_sub(1));
        }
        Err(e) => app.set_status(format!("Could not load tasks: {e}")),
    }
}

fn handle_task_articles_loaded(app: &mut App, result: Result<Vec<Article>, String>) {
    let Screen::TaskDetail(state) = &mut app.screen else {
        return;
    };
    state.loading = false;
    match result {
        Ok(articles) => {
            state.articles = articles.into_iter().map(sanitize).collect();
            state.index = state.index.min(state.articles.len().saturating_sub(1));
            state.scroll = 0;
            if state.articles.is_empty() {
                app.set_status("This task has no articles");
            }
        }
        Err(e) => app.set_status(format!("Could not load articles: {e}")),
    }
}

fn handle_articles_loaded(app: &mut App, result: Result<Vec<Article>, String>) {
    let Screen::ArticleList(state) = &mut app.screen else {
        return;
    };
    state.loading = false;
    match result {
        Ok(articles) if articles.is_empty() && state.page > 1 => {
            // Past the last page: stay on the previous one.
            state.page -= 1;
            app.set_status("No more articles");
        }
        Ok(articles) => {
            state.articles = articles.into_iter().map(sanitize).collect();
            state.sort.apply(&mut state.articles);
            state.selected = state.selected.min(state.articles.len().saturating_sub(1));
        }
        Err(e) => app.set_status(format!("Could not load articles: {e}")),
    }
}

fn handle_article_deleted(
    app: &mut App,
    article_id: RemoteId,
    result: Result<String, String>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let message = match result {
        Ok(message) => message,
        Err(e) => {
            app.set_status(format!("Delete failed: {e}"));
            return;
        }
    };
    tracing::info!(article_id = %article_id, "Article deleted");

    // The detail view of a deleted article has nothing left to show.
    let from_detail =
        matches!(&app.screen, Screen::ArticleDetail(d) if d.article.article_id == article_id);
    if from_detail {
        app.go_back();
    }
    match &mut app.screen {
        Screen::TaskDetail(state) => {
            state.articles.retain(|a| a.article_id != article_id);
            state.index = state.index.min(state.articles.len().saturating_sub(1));
            state.scroll = 0;
        }
        Screen::ArticleList(state) => {
            state.articles.retain(|a| a.article_id != article_id);
            state.selected = state.selected.min(state.articles.len().saturating_sub(1));
        }
        _ => {}
    }
    app.set_status(message);

    // Refill the page from the server so the next article moves up.
    if from_detail && matches!(app.screen, Screen::ArticleList(_)) {
        load_articles(app, event_tx);
    }
}

/// Strip terminal control sequences from server-supplied text.
fn sanitize(mut article: Article) -> Article {
    for field in [
        &mut article.title,
        &mut article.author,
        &mut article.content,
        &mut article.content_summary,
        &mut article.summary,
        &mut article.keyword,
    ] {
        if let Some(text) = field {
            let clean = strip_control_chars(text).into_owned();
            *text = clean;
        }
    }
    article
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ArticleFields, Task, TaskKind, TaskStatus};
    use crate::app::tests::{article, logged_in, test_app};
    use crate::api::KeywordReport;
    use crate::app::{
        ArticleDetailState, ArticleListState, LoginForm, ReportState, TaskDetailState, TaskListState,
    };
    use crate::reader::{FetchEvent, FetchOutcome, ReaderPhase};
    use pretty_assertions::assert_eq;

    fn apply(app: &mut App, event: AppEvent) {
        let (tx, _rx) = mpsc::channel(8);
        handle_app_event(app, event, &tx);
    }

    fn open_report(app: &mut App) -> u64 {
        app.push_screen(Screen::Report(ReportState {
            task_id: RemoteId::Number(11),
            report: None,
            scroll: 0,
        }));
        app.begin_request()
    }

    fn task(id: i64, status: TaskStatus) -> Task {
        Task {
            task_id: RemoteId::Number(id),
            status,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_login_success_opens_home() {
        let (mut app, _rx) = test_app();
        let generation = app.begin_request();
        apply(
            &mut app,
            AppEvent::LoggedIn {
                generation,
                result: Ok(UserInfo {
                    userid: RemoteId::Number(1),
                    useraccount: RemoteId::Number(10001),
                    username: "ana".into(),
                }),
            },
        );
        assert!(matches!(app.screen, Screen::Home { selected: 0 }));
        assert_eq!(app.user_id(), Some(&RemoteId::Number(1)));
    }

    #[tokio::test]
    async fn test_login_failure_shows_message() {
        let (mut app, _rx) = test_app();
        if let Screen::Login(form) = &mut app.screen {
            form.busy = true;
        }
        let generation = app.begin_request();
        apply(
            &mut app,
            AppEvent::LoggedIn {
                generation,
                result: Err("Invalid account or password".into()),
            },
        );
        let Screen::Login(form) = &app.screen else {
            panic!("expected login screen");
        };
        assert!(!form.busy);
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert!(msg.contains("Invalid account or password"));
    }

    #[tokio::test]
    async fn test_register_fills_assigned_account() {
        let (mut app, _rx) = test_app();
        let mut form = LoginForm::new(None);
        form.mode = LoginMode::Register;
        form.account = "Ana".into();
        app.screen = Screen::Login(form);
        let generation = app.begin_request();

        apply(
            &mut app,
            AppEvent::Registered {
                generation,
                result: Ok(RemoteId::Number(10042)),
            },
        );
        let Screen::Login(form) = &app.screen else {
            panic!("expected login screen");
        };
        assert_eq!(form.mode, LoginMode::Login);
        assert_eq!(form.account, "10042");
    }

    #[tokio::test]
    async fn test_stale_task_page_is_ignored() {
        let (mut app, _rx) = logged_in();
        app.push_screen(Screen::TaskList(TaskListState::new(TaskKind::Crawl)));
        let stale = app.begin_request();
        let current = app.begin_request();

        apply(
            &mut app,
            AppEvent::TasksLoaded {
                generation: stale,
                result: Ok(TaskPage {
                    tasks: vec![task(1, TaskStatus::Failed)],
                    total: 1,
                }),
            },
        );
        let Screen::TaskList(state) = &app.screen else {
            panic!("expected task list");
        };
        assert!(state.tasks.is_empty());
        assert!(state.loading);

        apply(
            &mut app,
            AppEvent::TasksLoaded {
                generation: current,
                result: Ok(TaskPage {
                    tasks: vec![task(2, TaskStatus::Completed)],
                    total: 1,
                }),
            },
        );
        let Screen::TaskList(state) = &app.screen else {
            panic!("expected task list");
        };
        assert_eq!(state.tasks, vec![task(2, TaskStatus::Completed)]);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_response_after_leaving_screen_is_ignored() {
        let (mut app, _rx) = logged_in();
        app.push_screen(Screen::ArticleList(ArticleListState::default()));
        let generation = app.begin_request();
        app.go_back();

        apply(
            &mut app,
            AppEvent::ArticlesLoaded {
                generation,
                result: Ok(vec![article(1)]),
            },
        );
        assert!(matches!(app.screen, Screen::Home { .. }));
    }

    #[tokio::test]
    async fn test_empty_page_past_end_keeps_previous_page() {
        let (mut app, _rx) = logged_in();
        let mut state = ArticleListState::default();
        state.page = 3;
        state.articles = vec![article(1), article(2)];
        app.push_screen(Screen::ArticleList(state));
        let generation = app.begin_request();

        apply(
            &mut app,
            AppEvent::ArticlesLoaded {
                generation,
                result: Ok(Vec::new()),
            },
        );
        let Screen::ArticleList(state) = &app.screen else {
            panic!("expected article list");
        };
        assert_eq!(state.page, 2);
        assert_eq!(state.articles.len(), 2);
    }

    #[tokio::test]
    async fn test_loaded_articles_are_sanitized() {
        let (mut app, _rx) = logged_in();
        app.push_screen(Screen::TaskDetail(TaskDetailState::new(
            TaskKind::Crawl,
            RemoteId::Number(5),
        )));
        let generation = app.begin_request();
        let mut dirty = article(1);
        dirty.title = Some("Bad\x1b[31mTitle".into());

        apply(
            &mut app,
            AppEvent::TaskArticlesLoaded {
                generation,
                result: Ok(vec![dirty]),
            },
        );
        let Screen::TaskDetail(state) = &app.screen else {
            panic!("expected task detail");
        };
        assert_eq!(state.articles[0].title(), "BadTitle");
    }

    #[tokio::test]
    async fn test_delete_from_detail_returns_to_list() {
        let (mut app, _rx) = logged_in();
        let mut list = ArticleListState::default();
        list.articles = vec![article(1), article(2)];
        list.selected = 1;
        list.loading = false;
        app.push_screen(Screen::ArticleList(list));
        app.push_screen(Screen::ArticleDetail(ArticleDetailState {
            article: article(2),
            scroll: 0,
        }));
        let before = app.request_generation;

        apply(
            &mut app,
            AppEvent::ArticleDeleted {
                article_id: RemoteId::Number(2),
                result: Ok("Deleted".into()),
            },
        );
        let Screen::ArticleList(state) = &app.screen else {
            panic!("expected article list");
        };
        assert_eq!(state.articles, vec![article(1)]);
        assert_eq!(state.selected, 0);
        // The page is requested again.
        assert!(state.loading);
        assert!(app.request_generation > before + 1);
    }

    #[tokio::test]
    async fn test_report_is_sanitized() {
        let (mut app, _rx) = logged_in();
        let generation = open_report(&mut app);

        apply(
            &mut app,
            AppEvent::ReportLoaded {
                generation,
                result: Ok(KeywordReport {
                    title: Some("\x1b]0;x\x07Weekly".into()),
                    keyword: Some("rates".into()),
                    content: Some("# Head\x1b[2J".into()),
                }),
            },
        );
        let Screen::Report(state) = &app.screen else {
            panic!("expected report");
        };
        let report = state.report.as_ref().unwrap();
        assert_eq!(report.title.as_deref(), Some("Weekly"));
        assert_eq!(report.content.as_deref(), Some("# Head"));
    }

    #[tokio::test]
    async fn test_panicked_report_load_leaves_report() {
        let (mut app, _rx) = logged_in();
        open_report(&mut app);
        assert!(app.screen.is_loading());

        apply(
            &mut app,
            AppEvent::TaskPanicked {
                task: "report",
                error: "boom".into(),
            },
        );
        assert!(matches!(app.screen, Screen::Home { .. }));
        assert!(!app.screen.is_loading());
    }

    #[tokio::test]
    async fn test_status_text_is_sanitized() {
        let (mut app, _rx) = logged_in();
        app.push_screen(Screen::ArticleList(ArticleListState::default()));
        let generation = app.begin_request();

        apply(
            &mut app,
            AppEvent::ArticlesLoaded {
                generation,
                result: Err("HTTP 500: \x1b[2Joops".into()),
            },
        );
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "Could not load articles: HTTP 500: oops");
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_article() {
        let (mut app, _rx) = logged_in();
        let mut detail = TaskDetailState::new(TaskKind::Keyword, RemoteId::Number(5));
        detail.articles = vec![article(1)];
        app.push_screen(Screen::TaskDetail(detail));

        apply(
            &mut app,
            AppEvent::ArticleDeleted {
                article_id: RemoteId::Number(1),
                result: Err("forbidden".into()),
            },
        );
        let Screen::TaskDetail(state) = &app.screen else {
            panic!("expected task detail");
        };
        assert_eq!(state.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_simplify_failure_sets_status() {
        let (mut app, _rx) = logged_in();
        app.push_screen(Screen::Reader(crate::app::ReaderView::new("https://example.com")));
        let generation = app
            .reader
            .start("https://example.com/a", RemoteId::Number(7))
            .unwrap();

        apply(
            &mut app,
            AppEvent::Simplify(FetchEvent {
                generation,
                outcome: FetchOutcome::Failure {
                    message: "boom".into(),
                },
            }),
        );
        assert_eq!(app.reader.current_state(), ReaderPhase::Idle);
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "Simplify failed: boom");
    }

    #[tokio::test]
    async fn test_simplify_success_after_cancel_is_discarded() {
        let (mut app, _rx) = logged_in();
        app.push_screen(Screen::Reader(crate::app::ReaderView::new("https://example.com")));
        let generation = app
            .reader
            .start("https://example.com/a", RemoteId::Number(7))
            .unwrap();
        app.reader.cancel();

        apply(
            &mut app,
            AppEvent::Simplify(FetchEvent {
                generation,
                outcome: FetchOutcome::Success {
                    fields: ArticleFields::default(),
                },
            }),
        );
        assert_eq!(app.reader.current_state(), ReaderPhase::Idle);
        assert!(app.simplified().is_none());
    }
}
