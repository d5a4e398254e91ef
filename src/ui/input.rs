//! Input handling for the TUI.
//!
//! Keys go to the help overlay or the confirmation dialog first, then to
//! whichever text field is open, then through the keybinding registry for
//! the current screen.

use crate::api::{Category, DeleteScope, TaskKind};
use crate::app::{
    App, AppEvent, ArticleDetailState, ArticleListState, ConfirmAction, HomeItem, LoginField,
    LoginMode, ReaderView, ReportState, Screen, TaskDetailState, TaskListState,
};
use crate::keybindings::{Action as KbAction, Context};
use crate::reader::ReaderPhase;
use crate::util::{normalize_address, validate_url_for_open, MAX_ADDRESS_LENGTH, MAX_SEARCH_QUERY_LENGTH};
use anyhow::Result;
use secrecy::ExposeSecretMut;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{
    load_articles, load_report, load_task_articles, load_tasks, open_in_browser, spawn_delete,
    spawn_process, submit_login,
};
use super::Action;

/// Longest account name or password accepted by the login form.
const MAX_CREDENTIAL_LENGTH: usize = 128;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    if app.show_help {
        return Ok(handle_help_input(app, code));
    }

    if app.pending_confirm.is_some() {
        handle_confirm_input(app, code, event_tx);
        return Ok(Action::Continue);
    }

    if is_editing(app) {
        return Ok(handle_text_entry(app, code, modifiers, event_tx));
    }

    let context = app.screen.context();
    let Some(action) = app.keybindings.action_for_key(code, modifiers, context) else {
        if let (Context::ArticleList, KeyCode::Char(c)) = (context, code) {
            handle_category_digit(app, c, event_tx);
        }
        return Ok(Action::Continue);
    };

    match action {
        KbAction::Quit => return Ok(Action::Quit),
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
        }
        KbAction::CycleTheme => {
            let name = app.cycle_theme();
            app.set_status(format!("Theme: {name}"));
        }
        KbAction::GoHome => app.go_home(),
        KbAction::Back => handle_back(app),
        KbAction::ScrollDown => app.scroll_by(1),
        KbAction::ScrollUp => app.scroll_by(-1),
        KbAction::PageDown => app.scroll_by(app.page_lines()),
        KbAction::PageUp => app.scroll_by(-app.page_lines()),
        action => match context {
            Context::Home => handle_home(app, action, event_tx),
            Context::TaskList => handle_task_list(app, action, event_tx),
            Context::TaskDetail => handle_task_detail(app, action, event_tx),
            Context::ArticleList => handle_article_list(app, action, event_tx),
            Context::ArticleDetail => handle_article_detail(app, action),
            Context::Reader => handle_reader(app, action),
            Context::Global | Context::Login | Context::Report => {}
        },
    }
    Ok(Action::Continue)
}

/// Handle input while the help overlay is visible.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

/// y/Y confirms the pending action, n/N/Esc cancels, anything else is ignored.
fn handle_confirm_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) {
    match code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(ConfirmAction::DeleteArticle {
                scope,
                article_id,
                title,
            }) = app.pending_confirm.take()
            {
                app.set_status(format!("Deleting {title}..."));
                spawn_delete(app, scope, article_id, event_tx);
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.pending_confirm = None;
            app.set_status("Cancelled");
        }
        _ => {}
    }
}

fn handle_back(app: &mut App) {
    // Esc while simplifying abandons the fetch and stays on the page.
    if matches!(app.screen, Screen::Reader(_)) && app.reader.cancel() {
        app.set_status("Simplify cancelled");
        return;
    }
    app.go_back();
}

// ============================================================================
// Text entry
// ============================================================================

fn is_editing(app: &App) -> bool {
    match &app.screen {
        Screen::Login(_) => true,
        Screen::TaskList(s) => s.search_input.is_some(),
        Screen::ArticleList(s) => s.search_input.is_some(),
        Screen::Reader(v) => v.input.is_some(),
        _ => false,
    }
}

fn is_plain_char(modifiers: KeyModifiers) -> bool {
    !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn handle_text_entry(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if matches!(app.screen, Screen::Login(_)) {
        return handle_login_input(app, code, modifiers, event_tx);
    }

    let (buffer, limit) = match &mut app.screen {
        Screen::TaskList(s) => (s.search_input.as_mut(), MAX_SEARCH_QUERY_LENGTH),
        Screen::ArticleList(s) => (s.search_input.as_mut(), MAX_SEARCH_QUERY_LENGTH),
        Screen::Reader(v) => (v.input.as_mut(), MAX_ADDRESS_LENGTH),
        _ => (None, 0),
    };
    let Some(buffer) = buffer else {
        return Action::Continue;
    };

    match code {
        KeyCode::Char(c) if is_plain_char(modifiers) => {
            if buffer.len() + c.len_utf8() > limit {
                app.set_status(format!("Input at max length ({limit} chars)"));
            } else {
                buffer.push(c);
            }
        }
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Esc => close_text_entry(app),
        KeyCode::Enter => commit_text_entry(app, event_tx),
        _ => {}
    }
    Action::Continue
}

fn close_text_entry(app: &mut App) {
    match &mut app.screen {
        Screen::TaskList(s) => s.search_input = None,
        Screen::ArticleList(s) => s.search_input = None,
        Screen::Reader(v) => v.input = None,
        _ => {}
    }
}

fn commit_text_entry(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    match &mut app.screen {
        Screen::TaskList(s) => {
            if let Some(query) = s.search_input.take() {
                s.search = query.trim().to_owned();
                s.page = 1;
                s.selected = 0;
                load_tasks(app, event_tx);
            }
        }
        Screen::ArticleList(s) => {
            if let Some(query) = s.search_input.take() {
                s.search = query.trim().to_owned();
                s.page = 1;
                s.selected = 0;
                load_articles(app, event_tx);
            }
        }
        Screen::Reader(view) => {
            let Some(input) = view.input.take() else {
                return;
            };
            if input.trim().is_empty() {
                return;
            }
            let address = normalize_address(&input);
            match validate_url_for_open(&address) {
                Ok(url) => {
                    view.address = url.to_string();
                    view.scroll = 0;
                    // A new page starts live.
                    app.reader.reset();
                }
                Err(e) => app.set_status(e.to_string()),
            }
        }
        _ => {}
    }
}

fn handle_login_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let Screen::Login(form) = &mut app.screen else {
        return Action::Continue;
    };
    if form.busy {
        return Action::Continue;
    }

    match code {
        KeyCode::Char(c) if is_plain_char(modifiers) => {
            let field = form.focused_input();
            if field.chars().count() < MAX_CREDENTIAL_LENGTH {
                field.push(c);
            }
            return Action::Continue;
        }
        KeyCode::Backspace => {
            form.focused_input().pop();
            return Action::Continue;
        }
        _ => {}
    }

    match app.keybindings.action_for_key(code, modifiers, app.screen.context()) {
        Some(KbAction::Quit) => return Action::Quit,
        Some(KbAction::NextField) | Some(KbAction::NavDown) | Some(KbAction::NavUp) => {
            if let Screen::Login(form) = &mut app.screen {
                form.focus = match form.focus {
                    LoginField::Account => LoginField::Password,
                    LoginField::Password => LoginField::Account,
                };
            }
        }
        Some(KbAction::ToggleRegister) => {
            if let Screen::Login(form) = &mut app.screen {
                form.mode = match form.mode {
                    LoginMode::Login => LoginMode::Register,
                    LoginMode::Register => LoginMode::Login,
                };
                form.account.clear();
                form.password.expose_secret_mut().clear();
                form.focus = LoginField::Account;
            }
        }
        Some(KbAction::Select) => submit_login(app, event_tx),
        _ => {}
    }
    Action::Continue
}

// ============================================================================
// Screens
// ============================================================================

/// Move a list selection, clamped to `len`.
fn step(selected: &mut usize, len: usize, down: bool) {
    if down {
        *selected = (*selected + 1).min(len.saturating_sub(1));
    } else {
        *selected = selected.saturating_sub(1);
    }
}

fn handle_home(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    let Screen::Home { selected } = &mut app.screen else {
        return;
    };
    match action {
        KbAction::NavDown => step(selected, HomeItem::ALL.len(), true),
        KbAction::NavUp => step(selected, HomeItem::ALL.len(), false),
        KbAction::Logout => app.logout(),
        KbAction::Select => {
            let item = HomeItem::ALL[(*selected).min(HomeItem::ALL.len() - 1)];
            open_home_item(app, item, event_tx);
        }
        _ => {}
    }
}

fn open_home_item(app: &mut App, item: HomeItem, event_tx: &mpsc::Sender<AppEvent>) {
    match item {
        HomeItem::Tasks | HomeItem::KeywordTasks => {
            let kind = if item == HomeItem::Tasks {
                TaskKind::Crawl
            } else {
                TaskKind::Keyword
            };
            app.push_screen(Screen::TaskList(TaskListState::new(kind)));
            load_tasks(app, event_tx);
        }
        HomeItem::Articles => {
            app.push_screen(Screen::ArticleList(ArticleListState::default()));
            load_articles(app, event_tx);
        }
        HomeItem::Reader => {
            let home = app.home_page.clone();
            app.push_screen(Screen::Reader(ReaderView::new(normalize_address(&home))));
        }
        HomeItem::Logout => app.logout(),
    }
}

fn handle_task_list(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    let per_page = app.per_page;
    let Screen::TaskList(state) = &mut app.screen else {
        return;
    };
    match action {
        KbAction::NavDown => step(&mut state.selected, state.tasks.len(), true),
        KbAction::NavUp => step(&mut state.selected, state.tasks.len(), false),
        KbAction::Search => state.search_input = Some(state.search.clone()),
        KbAction::NextPage => {
            if state.page < state.page_count(per_page) {
                state.page += 1;
                state.selected = 0;
                load_tasks(app, event_tx);
            } else {
                app.set_status("Already on the last page");
            }
        }
        KbAction::PrevPage => {
            if state.page > 1 {
                state.page -= 1;
                state.selected = 0;
                load_tasks(app, event_tx);
            } else {
                app.set_status("Already on the first page");
            }
        }
        KbAction::Refresh => load_tasks(app, event_tx),
        KbAction::Select => {
            let Some(task) = state.tasks.get(state.selected) else {
                return;
            };
            // Only finished tasks have articles to show.
            if let Some(reason) = task.status.blocked_reason() {
                app.set_status(reason);
                return;
            }
            let detail = TaskDetailState::new(state.kind, task.task_id.clone());
            app.push_screen(Screen::TaskDetail(detail));
            load_task_articles(app, event_tx);
        }
        _ => {}
    }
}

fn handle_task_detail(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    let Screen::TaskDetail(state) = &mut app.screen else {
        return;
    };
    match action {
        KbAction::NextItem | KbAction::PrevItem => {
            let before = state.index;
            step(&mut state.index, state.articles.len(), action == KbAction::NextItem);
            if state.index != before {
                state.scroll = 0;
            }
        }
        KbAction::Refresh => load_task_articles(app, event_tx),
        KbAction::Delete => {
            let scope = match state.kind {
                TaskKind::Crawl => DeleteScope::TaskArticles,
                TaskKind::Keyword => DeleteScope::KeywordArticles,
            };
            if let Some(article) = state.current() {
                app.pending_confirm = Some(ConfirmAction::DeleteArticle {
                    scope,
                    article_id: article.article_id.clone(),
                    title: article.title().to_owned(),
                });
            }
        }
        KbAction::ProcessTask => {
            if state.kind != TaskKind::Crawl {
                app.set_status("Keyword tasks are processed by the server");
                return;
            }
            let task_id = state.task_id.clone();
            app.set_status(format!("Processing task {task_id}..."));
            spawn_process(app, task_id, event_tx);
        }
        KbAction::ShowReport => {
            if state.kind != TaskKind::Keyword {
                app.set_status("Only keyword tasks have a report");
                return;
            }
            let report = ReportState {
                task_id: state.task_id.clone(),
                report: None,
                scroll: 0,
            };
            app.push_screen(Screen::Report(report));
            load_report(app, event_tx);
        }
        KbAction::OpenInBrowser => {
            let url = state.current().and_then(|a| a.source_url.clone());
            open_in_browser(app, url.as_deref());
        }
        KbAction::OpenInReader => {
            let url = state.current().and_then(|a| a.source_url.clone());
            open_in_reader(app, url);
        }
        _ => {}
    }
}

fn handle_category_digit(app: &mut App, c: char, event_tx: &mpsc::Sender<AppEvent>) {
    let Screen::ArticleList(state) = &mut app.screen else {
        return;
    };
    let Some(category) = c
        .to_digit(10)
        .and_then(|d| (d as usize).checked_sub(1))
        .and_then(|i| Category::ALL.get(i).copied())
    else {
        return;
    };
    state.toggle_category(category);
    state.page = 1;
    state.selected = 0;
    load_articles(app, event_tx);
}

fn handle_article_list(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    let Screen::ArticleList(state) = &mut app.screen else {
        return;
    };
    match action {
        KbAction::NavDown => step(&mut state.selected, state.articles.len(), true),
        KbAction::NavUp => step(&mut state.selected, state.articles.len(), false),
        KbAction::Search => state.search_input = Some(state.search.clone()),
        KbAction::ToggleAllCategories => {
            state.toggle_all();
            state.page = 1;
            state.selected = 0;
            load_articles(app, event_tx);
        }
        KbAction::NextPage => {
            if state.articles.is_empty() {
                app.set_status("No more articles");
                return;
            }
            state.page += 1;
            state.selected = 0;
            load_articles(app, event_tx);
        }
        KbAction::PrevPage => {
            if state.page > 1 {
                state.page -= 1;
                state.selected = 0;
                load_articles(app, event_tx);
            } else {
                app.set_status("Already on the first page");
            }
        }
        KbAction::Refresh => load_articles(app, event_tx),
        KbAction::CycleSort => {
            state.sort = state.sort.next();
            state.sort.apply(&mut state.articles);
            state.selected = 0;
            let label = state.sort.label();
            app.set_status(format!("Sorted by {label}"));
        }
        KbAction::Select => {
            if let Some(article) = state.articles.get(state.selected).cloned() {
                app.push_screen(Screen::ArticleDetail(ArticleDetailState { article, scroll: 0 }));
            }
        }
        _ => {}
    }
}

fn handle_article_detail(app: &mut App, action: KbAction) {
    let Screen::ArticleDetail(state) = &app.screen else {
        return;
    };
    match action {
        KbAction::Delete => {
            app.pending_confirm = Some(ConfirmAction::DeleteArticle {
                scope: DeleteScope::CategoryArticles,
                article_id: state.article.article_id.clone(),
                title: state.article.title().to_owned(),
            });
        }
        KbAction::OpenInBrowser => {
            let url = state.article.source_url.clone();
            open_in_browser(app, url.as_deref());
        }
        KbAction::OpenInReader => {
            let url = state.article.source_url.clone();
            open_in_reader(app, url);
        }
        _ => {}
    }
}

fn open_in_reader(app: &mut App, url: Option<String>) {
    match url.filter(|u| !u.trim().is_empty()) {
        Some(url) => app.push_screen(Screen::Reader(ReaderView::new(normalize_address(&url)))),
        None => app.set_status(super::helpers::ERR_ARTICLE_NO_URL),
    }
}

fn handle_reader(app: &mut App, action: KbAction) {
    let Screen::Reader(view) = &mut app.screen else {
        return;
    };
    match action {
        KbAction::EditAddress => view.input = Some(view.address.clone()),
        KbAction::OpenInBrowser => {
            let address = view.address.clone();
            open_in_browser(app, Some(&address));
        }
        KbAction::CancelSimplify => {
            if app.reader.cancel() {
                app.set_status("Simplify cancelled");
            } else {
                app.set_status("Nothing to cancel");
            }
        }
        KbAction::ToggleSimplify => match app.reader.current_state() {
            ReaderPhase::Simplified => {
                app.reader.restore();
                view.scroll = 0;
                app.set_status("Showing live page");
            }
            ReaderPhase::Fetching => {
                app.set_status("Already simplifying; press x to cancel");
            }
            ReaderPhase::Idle => {
                let Some(user_id) = app.session.as_ref().map(|s| s.userid.clone()) else {
                    return;
                };
                let address = view.address.clone();
                match app.reader.start(&address, user_id) {
                    Ok(_) => app.set_status("Simplifying..."),
                    Err(e) => app.set_status(e.to_string()),
                }
            }
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{RemoteId, Task, TaskStatus};
    use crate::app::tests::{article, logged_in, test_app};
    use pretty_assertions::assert_eq;

    fn press(app: &mut App, tx: &mpsc::Sender<AppEvent>, code: KeyCode) -> Action {
        handle_input(app, code, KeyModifiers::NONE, tx).unwrap()
    }

    fn type_text(app: &mut App, tx: &mpsc::Sender<AppEvent>, text: &str) {
        for c in text.chars() {
            press(app, tx, KeyCode::Char(c));
        }
    }

    fn status(app: &App) -> String {
        app.status_message
            .as_ref()
            .map(|(m, _)| m.to_string())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_login_form_captures_text_including_q() {
        let (mut app, _rx) = test_app();
        let (tx, _keep) = mpsc::channel(8);
        type_text(&mut app, &tx, "quinn");
        press(&mut app, &tx, KeyCode::Tab);
        type_text(&mut app, &tx, "pw");

        let Screen::Login(form) = &app.screen else {
            panic!("expected login screen");
        };
        assert_eq!(form.account, "quinn");
        assert_eq!(form.password(), "pw");
    }

    #[tokio::test]
    async fn test_login_submit_requires_both_fields() {
        let (mut app, _rx) = test_app();
        let (tx, _keep) = mpsc::channel(8);
        type_text(&mut app, &tx, "10001");
        press(&mut app, &tx, KeyCode::Enter);
        assert_eq!(status(&app), "Enter both fields first");

        press(&mut app, &tx, KeyCode::Tab);
        type_text(&mut app, &tx, "secret");
        press(&mut app, &tx, KeyCode::Enter);
        let Screen::Login(form) = &app.screen else {
            panic!("expected login screen");
        };
        assert!(form.busy);
        assert!(form.password().is_empty());
    }

    #[tokio::test]
    async fn test_ctrl_r_switches_to_register() {
        let (mut app, _rx) = test_app();
        let (tx, _keep) = mpsc::channel(8);
        handle_input(&mut app, KeyCode::Char('r'), KeyModifiers::CONTROL, &tx).unwrap();
        let Screen::Login(form) = &app.screen else {
            panic!("expected login screen");
        };
        assert_eq!(form.mode, LoginMode::Register);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_text_entry() {
        let (mut app, _rx) = test_app();
        let (tx, _keep) = mpsc::channel(8);
        let action = handle_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL, &tx).unwrap();
        assert!(matches!(action, Action::Quit));
    }

    #[tokio::test]
    async fn test_home_menu_opens_article_list() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        press(&mut app, &tx, KeyCode::Down);
        press(&mut app, &tx, KeyCode::Down);
        press(&mut app, &tx, KeyCode::Enter);
        let Screen::ArticleList(state) = &app.screen else {
            panic!("expected article list");
        };
        assert!(state.loading);
        assert_eq!(state.categories.len(), 8);
    }

    #[tokio::test]
    async fn test_unfinished_task_does_not_open() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        let mut list = TaskListState::new(TaskKind::Crawl);
        list.loading = false;
        list.tasks = vec![Task {
            task_id: RemoteId::Number(4),
            status: TaskStatus::Running,
            created_at: None,
        }];
        app.push_screen(Screen::TaskList(list));

        press(&mut app, &tx, KeyCode::Enter);
        assert!(matches!(app.screen, Screen::TaskList(_)));
        assert!(status(&app).contains("still running"));
    }

    #[tokio::test]
    async fn test_completed_task_opens_detail() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        let mut list = TaskListState::new(TaskKind::Keyword);
        list.tasks = vec![Task {
            task_id: RemoteId::Text("k-9".into()),
            status: TaskStatus::Completed,
            created_at: None,
        }];
        app.push_screen(Screen::TaskList(list));

        press(&mut app, &tx, KeyCode::Enter);
        let Screen::TaskDetail(detail) = &app.screen else {
            panic!("expected task detail");
        };
        assert_eq!(detail.task_id, RemoteId::Text("k-9".into()));
        assert_eq!(detail.kind, TaskKind::Keyword);
    }

    #[tokio::test]
    async fn test_task_list_next_page_stops_at_last() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        let mut list = TaskListState::new(TaskKind::Crawl);
        list.total = 15;
        app.push_screen(Screen::TaskList(list));

        press(&mut app, &tx, KeyCode::Char('n'));
        press(&mut app, &tx, KeyCode::Char('n'));
        let Screen::TaskList(state) = &app.screen else {
            panic!("expected task list");
        };
        assert_eq!(state.page, 2);
        assert_eq!(status(&app), "Already on the last page");
    }

    #[tokio::test]
    async fn test_search_prompt_commits_query() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        let mut list = TaskListState::new(TaskKind::Crawl);
        list.page = 2;
        app.push_screen(Screen::TaskList(list));

        press(&mut app, &tx, KeyCode::Char('/'));
        type_text(&mut app, &tx, " nasa ");
        press(&mut app, &tx, KeyCode::Enter);
        let Screen::TaskList(state) = &app.screen else {
            panic!("expected task list");
        };
        assert_eq!(state.search, "nasa");
        assert_eq!(state.page, 1);
        assert!(state.search_input.is_none());
    }

    #[tokio::test]
    async fn test_digit_toggles_category() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        app.push_screen(Screen::ArticleList(ArticleListState::default()));

        press(&mut app, &tx, KeyCode::Char('0'));
        press(&mut app, &tx, KeyCode::Char('4'));
        press(&mut app, &tx, KeyCode::Char('9'));
        let Screen::ArticleList(state) = &app.screen else {
            panic!("expected article list");
        };
        assert_eq!(state.categories, vec![Category::Technology]);
    }

    #[tokio::test]
    async fn test_delete_asks_for_confirmation() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        app.push_screen(Screen::ArticleDetail(ArticleDetailState {
            article: article(3),
            scroll: 0,
        }));

        press(&mut app, &tx, KeyCode::Char('d'));
        assert_eq!(
            app.pending_confirm,
            Some(ConfirmAction::DeleteArticle {
                scope: DeleteScope::CategoryArticles,
                article_id: RemoteId::Number(3),
                title: "Article 3".into(),
            })
        );

        press(&mut app, &tx, KeyCode::Char('n'));
        assert!(app.pending_confirm.is_none());
        assert_eq!(status(&app), "Cancelled");
    }

    #[tokio::test]
    async fn test_task_detail_paging_resets_scroll() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        let mut detail = TaskDetailState::new(TaskKind::Crawl, RemoteId::Number(1));
        detail.articles = vec![article(1), article(2)];
        detail.scroll = 9;
        app.push_screen(Screen::TaskDetail(detail));

        press(&mut app, &tx, KeyCode::Char('n'));
        press(&mut app, &tx, KeyCode::Char('n'));
        let Screen::TaskDetail(state) = &app.screen else {
            panic!("expected task detail");
        };
        assert_eq!(state.index, 1);
        assert_eq!(state.scroll, 0);
    }

    #[tokio::test]
    async fn test_open_in_reader_uses_source_url() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        app.push_screen(Screen::ArticleDetail(ArticleDetailState {
            article: article(3),
            scroll: 0,
        }));
        press(&mut app, &tx, KeyCode::Char('v'));
        let Screen::Reader(view) = &app.screen else {
            panic!("expected reader");
        };
        assert_eq!(view.address, "https://news.example.com/3");
    }

    #[tokio::test]
    async fn test_address_bar_prepends_https() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        app.push_screen(Screen::Reader(ReaderView::new("https://www.google.com")));

        press(&mut app, &tx, KeyCode::Char('g'));
        if let Screen::Reader(view) = &mut app.screen {
            view.input = Some(String::new());
        }
        type_text(&mut app, &tx, "news.example.org/story");
        press(&mut app, &tx, KeyCode::Enter);
        let Screen::Reader(view) = &app.screen else {
            panic!("expected reader");
        };
        assert_eq!(view.address, "https://news.example.org/story");
        assert!(view.input.is_none());
    }

    #[tokio::test]
    async fn test_reader_toggle_and_cancel() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        app.push_screen(Screen::Reader(ReaderView::new("https://news.example.com/a")));

        press(&mut app, &tx, KeyCode::Char('s'));
        assert_eq!(app.reader.current_state(), ReaderPhase::Fetching);
        press(&mut app, &tx, KeyCode::Char('s'));
        assert!(status(&app).contains("Already simplifying"));

        press(&mut app, &tx, KeyCode::Char('x'));
        assert_eq!(app.reader.current_state(), ReaderPhase::Idle);
        assert_eq!(status(&app), "Simplify cancelled");
    }

    #[tokio::test]
    async fn test_esc_while_fetching_cancels_but_stays() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        app.push_screen(Screen::Reader(ReaderView::new("https://news.example.com/a")));
        press(&mut app, &tx, KeyCode::Char('s'));

        press(&mut app, &tx, KeyCode::Esc);
        assert!(matches!(app.screen, Screen::Reader(_)));
        assert_eq!(app.reader.current_state(), ReaderPhase::Idle);

        press(&mut app, &tx, KeyCode::Esc);
        assert!(matches!(app.screen, Screen::Home { .. }));
    }

    #[tokio::test]
    async fn test_reader_rejects_non_web_address() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        app.push_screen(Screen::Reader(ReaderView::new("file:///etc/hosts")));
        press(&mut app, &tx, KeyCode::Char('s'));
        assert_eq!(app.reader.current_state(), ReaderPhase::Idle);
        assert!(status(&app).starts_with("Cannot simplify this address"));
    }

    #[tokio::test]
    async fn test_reader_simplifies_intranet_address() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        app.push_screen(Screen::Reader(ReaderView::new("http://192.168.1.10/intranet/news")));
        press(&mut app, &tx, KeyCode::Char('s'));
        assert_eq!(app.reader.current_state(), ReaderPhase::Fetching);
        app.reader.reset();
    }

    #[tokio::test]
    async fn test_help_overlay_captures_keys() {
        let (mut app, _rx) = logged_in();
        let (tx, _keep) = mpsc::channel(8);
        press(&mut app, &tx, KeyCode::Char('?'));
        assert!(app.show_help);
        let action = press(&mut app, &tx, KeyCode::Char('q'));
        assert!(matches!(action, Action::Continue));
        assert!(!app.show_help);
    }
}
