use crate::app::{App, Screen};
use crate::keybindings::{Action, Context};
use crate::reader::ReaderPhase;
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

use super::loop_runner::SPINNER_FRAMES;

const SPINNER: [&str; SPINNER_FRAMES] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Current spinner glyph.
pub(super) fn spinner(app: &App) -> &'static str {
    SPINNER[app.spinner_frame % SPINNER_FRAMES]
}

/// Key hints shown when there is no status message.
fn hint_actions(app: &App) -> &'static [Action] {
    match &app.screen {
        Screen::Login(_) => &[Action::NextField, Action::Select, Action::ToggleRegister],
        Screen::Home { .. } => &[Action::Select, Action::Logout, Action::ShowHelp, Action::Quit],
        Screen::TaskList(s) if s.search_input.is_some() => &[],
        Screen::TaskList(_) => &[
            Action::Select,
            Action::Search,
            Action::NextPage,
            Action::PrevPage,
            Action::Refresh,
            Action::Back,
        ],
        Screen::TaskDetail(_) => &[
            Action::NextItem,
            Action::PrevItem,
            Action::Delete,
            Action::ProcessTask,
            Action::ShowReport,
            Action::OpenInReader,
            Action::Back,
        ],
        Screen::Report(_) => &[Action::ScrollDown, Action::ScrollUp, Action::Back],
        Screen::ArticleList(s) if s.search_input.is_some() => &[],
        Screen::ArticleList(_) => &[
            Action::Select,
            Action::ToggleAllCategories,
            Action::CycleSort,
            Action::Search,
            Action::NextPage,
            Action::Back,
        ],
        Screen::ArticleDetail(_) => &[
            Action::Delete,
            Action::OpenInBrowser,
            Action::OpenInReader,
            Action::Back,
        ],
        Screen::Reader(v) if v.input.is_some() => &[],
        Screen::Reader(_) => match app.reader.current_state() {
            ReaderPhase::Fetching => &[Action::CancelSimplify, Action::Back],
            _ => &[
                Action::ToggleSimplify,
                Action::EditAddress,
                Action::OpenInBrowser,
                Action::Back,
            ],
        },
    }
}

fn short_label(action: Action) -> &'static str {
    match action {
        Action::Select => "open",
        Action::NextField => "next field",
        Action::ToggleRegister => "login/register",
        Action::Logout => "log out",
        Action::ShowHelp => "help",
        Action::Quit => "quit",
        Action::Search => "search",
        Action::NextPage => "next page",
        Action::PrevPage => "prev page",
        Action::Refresh => "reload",
        Action::Back => "back",
        Action::NextItem => "next",
        Action::PrevItem => "prev",
        Action::Delete => "delete",
        Action::ProcessTask => "process",
        Action::ShowReport => "report",
        Action::OpenInBrowser => "browser",
        Action::OpenInReader => "reader",
        Action::ToggleAllCategories => "all",
        Action::CycleSort => "sort",
        Action::EditAddress => "address",
        Action::ToggleSimplify => "simplify",
        Action::CancelSimplify => "cancel",
        Action::ScrollDown => "down",
        Action::ScrollUp => "up",
        other => other.describe(),
    }
}

fn key_hints(app: &App) -> String {
    let context = app.screen.context();
    let editing = match &app.screen {
        Screen::TaskList(s) => s.search_input.is_some(),
        Screen::ArticleList(s) => s.search_input.is_some(),
        Screen::Reader(v) => v.input.is_some(),
        _ => false,
    };
    if editing {
        return "Type to edit | Enter confirm | Esc cancel".to_string();
    }

    let mut hints: Vec<String> = hint_actions(app)
        .iter()
        .filter_map(|&action| {
            let key = app.keybindings.key_hint(action, context)?;
            Some(format!("[{key}] {}", short_label(action)))
        })
        .collect();
    if context == Context::ArticleList {
        hints.insert(1, "[1-8] category".to_string());
    }
    hints.join("  ")
}

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.screen.is_loading() {
        Cow::Owned(format!("{} Loading...", spinner(app)))
    } else {
        Cow::Owned(key_hints(app))
    };

    let paragraph = Paragraph::new(text).style(app.style("status_bar"));
    f.render_widget(paragraph, area);
}
