//! Render functions for the TUI.
//!
//! Dispatches to the current screen's renderer and draws overlays on top.

use crate::app::{App, ConfirmAction, Screen};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::{articles, help, login, reader, status, tasks};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    // Text screens report their height for page scrolling.
    app.viewport_lines = chunks[0].height.saturating_sub(2) as usize;

    match &app.screen {
        Screen::Login(_) => login::render_login(f, app, chunks[0]),
        Screen::Home { .. } => login::render_home(f, app, chunks[0]),
        Screen::TaskList(_) => tasks::render_list(f, app, chunks[0]),
        Screen::TaskDetail(_) => tasks::render_detail(f, app, chunks[0]),
        Screen::Report(_) => tasks::render_report(f, app, chunks[0]),
        Screen::ArticleList(_) => articles::render_list(f, app, chunks[0]),
        Screen::ArticleDetail(_) => articles::render_detail(f, app, chunks[0]),
        Screen::Reader(_) => reader::render(f, app, chunks[0]),
    }
    status::render(f, app, chunks[1]);

    if app.show_help {
        help::render(f, app);
    }

    if let Some(confirm) = &app.pending_confirm {
        render_confirm_overlay(f, app, confirm);
    }
}

/// A bordered block titled for the current screen.
pub(super) fn screen_block<'a>(app: &App, title: impl Into<String>) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("border"))
        .title(format!(" {} ", title.into()))
}

/// Render a confirmation dialog overlay centered on screen.
fn render_confirm_overlay(f: &mut Frame, app: &App, confirm: &ConfirmAction) {
    let area = f.area();

    let text = match confirm {
        ConfirmAction::DeleteArticle { title, .. } => {
            format!(
                "Delete \"{}\"?\n\nThis removes it on the server.\n\n(y) Confirm  (n/Esc) Cancel",
                crate::util::truncate_to_width(title, 36)
            )
        }
    };

    let width = 50u16.min(area.width.saturating_sub(4));
    let height = 7u16.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height);

    if overlay.width < 10 || overlay.height < 5 {
        return;
    }

    f.render_widget(Clear, overlay);

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("border_focused"))
                .title(" Confirm "),
        )
        .alignment(Alignment::Center)
        .style(app.style("body"));

    f.render_widget(paragraph, overlay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DeleteScope, RemoteId};
    use crate::app::tests::{article, logged_in};
    use crate::app::{ArticleDetailState, ReaderView};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_small_terminal_shows_message() {
        let (mut app, _rx) = logged_in();
        let screen = draw(&mut app, 40, 8);
        assert!(screen.contains("Terminal too small"));
    }

    #[tokio::test]
    async fn test_home_menu_renders() {
        let (mut app, _rx) = logged_in();
        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("Crawl tasks"));
        assert!(screen.contains("Articles by category"));
        assert_eq!(app.viewport_lines, 17);
    }

    #[tokio::test]
    async fn test_confirm_overlay_renders() {
        let (mut app, _rx) = logged_in();
        app.push_screen(Screen::ArticleDetail(ArticleDetailState {
            article: article(2),
            scroll: 0,
        }));
        app.pending_confirm = Some(ConfirmAction::DeleteArticle {
            scope: DeleteScope::CategoryArticles,
            article_id: RemoteId::Number(2),
            title: "Article 2".into(),
        });
        let screen = draw(&mut app, 80, 24);
        assert!(screen.contains("Delete \"Article 2\"?"));
    }

    #[tokio::test]
    async fn test_reader_renders_address() {
        let (mut app, _rx) = logged_in();
        app.push_screen(Screen::Reader(ReaderView::new("https://news.example.com/a")));
        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("https://news.example.com/a"));
    }

    #[tokio::test]
    async fn test_help_overlay_lists_reader_bindings() {
        let (mut app, _rx) = logged_in();
        app.show_help = true;
        let screen = draw(&mut app, 100, 40);
        assert!(screen.contains("Help"));
        assert!(screen.contains("Everywhere"));
    }
}
