//! Main event loop for the TUI.
//!
//! Multiplexes terminal input, background completions and a periodic tick.

use crate::app::{App, AppEvent};
use crate::reader::ReaderPhase;
use anyhow::Result;
use crossterm::{
    event::{Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::events::handle_app_event;
use super::input::handle_input;
use super::render::render;

/// Number of frames in the loading spinner animation.
pub(super) const SPINNER_FRAMES: usize = 10;

/// Result of handling a key press event.
pub enum Action {
    /// Keep running.
    Continue,
    /// Restore the terminal and exit.
    Quit,
}

/// Runs the TUI application event loop.
///
/// Uses `tokio::select!` over four sources, in priority order: shutdown
/// signals, terminal input, background completions (backend responses and
/// simplify outcomes) and a 250ms tick for the spinner and status expiry.
///
/// Completions are only ever applied here, on the loop's task, so state
/// changes never race with input handling.
///
/// # Panic Safety
///
/// Installs a panic hook that restores terminal state before unwinding.
pub async fn run(
    app: &mut App,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    // Install panic hook before touching the terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut event_stream = crossterm::event::EventStream::new();
    // Fixed-rate tick for the spinner and status expiry
    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));

    // Shutdown signals (Unix only); elsewhere these futures never complete
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        // Only render when state has changed
        if app.needs_redraw {
            terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;
        }

        // Apply everything already queued before waiting on more input.
        while let Ok(event) = event_rx.try_recv() {
            app.needs_redraw = true;
            handle_app_event(app, event, &event_tx);
        }

        // Platform-specific signal futures
        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            // Shutdown signals first
            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            // Terminal input
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                        app.needs_redraw = true;
                        match handle_input(app, key.code, key.modifiers, &event_tx) {
                            Ok(Action::Quit) => break,
                            Ok(Action::Continue) => {}
                            Err(e) => app.set_status(format!("Error: {e}")),
                        }
                    }
                    Some(Ok(Event::Resize(..))) => app.needs_redraw = true,
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Terminal event stream failed");
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }

            // Background completions, when the queue was empty above
            Some(event) = event_rx.recv() => {
                app.needs_redraw = true;
                handle_app_event(app, event, &event_tx);
            }

            // Periodic tick
            _ = tick_interval.tick() => {
                handle_tick(app);
            }
        }
    }

    // Nothing may arrive after exit.
    app.reader.reset();
    restore_terminal(terminal)?;
    Ok(())
}

/// Animate the spinner while something is loading and expire the status.
fn handle_tick(app: &mut App) {
    // Animate the spinner while a screen or the reader is waiting
    if app.screen.is_loading() || app.reader.current_state() == ReaderPhase::Fetching {
        app.spinner_frame = (app.spinner_frame + 1) % SPINNER_FRAMES;
        app.needs_redraw = true;
    }
    if app.clear_expired_status() {
        app.needs_redraw = true;
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{logged_in, test_app};
    use crate::app::{ReaderView, Screen};
    use crate::api::RemoteId;

    #[tokio::test]
    async fn test_tick_animates_only_while_loading() {
        let (mut app, _rx) = logged_in();
        app.needs_redraw = false;
        handle_tick(&mut app);
        assert_eq!(app.spinner_frame, 0);
        assert!(!app.needs_redraw);

        app.push_screen(Screen::Reader(ReaderView::new("https://example.com")));
        app.reader
            .start("https://example.com/a", RemoteId::Number(7))
            .unwrap();
        handle_tick(&mut app);
        assert_eq!(app.spinner_frame, 1);
    }

    #[tokio::test]
    async fn test_spinner_wraps() {
        let (mut app, _rx) = test_app();
        if let Screen::Login(form) = &mut app.screen {
            form.busy = true;
        }
        for _ in 0..SPINNER_FRAMES {
            handle_tick(&mut app);
        }
        assert_eq!(app.spinner_frame, 0);
    }
}
