//! Theme system for the TUI.
//!
//! Semantic roles map to ratatui `Style` values. `ThemeVariant` picks the
//! dark or light palette; `StyleMap` resolves role names to styles.

use crate::api::TaskStatus;
use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

// ============================================================================
// Theme Variant
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

/// Every semantic UI role and its style for one variant.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Lists --
    pub list_normal: Style,
    pub list_selected: Style,
    pub list_meta: Style,
    pub category_badge: Style,
    pub category_on: Style,
    pub category_off: Style,

    // -- Task status --
    pub status_completed: Style,
    pub status_failed: Style,
    pub status_running: Style,
    pub status_queued: Style,

    // -- Article text --
    pub heading: Style,
    pub body: Style,
    pub metadata: Style,
    pub code_block: Style,
    pub inline_code: Style,
    pub emphasis: Style,
    pub strong: Style,
    pub link: Style,
    pub error: Style,
    pub notice: Style,

    // -- Chrome --
    pub input: Style,
    pub input_active: Style,
    pub status_bar: Style,
    pub border: Style,
    pub border_focused: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            list_normal: Style::default(),
            list_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            list_meta: Style::default().fg(Color::DarkGray),
            category_badge: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            category_on: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            category_off: Style::default().fg(Color::DarkGray),

            status_completed: Style::default().fg(Color::Green),
            status_failed: Style::default().fg(Color::Red),
            status_running: Style::default().fg(Color::Yellow),
            status_queued: Style::default().fg(Color::Gray),

            heading: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            body: Style::default(),
            metadata: Style::default().fg(Color::DarkGray),
            code_block: Style::default().fg(Color::Yellow).bg(Color::Black),
            inline_code: Style::default().fg(Color::Yellow),
            emphasis: Style::default().add_modifier(Modifier::ITALIC),
            strong: Style::default().add_modifier(Modifier::BOLD),
            link: Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            error: Style::default().fg(Color::Red),
            notice: Style::default().fg(Color::Yellow),

            input: Style::default().fg(Color::Gray),
            input_active: Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            border: Style::default(),
            border_focused: Style::default().fg(Color::Cyan),
        }
    }

    fn light() -> Self {
        Self {
            list_normal: Style::default().fg(Color::Black),
            list_selected: Style::default().bg(Color::Blue).fg(Color::White),
            list_meta: Style::default().fg(Color::DarkGray),
            category_badge: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            category_on: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            category_off: Style::default().fg(Color::Gray),

            status_completed: Style::default().fg(Color::Green),
            status_failed: Style::default().fg(Color::Red),
            status_running: Style::default().fg(Color::Magenta),
            status_queued: Style::default().fg(Color::DarkGray),

            heading: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            body: Style::default().fg(Color::Black),
            metadata: Style::default().fg(Color::DarkGray),
            code_block: Style::default().fg(Color::DarkGray).bg(Color::White),
            inline_code: Style::default().fg(Color::DarkGray),
            emphasis: Style::default().add_modifier(Modifier::ITALIC),
            strong: Style::default().add_modifier(Modifier::BOLD),
            link: Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            error: Style::default().fg(Color::Red),
            notice: Style::default().fg(Color::Magenta),

            input: Style::default().fg(Color::DarkGray),
            input_active: Style::default().fg(Color::Black).add_modifier(Modifier::BOLD),
            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            border: Style::default().fg(Color::DarkGray),
            border_focused: Style::default().fg(Color::Blue),
        }
    }

    fn roles(&self) -> [(&'static str, Style); 27] {
        [
            ("list_normal", self.list_normal),
            ("list_selected", self.list_selected),
            ("list_meta", self.list_meta),
            ("category_badge", self.category_badge),
            ("category_on", self.category_on),
            ("category_off", self.category_off),
            ("status_completed", self.status_completed),
            ("status_failed", self.status_failed),
            ("status_running", self.status_running),
            ("status_queued", self.status_queued),
            ("heading", self.heading),
            ("body", self.body),
            ("metadata", self.metadata),
            ("code_block", self.code_block),
            ("inline_code", self.inline_code),
            ("emphasis", self.emphasis),
            ("strong", self.strong),
            ("link", self.link),
            ("error", self.error),
            ("notice", self.notice),
            ("input", self.input),
            ("input_active", self.input_active),
            ("status_bar", self.status_bar),
            ("border", self.border),
            ("border_focused", self.border_focused),
            ("status_other", self.notice),
            ("title", self.strong),
        ]
    }
}

// ============================================================================
// Style Map
// ============================================================================

/// Role-name lookup built from a `ColorPalette`.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
}

impl StyleMap {
    pub fn from_palette(palette: &ColorPalette) -> Self {
        Self {
            map: palette.roles().into_iter().collect(),
        }
    }

    /// Style for `role`; `Style::default()` for unknown roles.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }

    /// Style for a task status label.
    pub fn task_status(&self, status: &TaskStatus) -> Style {
        self.resolve(match status {
            TaskStatus::Completed => "status_completed",
            TaskStatus::Failed => "status_failed",
            TaskStatus::Running => "status_running",
            TaskStatus::Queued => "status_queued",
            TaskStatus::Other(_) => "status_other",
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
