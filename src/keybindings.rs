//! Keybinding registry: maps keys to actions per screen, with overrides
//! from the `[keybindings]` table in config.toml.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// Every user-facing action a key can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    Select,
    Back,
    GoHome,
    ShowHelp,
    CycleTheme,
    NextField,
    ToggleRegister,
    Logout,
    Search,
    NextPage,
    PrevPage,
    Refresh,
    NextItem,
    PrevItem,
    Delete,
    ProcessTask,
    ShowReport,
    OpenInBrowser,
    OpenInReader,
    ToggleAllCategories,
    CycleSort,
    EditAddress,
    ToggleSimplify,
    CancelSimplify,
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
}

impl Action {
    pub const ALL: [Action; 31] = [
        Action::Quit,
        Action::NavDown,
        Action::NavUp,
        Action::Select,
        Action::Back,
        Action::GoHome,
        Action::ShowHelp,
        Action::CycleTheme,
        Action::NextField,
        Action::ToggleRegister,
        Action::Logout,
        Action::Search,
        Action::NextPage,
        Action::PrevPage,
        Action::Refresh,
        Action::NextItem,
        Action::PrevItem,
        Action::Delete,
        Action::ProcessTask,
        Action::ShowReport,
        Action::OpenInBrowser,
        Action::OpenInReader,
        Action::ToggleAllCategories,
        Action::CycleSort,
        Action::EditAddress,
        Action::ToggleSimplify,
        Action::CancelSimplify,
        Action::ScrollDown,
        Action::ScrollUp,
        Action::PageDown,
        Action::PageUp,
    ];

    /// Name used for this action in config.toml.
    pub fn config_name(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::NavDown => "nav_down",
            Self::NavUp => "nav_up",
            Self::Select => "select",
            Self::Back => "back",
            Self::GoHome => "go_home",
            Self::ShowHelp => "show_help",
            Self::CycleTheme => "cycle_theme",
            Self::NextField => "next_field",
            Self::ToggleRegister => "toggle_register",
            Self::Logout => "logout",
            Self::Search => "search",
            Self::NextPage => "next_page",
            Self::PrevPage => "prev_page",
            Self::Refresh => "refresh",
            Self::NextItem => "next_item",
            Self::PrevItem => "prev_item",
            Self::Delete => "delete",
            Self::ProcessTask => "process_task",
            Self::ShowReport => "show_report",
            Self::OpenInBrowser => "open_in_browser",
            Self::OpenInReader => "open_in_reader",
            Self::ToggleAllCategories => "toggle_all_categories",
            Self::CycleSort => "cycle_sort",
            Self::EditAddress => "edit_address",
            Self::ToggleSimplify => "simplify",
            Self::CancelSimplify => "cancel_simplify",
            Self::ScrollDown => "scroll_down",
            Self::ScrollUp => "scroll_up",
            Self::PageDown => "page_down",
            Self::PageUp => "page_up",
        }
    }

    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::NavDown => "Move selection down",
            Self::NavUp => "Move selection up",
            Self::Select => "Open / confirm",
            Self::Back => "Go back / dismiss",
            Self::GoHome => "Return to the home menu",
            Self::ShowHelp => "Show help",
            Self::CycleTheme => "Cycle theme",
            Self::NextField => "Next input field",
            Self::ToggleRegister => "Switch between login and register",
            Self::Logout => "Log out",
            Self::Search => "Search",
            Self::NextPage => "Next page",
            Self::PrevPage => "Previous page",
            Self::Refresh => "Reload from server",
            Self::NextItem => "Next article",
            Self::PrevItem => "Previous article",
            Self::Delete => "Delete article",
            Self::ProcessTask => "Classify and summarize task",
            Self::ShowReport => "Show keyword report",
            Self::OpenInBrowser => "Open source in system browser",
            Self::OpenInReader => "Open source in reader",
            Self::ToggleAllCategories => "Select / clear all categories",
            Self::CycleSort => "Cycle sort order",
            Self::EditAddress => "Edit address",
            Self::ToggleSimplify => "Simplify page / back to live page",
            Self::CancelSimplify => "Cancel simplify",
            Self::ScrollDown => "Scroll down one line",
            Self::ScrollUp => "Scroll up one line",
            Self::PageDown => "Page down",
            Self::PageUp => "Page up",
        }
    }

    fn from_config_name(name: &str) -> Option<Action> {
        let wanted = name.trim().to_ascii_lowercase().replace('-', "_");
        Action::ALL.into_iter().find(|a| a.config_name() == wanted)
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: one per screen, plus the global fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Login,
    Home,
    TaskList,
    TaskDetail,
    ArticleList,
    ArticleDetail,
    Reader,
    Report,
}

impl Context {
    pub fn title(self) -> &'static str {
        match self {
            Context::Global => "Everywhere",
            Context::Login => "Login",
            Context::Home => "Home",
            Context::TaskList => "Task list",
            Context::TaskDetail => "Task articles",
            Context::ArticleList => "Articles",
            Context::ArticleDetail => "Article",
            Context::Reader => "Reader",
            Context::Report => "Report",
        }
    }
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Terminals report `T` as shift+`T`; the character already carries
    /// the shift, so it is dropped before lookup.
    fn normalized(mut self) -> Self {
        if matches!(self.code, KeyCode::Char(_)) {
            self.modifiers.remove(KeyModifiers::SHIFT);
        }
        self
    }
}

/// Parse a key string from config: `"q"`, `"Enter"`, `"PageDown"`,
/// `"ctrl+r"`, `"F5"`.
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    let lower = s.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("ctrl+") {
        let mut chars = rest.trim().chars();
        let c = chars.next()?;
        return chars.next().is_none().then(|| KeySpec::ctrl(c));
    }

    let named = match lower.as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "pageup" => Some(KeyCode::PageUp),
        "pagedown" => Some(KeyCode::PageDown),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "backspace" => Some(KeyCode::Backspace),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        return (1..=12).contains(&n).then(|| KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then(|| KeySpec::char(c))
}

/// Format a KeySpec for the help screen.
fn format_key(key: &KeySpec) -> String {
    let prefix = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };
    let name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::PageUp => "PgUp".to_string(),
        KeyCode::PageDown => "PgDn".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        _ => "?".to_string(),
    };
    format!("{prefix}{name}")
}

// ============================================================================
// Default Bindings
// ============================================================================

const DEFAULT_BINDINGS: &[(Context, KeySpec, Action)] = &[
    // Everywhere
    (Context::Global, KeySpec::char('q'), Action::Quit),
    (Context::Global, KeySpec::ctrl('c'), Action::Quit),
    (Context::Global, KeySpec::char('j'), Action::NavDown),
    (Context::Global, KeySpec::plain(KeyCode::Down), Action::NavDown),
    (Context::Global, KeySpec::char('k'), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Up), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Enter), Action::Select),
    (Context::Global, KeySpec::plain(KeyCode::Esc), Action::Back),
    (Context::Global, KeySpec::char('H'), Action::GoHome),
    (Context::Global, KeySpec::char('?'), Action::ShowHelp),
    (Context::Global, KeySpec::char('T'), Action::CycleTheme),
    // Login form
    (Context::Login, KeySpec::plain(KeyCode::Tab), Action::NextField),
    (Context::Login, KeySpec::ctrl('r'), Action::ToggleRegister),
    // Home menu
    (Context::Home, KeySpec::char('L'), Action::Logout),
    // Task list
    (Context::TaskList, KeySpec::char('/'), Action::Search),
    (Context::TaskList, KeySpec::char('n'), Action::NextPage),
    (Context::TaskList, KeySpec::plain(KeyCode::Right), Action::NextPage),
    (Context::TaskList, KeySpec::char('p'), Action::PrevPage),
    (Context::TaskList, KeySpec::plain(KeyCode::Left), Action::PrevPage),
    (Context::TaskList, KeySpec::char('r'), Action::Refresh),
    // Task articles
    (Context::TaskDetail, KeySpec::char('n'), Action::NextItem),
    (Context::TaskDetail, KeySpec::plain(KeyCode::Right), Action::NextItem),
    (Context::TaskDetail, KeySpec::char('p'), Action::PrevItem),
    (Context::TaskDetail, KeySpec::plain(KeyCode::Left), Action::PrevItem),
    (Context::TaskDetail, KeySpec::char('d'), Action::Delete),
    (Context::TaskDetail, KeySpec::char('c'), Action::ProcessTask),
    (Context::TaskDetail, KeySpec::char('R'), Action::ShowReport),
    (Context::TaskDetail, KeySpec::char('o'), Action::OpenInBrowser),
    (Context::TaskDetail, KeySpec::char('v'), Action::OpenInReader),
    (Context::TaskDetail, KeySpec::char('r'), Action::Refresh),
    (Context::TaskDetail, KeySpec::char('j'), Action::ScrollDown),
    (Context::TaskDetail, KeySpec::plain(KeyCode::Down), Action::ScrollDown),
    (Context::TaskDetail, KeySpec::char('k'), Action::ScrollUp),
    (Context::TaskDetail, KeySpec::plain(KeyCode::Up), Action::ScrollUp),
    (Context::TaskDetail, KeySpec::ctrl('d'), Action::PageDown),
    (Context::TaskDetail, KeySpec::ctrl('u'), Action::PageUp),
    // Category article list
    (Context::ArticleList, KeySpec::char('/'), Action::Search),
    (Context::ArticleList, KeySpec::char('n'), Action::NextPage),
    (Context::ArticleList, KeySpec::plain(KeyCode::Right), Action::NextPage),
    (Context::ArticleList, KeySpec::char('p'), Action::PrevPage),
    (Context::ArticleList, KeySpec::plain(KeyCode::Left), Action::PrevPage),
    (Context::ArticleList, KeySpec::char('r'), Action::Refresh),
    (Context::ArticleList, KeySpec::char('0'), Action::ToggleAllCategories),
    (Context::ArticleList, KeySpec::char('s'), Action::CycleSort),
    // Article detail
    (Context::ArticleDetail, KeySpec::char('d'), Action::Delete),
    (Context::ArticleDetail, KeySpec::char('o'), Action::OpenInBrowser),
    (Context::ArticleDetail, KeySpec::char('v'), Action::OpenInReader),
    (Context::ArticleDetail, KeySpec::char('j'), Action::ScrollDown),
    (Context::ArticleDetail, KeySpec::plain(KeyCode::Down), Action::ScrollDown),
    (Context::ArticleDetail, KeySpec::char('k'), Action::ScrollUp),
    (Context::ArticleDetail, KeySpec::plain(KeyCode::Up), Action::ScrollUp),
    (Context::ArticleDetail, KeySpec::ctrl('d'), Action::PageDown),
    (Context::ArticleDetail, KeySpec::ctrl('u'), Action::PageUp),
    // Reader
    (Context::Reader, KeySpec::char('g'), Action::EditAddress),
    (Context::Reader, KeySpec::char('s'), Action::ToggleSimplify),
    (Context::Reader, KeySpec::char('x'), Action::CancelSimplify),
    (Context::Reader, KeySpec::char('o'), Action::OpenInBrowser),
    (Context::Reader, KeySpec::char('j'), Action::ScrollDown),
    (Context::Reader, KeySpec::plain(KeyCode::Down), Action::ScrollDown),
    (Context::Reader, KeySpec::char('k'), Action::ScrollUp),
    (Context::Reader, KeySpec::plain(KeyCode::Up), Action::ScrollUp),
    (Context::Reader, KeySpec::ctrl('d'), Action::PageDown),
    (Context::Reader, KeySpec::plain(KeyCode::PageDown), Action::PageDown),
    (Context::Reader, KeySpec::ctrl('u'), Action::PageUp),
    (Context::Reader, KeySpec::plain(KeyCode::PageUp), Action::PageUp),
    // Keyword report
    (Context::Report, KeySpec::char('j'), Action::ScrollDown),
    (Context::Report, KeySpec::plain(KeyCode::Down), Action::ScrollDown),
    (Context::Report, KeySpec::char('k'), Action::ScrollUp),
    (Context::Report, KeySpec::plain(KeyCode::Up), Action::ScrollUp),
    (Context::Report, KeySpec::ctrl('d'), Action::PageDown),
    (Context::Report, KeySpec::ctrl('u'), Action::PageUp),
];

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings: defaults plus config overrides.
///
/// The same key may mean different things in different contexts; lookups
/// try the screen's context first and fall back to `Global`.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// Declaration order, for the help screen.
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::with_capacity(DEFAULT_BINDINGS.len()),
            bindings: Vec::with_capacity(DEFAULT_BINDINGS.len()),
        };
        for &(context, key, action) in DEFAULT_BINDINGS {
            registry.bind(context, key, action);
        }
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    /// Apply overrides from config. Each overridden action loses its default
    /// keys and gets the new key in every context it was bound in.
    ///
    /// Returns warnings for unknown action names and unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut entries: Vec<_> = overrides.iter().collect();
        entries.sort();

        for (action_name, key_str) in entries {
            let Some(action) = Action::from_config_name(action_name) else {
                warnings.push(format!("Unknown action '{action_name}', ignoring"));
                continue;
            };
            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{key_str}' for action '{action_name}', ignoring"
                ));
                continue;
            };

            let mut contexts: Vec<Context> = Vec::new();
            for (context, _, _) in self.bindings.iter().filter(|(_, _, a)| *a == action) {
                if !contexts.contains(context) {
                    contexts.push(*context);
                }
            }

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);
            for context in contexts {
                self.bind(context, key, action);
            }

            tracing::info!(action = %action_name, key = %key_str, "Applied keybinding override");
        }

        warnings
    }

    /// Action for a key in `context`, falling back to `Global`.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers).normalized();
        self.lookup
            .get(&(context, key))
            .or_else(|| self.lookup.get(&(Context::Global, key)))
            .copied()
    }

    /// First key bound to `action` in `context` (or globally), for hints.
    pub fn key_hint(&self, action: Action, context: Context) -> Option<String> {
        let find = |ctx: Context| {
            self.bindings
                .iter()
                .find(|(c, _, a)| *c == ctx && *a == action)
                .map(|(_, key, _)| format_key(key))
        };
        find(context).or_else(|| find(Context::Global))
    }

    /// Every binding as (context, key label, description), for the help screen.
    pub fn all_bindings(&self) -> Vec<(Context, String, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
