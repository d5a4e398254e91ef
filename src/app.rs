use crate::api::{
    ApiClient, Article, ArticleFields, ArticleSort, Category, DeleteScope, KeywordReport, RemoteId,
    Task, TaskKind, TaskPage, UserInfo,
};
use crate::config::Config;
use crate::keybindings::{Context, KeybindingRegistry};
use crate::reader::{FetchEvent, ReaderController};
use crate::theme::{StyleMap, ThemeVariant};
use crate::util::strip_control_chars;
use ratatui::style::Style;
use secrecy::{ExposeSecret, ExposeSecretMut, SecretBox, SecretString};
use std::borrow::Cow;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Maximum scroll offset for scrolled text views (ratatui u16 limit).
pub const MAX_SCROLL: usize = u16::MAX as usize;

/// How long a status message stays visible.
const STATUS_TTL_SECS: u64 = 3;

// ============================================================================
// Screens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Account,
    Password,
}

/// Login / registration form. In register mode the first field is the
/// display name rather than the account.
///
/// The password is zeroized on drop and redacted from `Debug` output.
#[derive(Debug)]
pub struct LoginForm {
    pub mode: LoginMode,
    pub account: String,
    pub password: SecretBox<String>,
    pub focus: LoginField,
    pub busy: bool,
}

impl Clone for LoginForm {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            account: self.account.clone(),
            password: SecretBox::new(Box::new(self.password.expose_secret().clone())),
            focus: self.focus,
            busy: self.busy,
        }
    }
}

impl LoginForm {
    pub fn new(account: Option<&str>) -> Self {
        let account = account.unwrap_or_default().to_owned();
        let focus = if account.is_empty() {
            LoginField::Account
        } else {
            LoginField::Password
        };
        Self {
            mode: LoginMode::Login,
            account,
            password: SecretBox::new(Box::default()),
            focus,
            busy: false,
        }
    }

    pub fn focused_input(&mut self) -> &mut String {
        match self.focus {
            LoginField::Account => &mut self.account,
            LoginField::Password => self.password.expose_secret_mut(),
        }
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Move the typed password out for submission, leaving the field empty.
    pub fn take_password(&mut self) -> SecretString {
        SecretString::from(std::mem::take(self.password.expose_secret_mut()))
    }
}

/// Entries on the home menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeItem {
    Tasks,
    KeywordTasks,
    Articles,
    Reader,
    Logout,
}

impl HomeItem {
    pub const ALL: [HomeItem; 5] = [
        HomeItem::Tasks,
        HomeItem::KeywordTasks,
        HomeItem::Articles,
        HomeItem::Reader,
        HomeItem::Logout,
    ];

    pub fn label(self) -> &'static str {
        match self {
            HomeItem::Tasks => "Crawl tasks",
            HomeItem::KeywordTasks => "Keyword tasks",
            HomeItem::Articles => "Articles by category",
            HomeItem::Reader => "Reader",
            HomeItem::Logout => "Log out",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskListState {
    pub kind: TaskKind,
    /// 1-based.
    pub page: u32,
    pub search: String,
    /// Text being typed while the search prompt is open.
    pub search_input: Option<String>,
    pub tasks: Vec<Task>,
    pub total: u64,
    pub selected: usize,
    pub loading: bool,
}

impl TaskListState {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            page: 1,
            search: String::new(),
            search_input: None,
            tasks: Vec::new(),
            total: 0,
            selected: 0,
            loading: true,
        }
    }

    pub fn page_count(&self, per_page: u32) -> u32 {
        TaskPage {
            tasks: Vec::new(),
            total: self.total,
        }
        .page_count(per_page)
    }
}

#[derive(Debug, Clone)]
pub struct TaskDetailState {
    pub kind: TaskKind,
    pub task_id: RemoteId,
    pub articles: Vec<Article>,
    pub index: usize,
    pub scroll: usize,
    pub loading: bool,
}

impl TaskDetailState {
    pub fn new(kind: TaskKind, task_id: RemoteId) -> Self {
        Self {
            kind,
            task_id,
            articles: Vec::new(),
            index: 0,
            scroll: 0,
            loading: true,
        }
    }

    pub fn current(&self) -> Option<&Article> {
        self.articles.get(self.index)
    }
}

#[derive(Debug, Clone)]
pub struct ReportState {
    pub task_id: RemoteId,
    pub report: Option<KeywordReport>,
    pub scroll: usize,
}

#[derive(Debug, Clone)]
pub struct ArticleListState {
    /// Selected categories, always in `Category::ALL` order.
    pub categories: Vec<Category>,
    /// 1-based.
    pub page: u32,
    pub search: String,
    pub search_input: Option<String>,
    pub sort: ArticleSort,
    pub articles: Vec<Article>,
    pub selected: usize,
    pub loading: bool,
}

impl Default for ArticleListState {
    fn default() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
            page: 1,
            search: String::new(),
            search_input: None,
            sort: ArticleSort::default(),
            articles: Vec::new(),
            selected: 0,
            loading: true,
        }
    }
}

impl ArticleListState {
    /// Flip one category on or off.
    pub fn toggle_category(&mut self, category: Category) {
        if let Some(pos) = self.categories.iter().position(|c| *c == category) {
            self.categories.remove(pos);
        } else {
            self.categories.push(category);
            self.categories.sort();
        }
    }

    /// Select every category, or clear them all if all were selected.
    pub fn toggle_all(&mut self) {
        if self.categories.len() == Category::ALL.len() {
            self.categories.clear();
        } else {
            self.categories = Category::ALL.to_vec();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArticleDetailState {
    pub article: Article,
    pub scroll: usize,
}

#[derive(Debug, Clone)]
pub struct ReaderView {
    /// Address currently shown.
    pub address: String,
    /// Address bar text while editing.
    pub input: Option<String>,
    pub scroll: usize,
}

impl ReaderView {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            input: None,
            scroll: 0,
        }
    }
}

/// A screen together with everything it displays. Navigation moves these
/// values around; nothing is looked up from shared selection state.
#[derive(Debug, Clone)]
pub enum Screen {
    Login(LoginForm),
    Home { selected: usize },
    TaskList(TaskListState),
    TaskDetail(TaskDetailState),
    Report(ReportState),
    ArticleList(ArticleListState),
    ArticleDetail(ArticleDetailState),
    Reader(ReaderView),
}

impl Screen {
    pub fn context(&self) -> Context {
        match self {
            Screen::Login(_) => Context::Login,
            Screen::Home { .. } => Context::Home,
            Screen::TaskList(_) => Context::TaskList,
            Screen::TaskDetail(_) => Context::TaskDetail,
            Screen::Report(_) => Context::Report,
            Screen::ArticleList(_) => Context::ArticleList,
            Screen::ArticleDetail(_) => Context::ArticleDetail,
            Screen::Reader(_) => Context::Reader,
        }
    }

    /// True when the screen is waiting on the backend.
    pub fn is_loading(&self) -> bool {
        match self {
            Screen::Login(form) => form.busy,
            Screen::TaskList(s) => s.loading,
            Screen::TaskDetail(s) => s.loading,
            Screen::Report(s) => s.report.is_none(),
            Screen::ArticleList(s) => s.loading,
            _ => false,
        }
    }
}

// ============================================================================
// Events and dialogs
// ============================================================================

/// Destructive operations waiting for y/n.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmAction {
    DeleteArticle {
        scope: DeleteScope,
        article_id: RemoteId,
        title: String,
    },
}

/// Completions from background tasks, delivered to the interactive loop.
///
/// Screen loads carry the request generation they were started under and
/// are dropped if a newer request has begun since.
#[derive(Debug)]
pub enum AppEvent {
    LoggedIn {
        generation: u64,
        result: Result<UserInfo, String>,
    },
    Registered {
        generation: u64,
        result: Result<RemoteId, String>,
    },
    TasksLoaded {
        generation: u64,
        result: Result<TaskPage, String>,
    },
    TaskArticlesLoaded {
        generation: u64,
        result: Result<Vec<Article>, String>,
    },
    ArticlesLoaded {
        generation: u64,
        result: Result<Vec<Article>, String>,
    },
    ReportLoaded {
        generation: u64,
        result: Result<KeywordReport, String>,
    },
    /// Applied to whichever screen still shows the article.
    ArticleDeleted {
        article_id: RemoteId,
        result: Result<String, String>,
    },
    ProcessFinished {
        task_id: RemoteId,
        result: Result<Option<String>, String>,
    },
    Simplify(FetchEvent),
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

impl From<FetchEvent> for AppEvent {
    fn from(event: FetchEvent) -> Self {
        AppEvent::Simplify(event)
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub api: ApiClient,
    pub per_page: u32,
    pub home_page: String,

    pub session: Option<UserInfo>,
    pub screen: Screen,
    /// Screens to return to with Back, most recent last.
    pub history: Vec<Screen>,

    /// The reader's simplify state and its single in-flight fetch.
    pub reader: ReaderController<ApiClient, AppEvent>,

    pub theme_variant: ThemeVariant,
    pub theme: StyleMap,
    pub keybindings: KeybindingRegistry,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub pending_confirm: Option<ConfirmAction>,
    pub show_help: bool,
    pub help_scroll_offset: usize,

    /// Dirty flag to skip unnecessary frame renders
    pub needs_redraw: bool,

    /// Generation of the newest screen request. Responses tagged with an
    /// older generation are stale and ignored.
    pub request_generation: u64,

    /// Current frame of the loading spinner animation.
    pub spinner_frame: usize,

    /// Text rows visible in the main pane at the last render.
    pub viewport_lines: usize,
}

impl App {
    pub fn new(
        config: &Config,
        api: ApiClient,
        keybindings: KeybindingRegistry,
        event_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        let theme_variant =
            ThemeVariant::from_str_name(&config.theme).unwrap_or_else(|| {
                tracing::warn!(theme = %config.theme, "Unknown theme, using dark");
                ThemeVariant::Dark
            });
        let reader = ReaderController::new(api.clone(), event_tx, api.timeouts().simplify);

        Self {
            api,
            per_page: config.per_page(),
            home_page: config.home_page.clone(),
            session: None,
            screen: Screen::Login(LoginForm::new(config.account.as_deref())),
            history: Vec::new(),
            reader,
            theme_variant,
            theme: StyleMap::from_palette(&theme_variant.palette()),
            keybindings,
            status_message: None,
            pending_confirm: None,
            show_help: false,
            help_scroll_offset: 0,
            needs_redraw: true,
            request_generation: 0,
            spinner_frame: 0,
            viewport_lines: 0,
        }
    }

    pub fn style(&self, role: &str) -> Style {
        self.theme.resolve(role)
    }

    /// Cycle to the next theme variant; returns its name.
    pub fn cycle_theme(&mut self) -> &'static str {
        self.theme_variant = self.theme_variant.next();
        self.theme = StyleMap::from_palette(&self.theme_variant.palette());
        self.needs_redraw = true;
        self.theme_variant.name()
    }

    pub fn user_id(&self) -> Option<&RemoteId> {
        self.session.as_ref().map(|s| &s.userid)
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    /// Start a new screen request, invalidating any older one.
    pub fn begin_request(&mut self) -> u64 {
        self.request_generation = self.request_generation.wrapping_add(1);
        self.request_generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.request_generation
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    /// Show `next`, remembering the current screen for Back.
    pub fn push_screen(&mut self, next: Screen) {
        let previous = std::mem::replace(&mut self.screen, next);
        self.leave(&previous);
        self.history.push(previous);
        self.needs_redraw = true;
    }

    /// Return to the previous screen. Returns false at the bottom of the
    /// stack.
    pub fn go_back(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        let left = std::mem::replace(&mut self.screen, previous);
        self.leave(&left);
        self.needs_redraw = true;
        true
    }

    /// Jump to the home menu, dropping the history.
    pub fn go_home(&mut self) {
        if self.session.is_none() {
            return;
        }
        let left = std::mem::replace(&mut self.screen, Screen::Home { selected: 0 });
        self.leave(&left);
        self.history.clear();
        self.needs_redraw = true;
    }

    /// End the session and show a fresh login form.
    pub fn logout(&mut self) {
        let account = self.session.take().map(|s| s.useraccount.to_string());
        let left = std::mem::replace(
            &mut self.screen,
            Screen::Login(LoginForm::new(account.as_deref())),
        );
        self.leave(&left);
        self.history.clear();
        self.pending_confirm = None;
        self.needs_redraw = true;
        tracing::info!("Logged out");
    }

    fn leave(&mut self, screen: &Screen) {
        // Outstanding responses belong to the screen being left.
        self.begin_request();
        if matches!(screen, Screen::Reader(_)) {
            self.reader.reset();
        }
    }

    // ------------------------------------------------------------------------
    // Status and scrolling
    // ------------------------------------------------------------------------

    /// Set status message (will auto-expire after 3 seconds)
    ///
    /// Server messages end up here, so control sequences are stripped.
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        let msg = msg.into();
        let clean = match strip_control_chars(&msg) {
            Cow::Borrowed(_) => None,
            Cow::Owned(clean) => Some(clean),
        };
        let msg = clean.map_or(msg, Cow::Owned);
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear status message if expired. Returns true if one was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    /// Scroll offset of the current text screen, if it has one.
    pub fn scroll_mut(&mut self) -> Option<&mut usize> {
        match &mut self.screen {
            Screen::TaskDetail(s) => Some(&mut s.scroll),
            Screen::Report(s) => Some(&mut s.scroll),
            Screen::ArticleDetail(s) => Some(&mut s.scroll),
            Screen::Reader(s) => Some(&mut s.scroll),
            _ => None,
        }
    }

    pub fn scroll_by(&mut self, delta: isize) {
        if let Some(scroll) = self.scroll_mut() {
            *scroll = scroll.saturating_add_signed(delta).min(MAX_SCROLL);
        }
    }

    /// Lines a page-scroll moves.
    pub fn page_lines(&self) -> isize {
        self.viewport_lines.saturating_sub(2).max(1) as isize
    }

    /// Fields to show in the reader, when simplified.
    pub fn simplified(&self) -> Option<&ArticleFields> {
        self.reader.fields()
    }
}
