//! Wire types for the aggregation backend.
//!
//! Field names follow the backend's JSON exactly. Everything the backend
//! may omit or send as `null` is an `Option`.

use crate::util::strip_control_chars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// A backend identifier (user, task or article).
///
/// The backend is not consistent about sending ids as numbers or strings,
/// so the original JSON form is kept and echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteId::Number(n) => write!(f, "{n}"),
            RemoteId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RemoteId {
    fn from(n: i64) -> Self {
        RemoteId::Number(n)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        RemoteId::Text(s.to_owned())
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Returned by a successful login.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInfo {
    pub userid: RemoteId,
    pub useraccount: RemoteId,
    #[serde(default)]
    pub username: String,
}

impl UserInfo {
    /// Name shown in headers; falls back to the account id.
    pub fn display_name(&self) -> String {
        if self.username.trim().is_empty() {
            self.useraccount.to_string()
        } else {
            self.username.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Registered {
    pub useraccount: RemoteId,
}

// ============================================================================
// Tasks
// ============================================================================

/// Which family of server-side jobs a screen is listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Crawl and classification jobs.
    Crawl,
    /// Keyword tracking jobs with a generated report.
    Keyword,
}

impl TaskKind {
    pub fn title(self) -> &'static str {
        match self {
            TaskKind::Crawl => "Tasks",
            TaskKind::Keyword => "Keyword Tasks",
        }
    }
}

/// Lifecycle of a server-side task, parsed from the backend's labels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TaskStatus {
    Completed,
    Failed,
    Running,
    Queued,
    Other(String),
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "完成" | "已完成" | "completed" | "done" | "success" => TaskStatus::Completed,
            "失败" | "failed" | "error" => TaskStatus::Failed,
            "执行中" | "running" | "processing" => TaskStatus::Running,
            "排队中" | "queued" | "pending" => TaskStatus::Queued,
            _ => TaskStatus::Other(raw),
        }
    }
}

impl TaskStatus {
    pub fn label(&self) -> &str {
        match self {
            TaskStatus::Completed => "Completed",
            TaskStatus::Failed => "Failed",
            TaskStatus::Running => "Running",
            TaskStatus::Queued => "Queued",
            TaskStatus::Other(raw) => raw,
        }
    }

    /// Why a task in this state cannot be opened, or `None` if it can.
    pub fn blocked_reason(&self) -> Option<String> {
        match self {
            TaskStatus::Completed => None,
            TaskStatus::Failed => Some("Task failed, no articles to show".into()),
            TaskStatus::Running => Some("Task is still running, try again shortly".into()),
            TaskStatus::Queued => Some("Task is queued and has not started yet".into()),
            TaskStatus::Other(raw) => Some(format!("Task status is '{raw}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Task {
    pub task_id: RemoteId,
    pub status: TaskStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One page of a task listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskPage {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub total: u64,
}

impl TaskPage {
    /// Number of pages at `per_page` tasks each. Never less than one.
    pub fn page_count(&self, per_page: u32) -> u32 {
        let per_page = u64::from(per_page.max(1));
        let pages = self.total.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

// ============================================================================
// Articles
// ============================================================================

/// The eight categories the backend classifies articles into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    ForeignAffairs,
    Finance,
    Military,
    Technology,
    Domestic,
    Culture,
    Entertainment,
    Sports,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::ForeignAffairs,
        Category::Finance,
        Category::Military,
        Category::Technology,
        Category::Domestic,
        Category::Culture,
        Category::Entertainment,
        Category::Sports,
    ];

    /// Name used in `category_names` query parameters and response keys.
    pub fn api_name(self) -> &'static str {
        match self {
            Category::ForeignAffairs => "Foreign Affairs",
            Category::Finance => "Finance",
            Category::Military => "Military",
            Category::Technology => "Technology",
            Category::Domestic => "Domestic",
            Category::Culture => "Culture",
            Category::Entertainment => "Entertainment",
            Category::Sports => "Sports",
        }
    }

    /// Short label shown on badges.
    pub fn label(self) -> &'static str {
        match self {
            Category::ForeignAffairs => "外交",
            Category::Finance => "金融",
            Category::Military => "军事",
            Category::Technology => "科技",
            Category::Domestic => "国内",
            Category::Culture => "文化",
            Category::Entertainment => "娱乐",
            Category::Sports => "体育",
        }
    }

    pub fn from_api_name(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.api_name() == name)
    }

    /// Badge text for a raw category key, falling back to the key itself.
    pub fn label_for(raw: &str) -> &str {
        Category::from_api_name(raw).map_or(raw, |c| c.label())
    }
}

/// An article as returned by any of the article endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Article {
    pub article_id: RemoteId,
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub author: Option<String>,
    pub publish_time: Option<String>,
    pub content: Option<String>,
    pub content_summary: Option<String>,
    pub summary: Option<String>,
    pub keyword: Option<String>,
    /// Response key this article was listed under, set client-side.
    #[serde(default)]
    pub category: Option<String>,
}

impl Article {
    pub fn title(&self) -> &str {
        non_empty(&self.title).unwrap_or("(untitled)")
    }

    /// Text for the detail view: the generated summary when the backend has
    /// one, the full content otherwise.
    pub fn body(&self) -> Option<&str> {
        non_empty(&self.content_summary).or_else(|| non_empty(&self.content))
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ArticleList {
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ArticlesByCategory {
    #[serde(default)]
    pub articles_by_category: BTreeMap<String, Vec<Article>>,
}

impl ArticlesByCategory {
    /// Flatten the grouped response, tagging each article with its group.
    pub fn into_articles(self) -> Vec<Article> {
        self.articles_by_category
            .into_iter()
            .flat_map(|(category, articles)| {
                articles.into_iter().map(move |mut a| {
                    a.category = Some(category.clone());
                    a
                })
            })
            .collect()
    }
}

/// Client-side ordering of a loaded article page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArticleSort {
    #[default]
    Category,
    Newest,
    Title,
}

impl ArticleSort {
    pub fn next(self) -> Self {
        match self {
            ArticleSort::Category => ArticleSort::Newest,
            ArticleSort::Newest => ArticleSort::Title,
            ArticleSort::Title => ArticleSort::Category,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArticleSort::Category => "category",
            ArticleSort::Newest => "newest",
            ArticleSort::Title => "title",
        }
    }

    /// Stable sort, so equal keys keep the server's order.
    pub fn apply(self, articles: &mut [Article]) {
        match self {
            ArticleSort::Category => articles.sort_by_key(|a| {
                a.category
                    .as_deref()
                    .and_then(Category::from_api_name)
                    .map_or(usize::MAX, |c| c as usize)
            }),
            // Timestamps are compared as text; the backend sends
            // zero-padded `YYYY-MM-DD HH:MM:SS` or RFC 3339.
            ArticleSort::Newest => articles.sort_by(|a, b| b.publish_time.cmp(&a.publish_time)),
            ArticleSort::Title => articles.sort_by(|a, b| a.title().cmp(b.title())),
        }
    }
}

/// Which backend collection a delete request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    TaskArticles,
    CategoryArticles,
    KeywordArticles,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteArticles<'a> {
    pub article_ids: &'a [RemoteId],
    pub user_id: &'a RemoteId,
}

// ============================================================================
// Reports and simplification
// ============================================================================

/// Generated report for a keyword task.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KeywordReport {
    pub title: Option<String>,
    pub keyword: Option<String>,
    pub content: Option<String>,
}

impl KeywordReport {
    /// Drop terminal control sequences from every field.
    pub fn sanitized(mut self) -> Self {
        for field in [&mut self.title, &mut self.keyword, &mut self.content] {
            strip_in_place(field);
        }
        self
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportEnvelope {
    #[serde(default)]
    pub report: KeywordReport,
}

/// Fields extracted from a web page by the simplify endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArticleFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publish_time: Option<String>,
    pub content: Option<String>,
}

impl ArticleFields {
    /// Drop terminal control sequences from every field. Extracted pages
    /// come from arbitrary sites.
    pub fn sanitized(mut self) -> Self {
        for field in [
            &mut self.title,
            &mut self.author,
            &mut self.publish_time,
            &mut self.content,
        ] {
            strip_in_place(field);
        }
        self
    }
}

fn strip_in_place(field: &mut Option<String>) {
    if let Some(text) = field {
        let clean = strip_control_chars(text).into_owned();
        *text = clean;
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimplifyEnvelope {
    #[serde(default)]
    pub data: ArticleFields,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn article(id: i64, title: &str, time: Option<&str>, category: Option<&str>) -> Article {
        Article {
            article_id: RemoteId::Number(id),
            title: Some(title.into()),
            source_url: None,
            author: None,
            publish_time: time.map(Into::into),
            content: None,
            content_summary: None,
            summary: None,
            keyword: None,
            category: category.map(Into::into),
        }
    }

    #[test]
    fn test_remote_id_keeps_json_shape() {
        let n: RemoteId = serde_json::from_str("42").unwrap();
        let s: RemoteId = serde_json::from_str("\"u-7\"").unwrap();
        assert_eq!(n, RemoteId::Number(42));
        assert_eq!(s, RemoteId::Text("u-7".into()));
        assert_eq!(serde_json::to_string(&n).unwrap(), "42");
        assert_eq!(s.to_string(), "u-7");
    }

    #[test]
    fn test_task_status_from_backend_labels() {
        let tasks: TaskPage = serde_json::from_str(
            r#"{"tasks":[
                {"task_id":1,"status":"完成","created_at":"2024-05-01 10:00:00"},
                {"task_id":2,"status":"失败"},
                {"task_id":3,"status":"执行中"},
                {"task_id":4,"status":"排队中"},
                {"task_id":5,"status":"paused"}
            ],"total":5}"#,
        )
        .unwrap();
        let statuses: Vec<_> = tasks.tasks.iter().map(|t| t.status.clone()).collect();
        assert_eq!(
            statuses,
            vec![
                TaskStatus::Completed,
                TaskStatus::Failed,
                TaskStatus::Running,
                TaskStatus::Queued,
                TaskStatus::Other("paused".into()),
            ]
        );
        assert!(tasks.tasks[0].status.blocked_reason().is_none());
        assert!(tasks.tasks[2].status.blocked_reason().is_some());
    }

    #[test]
    fn test_page_count() {
        let page = |total| TaskPage { tasks: vec![], total };
        assert_eq!(page(0).page_count(10), 1);
        assert_eq!(page(10).page_count(10), 1);
        assert_eq!(page(11).page_count(10), 2);
        assert_eq!(page(5).page_count(0), 5);
    }

    #[test]
    fn test_articles_by_category_flatten_tags_category() {
        let grouped: ArticlesByCategory = serde_json::from_str(
            r#"{"articles_by_category":{
                "Sports":[{"article_id":2,"title":"Match"}],
                "Finance":[{"article_id":1,"title":"Rates","content_summary":"short"}]
            }}"#,
        )
        .unwrap();
        let articles = grouped.into_articles();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].category.as_deref(), Some("Finance"));
        assert_eq!(articles[0].body(), Some("short"));
        assert_eq!(articles[1].category.as_deref(), Some("Sports"));
    }

    #[test]
    fn test_article_body_prefers_summary() {
        let mut a = article(1, "t", None, None);
        a.content = Some("full".into());
        assert_eq!(a.body(), Some("full"));
        a.content_summary = Some("  ".into());
        assert_eq!(a.body(), Some("full"));
        a.content_summary = Some("sum".into());
        assert_eq!(a.body(), Some("sum"));
    }

    #[test]
    fn test_sort_orders() {
        let mut list = vec![
            article(1, "b", Some("2024-01-02 00:00:00"), Some("Sports")),
            article(2, "a", Some("2024-03-01 00:00:00"), Some("Unknown")),
            article(3, "c", None, Some("Foreign Affairs")),
        ];

        ArticleSort::Category.apply(&mut list);
        let ids: Vec<_> = list.iter().map(|a| a.article_id.to_string()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);

        ArticleSort::Newest.apply(&mut list);
        let ids: Vec<_> = list.iter().map(|a| a.article_id.to_string()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);

        ArticleSort::Title.apply(&mut list);
        let ids: Vec<_> = list.iter().map(|a| a.article_id.to_string()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::label_for("Technology"), "科技");
        assert_eq!(Category::label_for("Weather"), "Weather");
        assert_eq!(Category::ALL.len(), 8);
    }

    #[test]
    fn test_simplified_fields_lose_escape_sequences() {
        let fields = ArticleFields {
            title: Some("\x1b]0;pwned\x07Title".into()),
            author: None,
            publish_time: Some("2024-05-01".into()),
            content: Some("a\x1b[2Jb\nline two".into()),
        }
        .sanitized();
        assert_eq!(fields.title.as_deref(), Some("Title"));
        assert_eq!(fields.content.as_deref(), Some("ab\nline two"));
        assert_eq!(fields.publish_time.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_report_loses_escape_sequences() {
        let report = KeywordReport {
            title: Some("Weekly\x1b[31m".into()),
            keyword: Some("ra\x07tes".into()),
            content: None,
        }
        .sanitized();
        assert_eq!(report.title.as_deref(), Some("Weekly"));
        assert_eq!(report.keyword.as_deref(), Some("rates"));
    }
}
