use super::types::{
    Article, ArticleFields, ArticleList, ArticlesByCategory, Category, DeleteArticles,
    DeleteScope, KeywordReport, Registered, RemoteId, ReportEnvelope, SimplifyEnvelope, TaskKind,
    TaskPage, UserInfo,
};
use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Largest response body accepted from the backend.
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Longest raw body excerpt used as an error message.
const MAX_ERROR_EXCERPT: usize = 200;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Could not reach server: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-success status, or a success status whose body carries `error`.
    /// Displays as the server-provided message alone.
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("Unexpected response from server: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported server URL scheme: {0}")]
    UnsupportedScheme(String),
}

impl ApiError {
    /// HTTP status the server answered with, when there was an answer.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Per-call wait bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Login, listings, deletes and reports.
    pub request: Duration,
    /// Page simplification.
    pub simplify: Duration,
    /// Server-side classify-and-summarize of a task.
    pub process: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(5),
            simplify: Duration::from_secs(30),
            process: Duration::from_secs(30),
        }
    }
}

/// Page, filter and search parameters for the category listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub page: u32,
    pub per_page: u32,
    pub categories: Vec<Category>,
    pub search: Option<String>,
}

/// Typed client for the aggregation backend's REST API.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    timeouts: Timeouts,
}

fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }
        if attempt.previous().iter().any(|prev| prev == attempt.url()) {
            return attempt.error("Redirect loop detected");
        }
        tracing::debug!(to = %attempt.url(), hop = attempt.previous().len() + 1, "Following redirect");
        attempt.follow()
    })
}

impl ApiClient {
    /// Build a client for the backend at `server_url`.
    pub fn new(server_url: &str, timeouts: Timeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;
        Self::with_http(http, server_url, timeouts)
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_http(
        http: reqwest::Client,
        server_url: &str,
        timeouts: Timeouts,
    ) -> Result<Self, ApiError> {
        let mut base = Url::parse(server_url.trim())?;
        match base.scheme() {
            "https" => {}
            "http" => {
                let local = matches!(base.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
                if !local {
                    tracing::warn!(server = %base, "Server URL is not HTTPS; credentials travel in clear text");
                }
            }
            other => return Err(ApiError::UnsupportedScheme(other.to_owned())),
        }
        // Url::join drops the last segment of a base without a trailing slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http,
            base,
            timeouts,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub async fn login(&self, account: &str, password: &SecretString) -> Result<UserInfo, ApiError> {
        let url = self.endpoint("api/login/")?;
        let body = json!({ "useraccount": account, "userpwd": password.expose_secret() });
        let user: UserInfo = self
            .call(self.http.post(url).json(&body), self.timeouts.request)
            .await?;
        tracing::info!(user_id = %user.userid, "Logged in");
        Ok(user)
    }

    /// Create an account; the backend answers with the new login account.
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<RemoteId, ApiError> {
        let url = self.endpoint("api/register/")?;
        let body = json!({ "username": username, "userpwd": password.expose_secret() });
        let registered: Registered = self
            .call(self.http.post(url).json(&body), self.timeouts.request)
            .await?;
        Ok(registered.useraccount)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub async fn tasks(
        &self,
        kind: TaskKind,
        user_id: &RemoteId,
        page: u32,
        per_page: u32,
        search: Option<&str>,
    ) -> Result<TaskPage, ApiError> {
        let prefix = match kind {
            TaskKind::Crawl => "api/tasks/",
            TaskKind::Keyword => "api/keyword_tasks/",
        };
        let mut url = self.endpoint(prefix)?;
        url.path_segments_mut()
            .map_err(|()| ApiError::UnsupportedScheme(self.base.scheme().to_owned()))?
            .pop_if_empty()
            .push(&user_id.to_string())
            .push("");

        let mut params = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_owned()));
        }
        append_query(&mut url, &params);

        self.call(self.http.get(url), self.timeouts.request).await
    }

    /// All articles a finished task produced.
    pub async fn task_articles(
        &self,
        kind: TaskKind,
        user_id: &RemoteId,
        task_id: &RemoteId,
    ) -> Result<Vec<Article>, ApiError> {
        let path = match kind {
            TaskKind::Crawl => "get_articles/",
            TaskKind::Keyword => "get_keyword_articles/",
        };
        let mut url = self.endpoint(path)?;
        append_query(
            &mut url,
            &[("user_id", user_id.to_string()), ("task_id", task_id.to_string())],
        );
        let list: ArticleList = self.call(self.http.get(url), self.timeouts.request).await?;
        Ok(list.articles)
    }

    /// Ask the backend to classify and summarize a task's articles.
    ///
    /// Returns the server's message, if it sent one.
    pub async fn process_task(
        &self,
        user_id: &RemoteId,
        task_id: &RemoteId,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint("api/process-articles/")?;
        let body = json!({ "user_id": user_id, "task_id": task_id });
        let reply: Value = self
            .call(self.http.post(url).json(&body), self.timeouts.process)
            .await?;
        Ok(string_field(&reply, "message"))
    }

    pub async fn keyword_report(
        &self,
        user_id: &RemoteId,
        task_id: &RemoteId,
    ) -> Result<KeywordReport, ApiError> {
        let mut url = self.endpoint("api/get_keyword_report/")?;
        append_query(
            &mut url,
            &[("user_id", user_id.to_string()), ("task_id", task_id.to_string())],
        );
        let envelope: ReportEnvelope = self.call(self.http.get(url), self.timeouts.request).await?;
        Ok(envelope.report)
    }

    // ========================================================================
    // Articles
    // ========================================================================

    /// One page of articles in the selected categories, flattened and
    /// tagged with the category each was listed under.
    pub async fn articles_by_category(
        &self,
        user_id: &RemoteId,
        query: &ArticleQuery,
    ) -> Result<Vec<Article>, ApiError> {
        let mut url = self.endpoint("get_articles_by_categories/")?;
        let mut params = vec![
            ("user_id", user_id.to_string()),
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        params.extend(
            query
                .categories
                .iter()
                .map(|c| ("category_names", c.api_name().to_owned())),
        );
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_owned()));
        }
        append_query(&mut url, &params);

        let grouped: ArticlesByCategory = self.call(self.http.get(url), self.timeouts.request).await?;
        Ok(grouped.into_articles())
    }

    /// Delete articles from one of the backend collections. Returns the
    /// server's confirmation message.
    pub async fn delete_articles(
        &self,
        scope: DeleteScope,
        user_id: &RemoteId,
        article_ids: &[RemoteId],
    ) -> Result<String, ApiError> {
        let path = match scope {
            DeleteScope::TaskArticles => "delete_articles/",
            DeleteScope::CategoryArticles => "delete_category_articles/",
            DeleteScope::KeywordArticles => "delete_keyword_articles/",
        };
        let url = self.endpoint(path)?;
        let body = DeleteArticles {
            article_ids,
            user_id,
        };
        let reply: Value = self
            .call(self.http.delete(url).json(&body), self.timeouts.request)
            .await?;
        tracing::info!(count = article_ids.len(), ?scope, "Deleted articles");
        Ok(string_field(&reply, "message").unwrap_or_else(|| "Deleted".to_owned()))
    }

    // ========================================================================
    // Simplification
    // ========================================================================

    /// Ask the backend to download `target_url` and extract its article.
    pub async fn simplify(
        &self,
        user_id: &RemoteId,
        target_url: &str,
    ) -> Result<ArticleFields, ApiError> {
        let url = self.endpoint("api/simplify/")?;
        let body = json!({ "user_id": user_id, "url": target_url });
        let envelope: SimplifyEnvelope = self
            .call(self.http.post(url).json(&body), self.timeouts.simplify)
            .await?;
        Ok(envelope.data)
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        limit: Duration,
    ) -> Result<T, ApiError> {
        let (status, body) = tokio::time::timeout(limit, async {
            let response = request.send().await?;
            let status = response.status();
            let body = read_limited_body(response, MAX_RESPONSE_SIZE).await?;
            Ok::<_, ApiError>((status, body))
        })
        .await
        .map_err(|_| ApiError::Timeout(limit.as_secs()))??;

        if !status.is_success() {
            let error = server_error(status, &body);
            tracing::debug!(status = status.as_u16(), error = %error, "Backend returned an error");
            return Err(error);
        }

        let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&body)?
        };
        if let Some(message) = string_field(&value, "error") {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn append_query(url: &mut Url, params: &[(&str, String)]) {
    let mut pairs = url.query_pairs_mut();
    for (key, value) in params {
        pairs.append_pair(key, value);
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Pull a human-readable message out of an error response: `error`, then
/// `message`, then `detail`, then the raw body, then the status line.
fn server_error(status: StatusCode, body: &[u8]) -> ApiError {
    let parsed = serde_json::from_slice::<Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            ["error", "message", "detail"]
                .iter()
                .find_map(|key| string_field(v, key))
        })
        .or_else(|| {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            (!text.is_empty()).then(|| text.chars().take(MAX_ERROR_EXCERPT).collect())
        })
        .unwrap_or_else(|| format!("HTTP {status}"));

    ApiError::Server {
        status: status.as_u16(),
        message,
    }
}

async fn read_limited_body(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(ApiError::ResponseTooLarge(limit));
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::TaskStatus;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Timeouts::default()).unwrap()
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    #[tokio::test]
    async fn test_login_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login/"))
            .and(body_json(json!({"useraccount": "10001", "userpwd": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userid": 7, "useraccount": 10001, "username": "reader"
            })))
            .mount(&server)
            .await;

        let user = client(&server).login("10001", &secret("pw")).await.unwrap();
        assert_eq!(user.userid, RemoteId::Number(7));
        assert_eq!(user.display_name(), "reader");
    }

    #[tokio::test]
    async fn test_login_rejected_uses_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Wrong password"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).login("1", &secret("x")).await.unwrap_err();
        assert_eq!(err.to_string(), "Wrong password");
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_register_returns_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register/"))
            .and(body_json(json!({"username": "ann", "userpwd": "pw"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"useraccount": "20002"})))
            .mount(&server)
            .await;

        let account = client(&server).register("ann", &secret("pw")).await.unwrap();
        assert_eq!(account, RemoteId::Text("20002".into()));
    }

    #[tokio::test]
    async fn test_tasks_query_and_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/7/"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "10"))
            .and(query_param("search", "rates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tasks": [{"task_id": 3, "status": "完成", "created_at": "2024-05-01"}],
                "total": 11
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .tasks(TaskKind::Crawl, &RemoteId::Number(7), 2, 10, Some(" rates "))
            .await
            .unwrap();
        assert_eq!(page.total, 11);
        assert_eq!(page.tasks[0].status, TaskStatus::Completed);
        assert_eq!(page.page_count(10), 2);
    }

    #[tokio::test]
    async fn test_keyword_tasks_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/keyword_tasks/7/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tasks": [], "total": 0})))
            .mount(&server)
            .await;

        let page = client(&server)
            .tasks(TaskKind::Keyword, &RemoteId::Number(7), 1, 10, None)
            .await
            .unwrap();
        assert!(page.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_articles_by_category_sends_each_category() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get_articles_by_categories/"))
            .and(query_param("category_names", "Foreign Affairs"))
            .and(query_param("category_names", "Sports"))
            .and(query_param("user_id", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "articles_by_category": {
                    "Sports": [{"article_id": 1, "title": "Final"}]
                }
            })))
            .mount(&server)
            .await;

        let query = ArticleQuery {
            page: 1,
            per_page: 10,
            categories: vec![Category::ForeignAffairs, Category::Sports],
            search: None,
        };
        let articles = client(&server)
            .articles_by_category(&RemoteId::Number(7), &query)
            .await
            .unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].category.as_deref(), Some("Sports"));
    }

    #[tokio::test]
    async fn test_delete_sends_ids_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/delete_category_articles/"))
            .and(body_json(json!({"article_ids": [5], "user_id": 7})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "1 deleted"})))
            .expect(1)
            .mount(&server)
            .await;

        let message = client(&server)
            .delete_articles(
                DeleteScope::CategoryArticles,
                &RemoteId::Number(7),
                &[RemoteId::Number(5)],
            )
            .await
            .unwrap();
        assert_eq!(message, "1 deleted");
    }

    #[tokio::test]
    async fn test_error_key_in_success_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/process-articles/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "no articles"})))
            .mount(&server)
            .await;

        let err = client(&server)
            .process_task(&RemoteId::Number(7), &RemoteId::Number(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 200, .. }));
        assert_eq!(err.to_string(), "no articles");
    }

    #[tokio::test]
    async fn test_plain_text_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client(&server)
            .keyword_report(&RemoteId::Number(7), &RemoteId::Number(1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_empty_error_body_uses_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .task_articles(TaskKind::Crawl, &RemoteId::Number(7), &RemoteId::Number(1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 404 Not Found");
    }

    #[tokio::test]
    async fn test_simplify_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/simplify/"))
            .and(body_json(json!({"user_id": 7, "url": "https://example.com/a"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"title": "T", "content": "C"}
            })))
            .mount(&server)
            .await;

        let fields = client(&server)
            .simplify(&RemoteId::Number(7), "https://example.com/a")
            .await
            .unwrap();
        assert_eq!(
            fields,
            ArticleFields {
                title: Some("T".into()),
                author: None,
                publish_time: None,
                content: Some("C".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"report": {}}))
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&server)
            .await;

        let timeouts = Timeouts {
            request: Duration::from_millis(100),
            ..Timeouts::default()
        };
        let client = ApiClient::new(&server.uri(), timeouts).unwrap();
        let err = client
            .keyword_report(&RemoteId::Number(7), &RemoteId::Number(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_base_path_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/backend/api/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userid": "u1", "useraccount": "u1"
            })))
            .mount(&server)
            .await;

        let client =
            ApiClient::new(&format!("{}/backend", server.uri()), Timeouts::default()).unwrap();
        let user = client.login("u1", &secret("pw")).await.unwrap();
        assert_eq!(user.display_name(), "u1");
    }

    #[test]
    fn test_rejects_non_http_server() {
        assert!(matches!(
            ApiClient::new("ftp://example.com", Timeouts::default()),
            Err(ApiError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            ApiClient::new("not a url", Timeouts::default()),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
