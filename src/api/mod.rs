//! REST client for the news aggregation backend.
//!
//! Every call is bounded by a timeout and every failure, whether transport,
//! status or payload, comes back as an [`ApiError`] whose `Display` is fit
//! to show the user.

mod client;
mod types;

pub use client::{ApiClient, ApiError, ArticleQuery, Timeouts};
pub use types::{
    Article, ArticleFields, ArticleSort, Category, DeleteScope, KeywordReport, RemoteId, Task,
    TaskKind, TaskPage, TaskStatus, UserInfo,
};
