//! A single cancellable simplify call, run off the interactive loop.
//!
//! [`start`] spawns the call and returns a [`TaskHandle`]. Exactly one
//! [`FetchEvent`] is sent on the supplied channel per started fetch, whether
//! the call succeeds, fails, times out, panics or is cancelled. The channel
//! is the interactive loop's own event queue, so the outcome is always
//! applied between input events, never concurrently with them.

use crate::api::{ApiClient, ApiError, ArticleFields, RemoteId};
use crate::util::catch_task_panic;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What to simplify and on whose behalf. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    target_url: String,
    requester_id: RemoteId,
}

impl FetchRequest {
    pub fn new(target_url: impl Into<String>, requester_id: RemoteId) -> Self {
        Self {
            target_url: target_url.into(),
            requester_id,
        }
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn requester_id(&self) -> &RemoteId {
        &self.requester_id
    }
}

/// Terminal result of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { fields: ArticleFields },
    Failure { message: String },
    Cancelled,
}

/// An outcome tagged with the generation of the fetch that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEvent {
    pub generation: u64,
    pub outcome: FetchOutcome,
}

/// The remote side of a simplify call.
///
/// The returned future must own everything it needs so it can outlive the
/// borrow of `self` on a spawned task.
pub trait ContentService: Send + Sync + 'static {
    fn simplify(&self, request: &FetchRequest) -> BoxFuture<'static, Result<ArticleFields, ApiError>>;
}

impl ContentService for ApiClient {
    fn simplify(&self, request: &FetchRequest) -> BoxFuture<'static, Result<ArticleFields, ApiError>> {
        let client = self.clone();
        let request = request.clone();
        async move {
            client
                .simplify(request.requester_id(), request.target_url())
                .await
        }
        .boxed()
    }
}

/// Handle to one in-flight fetch. Dropping it cancels the fetch.
#[derive(Debug)]
pub struct TaskHandle {
    generation: u64,
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Request cooperative cancellation. A no-op once the outcome exists.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the outcome has been produced and sent.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn one simplify call. Must be called inside a tokio runtime.
///
/// The call is bounded by `timeout`; expiry becomes a `Failure`. The task
/// never retries.
pub fn start<S, E>(
    service: &S,
    request: FetchRequest,
    generation: u64,
    timeout: Duration,
    events: mpsc::Sender<E>,
) -> TaskHandle
where
    S: ContentService + ?Sized,
    E: From<FetchEvent> + Send + 'static,
{
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let call = service.simplify(&request);
    let target = request.target_url;

    let join = tokio::spawn(async move {
        let outcome = tokio::select! {
            biased;
            () = cancelled.cancelled() => FetchOutcome::Cancelled,
            result = catch_task_panic(tokio::time::timeout(timeout, call)) => match result {
                Ok(Ok(Ok(fields))) => FetchOutcome::Success { fields },
                Ok(Ok(Err(e))) => FetchOutcome::Failure { message: e.to_string() },
                Ok(Err(_)) => FetchOutcome::Failure {
                    message: format!("Simplify request timed out after {}s", timeout.as_secs()),
                },
                Err(panic) => {
                    tracing::error!(error = %panic, "Simplify task panicked");
                    FetchOutcome::Failure { message: format!("Simplify failed unexpectedly: {panic}") }
                }
            },
        };

        match &outcome {
            FetchOutcome::Success { .. } => tracing::debug!(generation, url = %target, "Simplify succeeded"),
            FetchOutcome::Failure { message } => {
                tracing::warn!(generation, url = %target, error = %message, "Simplify failed")
            }
            FetchOutcome::Cancelled => tracing::debug!(generation, url = %target, "Simplify cancelled"),
        }

        if events.send(FetchEvent { generation, outcome }.into()).await.is_err() {
            tracing::debug!(generation, "Event receiver closed before simplify outcome was delivered");
        }
    });

    TaskHandle {
        generation,
        token,
        join,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Delayed {
        delay: Duration,
    }

    impl ContentService for Delayed {
        fn simplify(&self, request: &FetchRequest) -> BoxFuture<'static, Result<ArticleFields, ApiError>> {
            let delay = self.delay;
            let title = request.target_url().to_owned();
            async move {
                tokio::time::sleep(delay).await;
                Ok(ArticleFields {
                    title: Some(title),
                    ..ArticleFields::default()
                })
            }
            .boxed()
        }
    }

    fn request() -> FetchRequest {
        FetchRequest::new("https://example.com/a", RemoteId::Number(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_one_outcome() {
        let (tx, mut rx) = mpsc::channel::<FetchEvent>(4);
        let service = Delayed {
            delay: Duration::from_millis(50),
        };
        let handle = start(&service, request(), 1, Duration::from_secs(30), tx);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.generation, 1);
        assert!(matches!(event.outcome, FetchOutcome::Success { .. }));

        // Sender moved into the finished task, so the channel closes.
        assert!(rx.recv().await.is_none());
        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_completion_yields_cancelled() {
        let (tx, mut rx) = mpsc::channel::<FetchEvent>(4);
        let service = Delayed {
            delay: Duration::from_secs(2),
        };
        let handle = start(&service, request(), 4, Duration::from_secs(30), tx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            FetchEvent {
                generation: 4,
                outcome: FetchOutcome::Cancelled
            }
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_completion_keeps_outcome() {
        let (tx, mut rx) = mpsc::channel::<FetchEvent>(4);
        let service = Delayed {
            delay: Duration::ZERO,
        };
        let handle = start(&service, request(), 2, Duration::from_secs(30), tx);

        let event = rx.recv().await.unwrap();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(matches!(event.outcome, FetchOutcome::Success { .. }));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failure() {
        let (tx, mut rx) = mpsc::channel::<FetchEvent>(4);
        let service = Delayed {
            delay: Duration::from_secs(60),
        };
        let _handle = start(&service, request(), 1, Duration::from_secs(30), tx);

        let event = rx.recv().await.unwrap();
        match event.outcome {
            FetchOutcome::Failure { message } => assert!(message.contains("timed out after 30s")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let (tx, mut rx) = mpsc::channel::<FetchEvent>(4);
        let service = Delayed {
            delay: Duration::from_secs(5),
        };
        drop(start(&service, request(), 9, Duration::from_secs(30), tx));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.outcome, FetchOutcome::Cancelled);
    }

    struct Exploding;

    fn explode() -> Result<ArticleFields, ApiError> {
        panic!("parser bug")
    }

    impl ContentService for Exploding {
        fn simplify(&self, _: &FetchRequest) -> BoxFuture<'static, Result<ArticleFields, ApiError>> {
            async { explode() }.boxed()
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let (tx, mut rx) = mpsc::channel::<FetchEvent>(4);
        let _handle = start(&Exploding, request(), 1, Duration::from_secs(30), tx);

        let event = rx.recv().await.unwrap();
        match event.outcome {
            FetchOutcome::Failure { message } => assert!(message.contains("parser bug")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
