use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Run `future`, turning a panic inside it into `Err(panic message)`.
///
/// Spawned request tasks go through this so a bug in one response handler
/// becomes a status-bar error instead of a task that silently vanishes.
pub async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future).catch_unwind().await.map_err(|panic| {
        if let Some(s) = panic.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_owned()
        }
    })
}
