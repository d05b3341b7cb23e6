//! Detached best-effort writes.
//!
//! The primary flow never awaits these; a failure ends up in the log and
//! nowhere else.

use std::fmt::Display;
use std::future::Future;

use tokio::task::JoinHandle;

/// Spawns `write` on the runtime and logs its outcome. The returned handle
/// may be dropped; the task keeps running.
pub fn spawn_best_effort<F, E>(operation: &'static str, id: i64, write: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match write.await {
            Ok(()) => log::debug!("{} for certificate {} completed", operation, id),
            Err(e) => log::error!("{} for certificate {} failed: {}", operation, id, e),
        }
    })
}
