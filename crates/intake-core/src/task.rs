//! # Best-Effort Side Tasks
//!
//! Work that must not hold up an HTTP response (webhook confirmation email).
//! A side task runs detached on the Tokio runtime; its failure is logged from
//! inside the task, and whoever holds the handle may still join it to see the
//! result.

use crate::error::{IntakeError, IntakeResult};
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Handle to a spawned best-effort task
#[derive(Debug)]
pub struct SideTask {
    name: &'static str,
    handle: JoinHandle<IntakeResult<()>>,
}

impl SideTask {
    /// Spawn `work` onto the runtime. Must be called from within a runtime.
    pub fn spawn<F>(name: &'static str, work: F) -> Self
    where
        F: Future<Output = IntakeResult<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let result = work.await;
            match &result {
                Ok(()) => debug!(task = name, "Side task finished"),
                Err(e) => error!(task = name, error = %e, "Side task failed"),
            }
            result
        });
        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Let the task run on its own
    pub fn detach(self) {
        drop(self.handle);
    }

    /// Wait for the task and return its result
    pub async fn join(self) -> IntakeResult<()> {
        self.handle
            .await
            .map_err(|e| IntakeError::Internal(format!("side task {} aborted: {e}", self.name)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_returns_result() {
        let ok = SideTask::spawn("ok", async { Ok(()) });
        assert_eq!(ok.name(), "ok");
        assert!(ok.join().await.is_ok());

        let failed = SideTask::spawn("failed", async {
            Err(IntakeError::upstream("smtp", "timeout"))
        });
        assert!(matches!(
            failed.join().await,
            Err(IntakeError::Upstream { .. })
        ));
    }

    #[tokio::test]
    async fn test_detached_task_still_runs() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        SideTask::spawn("detached", async move {
            let _ = tx.send(());
            Ok(())
        })
        .detach();

        assert!(rx.await.is_ok());
    }
}
