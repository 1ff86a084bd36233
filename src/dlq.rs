use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{info, warn};

use crate::backend::BackendClient;
use crate::domain::{FailedTask, FailedTaskStatus};
use crate::error::{PayflowError, Result};

/// Manual retry console over the backend's dead-letter queue.
///
/// The task list is a fresh snapshot each poll. A retry is fire-and-forget:
/// the console does not wait for the task to run, it relies on the next poll
/// to observe the new state (disappearance on success, or FAILED again with
/// an incremented retry count). While a retry is outstanding the task's
/// retry control is refused locally, so rapid clicks cannot double-submit.
pub struct DlqConsole {
    client: Arc<BackendClient>,
    tasks: Mutex<Vec<FailedTask>>,
    pending_retries: Mutex<HashSet<String>>,
    interval: Duration,
}

// A panicked caller must not wedge the console for every later click.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DlqConsole {
    pub fn new(client: Arc<BackendClient>, interval: Duration) -> Self {
        Self {
            client,
            tasks: Mutex::new(Vec::new()),
            pending_retries: Mutex::new(HashSet::new()),
            interval,
        }
    }

    /// Rendered task list: backend snapshot with locally pending retries
    /// shown as RETRYING.
    pub fn snapshot(&self) -> Vec<FailedTask> {
        let pending = lock(&self.pending_retries);
        lock(&self.tasks)
            .iter()
            .cloned()
            .map(|mut t| {
                if pending.contains(&t.task_id) {
                    t.status = FailedTaskStatus::Retrying;
                }
                t
            })
            .collect()
    }

    /// Whether the retry control for this task is enabled.
    pub fn can_retry(&self, task_id: &str) -> bool {
        if lock(&self.pending_retries).contains(task_id) {
            return false;
        }
        lock(&self.tasks)
            .iter()
            .any(|t| t.task_id == task_id && t.status == FailedTaskStatus::Failed)
    }

    /// Dispatch a manual retry. Refused while one is already outstanding for
    /// this task; a dispatch error re-enables the control.
    pub async fn retry(&self, task_id: &str) -> Result<()> {
        {
            let mut pending = lock(&self.pending_retries);
            if !pending.insert(task_id.to_owned()) {
                return Err(PayflowError::RetryAlreadyPending(task_id.to_owned()));
            }
        }

        info!(task_id, "dlq.retry_dispatch");
        match self.client.retry_task(task_id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                lock(&self.pending_retries).remove(task_id);
                Err(PayflowError::RetryDispatchFailed {
                    task_id: task_id.to_owned(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Refresh the snapshot. A successful poll resolves every outstanding
    /// retry: the backend's reported status is authoritative again.
    pub async fn poll_once(&self) -> Result<()> {
        let list = self
            .client
            .list_failed_tasks()
            .await
            .map_err(|e| PayflowError::DlqPollFailed(e.to_string()))?;

        *lock(&self.tasks) = list;
        lock(&self.pending_retries).clear();
        Ok(())
    }

    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        info!(interval_secs = self.interval.as_secs(), "dlq.console_start");
        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                warn!(error = %e, "dlq.poll_failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn failed_task_json(task_id: &str, retry_count: u32) -> serde_json::Value {
        json!({
            "task_id": task_id,
            "task_type": "webhook_delivery",
            "payload": {"url": "https://example.com"},
            "error_message": "connection refused",
            "retry_count": retry_count,
            "status": "FAILED",
            "created_at": Utc::now(),
            "last_retry_at": null
        })
    }

    async fn console_with(server: &MockServer) -> DlqConsole {
        DlqConsole::new(
            Arc::new(BackendClient::new(server.uri())),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn retry_disables_control_until_next_poll() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/dlq/tasks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([failed_task_json("T1", 3)])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/dlq/retry/T1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let console = console_with(&server).await;
        console.poll_once().await.unwrap();
        assert!(console.can_retry("T1"));

        console.retry("T1").await.unwrap();
        assert!(!console.can_retry("T1"));
        assert!(matches!(
            console.retry("T1").await,
            Err(PayflowError::RetryAlreadyPending(_))
        ));

        // Snapshot reflects the in-flight retry.
        let snap = console.snapshot();
        assert_eq!(snap[0].status, FailedTaskStatus::Retrying);

        // Next poll resolves the status and re-enables the control.
        console.poll_once().await.unwrap();
        assert!(console.can_retry("T1"));
    }

    #[tokio::test]
    async fn dispatch_failure_reenables_control() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/dlq/tasks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([failed_task_json("T2", 0)])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/dlq/retry/T2"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let console = console_with(&server).await;
        console.poll_once().await.unwrap();

        let err = console.retry("T2").await.unwrap_err();
        assert!(matches!(err, PayflowError::RetryDispatchFailed { .. }));
        assert!(console.can_retry("T2"));
    }

    #[tokio::test]
    async fn console_survives_a_poisoned_lock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/dlq/tasks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([failed_task_json("T4", 0)])),
            )
            .mount(&server)
            .await;

        let console = console_with(&server).await;
        console.poll_once().await.unwrap();

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = console.tasks.lock().unwrap();
            panic!("renderer died mid-snapshot");
        }));

        assert_eq!(console.snapshot().len(), 1);
        assert!(console.can_retry("T4"));
    }

    #[tokio::test]
    async fn poll_failure_keeps_stale_snapshot() {
        let server = MockServer::start().await;
        let ok = Mock::given(method("GET"))
            .and(path("/admin/dlq/tasks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([failed_task_json("T3", 1)])),
            )
            .expect(1)
            .mount_as_scoped(&server)
            .await;

        let console = console_with(&server).await;
        console.poll_once().await.unwrap();
        drop(ok);

        Mock::given(method("GET"))
            .and(path("/admin/dlq/tasks"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(matches!(
            console.poll_once().await,
            Err(PayflowError::DlqPollFailed(_))
        ));
        assert_eq!(console.snapshot().len(), 1);
    }
}
