//! In-memory implementation of [`WorkflowStore`].
//!
//! Stores workflow rows and step/nap records in HashMaps behind RwLocks.
//! The claim scan runs under the workflow write lock, which provides the
//! compare-and-set atomicity the contract requires. Useful for testing and
//! as a reference implementation.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use durable_core::status::WorkflowStatus;
use durable_core::store::{RunData, StoreError, WorkflowStore};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// One workflow row: the shared ground truth for a workflow id.
#[derive(Debug, Clone)]
struct WorkflowRow {
    handler: String,
    input: Bytes,
    status: WorkflowStatus,
    timeout_at: Option<DateTime<Utc>>,
    failures: u32,
    last_error: Option<String>,
}

/// In-memory store backed by HashMaps.
///
/// Cloning is cheap and clones share state, so a worker and a client can
/// operate on the same store instance. For production use, implement
/// [`WorkflowStore`] over a durable backend (PostgreSQL, Redis, any KV
/// store with compare-and-set).
#[derive(Clone, Default)]
pub struct InMemoryStore {
    workflows: Arc<RwLock<HashMap<String, WorkflowRow>>>,
    steps: Arc<RwLock<HashMap<String, Bytes>>>, // Key: "{workflow_id}:{step_id}"
    naps: Arc<RwLock<HashMap<String, DateTime<Utc>>>>, // Key: "{workflow_id}:{nap_id}"
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_key(workflow_id: &str, record_id: &str) -> String {
        format!("{}:{}", workflow_id, record_id)
    }

    fn lock_error<E: std::fmt::Display>(err: E) -> StoreError {
        StoreError::Backend(format!("lock error: {}", err))
    }

    /// Last recorded error text for a workflow, if any.
    ///
    /// Not part of the store contract; exposed for tests and operators.
    pub fn last_error(&self, workflow_id: &str) -> Option<String> {
        self.workflows
            .read()
            .ok()?
            .get(workflow_id)
            .and_then(|row| row.last_error.clone())
    }

    /// Current lease deadline for a workflow, if one is set.
    ///
    /// Not part of the store contract; exposed for tests and operators.
    pub fn timeout_at(&self, workflow_id: &str) -> Option<DateTime<Utc>> {
        self.workflows
            .read()
            .ok()?
            .get(workflow_id)
            .and_then(|row| row.timeout_at)
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn insert(&self, id: &str, handler: &str, input: Bytes) -> Result<bool, StoreError> {
        let mut workflows = self.workflows.write().map_err(Self::lock_error)?;
        if workflows.contains_key(id) {
            return Ok(false);
        }
        workflows.insert(
            id.to_string(),
            WorkflowRow {
                handler: handler.to_string(),
                input,
                status: WorkflowStatus::Idle,
                timeout_at: None,
                failures: 0,
                last_error: None,
            },
        );
        Ok(true)
    }

    async fn claim(
        &self,
        now: DateTime<Utc>,
        timeout_at: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        let mut workflows = self.workflows.write().map_err(Self::lock_error)?;

        let candidate = workflows.iter().find_map(|(id, row)| {
            let ready = match row.status {
                WorkflowStatus::Idle => true,
                WorkflowStatus::Running | WorkflowStatus::Failed => {
                    row.timeout_at.is_some_and(|t| t < now)
                }
                WorkflowStatus::Finished | WorkflowStatus::Aborted => false,
            };
            ready.then(|| id.clone())
        });

        if let Some(id) = candidate {
            let row = workflows
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            row.status = WorkflowStatus::Running;
            row.timeout_at = Some(timeout_at);
            return Ok(Some(id));
        }
        Ok(None)
    }

    async fn find_output(
        &self,
        workflow_id: &str,
        step_id: &str,
    ) -> Result<Option<Bytes>, StoreError> {
        let steps = self.steps.read().map_err(Self::lock_error)?;
        Ok(steps.get(&Self::record_key(workflow_id, step_id)).cloned())
    }

    async fn find_wake_up_at(
        &self,
        workflow_id: &str,
        nap_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let naps = self.naps.read().map_err(Self::lock_error)?;
        Ok(naps.get(&Self::record_key(workflow_id, nap_id)).copied())
    }

    async fn find_run_data(&self, workflow_id: &str) -> Result<Option<RunData>, StoreError> {
        let workflows = self.workflows.read().map_err(Self::lock_error)?;
        Ok(workflows.get(workflow_id).map(|row| RunData {
            handler: row.handler.clone(),
            input: row.input.clone(),
            failures: row.failures,
        }))
    }

    async fn set_as_finished(&self, workflow_id: &str) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write().map_err(Self::lock_error)?;
        let row = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| StoreError::NotFound(workflow_id.to_string()))?;
        row.status = WorkflowStatus::Finished;
        row.timeout_at = None;
        Ok(())
    }

    async fn find_status(&self, workflow_id: &str) -> Result<Option<WorkflowStatus>, StoreError> {
        let workflows = self.workflows.read().map_err(Self::lock_error)?;
        Ok(workflows.get(workflow_id).map(|row| row.status))
    }

    async fn update_status(
        &self,
        workflow_id: &str,
        status: WorkflowStatus,
        timeout_at: DateTime<Utc>,
        failures: u32,
        last_error: &str,
    ) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write().map_err(Self::lock_error)?;
        let row = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| StoreError::NotFound(workflow_id.to_string()))?;
        row.status = status;
        row.timeout_at = Some(timeout_at);
        row.failures = failures;
        row.last_error = Some(last_error.to_string());
        Ok(())
    }

    async fn update_output(
        &self,
        workflow_id: &str,
        step_id: &str,
        output: Bytes,
        timeout_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write().map_err(Self::lock_error)?;
        let row = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| StoreError::NotFound(workflow_id.to_string()))?;

        let mut steps = self.steps.write().map_err(Self::lock_error)?;
        // First write wins: a stale lease holder racing a replay must not
        // change a recorded value.
        steps
            .entry(Self::record_key(workflow_id, step_id))
            .or_insert(output);
        row.timeout_at = Some(timeout_at);
        Ok(())
    }

    async fn update_wake_up_at(
        &self,
        workflow_id: &str,
        nap_id: &str,
        wake_up_at: DateTime<Utc>,
        timeout_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write().map_err(Self::lock_error)?;
        let row = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| StoreError::NotFound(workflow_id.to_string()))?;

        let mut naps = self.naps.write().map_err(Self::lock_error)?;
        naps.entry(Self::record_key(workflow_id, nap_id))
            .or_insert(wake_up_at);
        row.timeout_at = Some(timeout_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn lease(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn test_insert_and_run_data() {
        let store = InMemoryStore::new();

        let created = store
            .insert("wf-1", "handler", Bytes::from_static(b"42"))
            .await
            .unwrap();
        assert!(created);

        let run_data = store.find_run_data("wf-1").await.unwrap().unwrap();
        assert_eq!(run_data.handler, "handler");
        assert_eq!(run_data.input, Bytes::from_static(b"42"));
        assert_eq!(run_data.failures, 0);
        assert_eq!(
            store.find_status("wf-1").await.unwrap(),
            Some(WorkflowStatus::Idle)
        );
    }

    #[tokio::test]
    async fn test_insert_duplicate_id() {
        let store = InMemoryStore::new();

        assert!(store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap());
        assert!(!store
            .insert("wf-1", "h2", Bytes::from_static(b"2"))
            .await
            .unwrap());

        // Original record unchanged.
        let run_data = store.find_run_data("wf-1").await.unwrap().unwrap();
        assert_eq!(run_data.handler, "h");
        assert_eq!(run_data.input, Bytes::from_static(b"1"));
    }

    #[tokio::test]
    async fn test_claim_empty_store() {
        let store = InMemoryStore::new();
        let claimed = store.claim(epoch(), lease(epoch())).await.unwrap();
        assert_eq!(claimed, None);
    }

    #[tokio::test]
    async fn test_claim_idle_workflow() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();

        let claimed = store.claim(epoch(), lease(epoch())).await.unwrap();
        assert_eq!(claimed, Some("wf-1".to_string()));
        assert_eq!(
            store.find_status("wf-1").await.unwrap(),
            Some(WorkflowStatus::Running)
        );
        assert_eq!(store.timeout_at("wf-1"), Some(lease(epoch())));
    }

    #[tokio::test]
    async fn test_claim_respects_unexpired_lease() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();

        let first = store.claim(epoch(), lease(epoch())).await.unwrap();
        assert!(first.is_some());

        // A second claim before the lease expires finds nothing.
        let second = store
            .claim(epoch() + Duration::from_secs(30), lease(epoch()))
            .await
            .unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn test_claim_reclaims_expired_running_workflow() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();
        store.claim(epoch(), lease(epoch())).await.unwrap();

        // The lease ran out: the workflow is claimable again.
        let later = epoch() + Duration::from_secs(61);
        let reclaimed = store.claim(later, lease(later)).await.unwrap();
        assert_eq!(reclaimed, Some("wf-1".to_string()));
        assert_eq!(store.timeout_at("wf-1"), Some(lease(later)));
    }

    #[tokio::test]
    async fn test_claim_retries_failed_workflow_after_timeout() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();
        store
            .update_status(
                "wf-1",
                WorkflowStatus::Failed,
                epoch() + Duration::from_secs(60),
                1,
                "boom",
            )
            .await
            .unwrap();

        // Not claimable before the retry deadline.
        let early = store
            .claim(epoch() + Duration::from_secs(30), lease(epoch()))
            .await
            .unwrap();
        assert_eq!(early, None);

        let later = epoch() + Duration::from_secs(90);
        let claimed = store.claim(later, lease(later)).await.unwrap();
        assert_eq!(claimed, Some("wf-1".to_string()));
        assert_eq!(
            store.find_status("wf-1").await.unwrap(),
            Some(WorkflowStatus::Running)
        );
    }

    #[tokio::test]
    async fn test_claim_never_returns_terminal_workflows() {
        let store = InMemoryStore::new();
        store
            .insert("wf-done", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();
        store.set_as_finished("wf-done").await.unwrap();

        store
            .insert("wf-dead", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();
        store
            .update_status("wf-dead", WorkflowStatus::Aborted, epoch(), 3, "boom")
            .await
            .unwrap();

        // Even far in the future, neither is ready.
        let far = epoch() + Duration::from_secs(86_400);
        let claimed = store.claim(far, lease(far)).await.unwrap();
        assert_eq!(claimed, None);
    }

    #[tokio::test]
    async fn test_update_output_first_write_wins() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();

        store
            .update_output("wf-1", "a", Bytes::from_static(b"10"), lease(epoch()))
            .await
            .unwrap();
        store
            .update_output("wf-1", "a", Bytes::from_static(b"99"), lease(epoch()))
            .await
            .unwrap();

        assert_eq!(
            store.find_output("wf-1", "a").await.unwrap(),
            Some(Bytes::from_static(b"10"))
        );
    }

    #[tokio::test]
    async fn test_update_output_pushes_lease() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();
        store.claim(epoch(), lease(epoch())).await.unwrap();

        let refreshed = epoch() + Duration::from_secs(120);
        store
            .update_output("wf-1", "a", Bytes::from_static(b"10"), refreshed)
            .await
            .unwrap();
        assert_eq!(store.timeout_at("wf-1"), Some(refreshed));
    }

    #[tokio::test]
    async fn test_update_output_unknown_workflow() {
        let store = InMemoryStore::new();
        let result = store
            .update_output("missing", "a", Bytes::from_static(b"10"), lease(epoch()))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_wake_up_at_first_write_wins() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();

        let wake = epoch() + Duration::from_secs(10);
        store
            .update_wake_up_at("wf-1", "n", wake, lease(wake))
            .await
            .unwrap();
        store
            .update_wake_up_at(
                "wf-1",
                "n",
                wake + Duration::from_secs(100),
                lease(wake),
            )
            .await
            .unwrap();

        assert_eq!(store.find_wake_up_at("wf-1", "n").await.unwrap(), Some(wake));
    }

    #[tokio::test]
    async fn test_step_records_scoped_per_workflow() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();
        store
            .insert("wf-2", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();

        store
            .update_output("wf-1", "a", Bytes::from_static(b"one"), lease(epoch()))
            .await
            .unwrap();

        assert!(store.find_output("wf-1", "a").await.unwrap().is_some());
        assert_eq!(store.find_output("wf-2", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_as_finished_clears_lease() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();
        store.claim(epoch(), lease(epoch())).await.unwrap();

        store.set_as_finished("wf-1").await.unwrap();
        assert_eq!(
            store.find_status("wf-1").await.unwrap(),
            Some(WorkflowStatus::Finished)
        );
        assert_eq!(store.timeout_at("wf-1"), None);
    }

    #[tokio::test]
    async fn test_update_status_writes_all_fields() {
        let store = InMemoryStore::new();
        store
            .insert("wf-1", "h", Bytes::from_static(b"1"))
            .await
            .unwrap();

        let retry_at = epoch() + Duration::from_secs(60);
        store
            .update_status("wf-1", WorkflowStatus::Failed, retry_at, 2, "boom")
            .await
            .unwrap();

        assert_eq!(
            store.find_status("wf-1").await.unwrap(),
            Some(WorkflowStatus::Failed)
        );
        assert_eq!(store.timeout_at("wf-1"), Some(retry_at));
        assert_eq!(store.last_error("wf-1"), Some("boom".to_string()));
        assert_eq!(store.find_run_data("wf-1").await.unwrap().unwrap().failures, 2);
    }

    #[tokio::test]
    async fn test_find_status_unknown_workflow() {
        let store = InMemoryStore::new();
        assert_eq!(store.find_status("missing").await.unwrap(), None);
        assert!(store.find_run_data("missing").await.unwrap().is_none());
    }
}
