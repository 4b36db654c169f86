//! Per-execution workflow primitives.
//!
//! A [`Context`] is constructed for each handler invocation and carries the
//! workflow id. Its three operations are the only way a handler touches
//! durable state:
//!
//! - [`step`](Context::step) memoizes the output of a unit of work,
//! - [`sleep`](Context::sleep) records a wake-up time before waiting so a
//!   crash mid-sleep loses at most the wall-clock remainder,
//! - [`start`](Context::start) submits a new, independent workflow.
//!
//! Every step or nap write also pushes the workflow's lease deadline
//! forward, which is how a live worker renews its claim.

use crate::clock::Clock;
use crate::store::{StoreError, WorkflowStore};
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Handle passed to a handler for one workflow execution.
#[derive(Clone)]
pub struct Context {
    workflow_id: String,
    store: Arc<dyn WorkflowStore>,
    clock: Arc<dyn Clock>,
    timeout_interval: Duration,
}

impl Context {
    /// Bind a context to a workflow id.
    ///
    /// `timeout_interval` is the lease length: each step or nap write pushes
    /// the workflow's `timeout_at` to `now + timeout_interval`.
    pub fn new(
        workflow_id: impl Into<String>,
        store: Arc<dyn WorkflowStore>,
        clock: Arc<dyn Clock>,
        timeout_interval: Duration,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            store,
            clock,
            timeout_interval,
        }
    }

    /// The id of the workflow this context is bound to.
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Execute `func` at most once per `(workflow, id)` and return its output.
    ///
    /// If an output is already recorded for this step id, it is returned
    /// without invoking `func`. Otherwise `func` runs, its output is
    /// persisted together with a refreshed lease deadline, and the output is
    /// returned. When `func` fails the error propagates and no record is
    /// written, so a later replay re-invokes it.
    ///
    /// Step ids must be unique within the workflow; on a collision the first
    /// recorded output wins.
    pub async fn step<F, Fut>(&self, id: &str, func: F) -> anyhow::Result<Bytes>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Bytes>> + Send,
    {
        if let Some(output) = self.store.find_output(&self.workflow_id, id).await? {
            tracing::debug!(
                workflow_id = %self.workflow_id,
                step_id = %id,
                "step output already recorded, skipping execution"
            );
            return Ok(output);
        }

        let output = func().await?;

        let timeout_at = self.clock.now() + self.timeout_interval;
        self.store
            .update_output(&self.workflow_id, id, output.clone(), timeout_at)
            .await?;
        tracing::debug!(
            workflow_id = %self.workflow_id,
            step_id = %id,
            "step completed"
        );
        Ok(output)
    }

    /// Durable delay of `duration`, surviving crashes.
    ///
    /// The wake-up time is recorded under `(workflow, id)` before waiting.
    /// On replay the wait is shortened to the remaining interval, or skipped
    /// entirely once the recorded wake-up time has passed, so the original
    /// schedule is preserved across re-executions.
    pub async fn sleep(&self, id: &str, duration: Duration) -> Result<(), StoreError> {
        let now = self.clock.now();

        if let Some(wake_up_at) = self.store.find_wake_up_at(&self.workflow_id, id).await? {
            let remaining = (wake_up_at - now).to_std().unwrap_or_default();
            if remaining.is_zero() {
                tracing::debug!(
                    workflow_id = %self.workflow_id,
                    nap_id = %id,
                    "nap already satisfied"
                );
                return Ok(());
            }
            tracing::debug!(
                workflow_id = %self.workflow_id,
                nap_id = %id,
                remaining_ms = remaining.as_millis() as u64,
                "resuming recorded nap"
            );
            self.clock.delay(remaining).await;
            return Ok(());
        }

        let wake_up_at = now + duration;
        let timeout_at = wake_up_at + self.timeout_interval;
        self.store
            .update_wake_up_at(&self.workflow_id, id, wake_up_at, timeout_at)
            .await?;
        tracing::debug!(
            workflow_id = %self.workflow_id,
            nap_id = %id,
            wake_up_at = %wake_up_at,
            "nap recorded"
        );
        self.clock.delay(duration).await;
        Ok(())
    }

    /// Submit a new, independent workflow.
    ///
    /// Returns `true` when freshly created and `false` when `id` already
    /// existed. There is no parent/child relationship with the submitting
    /// workflow.
    pub async fn start(&self, id: &str, handler: &str, input: Bytes) -> Result<bool, StoreError> {
        let created = self.store.insert(id, handler, input).await?;
        tracing::debug!(
            workflow_id = %id,
            handler = %handler,
            created,
            "workflow submitted from handler"
        );
        Ok(created)
    }
}
