//! Persistence contract for workflow state.
//!
//! The core treats the store as the single source of truth: workflow rows,
//! step outputs, and nap times all live behind this trait, and nothing is
//! cached across suspension points. Implementations may back it with any
//! store that can provide the stated atomicity (relational, document, KV
//! with compare-and-set).

use crate::status::WorkflowStatus;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced workflow row does not exist.
    #[error("workflow not found: {0}")]
    NotFound(String),
    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Store-specific error.
    #[error("store error: {0}")]
    Backend(String),
}

/// The fields the run engine needs to dispatch a workflow.
#[derive(Debug, Clone)]
pub struct RunData {
    /// Registered handler name.
    pub handler: String,
    /// Caller-supplied input, opaque to the core.
    pub input: Bytes,
    /// Number of executions terminated by a handler error so far.
    pub failures: u32,
}

/// Storage operations required by the execution engine.
///
/// Only two operations need cross-worker atomicity: [`claim`] (a conditional
/// update on status plus `timeout_at`) and [`insert`] (unique-id
/// enforcement). Every other write is made by the current lease holder; the
/// at-most-once step/nap records and the terminal statuses absorb writes
/// from a holder whose lease has expired.
///
/// [`claim`]: WorkflowStore::claim
/// [`insert`]: WorkflowStore::insert
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Create an `idle` workflow.
    ///
    /// Returns `true` on success and `false` when `id` already exists. Any
    /// other failure is a [`StoreError`].
    async fn insert(&self, id: &str, handler: &str, input: Bytes) -> Result<bool, StoreError>;

    /// Atomically lease one ready workflow.
    ///
    /// A workflow is ready when its status is `idle`, or when its status is
    /// `running` or `failed` and its `timeout_at` is before `now`. The
    /// selected row is set to `running` with the given `timeout_at` and its
    /// id is returned. Returns `None` when no workflow is ready.
    /// Tie-breaking between multiple candidates is unspecified.
    async fn claim(
        &self,
        now: DateTime<Utc>,
        timeout_at: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError>;

    /// Recorded output of a step, or `None` if the step has not completed.
    async fn find_output(
        &self,
        workflow_id: &str,
        step_id: &str,
    ) -> Result<Option<Bytes>, StoreError>;

    /// Recorded wake-up time of a nap, or `None` if the nap was never
    /// scheduled.
    async fn find_wake_up_at(
        &self,
        workflow_id: &str,
        nap_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Handler name, input, and failure count for a workflow.
    async fn find_run_data(&self, workflow_id: &str) -> Result<Option<RunData>, StoreError>;

    /// Mark a workflow `finished`. Terminal; no further writes follow.
    async fn set_as_finished(&self, workflow_id: &str) -> Result<(), StoreError>;

    /// Current status of a workflow, or `None` if the id is unknown.
    async fn find_status(&self, workflow_id: &str) -> Result<Option<WorkflowStatus>, StoreError>;

    /// Write status, lease deadline, failure count, and last error together.
    async fn update_status(
        &self,
        workflow_id: &str,
        status: WorkflowStatus,
        timeout_at: DateTime<Utc>,
        failures: u32,
        last_error: &str,
    ) -> Result<(), StoreError>;

    /// Create the step record and push the lease deadline in one unit.
    ///
    /// Step records are written at most once per `(workflow_id, step_id)`;
    /// a record that already exists keeps its original value.
    async fn update_output(
        &self,
        workflow_id: &str,
        step_id: &str,
        output: Bytes,
        timeout_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Create the nap record and set the lease deadline in one unit.
    ///
    /// Nap records are written at most once per `(workflow_id, nap_id)`.
    async fn update_wake_up_at(
        &self,
        workflow_id: &str,
        nap_id: &str,
        wake_up_at: DateTime<Utc>,
        timeout_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
