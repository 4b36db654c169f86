//! Workflow status vocabulary.
//!
//! Statuses are wire-stable: the lowercase strings produced here are what
//! stores persist and clients match against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a workflow.
///
/// Workflows are created `Idle`, move to `Running` when a worker claims them,
/// and end in `Finished` (success) or `Aborted` (too many failures). `Failed`
/// is a retryable state: the claim predicate re-leases a failed workflow once
/// its timeout has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    /// Created but never claimed.
    Idle,
    /// Leased by a worker; the lease is the row's `timeout_at`.
    Running,
    /// Terminated by a handler error; claimable again after `timeout_at`.
    Failed,
    /// Handler returned successfully. Terminal.
    Finished,
    /// Reached the failure limit. Terminal; never re-claimed.
    Aborted,
}

impl WorkflowStatus {
    /// The wire-stable string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Idle => "idle",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Finished => "finished",
            WorkflowStatus::Aborted => "aborted",
        }
    }

    /// Whether this status is terminal (never executed again).
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Finished | WorkflowStatus::Aborted)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
