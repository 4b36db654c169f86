//! Client surface: submit workflows and observe terminal status.
//!
//! The client shares the persistence contract with the workers but runs no
//! workflow code itself; submission is an insert, and observation is a
//! status poll. There is no push notification channel.

use bytes::Bytes;
use durable_core::clock::{Clock, TokioClock};
use durable_core::status::WorkflowStatus;
use durable_core::store::{StoreError, WorkflowStore};
use std::sync::Arc;
use std::time::Duration;

/// Submits workflows and polls their status.
///
/// # Example
///
/// ```rust,ignore
/// use durable_runtime::Client;
/// use durable_persistence::InMemoryStore;
/// use durable_core::WorkflowStatus;
///
/// let client = Client::new(store);
/// client.start("order-17", "process_order", input).await?;
/// let outcome = client
///     .wait(
///         "order-17",
///         &[WorkflowStatus::Finished, WorkflowStatus::Aborted],
///         10,
///         Duration::from_millis(500),
///     )
///     .await?;
/// ```
#[derive(Clone)]
pub struct Client<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Client<S>
where
    S: WorkflowStore,
{
    /// Create a client over a store.
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(TokioClock),
        }
    }

    /// Replace the clock, letting tests drive time deterministically.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Submit a workflow.
    ///
    /// Returns `true` when freshly created and `false` when the id already
    /// existed (the existing record is untouched). Errors other than a
    /// duplicate id propagate.
    pub async fn start(&self, id: &str, handler: &str, input: Bytes) -> Result<bool, StoreError> {
        let created = self.store.insert(id, handler, input).await?;
        tracing::debug!(workflow_id = %id, handler = %handler, created, "workflow submitted");
        Ok(created)
    }

    /// Poll for a status in `statuses`, up to `times` attempts with `delay`
    /// between them.
    ///
    /// Returns the first matching status, or `None` once the budget is
    /// exhausted; `times = 0` returns `None` immediately. Advisory only:
    /// a workflow may reach a status between polls.
    pub async fn wait(
        &self,
        id: &str,
        statuses: &[WorkflowStatus],
        times: u32,
        delay: Duration,
    ) -> Result<Option<WorkflowStatus>, StoreError> {
        for attempt in 0..times {
            if let Some(status) = self.store.find_status(id).await? {
                if statuses.contains(&status) {
                    return Ok(Some(status));
                }
            }
            if attempt + 1 < times {
                self.clock.delay(delay).await;
            }
        }
        Ok(None)
    }

    /// Current status of a workflow, or `None` if the id is unknown.
    pub async fn find_status(&self, id: &str) -> Result<Option<WorkflowStatus>, StoreError> {
        self.store.find_status(id).await
    }
}
