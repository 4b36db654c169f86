//! Worker: claims ready workflows from a shared store and runs them.
//!
//! A worker is part of a pool that cooperatively executes workflows. Each
//! worker polls the store, claims one ready workflow at a time (the claim is
//! a lease recorded as the row's `timeout_at`), and dispatches the
//! registered handler. Multiple workers can run across machines or
//! processes over one shared store without double-execution.
//!
//! Recovery needs no coordination beyond the lease: when a worker dies
//! mid-execution its lease expires, another worker claims the workflow and
//! re-enters the handler from the top, and the step/nap memoization in
//! [`Context`] skips every unit of work that already has a record.

use durable_core::clock::{Clock, TokioClock};
use durable_core::context::Context;
use durable_core::error::WorkflowError;
use durable_core::registry::HandlerRegistry;
use durable_core::status::WorkflowStatus;
use durable_core::store::{StoreError, WorkflowStore};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// A worker that claims and executes workflows from a shared store.
///
/// # Example
///
/// ```rust,ignore
/// use durable_runtime::Worker;
/// use durable_persistence::InMemoryStore;
/// use durable_core::HandlerRegistry;
///
/// let store = InMemoryStore::new();
/// let mut handlers = HandlerRegistry::new();
/// handlers.register("greet", |ctx, input| async move {
///     ctx.step("hello", || async { Ok(input.clone()) }).await?;
///     Ok(())
/// });
///
/// let worker = Worker::new(store, handlers);
/// worker.poll(|| false).await?;
/// ```
#[derive(Clone)]
pub struct Worker<S> {
    store: Arc<S>,
    registry: Arc<HandlerRegistry>,
    clock: Arc<dyn Clock>,
    max_failures: u32,
    timeout_interval: Duration,
    poll_interval: Duration,
    retry_interval: Duration,
    max_concurrency: NonZeroUsize,
}

impl<S> Worker<S>
where
    S: WorkflowStore + 'static,
{
    /// Create a worker over a store and a handler registry.
    ///
    /// Defaults: 3 failures before abort, 60 second lease, 1 second idle
    /// poll, 60 second retry delay, 8 concurrent runs.
    pub fn new(store: S, registry: HandlerRegistry) -> Self {
        Self {
            store: Arc::new(store),
            registry: Arc::new(registry),
            clock: Arc::new(TokioClock),
            max_failures: 3,
            timeout_interval: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            retry_interval: Duration::from_secs(60),
            max_concurrency: NonZeroUsize::new(8).unwrap(),
        }
    }

    /// Set how many failed attempts force `aborted` instead of `failed`.
    #[must_use]
    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// Set the lease length.
    ///
    /// Also the amount added past `wake_up_at` when a nap is recorded. Must
    /// be sized generously enough to cover clock skew between workers and
    /// the store.
    #[must_use]
    pub fn with_timeout_interval(mut self, interval: Duration) -> Self {
        self.timeout_interval = interval;
        self
    }

    /// Set the idle sleep between empty poll cycles.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the delay before a failed workflow becomes claimable again.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the maximum number of concurrent workflow runs.
    #[must_use]
    pub fn with_max_concurrency(mut self, max: NonZeroUsize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Replace the clock, letting tests drive time deterministically.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Execute one claimed workflow: load, dispatch, finalize.
    ///
    /// A handler error is not an error here: it is translated into store
    /// state (`failed` below the failure limit, `aborted` at it) and the
    /// call returns `Ok`. The errors this method does return are fatal:
    /// a vanished workflow row, an unregistered handler, or a store
    /// failure. In the last case no terminal state is recorded, and the
    /// expiring lease lets another worker retry.
    pub async fn execute(&self, workflow_id: &str) -> Result<(), WorkflowError> {
        let run_data = self
            .store
            .find_run_data(workflow_id)
            .await?
            .ok_or_else(|| WorkflowError::WorkflowNotFound(workflow_id.to_string()))?;

        let handler = self
            .registry
            .get(&run_data.handler)
            .ok_or_else(|| WorkflowError::HandlerNotFound(run_data.handler.clone()))?;

        tracing::debug!(
            workflow_id = %workflow_id,
            handler = %run_data.handler,
            failures = run_data.failures,
            "executing workflow"
        );

        let ctx = Context::new(
            workflow_id,
            Arc::clone(&self.store) as Arc<dyn WorkflowStore>,
            Arc::clone(&self.clock),
            self.timeout_interval,
        );

        match handler.call(ctx, run_data.input).await {
            Ok(()) => {
                self.store.set_as_finished(workflow_id).await?;
                tracing::info!(workflow_id = %workflow_id, "workflow finished");
                Ok(())
            }
            Err(err) => match err.downcast::<StoreError>() {
                // A store failure must not be recorded as a handler
                // failure; leave the row running and let the lease expire.
                Ok(store_err) => Err(WorkflowError::Store(store_err)),
                Err(handler_err) => {
                    let failures = run_data.failures + 1;
                    let status = if failures < self.max_failures {
                        WorkflowStatus::Failed
                    } else {
                        WorkflowStatus::Aborted
                    };
                    let timeout_at = self.clock.now() + self.retry_interval;
                    let last_error = handler_err.to_string();
                    tracing::warn!(
                        workflow_id = %workflow_id,
                        status = %status,
                        failures,
                        error = %last_error,
                        "handler failed"
                    );
                    self.store
                        .update_status(workflow_id, status, timeout_at, failures, &last_error)
                        .await?;
                    Ok(())
                }
            },
        }
    }

    /// Poll the store for ready workflows until `should_stop` returns true.
    ///
    /// Each claimed workflow is run on its own task without awaiting it, so
    /// one worker feeds up to `max_concurrency` concurrent runs; a panic in
    /// a run is confined to its task. When nothing is claimable the worker
    /// sleeps `poll_interval`; when work exists it claims without pause.
    ///
    /// `should_stop` is evaluated at the top of each iteration. On stop,
    /// in-flight runs are drained before returning.
    pub async fn poll<F>(self, should_stop: F) -> anyhow::Result<()>
    where
        F: Fn() -> bool + Send,
    {
        let max_concurrency = self.max_concurrency.get();
        let semaphore = Arc::new(Semaphore::new(max_concurrency));
        let worker = Arc::new(self);

        while !should_stop() {
            // Wait for run capacity before claiming, so a claim is never
            // left leased but unstarted.
            let permit = semaphore.clone().acquire_owned().await?;

            let now = worker.clock.now();
            match worker.store.claim(now, now + worker.timeout_interval).await? {
                Some(workflow_id) => {
                    tracing::debug!(workflow_id = %workflow_id, "claimed workflow");
                    let worker = Arc::clone(&worker);
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(err) = worker.execute(&workflow_id).await {
                            tracing::error!(
                                workflow_id = %workflow_id,
                                error = %err,
                                "workflow run failed"
                            );
                        }
                    });
                }
                None => {
                    drop(permit);
                    worker.clock.delay(worker.poll_interval).await;
                }
            }
        }

        tracing::info!("stopping, draining in-flight workflow runs");
        let _drained = semaphore.acquire_many(max_concurrency as u32).await?;
        Ok(())
    }
}
