//! Runtime for durable workflow execution: the run engine, the polling
//! worker, and the client surface.
//!
//! The moving parts are deliberately few. A [`Client`] inserts workflow
//! rows; a [`Worker`] claims ready rows under a lease and dispatches the
//! registered handler with a [`Context`](durable_core::Context); the
//! step/nap records the context writes make every re-execution converge to
//! the same position. All scheduling state lives in the store, so a
//! restarted worker resumes correctly with no in-process queue.
//!
//! # Example
//!
//! ```rust,ignore
//! use durable_core::HandlerRegistry;
//! use durable_runtime::{Client, Worker, persistence::InMemoryStore};
//!
//! let store = InMemoryStore::new();
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers.register("process_order", |ctx, input| async move {
//!     let charged = ctx.step("charge", || async { charge(&input).await }).await?;
//!     ctx.sleep("cooldown", Duration::from_secs(3600)).await?;
//!     ctx.step("ship", || async { ship(&charged).await }).await?;
//!     Ok(())
//! });
//!
//! let client = Client::new(store.clone());
//! client.start("order-17", "process_order", input).await?;
//!
//! let worker = Worker::new(store, handlers);
//! worker.poll(|| false).await?;
//! ```

mod client;
mod worker;

pub use client::Client;
pub use worker::Worker;

pub use durable_core::{Context, HandlerRegistry, WorkflowError, WorkflowStatus};
pub use durable_persistence as persistence;
