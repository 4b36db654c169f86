//! Persistence implementations for durable workflow execution.
//!
//! The store is the shared ground truth of the system: workflow rows, step
//! outputs, and nap times all live there, and every scheduling decision is
//! derived from it. This crate ships the in-memory reference implementation
//! of the [`WorkflowStore`] contract defined in `durable-core`.
//!
//! # Implementing Custom Backends
//!
//! Any store that can provide the required atomicity is a valid substrate.
//! Two operations carry the cross-worker correctness burden:
//!
//! 1. `claim` must be a conditional update: select one ready workflow and
//!    mark it running with a fresh lease, atomically with respect to
//!    concurrent claims (`UPDATE ... WHERE` with row locking, a CAS loop on
//!    a KV store, etc.).
//! 2. `insert` must enforce id uniqueness, reporting a duplicate as `false`
//!    rather than an error.
//!
//! All other writes are made by the current lease holder; enforcing lease
//! ownership on them is optional hardening.
//!
//! ```rust,ignore
//! use durable_core::store::{StoreError, WorkflowStore};
//! use async_trait::async_trait;
//!
//! pub struct PostgresStore {
//!     // your connection pool
//! }
//!
//! #[async_trait]
//! impl WorkflowStore for PostgresStore {
//!     async fn insert(&self, id: &str, handler: &str, input: Bytes) -> Result<bool, StoreError> {
//!         // INSERT ... ON CONFLICT DO NOTHING
//!     }
//!     // ... remaining operations
//! }
//! ```

mod in_memory;

pub use durable_core::store::{RunData, StoreError, WorkflowStore};
pub use in_memory::InMemoryStore;
