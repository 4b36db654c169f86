//! Core types and primitives for durable workflow execution.
//!
//! A workflow is a long-running procedure that survives crashes, timeouts,
//! and restarts: intermediate results are recorded in a store, and a
//! replayed execution re-uses recorded outputs instead of re-executing
//! their producers. This crate holds the building blocks:
//!
//! - [`WorkflowStore`]: the persistence contract the engine requires,
//! - [`Context`]: the `step` / `sleep` / `start` primitives handlers use,
//! - [`HandlerRegistry`]: the name → handler mapping workers dispatch on,
//! - [`Clock`]: injectable time for deterministic tests.
//!
//! The run engine and the polling supervisor live in `durable-runtime`;
//! store implementations live in `durable-persistence`.

pub mod clock;
pub mod context;
pub mod error;
pub mod registry;
pub mod status;
pub mod store;

pub use clock::{Clock, ManualClock, TokioClock};
pub use context::Context;
pub use error::WorkflowError;
pub use registry::{Handler, HandlerFuture, HandlerRegistry};
pub use status::WorkflowStatus;
pub use store::{RunData, StoreError, WorkflowStore};
