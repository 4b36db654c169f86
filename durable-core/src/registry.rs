//! Handler registry.
//!
//! Maps handler names to their implementations. Workflow rows store only the
//! handler name; the worker resolves it against this registry at dispatch
//! time, so every worker processing a shared store must register the same
//! handlers from code. The registry is built once at worker construction and
//! read-only thereafter.

use crate::context::Context;
use anyhow::Result;
use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A workflow handler: a named procedure driven to completion across
/// process lifetimes.
///
/// Handlers receive a [`Context`] bound to the workflow id and the opaque
/// caller-supplied input. A handler returning `Ok` finishes the workflow;
/// an error triggers the retry/abort state machine.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: Context, input: Bytes) -> HandlerFuture;
}

/// Registry of handler implementations, keyed by name.
///
/// # Example
///
/// ```rust,ignore
/// let mut handlers = HandlerRegistry::new();
/// handlers.register("greet", |ctx, input| async move {
///     ctx.step("hello", || async { Ok(input.clone()) }).await?;
///     Ok(())
/// });
/// ```
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler from an async closure.
    pub fn register<F, Fut>(&mut self, name: &str, func: F)
    where
        F: Fn(Context, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.handlers
            .insert(name.to_string(), Arc::new(FnHandler { func }));
    }

    /// Register a type implementing [`Handler`] directly.
    pub fn register_handler<H>(&mut self, name: &str, handler: H)
    where
        H: Handler + 'static,
    {
        self.handlers.insert(name.to_string(), Arc::new(handler));
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    /// Check whether a handler name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Iterator over registered handler names.
    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(|s| s.as_str())
    }
}

/// Wrapper implementing [`Handler`] for async closures.
struct FnHandler<F> {
    func: F,
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Context, Bytes) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, ctx: Context, input: Bytes) -> HandlerFuture {
        Box::pin((self.func)(ctx, input))
    }
}
