//! Middleware pipeline.
//!
//! A middleware receives the request together with a [`Next`] continuation.
//! It may change the request, call `next.run(request)` to continue towards
//! the transport, and change the response on the way back. It can also skip
//! `next` entirely and fabricate a response.
//!
//! Layers are kept in registration order. The most recently added layer is
//! the outermost one: its pre-request code runs first and its post-response
//! code runs last.
//!
//! ```text
//! add(a); add(b); add(c);
//!
//! request  → c → b → a → terminal
//! response ← c ← b ← a ←
//! ```
use std::fmt;
use std::sync::Arc;

use crate::errors::HttpError;
use crate::request::Request;
use crate::response::Response;

/// The innermost step of a pipeline (usually "send through the transport").
pub type Terminal<'a> = dyn Fn(Request) -> Result<Response, HttpError> + 'a;

/// A layer wrapping request dispatch.
pub trait Middleware: Send + Sync {
    fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, HttpError>;
}

impl<F> Middleware for F
where
    F: Fn(Request, Next<'_>) -> Result<Response, HttpError> + Send + Sync,
{
    fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, HttpError> {
        self(request, next)
    }
}

/// The rest of the pipeline, as seen from one layer.
///
/// `run` consumes the continuation, so a layer can forward a request at most once.
pub struct Next<'a> {
    layers: &'a [Arc<dyn Middleware>],
    terminal: &'a Terminal<'a>,
}

impl<'a> Next<'a> {
    pub fn run(self, request: Request) -> Result<Response, HttpError> {
        match self.layers.split_last() {
            Some((outer, inner)) => outer.handle(
                request,
                Next {
                    layers: inner,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(request),
        }
    }

    /// Number of layers still ahead of the terminal step.
    pub fn remaining(&self) -> usize {
        self.layers.len()
    }
}

/// Ordered list of middleware layers.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer around all layers added so far.
    pub fn push(&mut self, middleware: impl Middleware + 'static) {
        self.layers.push(Arc::new(middleware));
    }

    pub fn push_shared(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Runs `request` through every layer and finally through `terminal`.
    pub fn dispatch(&self, request: Request, terminal: &Terminal<'_>) -> Result<Response, HttpError> {
        Next {
            layers: &self.layers,
            terminal,
        }
        .run(request)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("layers", &self.layers.len())
            .finish()
    }
}
