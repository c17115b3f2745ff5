//! Host handler traits and type erasure.
//!
//! A host handler is the plain, non-deferred kind: it receives the live
//! request and response handles and reports how the stack should proceed.
//!
//! ```text
//! (req, res)      -> Next   ← Handler
//! (err, req, res) -> Next   ← ErrorHandler
//!
//! Next::Continue     ≙ next()
//! Next::Error(err)   ≙ next(err)
//! Next::Stop         ≙ not calling next: the exchange is closed
//! ```
//!
//! Both traits are implemented for matching `async` closures, and by the
//! adapters in [`adapter`](crate::adapter) for middleware chains.
//!
//! # How handlers are stored
//!
//! [`App`](crate::App) keeps handlers of different concrete types in one
//! `Vec`, so each is boxed behind `Arc<dyn Handler>`. The runtime cost per
//! layer is one virtual call plus one boxed future.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use crate::connection::{RequestView, ResponseHandle};
use crate::error::BoxError;

/// How the handler stack proceeds after a handler returns.
#[derive(Debug)]
pub enum Next {
    /// Run the next normal handler.
    Continue,
    /// The exchange is closed; run nothing else.
    Stop,
    /// Skip to the next error handler with this error.
    Error(BoxError),
}

pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: Arc<dyn RequestView>, res: ResponseHandle) -> BoxFuture<'static, Next>;
}

pub trait ErrorHandler: Send + Sync + 'static {
    fn handle_error(
        &self,
        err: BoxError,
        req: Arc<dyn RequestView>,
        res: ResponseHandle,
    ) -> BoxFuture<'static, Next>;
}

pub(crate) type BoxedHandler = Arc<dyn Handler>;
pub(crate) type BoxedErrorHandler = Arc<dyn ErrorHandler>;

// ── Blanket implementations ───────────────────────────────────────────────────

/// Any `Fn(req, res) -> impl Future<Output = Next>`.
impl<F, Fut> Handler for F
where
    F: Fn(Arc<dyn RequestView>, ResponseHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Next> + Send + 'static,
{
    fn handle(&self, req: Arc<dyn RequestView>, res: ResponseHandle) -> BoxFuture<'static, Next> {
        self(req, res).boxed()
    }
}

/// Any `Fn(err, req, res) -> impl Future<Output = Next>`.
impl<F, Fut> ErrorHandler for F
where
    F: Fn(BoxError, Arc<dyn RequestView>, ResponseHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Next> + Send + 'static,
{
    fn handle_error(
        &self,
        err: BoxError,
        req: Arc<dyn RequestView>,
        res: ResponseHandle,
    ) -> BoxFuture<'static, Next> {
        self(err, req, res).boxed()
    }
}
