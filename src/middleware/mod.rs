//! The middleware type and its combinators.
//!
//! A [`Middleware<E, A>`] is a recipe: given a [`Connection`], asynchronously
//! produce either a value `A` together with the next connection, or a typed
//! failure `E`.
//!
//! ```text
//! Connection ──► Middleware<E, A> ──► Ok((A, Connection'))
//!                                 └─► Err(E)
//! ```
//!
//! Composition threads the connection from step to step. The first failing
//! step ends the chain: later steps never run, and the actions they would have
//! staged never reach the log.
//!
//! ```rust
//! use weft::{Status, middleware::{self, Middleware}};
//!
//! #[derive(Debug)]
//! struct MissingId;
//!
//! let show_user: Middleware<MissingId, ()> =
//!     middleware::decode_param("id", |id| async move {
//!         id.as_str().map(str::to_owned).ok_or(MissingId)
//!     })
//!     .chain(|id| {
//!         middleware::status(Status::Ok)
//!             .then(middleware::send(format!("user {id}")))
//!     });
//! ```

mod decode;
mod respond;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt, TryFutureExt};

use crate::connection::Connection;

pub use self::decode::{
    decode_body, decode_header, decode_method, decode_param, decode_params, decode_query,
};
pub use self::respond::{
    clear_cookie, content_type, cookie, end, header, json, redirect, send, status,
};

/// The future one middleware step resolves to.
pub type Step<E, A> = BoxFuture<'static, Result<(A, Connection), E>>;

type RunFn<E, A> = dyn Fn(Connection) -> Step<E, A> + Send + Sync;

/// A state-threading asynchronous computation over a [`Connection`].
///
/// Cloning is cheap: the recipe is shared, and one value serves any number
/// of exchanges.
pub struct Middleware<E, A> {
    run: Arc<RunFn<E, A>>,
}

impl<E, A> Clone for Middleware<E, A> {
    fn clone(&self) -> Self {
        Self { run: Arc::clone(&self.run) }
    }
}

impl<E, A> Middleware<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Connection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(A, Connection), E>> + Send + 'static,
    {
        Self { run: Arc::new(move |c| f(c).boxed()) }
    }

    /// Runs the computation against `c`.
    pub fn run(&self, c: Connection) -> Step<E, A> {
        (self.run)(c)
    }

    /// Sequences `self` with the middleware `f` builds from its result.
    ///
    /// `f` is never called when `self` fails.
    pub fn chain<B, F>(self, f: F) -> Middleware<E, B>
    where
        B: Send + 'static,
        F: Fn(A) -> Middleware<E, B> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Middleware::new(move |c| {
            let first = self.run(c);
            let f = Arc::clone(&f);
            async move {
                let (a, c) = first.await?;
                f(a).run(c).await
            }
        })
    }

    /// Runs `self`, then `next`, keeping only `next`'s result.
    pub fn then<B>(self, next: Middleware<E, B>) -> Middleware<E, B>
    where
        B: Send + 'static,
    {
        self.chain(move |_| next.clone())
    }

    pub fn map<B, F>(self, f: F) -> Middleware<E, B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Middleware::new(move |c| {
            let f = Arc::clone(&f);
            self.run(c).map_ok(move |(a, c)| (f(a), c))
        })
    }

    pub fn map_err<E2, F>(self, f: F) -> Middleware<E2, A>
    where
        E2: Send + 'static,
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Middleware::new(move |c| {
            let f = Arc::clone(&f);
            self.run(c).map_err(move |e| f(e))
        })
    }
}

// ── Constructors ─────────────────────────────────────────────────────────────

/// Always succeeds with `a`, connection untouched.
pub fn of<E, A>(a: A) -> Middleware<E, A>
where
    E: Send + 'static,
    A: Clone + Send + Sync + 'static,
{
    Middleware::new(move |c| future::ready(Ok((a.clone(), c))))
}

/// Always fails with `e`.
pub fn fail<E, A>(e: E) -> Middleware<E, A>
where
    E: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    Middleware::new(move |_| future::ready(Err(e.clone())))
}

pub fn from_result<E, A>(result: Result<A, E>) -> Middleware<E, A>
where
    E: Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    Middleware::new(move |c| future::ready(result.clone().map(|a| (a, c))))
}

/// Lifts a pure read of the connection.
pub fn gets<E, A, F>(f: F) -> Middleware<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(&Connection) -> A + Send + Sync + 'static,
{
    Middleware::new(move |c| {
        let a = f(&c);
        future::ready(Ok((a, c)))
    })
}

/// Lifts an asynchronous computation keyed on the connection. The connection
/// passes through unchanged.
pub fn from_connection<E, A, F, Fut>(f: F) -> Middleware<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(&Connection) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    Middleware::new(move |c| {
        let fa = f(&c);
        fa.map_ok(move |a| (a, c))
    })
}

/// Replaces the connection with `f(connection)`.
pub fn modify_connection<E, F>(f: F) -> Middleware<E, ()>
where
    E: Send + 'static,
    F: Fn(&Connection) -> Connection + Send + Sync + 'static,
{
    Middleware::new(move |c| future::ready(Ok(((), f(&c)))))
}

// ── Runners ──────────────────────────────────────────────────────────────────

/// Runs `ma` and keeps only its result.
pub fn eval_middleware<E, A>(
    ma: &Middleware<E, A>,
    c: Connection,
) -> impl Future<Output = Result<A, E>> + Send + 'static
where
    E: Send + 'static,
    A: Send + 'static,
{
    ma.run(c).map_ok(|(a, _)| a)
}

/// Runs `ma` and keeps only the final connection.
pub fn exec_middleware<E, A>(
    ma: &Middleware<E, A>,
    c: Connection,
) -> impl Future<Output = Result<Connection, E>> + Send + 'static
where
    E: Send + 'static,
    A: Send + 'static,
{
    ma.run(c).map_ok(|(_, c)| c)
}
