//! The handler stack.
//!
//! No routing: every exchange walks the whole stack in registration order.
//! Normal handlers run while no error is pending; error handlers run only
//! while one is.
//!
//! ```text
//! handler ─Continue─► handler ─Error(e)─► (handler skipped) ─► error_handler(e) ─Stop─► done
//! ```
//!
//! Falling off the end with an error pending answers `500`; falling off the
//! end with nothing sent answers `404`.

use std::sync::Arc;

use http::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::connection::{RequestView, ResponseHandle};
use crate::error::BoxError;
use crate::handler::{BoxedErrorHandler, BoxedHandler, ErrorHandler, Handler, Next};
use crate::request::Request;
use crate::response::Response;

enum Layer {
    Handler(BoxedHandler),
    ErrorHandler(BoxedErrorHandler),
}

/// The application: an ordered stack of handlers and error handlers.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
///
/// ```rust
/// use weft::{App, BoxError, Status, adapter, middleware};
///
/// let app = App::new()
///     .handler(adapter::to_request_handler(
///         middleware::header::<BoxError>("X-Powered-By", "weft"),
///     ))
///     .handler(adapter::to_request_handler(
///         middleware::status::<BoxError>(Status::Ok).then(middleware::send("hello")),
///     ))
///     .error_handler(adapter::to_error_request_handler(|err: BoxError| {
///         middleware::status::<BoxError>(Status::ServerError).then(middleware::send(err.to_string()))
///     }));
/// ```
#[derive(Default)]
pub struct App {
    layers: Vec<Layer>,
    cookie_secret: Option<Arc<str>>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(mut self, handler: impl Handler) -> Self {
        self.layers.push(Layer::Handler(Arc::new(handler)));
        self
    }

    pub fn error_handler(mut self, handler: impl ErrorHandler) -> Self {
        self.layers.push(Layer::ErrorHandler(Arc::new(handler)));
        self
    }

    /// Secret used to sign cookies set with `CookieOptions::signed`.
    pub fn cookie_secret(mut self, secret: impl Into<String>) -> Self {
        self.cookie_secret = Some(Arc::from(secret.into()));
        self
    }

    /// Runs one exchange through the stack and returns the final response.
    pub async fn handle(&self, req: Request) -> Response {
        let method = req.method().to_owned();
        let path = req.path().to_owned();

        let req: Arc<dyn RequestView> = Arc::new(req);
        let response = Arc::new(Mutex::new(Response::new(self.cookie_secret.clone())));
        let res: ResponseHandle = response.clone();

        let mut pending: Option<BoxError> = None;
        let mut stopped = false;

        for layer in &self.layers {
            let next = match (layer, pending.take()) {
                (Layer::Handler(h), None) => h.handle(Arc::clone(&req), Arc::clone(&res)).await,
                (Layer::ErrorHandler(h), Some(err)) => {
                    h.handle_error(err, Arc::clone(&req), Arc::clone(&res)).await
                }
                (_, err) => {
                    pending = err;
                    continue;
                }
            };

            match next {
                Next::Continue => {}
                Next::Error(err) => pending = Some(err),
                Next::Stop => {
                    stopped = true;
                    break;
                }
            }
        }

        let mut response = std::mem::take(&mut *response.lock().await);

        if !stopped {
            match pending {
                Some(err) => {
                    warn!(%method, %path, "unhandled error: {err}");
                    if !response.is_finished() {
                        response.reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_owned());
                    }
                }
                None if !response.is_finished() => {
                    response.reply(StatusCode::NOT_FOUND, format!("Cannot {method} {path}"));
                }
                None => {}
            }
        }

        debug!(%method, %path, status = response.status().as_u16(), "exchange complete");
        response
    }
}
