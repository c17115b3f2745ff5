//! # weft
//!
//! Deferred, state-threading HTTP middleware over hyper.
//!
//! A handler written with weft does not poke at a response. It describes what
//! should happen to the exchange, as a [`Middleware<E, A>`]: a function from
//! an immutable [`Connection`] to a future of either a typed failure `E` or a
//! value `A` plus the next connection. Response mutations pile up in the
//! connection's action log and reach the client only when the chain has
//! succeeded, in the order they were issued.
//!
//! ## The pieces
//!
//! - [`Connection`]: request view, pending [`Action`]s, terminal flag.
//! - [`Middleware`] and the combinators in [`middleware`]: `chain`, `gets`,
//!   `from_connection`, decoders, response builders.
//! - [`adapter`]: runs a chain as a host handler, replays its log, and lifts
//!   plain handlers into chains.
//! - [`App`] and [`Server`]: the host. A stack of handlers and error
//!   handlers on hyper, with graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use weft::{App, BoxError, Server, Status, adapter, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), weft::Error> {
//!     let greet = middleware::decode_query::<BoxError, _, _, _>(|query| async move {
//!         Ok(query["name"].as_str().unwrap_or("world").to_owned())
//!     })
//!     .chain(|name| {
//!         middleware::status(Status::Ok)
//!             .then(middleware::json(json!({ "hello": name }), BoxError::from))
//!     });
//!
//!     let app = App::new()
//!         .handler(adapter::to_request_handler(greet))
//!         .error_handler(adapter::to_error_request_handler(|err: BoxError| {
//!             middleware::status::<BoxError>(Status::BadRequest)
//!                 .then(middleware::send(err.to_string()))
//!         }));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//! ```

mod app;
mod connection;
mod cookie;
mod error;
mod handler;
mod media_type;
mod request;
mod response;
mod server;
mod status;

pub mod adapter;
pub mod middleware;

pub use app::App;
pub use connection::{Action, ActionLog, Connection, RequestView, ResponseHandle, ResponseSink};
pub use cookie::{CookieOptions, SameSite};
pub use error::{BoxError, Error};
pub use handler::{ErrorHandler, Handler, Next};
pub use media_type::MediaType;
pub use middleware::Middleware;
pub use request::Request;
pub use response::Response;
pub use server::Server;
pub use status::Status;
