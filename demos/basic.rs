//! Minimal weft example: a session cookie, a JSON endpoint, a redirect, and
//! an error handler that turns chain failures into responses.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/?name=alice
//!   curl -i http://localhost:3000/old
//!   curl -i -X DELETE http://localhost:3000/

use std::fmt;
use std::future::ready;
use std::time::Duration;

use serde::Serialize;
use weft::{
    App, BoxError, Connection, CookieOptions, MediaType, Middleware, SameSite, Server, Status,
    adapter, middleware,
};

#[derive(Debug)]
enum AppError {
    MethodNotAllowed(String),
    Encode(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MethodNotAllowed(m) => write!(f, "method {m} not allowed"),
            Self::Encode(e) => write!(f, "cannot encode response: {e}"),
        }
    }
}

impl std::error::Error for AppError {}

#[derive(Serialize)]
struct Greeting {
    hello: String,
    visits: u64,
}

#[tokio::main]
async fn main() -> Result<(), weft::Error> {
    tracing_subscriber::fmt::init();

    let app = App::new()
        .cookie_secret("change-me")
        .handler(adapter::to_request_handler(only_get()))
        .handler(adapter::to_request_handler(redirect_old()))
        .handler(adapter::to_request_handler(greet()))
        .error_handler(adapter::to_error_request_handler(report));

    Server::bind("0.0.0.0:3000").serve(app).await
}

// Anything but GET fails the chain; the error handler answers.
fn only_get() -> Middleware<AppError, ()> {
    middleware::decode_method(|method| {
        ready(if method == "GET" { Ok(()) } else { Err(AppError::MethodNotAllowed(method)) })
    })
}

// GET /old → 302 /. Other paths fall through to the next handler.
fn redirect_old() -> Middleware<AppError, ()> {
    middleware::gets(|c: &Connection| c.original_url().starts_with("/old")).chain(|old| {
        if old {
            middleware::redirect("/").then(middleware::end())
        } else {
            middleware::of(())
        }
    })
}

fn greet() -> Middleware<AppError, ()> {
    let visits = middleware::decode_header("x-visits", |v| {
        ready(Ok(v.as_str().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0) + 1))
    });
    let name = middleware::decode_query(|q| {
        ready(Ok(q["name"].as_str().unwrap_or("world").to_owned()))
    });

    visits.chain(move |visits| {
        name.clone().chain(move |hello| {
            let session = CookieOptions::new()
                .http_only(true)
                .signed(true)
                .same_site(SameSite::Lax)
                .max_age(Duration::from_secs(3600));
            middleware::cookie("session", hello.clone(), session)
                .then(middleware::status(Status::Ok))
                .then(middleware::json(Greeting { hello, visits }, AppError::Encode))
        })
    })
}

fn report(err: BoxError) -> Middleware<BoxError, ()> {
    let status = match err.downcast_ref::<AppError>() {
        Some(AppError::MethodNotAllowed(_)) => Status::MethodNotAllowed,
        _ => Status::ServerError,
    };
    middleware::status(status)
        .then(middleware::content_type(MediaType::TextPlain))
        .then(middleware::send(err.to_string()))
}
