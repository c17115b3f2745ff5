//! The status codes middleware reaches for most often.
//!
//! Anything accepting a status takes `impl Into<StatusCode>`, so a raw
//! [`http::StatusCode`] works too when the code you need is not listed here.
//!
//! ```rust
//! use weft::{Status, middleware::status};
//!
//! let created = status::<std::convert::Infallible>(Status::Created);
//! let teapot = status::<std::convert::Infallible>(http::StatusCode::IM_A_TEAPOT);
//! ```

use http::StatusCode;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,               // 200
    Created,          // 201

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    Found,            // 302

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,       // 400
    Unauthorized,     // 401
    Forbidden,        // 403
    NotFound,         // 404
    MethodNotAllowed, // 405
    NotAcceptable,    // 406

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    ServerError,      // 500
}

impl From<Status> for StatusCode {
    fn from(s: Status) -> StatusCode {
        match s {
            Status::Ok               => StatusCode::OK,
            Status::Created          => StatusCode::CREATED,
            Status::Found            => StatusCode::FOUND,
            Status::BadRequest       => StatusCode::BAD_REQUEST,
            Status::Unauthorized     => StatusCode::UNAUTHORIZED,
            Status::Forbidden        => StatusCode::FORBIDDEN,
            Status::NotFound         => StatusCode::NOT_FOUND,
            Status::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Status::NotAcceptable    => StatusCode::NOT_ACCEPTABLE,
            Status::ServerError      => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        StatusCode::from(s).as_u16()
    }
}
