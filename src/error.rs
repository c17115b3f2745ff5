//! Unified error type.

use std::fmt;

/// Type-erased error passed between host handlers.
///
/// This is what `next(err)` carries: a failing middleware chain converts its
/// own error into a `BoxError` and hands it to the error-handler stack.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by weft's fallible operations.
///
/// Domain failures of a middleware chain live in the chain's own `E`. This
/// type surfaces failures of the host: binding a port, or replaying an action
/// the live response refuses.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Header name or value is not valid HTTP.
    InvalidHeader { name: String },
    /// Cookie name, value or attribute cannot be serialised.
    InvalidCookie { name: String },
    /// A signed cookie was requested but the app has no cookie secret.
    MissingCookieSecret { name: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::InvalidHeader { name } => write!(f, "invalid header `{name}`"),
            Self::InvalidCookie { name } => write!(f, "invalid cookie `{name}`"),
            Self::MissingCookieSecret { name } => {
                write!(f, "cookie `{name}` is signed but no cookie secret is configured")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
