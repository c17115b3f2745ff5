//! The immutable connection threaded through a middleware chain.
//!
//! A [`Connection`] never touches the live response. Every mutator returns a
//! new value with one more [`Action`] in its log; the adapter replays that log
//! against a [`ResponseSink`] once the chain has finished.
//!
//! ```text
//! Connection { log: [] }
//!     .set_status(302)              → { log: [SetStatus] }
//!     .set_header("Location", "/")  → { log: [SetStatus, SetHeader] }
//!     .end_response()               → { log: [.., EndResponse], ended }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::cookie::CookieOptions;
use crate::error::Error;

// ── Capabilities ─────────────────────────────────────────────────────────────

/// Read access to the incoming request.
///
/// Every payload is an untyped [`Value`]; turning it into something useful is
/// left to the decoder the caller supplies. `Value::Null` stands for "absent".
pub trait RequestView: Send + Sync + 'static {
    fn body(&self) -> Value;
    /// The payload exactly as received. Empty unless the host keeps it.
    fn raw_body(&self) -> Bytes {
        Bytes::new()
    }
    /// Case-insensitive. `Value::Null` when the header is missing; repeated
    /// headers are joined into one string.
    fn header(&self, name: &str) -> Value;
    fn params(&self) -> Value;
    fn query(&self) -> Value;
    fn original_url(&self) -> &str;
    fn method(&self) -> &str;
}

/// Write access to the live response. Only the adapter's replay calls this.
///
/// [`check`](ResponseSink::check) must accept exactly the actions the
/// setters would accept: replay checks the whole log first and applies it
/// only when nothing is rejected.
pub trait ResponseSink: Send {
    /// Whether `action` would be applied, without applying it.
    fn check(&self, action: &Action) -> Result<(), Error> {
        let _ = action;
        Ok(())
    }
    fn set_status(&mut self, status: StatusCode);
    fn set_header(&mut self, name: &str, value: &str) -> Result<(), Error>;
    fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<(), Error>;
    fn clear_cookie(&mut self, name: &str, options: &CookieOptions) -> Result<(), Error>;
    /// Sends `body` and finishes the response.
    fn send(&mut self, body: Bytes);
    /// Finishes the response without a payload.
    fn end(&mut self);
}

/// Shared handle to the live response of one exchange.
pub type ResponseHandle = Arc<Mutex<dyn ResponseSink>>;

// ── Actions ──────────────────────────────────────────────────────────────────

/// One deferred response mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    SetBody(Bytes),
    EndResponse,
    SetStatus(StatusCode),
    SetHeader { name: String, value: String },
    ClearCookie { name: String, options: CookieOptions },
    SetCookie { name: String, value: String, options: CookieOptions },
}

/// Persistent, append-only log of [`Action`]s.
///
/// Internally a shared cons list: pushing is O(1) and never copies, so every
/// intermediate [`Connection`] keeps its own view of the log. Iteration yields
/// actions in the order they were issued.
#[derive(Clone, Default)]
pub struct ActionLog {
    head: Option<Arc<Node>>,
    len: usize,
}

struct Node {
    action: Action,
    next: Option<Arc<Node>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a new log with `action` after every existing one.
    pub fn push(&self, action: Action) -> Self {
        let node = Node { action, next: self.head.clone() };
        Self { head: Some(Arc::new(node)), len: self.len + 1 }
    }

    /// Actions in issue order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        let mut newest_first = Vec::with_capacity(self.len);
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            newest_first.push(&node.action);
            cursor = node.next.as_deref();
        }
        newest_first.into_iter().rev()
    }

    pub fn to_vec(&self) -> Vec<Action> {
        self.iter().cloned().collect()
    }
}

impl std::fmt::Debug for ActionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// Unlink iteratively; the default recursive drop overflows on long logs.
impl Drop for ActionLog {
    fn drop(&mut self) {
        let mut cursor = self.head.take();
        while let Some(node) = cursor {
            cursor = match Arc::try_unwrap(node) {
                Ok(mut node) => node.next.take(),
                Err(_) => break,
            };
        }
    }
}

// ── Connection ───────────────────────────────────────────────────────────────

/// Immutable snapshot of one exchange: request view, response handle, the
/// pending action log and the terminal flag.
///
/// Once [`set_body`](Connection::set_body) or
/// [`end_response`](Connection::end_response) has been issued the connection
/// is terminal and stays so. Issuing both, or either twice, is allowed: every
/// action is replayed and the last terminal one wins.
#[derive(Clone)]
pub struct Connection {
    request: Arc<dyn RequestView>,
    response: ResponseHandle,
    actions: ActionLog,
    ended: bool,
}

impl Connection {
    pub fn new(request: Arc<dyn RequestView>, response: ResponseHandle) -> Self {
        Self { request, response, actions: ActionLog::new(), ended: false }
    }

    pub fn request(&self) -> &Arc<dyn RequestView> {
        &self.request
    }

    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    pub fn actions(&self) -> &ActionLog {
        &self.actions
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn body(&self) -> Value {
        self.request.body()
    }

    pub fn raw_body(&self) -> Bytes {
        self.request.raw_body()
    }

    pub fn header(&self, name: &str) -> Value {
        self.request.header(name)
    }

    pub fn params(&self) -> Value {
        self.request.params()
    }

    pub fn query(&self) -> Value {
        self.request.query()
    }

    pub fn original_url(&self) -> &str {
        self.request.original_url()
    }

    pub fn method(&self) -> &str {
        self.request.method()
    }

    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Action::SetHeader { name: name.into(), value: value.into() }, false)
    }

    pub fn set_status(&self, status: impl Into<StatusCode>) -> Self {
        self.push(Action::SetStatus(status.into()), false)
    }

    pub fn set_cookie(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
        options: CookieOptions,
    ) -> Self {
        let action = Action::SetCookie { name: name.into(), value: value.into(), options };
        self.push(action, false)
    }

    pub fn clear_cookie(&self, name: impl Into<String>, options: CookieOptions) -> Self {
        self.push(Action::ClearCookie { name: name.into(), options }, false)
    }

    /// Terminal: sends `body` as the response payload.
    pub fn set_body(&self, body: impl Into<Bytes>) -> Self {
        self.push(Action::SetBody(body.into()), true)
    }

    /// Terminal: closes the response with no payload.
    pub fn end_response(&self) -> Self {
        self.push(Action::EndResponse, true)
    }

    /// Terminal without an action: something outside the log already closed
    /// the exchange.
    pub(crate) fn mark_ended(self) -> Self {
        Self { ended: true, ..self }
    }

    fn push(&self, action: Action, terminal: bool) -> Self {
        Self {
            request: Arc::clone(&self.request),
            response: Arc::clone(&self.response),
            actions: self.actions.push(action),
            ended: self.ended || terminal,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("method", &self.method())
            .field("original_url", &self.original_url())
            .field("actions", &self.actions)
            .field("ended", &self.ended)
            .finish()
    }
}
