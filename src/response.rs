//! The live response of one exchange.
//!
//! Handlers never build a [`Response`] themselves. The [`App`](crate::App)
//! creates one per exchange, hands it out as a [`ResponseHandle`], and turns
//! it into a hyper response once the handler stack is done.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use time::OffsetDateTime;

use crate::connection::{Action, ResponseSink};
use crate::cookie::{self, CookieOptions};
use crate::error::Error;

/// An outgoing HTTP response, buffered until the exchange is closed.
///
/// Sending twice, or ending after sending, is not an error: the last terminal
/// call decides what goes out. `end` drops any payload sent before it, along
/// with the `Content-Type` that `send` picked for it.
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    finished: bool,
    // Content-Type was filled in by `send`, not set by a handler.
    default_content_type: bool,
    cookie_secret: Option<Arc<str>>,
}

impl Response {
    pub(crate) fn new(cookie_secret: Option<Arc<str>>) -> Self {
        Self { cookie_secret, ..Self::default() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// `true` once `send` or `end` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Replaces whatever was staged with a plain-text reply.
    pub(crate) fn reply(&mut self, status: StatusCode, text: String) {
        self.status = status;
        self.headers.clear();
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        self.body = Bytes::from(text);
        self.finished = true;
        self.default_content_type = false;
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }

    fn cookie_header(
        &self,
        name: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Result<HeaderValue, Error> {
        let secret = self.cookie_secret.as_deref();
        let header = cookie::serialize(name, value, options, secret, OffsetDateTime::now_utc())?;
        HeaderValue::try_from(header).map_err(|_| Error::InvalidCookie { name: name.to_owned() })
    }
}

fn cleared_cookie_header(name: &str, options: &CookieOptions) -> Result<HeaderValue, Error> {
    let options = cookie::expired(options);
    let header = cookie::serialize(name, "", &options, None, OffsetDateTime::now_utc())?;
    HeaderValue::try_from(header).map_err(|_| Error::InvalidCookie { name: name.to_owned() })
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let invalid = || Error::InvalidHeader { name: name.to_owned() };
    let header = HeaderName::try_from(name).map_err(|_| invalid())?;
    let value = HeaderValue::try_from(value).map_err(|_| invalid())?;
    Ok((header, value))
}

impl ResponseSink for Response {
    fn check(&self, action: &Action) -> Result<(), Error> {
        match action {
            Action::SetHeader { name, value } => header_pair(name, value).map(drop),
            Action::SetCookie { name, value, options } => {
                self.cookie_header(name, value, options).map(drop)
            }
            Action::ClearCookie { name, options } => cleared_cookie_header(name, options).map(drop),
            Action::SetStatus(_) | Action::SetBody(_) | Action::EndResponse => Ok(()),
        }
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let (header, value) = header_pair(name, value)?;
        if header == CONTENT_TYPE {
            self.default_content_type = false;
        }
        self.headers.insert(header, value);
        Ok(())
    }

    fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<(), Error> {
        let header = self.cookie_header(name, value, options)?;
        self.headers.append(SET_COOKIE, header);
        Ok(())
    }

    fn clear_cookie(&mut self, name: &str, options: &CookieOptions) -> Result<(), Error> {
        let header = cleared_cookie_header(name, options)?;
        self.headers.append(SET_COOKIE, header);
        Ok(())
    }

    fn send(&mut self, body: Bytes) {
        if !self.headers.contains_key(CONTENT_TYPE) {
            let default = if std::str::from_utf8(&body).is_ok() {
                "text/html; charset=utf-8"
            } else {
                "application/octet-stream"
            };
            self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(default));
            self.default_content_type = true;
        }
        self.body = body;
        self.finished = true;
    }

    fn end(&mut self) {
        if self.default_content_type {
            self.headers.remove(CONTENT_TYPE);
            self.default_content_type = false;
        }
        self.body = Bytes::new();
        self.finished = true;
    }
}
