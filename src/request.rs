//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{Map, Value, map::Entry};

use crate::connection::RequestView;

/// An incoming HTTP request.
///
/// The server keeps the payload as received in [`raw_body`](Request::raw_body)
/// and exposes it as a string body when it is UTF-8 (`Null` when empty or
/// binary). Params start as an empty object; embedders that route or parse
/// bodies set them with [`with_body`](Request::with_body) and
/// [`with_params`](Request::with_params).
pub struct Request {
    method: Method,
    original_url: String,
    headers: HeaderMap,
    raw_body: Bytes,
    body: Value,
    params: Value,
    query: Value,
}

impl Request {
    pub fn new(method: Method, original_url: impl Into<String>) -> Self {
        let original_url = original_url.into();
        let query = parse_query(&original_url);
        Self {
            method,
            original_url,
            headers: HeaderMap::new(),
            raw_body: Bytes::new(),
            body: Value::Null,
            params: Value::Object(Map::new()),
            query,
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let original_url = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());
        let text = match std::str::from_utf8(&body) {
            Ok(text) if !text.is_empty() => Value::String(text.to_owned()),
            _ => Value::Null,
        };
        Self {
            headers: parts.headers,
            raw_body: body,
            body: text,
            ..Self::new(parts.method, original_url)
        }
    }

    /// Appends a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// The path without its query string.
    pub fn path(&self) -> &str {
        self.original_url.split_once('?').map_or(self.original_url.as_str(), |(path, _)| path)
    }
}

impl RequestView for Request {
    fn body(&self) -> Value {
        self.body.clone()
    }

    fn raw_body(&self) -> Bytes {
        self.raw_body.clone()
    }

    // Joined the way node does: `set-cookie` stays a list, `cookie` joins
    // with "; ", everything else with ", ". Bytes are read as Latin-1.
    fn header(&self, name: &str) -> Value {
        let values: Vec<String> = self
            .headers
            .get_all(name)
            .iter()
            .map(|v| v.as_bytes().iter().map(|&b| char::from(b)).collect())
            .collect();

        if values.is_empty() {
            return Value::Null;
        }
        match name.to_ascii_lowercase().as_str() {
            "set-cookie" => Value::Array(values.into_iter().map(Value::String).collect()),
            "cookie" => Value::String(values.join("; ")),
            _ => Value::String(values.join(", ")),
        }
    }

    fn params(&self) -> Value {
        self.params.clone()
    }

    fn query(&self) -> Value {
        self.query.clone()
    }

    fn original_url(&self) -> &str {
        &self.original_url
    }

    fn method(&self) -> &str {
        self.method.as_str()
    }
}

/// Query string as an object; a key seen more than once maps to an array.
fn parse_query(url: &str) -> Value {
    let mut query = Map::new();
    let Some((_, raw)) = url.split_once('?') else {
        return Value::Object(query);
    };

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        let value = Value::String(value.into_owned());
        match query.entry(key.into_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(values) => values.push(value),
                first => {
                    let taken = first.take();
                    *first = Value::Array(vec![taken, value]);
                }
            },
        }
    }

    Value::Object(query)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_repeats_become_arrays() {
        let req = Request::new(Method::GET, "/search?q=rust+lang&page=2&tag=a&tag=b&tag=c");
        assert_eq!(
            req.query(),
            json!({ "q": "rust lang", "page": "2", "tag": ["a", "b", "c"] })
        );
        assert_eq!(req.path(), "/search");
    }

    #[test]
    fn missing_query_is_an_empty_object() {
        let req = Request::new(Method::GET, "/plain");
        assert_eq!(req.query(), json!({}));
        assert_eq!(req.params(), json!({}));
        assert_eq!(req.body(), Value::Null);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::GET, "/").with_header("Content-Type", "text/csv");
        assert_eq!(req.header("content-type"), json!("text/csv"));
        assert_eq!(req.header("CONTENT-TYPE"), json!("text/csv"));
        assert_eq!(req.header("accept"), Value::Null);
    }

    #[test]
    fn parts_carry_url_headers_and_raw_body() {
        let (parts, ()) = http::Request::builder()
            .method(Method::PUT)
            .uri("http://example.com/items/1?dry=1")
            .header("x-trace", "t1")
            .body(())
            .unwrap()
            .into_parts();
        let req = Request::from_parts(parts, Bytes::from_static(b"{\"a\":1}"));

        assert_eq!(req.method(), "PUT");
        assert_eq!(req.original_url(), "/items/1?dry=1");
        assert_eq!(req.query(), json!({ "dry": "1" }));
        assert_eq!(req.header("X-Trace"), json!("t1"));
        assert_eq!(req.body(), json!("{\"a\":1}"));
        assert_eq!(req.raw_body(), &Bytes::from_static(b"{\"a\":1}"));
    }

    #[test]
    fn binary_body_stays_raw() {
        let (parts, ()) = http::Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .body(())
            .unwrap()
            .into_parts();
        let payload = Bytes::from_static(&[0xff, 0x00, 0xfe]);
        let req = Request::from_parts(parts, payload.clone());

        assert_eq!(req.body(), Value::Null);
        assert_eq!(RequestView::raw_body(&req), payload);
    }

    #[test]
    fn repeated_headers_are_joined() {
        let req = Request::new(Method::GET, "/")
            .with_header("Accept", "text/html")
            .with_header("accept", "application/json")
            .with_header("Cookie", "a=1")
            .with_header("Cookie", "b=2")
            .with_header("Set-Cookie", "x=1")
            .with_header("Set-Cookie", "y=2");

        assert_eq!(req.header("accept"), json!("text/html, application/json"));
        assert_eq!(req.header("cookie"), json!("a=1; b=2"));
        assert_eq!(req.header("set-cookie"), json!(["x=1", "y=2"]));
    }

    #[test]
    fn header_bytes_read_as_latin1() {
        let mut req = Request::new(Method::GET, "/");
        req.headers.insert("x-name", HeaderValue::from_bytes(b"caf\xe9").unwrap());
        assert_eq!(req.header("x-name"), json!("café"));
    }
}
