//! Decoders: pull one untyped field out of the request and hand it to a
//! caller-supplied function that turns it into something typed, or fails.

use std::future::Future;

use serde_json::Value;

use super::{Middleware, from_connection};

pub fn decode_header<E, A, F, Fut>(name: impl Into<String>, f: F) -> Middleware<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    let name = name.into();
    from_connection(move |c| f(c.header(&name)))
}

pub fn decode_method<E, A, F, Fut>(f: F) -> Middleware<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    from_connection(move |c| f(c.method().to_owned()))
}

pub fn decode_body<E, A, F, Fut>(f: F) -> Middleware<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    from_connection(move |c| f(c.body()))
}

pub fn decode_query<E, A, F, Fut>(f: F) -> Middleware<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    from_connection(move |c| f(c.query()))
}

pub fn decode_params<E, A, F, Fut>(f: F) -> Middleware<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    from_connection(move |c| f(c.params()))
}

/// Decodes a single path parameter.
///
/// When the params are not an object, or lack `name`, the decoder receives
/// `Value::Null` and decides for itself whether that is an error.
pub fn decode_param<E, A, F, Fut>(name: impl Into<String>, f: F) -> Middleware<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    let name = name.into();
    from_connection(move |c| {
        let param = match c.params() {
            Value::Object(mut params) => params.remove(&name).unwrap_or(Value::Null),
            _ => Value::Null,
        };
        f(param)
    })
}
