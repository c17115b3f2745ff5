//! Response builders. Each one stages actions on the connection; nothing
//! reaches the client until the adapter replays the log.

use bytes::Bytes;
use futures_util::future::{self, FutureExt};
use http::StatusCode;
use serde::Serialize;

use super::{Middleware, modify_connection};
use crate::cookie::CookieOptions;
use crate::media_type::MediaType;
use crate::status::Status;

pub fn status<E>(status: impl Into<StatusCode>) -> Middleware<E, ()>
where
    E: Send + 'static,
{
    let status = status.into();
    modify_connection(move |c| c.set_status(status))
}

pub fn header<E>(name: impl Into<String>, value: impl Into<String>) -> Middleware<E, ()>
where
    E: Send + 'static,
{
    let (name, value) = (name.into(), value.into());
    modify_connection(move |c| c.set_header(name.clone(), value.clone()))
}

pub fn content_type<E>(media_type: MediaType) -> Middleware<E, ()>
where
    E: Send + 'static,
{
    header("Content-Type", media_type.as_str())
}

pub fn cookie<E>(
    name: impl Into<String>,
    value: impl Into<String>,
    options: CookieOptions,
) -> Middleware<E, ()>
where
    E: Send + 'static,
{
    let (name, value) = (name.into(), value.into());
    modify_connection(move |c| c.set_cookie(name.clone(), value.clone(), options.clone()))
}

pub fn clear_cookie<E>(name: impl Into<String>, options: CookieOptions) -> Middleware<E, ()>
where
    E: Send + 'static,
{
    let name = name.into();
    modify_connection(move |c| c.clear_cookie(name.clone(), options.clone()))
}

/// Terminal: sends `body`.
pub fn send<E>(body: impl Into<Bytes>) -> Middleware<E, ()>
where
    E: Send + 'static,
{
    let body = body.into();
    modify_connection(move |c| c.set_body(body.clone()))
}

/// Terminal: closes the response with no payload.
pub fn end<E>() -> Middleware<E, ()>
where
    E: Send + 'static,
{
    modify_connection(|c| c.end_response())
}

/// Terminal: serialises `body` and sends it as `application/json`.
///
/// Serialisation runs each time the middleware runs. On failure nothing is
/// staged and the chain fails with `on_error(err)`.
pub fn json<E, T, F>(body: T, on_error: F) -> Middleware<E, ()>
where
    E: Send + 'static,
    T: Serialize + Send + Sync + 'static,
    F: Fn(serde_json::Error) -> E + Send + Sync + 'static,
{
    Middleware::new(move |c| match serde_json::to_string(&body) {
        Ok(text) => content_type(MediaType::ApplicationJson).then(send(text)).run(c),
        Err(err) => future::ready(Err(on_error(err))).boxed(),
    })
}

/// `302 Found` with a `Location` header. Does not end the response.
pub fn redirect<E>(uri: impl Into<String>) -> Middleware<E, ()>
where
    E: Send + 'static,
{
    status(Status::Found).then(header("Location", uri))
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::time::Duration;

    use serde::ser::{Error as _, Serializer};

    use super::*;
    use crate::connection::Action;
    use crate::middleware::{exec_middleware, tests::connection};
    use crate::request::Request;

    fn get() -> crate::connection::Connection {
        connection(Request::new(http::Method::GET, "/"))
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialise"))
        }
    }

    #[derive(Debug, PartialEq)]
    struct EncodeFailed(String);

    #[tokio::test]
    async fn redirect_sets_status_then_location() {
        let m = redirect::<Infallible>("/login");
        let c = exec_middleware(&m, get()).await.unwrap();
        assert_eq!(
            c.actions().to_vec(),
            vec![
                Action::SetStatus(StatusCode::FOUND),
                Action::SetHeader { name: "Location".into(), value: "/login".into() },
            ]
        );
        assert!(!c.is_ended());
    }

    #[tokio::test]
    async fn json_sets_content_type_then_body() {
        let m = json(serde_json::json!({ "id": 1 }), |e| EncodeFailed(e.to_string()));
        let c = exec_middleware(&m, get()).await.unwrap();
        assert_eq!(
            c.actions().to_vec(),
            vec![
                Action::SetHeader { name: "Content-Type".into(), value: "application/json".into() },
                Action::SetBody(Bytes::from(r#"{"id":1}"#)),
            ]
        );
        assert!(c.is_ended());
    }

    #[tokio::test]
    async fn json_failure_stages_nothing() {
        let m = status(Status::Created).then(json(Unserializable, |e| EncodeFailed(e.to_string())));
        let err = exec_middleware(&m, get()).await.unwrap_err();
        assert_eq!(err, EncodeFailed("cannot serialise".into()));

        let m = json(Unserializable, |e| EncodeFailed(e.to_string()));
        assert!(exec_middleware(&m, get()).await.is_err());
    }

    #[tokio::test]
    async fn builders_stage_one_action_each() {
        let options = CookieOptions::new().max_age(Duration::from_secs(60));
        let m = status::<Infallible>(Status::Ok)
            .then(header("X-Request-Id", "42"))
            .then(content_type(MediaType::TextPlain))
            .then(cookie("sid", "abc", options.clone()))
            .then(clear_cookie("old", CookieOptions::new()))
            .then(send("hi"))
            .then(end());

        let c = exec_middleware(&m, get()).await.unwrap();
        assert_eq!(
            c.actions().to_vec(),
            vec![
                Action::SetStatus(StatusCode::OK),
                Action::SetHeader { name: "X-Request-Id".into(), value: "42".into() },
                Action::SetHeader { name: "Content-Type".into(), value: "text/plain".into() },
                Action::SetCookie { name: "sid".into(), value: "abc".into(), options },
                Action::ClearCookie { name: "old".into(), options: CookieOptions::new() },
                Action::SetBody(Bytes::from("hi")),
                Action::EndResponse,
            ]
        );
        assert!(c.is_ended());
    }
}
