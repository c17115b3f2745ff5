//! Bridges between middleware chains and the host handler stack.
//!
//! ```text
//! Request ─► Connection::new ─► middleware ─┬─ Err(e)  ─► Next::Error(e)        (no replay)
//!                                            └─ Ok(c)   ─► replay(c.actions())
//!                                                          ├─ ended  ─► Next::Stop
//!                                                          └─ open   ─► Next::Continue
//! ```
//!
//! Replay only starts after the middleware future has resolved, and runs to
//! completion under the response lock. Dropping the handler future before
//! then leaves the response untouched and yields no [`Next`] at all.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::connection::{Action, ActionLog, Connection, RequestView, ResponseHandle, ResponseSink};
use crate::error::{BoxError, Error};
use crate::handler::{ErrorHandler, Handler, Next};
use crate::middleware::{Middleware, exec_middleware};

/// Applies every action to `sink`, oldest first, one sink call per action.
///
/// All or nothing: every action goes through [`ResponseSink::check`] first,
/// and if any is rejected the sink is left untouched.
pub fn replay(actions: &ActionLog, sink: &mut dyn ResponseSink) -> Result<(), Error> {
    let actions: Vec<&Action> = actions.iter().collect();
    for action in &actions {
        sink.check(action)?;
    }

    for action in actions {
        match action {
            Action::SetHeader { name, value } => sink.set_header(name, value)?,
            Action::SetStatus(status) => sink.set_status(*status),
            Action::SetCookie { name, value, options } => sink.set_cookie(name, value, options)?,
            Action::ClearCookie { name, options } => sink.clear_cookie(name, options)?,
            Action::SetBody(body) => sink.send(body.clone()),
            Action::EndResponse => sink.end(),
        }
    }
    Ok(())
}

async fn exec<E>(middleware: &Middleware<E, ()>, req: Arc<dyn RequestView>, res: ResponseHandle) -> Next
where
    E: Into<BoxError> + Send + 'static,
{
    let conn = Connection::new(req, Arc::clone(&res));
    let conn = match exec_middleware(middleware, conn).await {
        Ok(conn) => conn,
        Err(e) => return Next::Error(e.into()),
    };

    debug!(
        method = conn.method(),
        url = conn.original_url(),
        actions = conn.actions().len(),
        ended = conn.is_ended(),
        "replaying action log"
    );

    let mut sink = res.lock().await;
    if let Err(e) = replay(conn.actions(), &mut *sink) {
        warn!(url = conn.original_url(), "replay failed: {e}");
        return Next::Error(e.into());
    }

    if conn.is_ended() { Next::Stop } else { Next::Continue }
}

// ── Middleware → host ────────────────────────────────────────────────────────

/// Host handler running a middleware chain. Built by [`to_request_handler`].
pub struct MiddlewareHandler<E> {
    middleware: Middleware<E, ()>,
}

impl<E> Handler for MiddlewareHandler<E>
where
    E: Into<BoxError> + Send + 'static,
{
    fn handle(&self, req: Arc<dyn RequestView>, res: ResponseHandle) -> BoxFuture<'static, Next> {
        let middleware = self.middleware.clone();
        async move { exec(&middleware, req, res).await }.boxed()
    }
}

/// Host error handler building its chain from the pending error. Built by
/// [`to_error_request_handler`].
pub struct ErrorMiddlewareHandler<F> {
    f: F,
}

impl<F, E> ErrorHandler for ErrorMiddlewareHandler<F>
where
    F: Fn(BoxError) -> Middleware<E, ()> + Send + Sync + 'static,
    E: Into<BoxError> + Send + 'static,
{
    fn handle_error(
        &self,
        err: BoxError,
        req: Arc<dyn RequestView>,
        res: ResponseHandle,
    ) -> BoxFuture<'static, Next> {
        let middleware = (self.f)(err);
        async move { exec(&middleware, req, res).await }.boxed()
    }
}

/// Runs `middleware` as a normal handler.
///
/// A failed chain replays nothing and forwards its error to the error
/// handlers. A successful one replays its log, then continues the stack
/// unless the response was ended.
pub fn to_request_handler<E>(middleware: Middleware<E, ()>) -> MiddlewareHandler<E>
where
    E: Into<BoxError> + Send + 'static,
{
    MiddlewareHandler { middleware }
}

/// Runs the chain `f` builds from the pending error, as an error handler.
pub fn to_error_request_handler<F, E>(f: F) -> ErrorMiddlewareHandler<F>
where
    F: Fn(BoxError) -> Middleware<E, ()> + Send + Sync + 'static,
    E: Into<BoxError> + Send + 'static,
{
    ErrorMiddlewareHandler { f }
}

// ── Host → middleware ────────────────────────────────────────────────────────

/// Lifts a plain host handler into a middleware.
///
/// The handler writes to the live response directly, outside the action log.
/// The middleware resolves with `f(request)` once the handler is done:
///
/// - `Next::Continue` leaves the connection as it was;
/// - `Next::Stop` marks it ended, since the handler closed the exchange;
/// - `Next::Error(err)` fails the middleware with `E::from(err)`.
pub fn from_request_handler<H, E, A, F>(handler: H, f: F) -> Middleware<E, A>
where
    H: Handler,
    E: From<BoxError> + Send + 'static,
    A: Send + 'static,
    F: Fn(&dyn RequestView) -> A + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let f = Arc::new(f);
    Middleware::new(move |c: Connection| {
        let done = handler.handle(Arc::clone(c.request()), Arc::clone(c.response()));
        let f = Arc::clone(&f);
        async move {
            match done.await {
                Next::Continue => Ok((f(c.request().as_ref()), c)),
                Next::Stop => Ok((f(c.request().as_ref()), c.mark_ended())),
                Next::Error(err) => Err(E::from(err)),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use http::StatusCode;
    use tokio::sync::Mutex;

    use super::*;
    use crate::cookie::CookieOptions;
    use crate::middleware::{self, from_connection};
    use crate::request::Request;

    /// Records each sink call instead of applying it.
    #[derive(Debug, Default, PartialEq)]
    struct Recorder {
        effects: Vec<String>,
    }

    impl ResponseSink for Recorder {
        fn check(&self, action: &Action) -> Result<(), Error> {
            match action {
                Action::SetHeader { name, .. } if name.is_empty() => {
                    Err(Error::InvalidHeader { name: name.clone() })
                }
                _ => Ok(()),
            }
        }

        fn set_status(&mut self, status: StatusCode) {
            self.effects.push(format!("status {}", status.as_u16()));
        }

        fn set_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
            if name.is_empty() {
                return Err(Error::InvalidHeader { name: name.to_owned() });
            }
            self.effects.push(format!("header {name}: {value}"));
            Ok(())
        }

        fn set_cookie(&mut self, name: &str, value: &str, _: &CookieOptions) -> Result<(), Error> {
            self.effects.push(format!("cookie {name}={value}"));
            Ok(())
        }

        fn clear_cookie(&mut self, name: &str, _: &CookieOptions) -> Result<(), Error> {
            self.effects.push(format!("clear {name}"));
            Ok(())
        }

        fn send(&mut self, body: Bytes) {
            self.effects.push(format!("send {}", String::from_utf8_lossy(&body)));
        }

        fn end(&mut self) {
            self.effects.push("end".to_owned());
        }
    }

    fn exchange(url: &str) -> (Arc<dyn RequestView>, Arc<Mutex<Recorder>>, ResponseHandle) {
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        let handle: ResponseHandle = recorder.clone();
        (Arc::new(Request::new(http::Method::GET, url)), recorder, handle)
    }

    async fn effects(recorder: &Arc<Mutex<Recorder>>) -> Vec<String> {
        recorder.lock().await.effects.clone()
    }

    #[test]
    fn replay_applies_one_effect_per_action_in_order() {
        let log = ActionLog::new()
            .push(Action::SetStatus(StatusCode::CREATED))
            .push(Action::SetHeader { name: "X-A".into(), value: "1".into() })
            .push(Action::SetCookie {
                name: "sid".into(),
                value: "v".into(),
                options: CookieOptions::new(),
            })
            .push(Action::ClearCookie { name: "old".into(), options: CookieOptions::new() })
            .push(Action::SetBody(Bytes::from("body")))
            .push(Action::EndResponse);

        let mut sink = Recorder::default();
        replay(&log, &mut sink).unwrap();
        assert_eq!(
            sink.effects,
            ["status 201", "header X-A: 1", "cookie sid=v", "clear old", "send body", "end"]
        );
    }

    #[test]
    fn rejected_action_leaves_the_sink_untouched() {
        let log = ActionLog::new()
            .push(Action::SetStatus(StatusCode::OK))
            .push(Action::SetHeader { name: String::new(), value: "x".into() })
            .push(Action::EndResponse);

        let mut sink = Recorder::default();
        assert!(replay(&log, &mut sink).is_err());
        assert!(sink.effects.is_empty());
    }

    #[tokio::test]
    async fn rejected_replay_reports_an_error_without_effects() {
        let (req, recorder, res) = exchange("/");
        let m = middleware::header::<BoxError>("X-Early", "1")
            .then(middleware::header("", "x"))
            .then(middleware::send("ok"));

        match to_request_handler(m).handle(req, res).await {
            Next::Error(err) => assert_eq!(err.to_string(), "invalid header ``"),
            other => panic!("expected an error, got {other:?}"),
        }
        assert!(effects(&recorder).await.is_empty());
    }

    #[tokio::test]
    async fn open_connection_continues_the_stack() {
        let (req, recorder, res) = exchange("/");
        let handler = to_request_handler(middleware::header::<BoxError>("X-Seen", "1"));

        assert!(matches!(handler.handle(req, res).await, Next::Continue));
        assert_eq!(effects(&recorder).await, ["header X-Seen: 1"]);
    }

    #[tokio::test]
    async fn ended_connection_stops_the_stack() {
        let (req, recorder, res) = exchange("/");
        let m = middleware::status::<BoxError>(StatusCode::OK).then(middleware::send("done"));

        assert!(matches!(to_request_handler(m).handle(req, res).await, Next::Stop));
        assert_eq!(effects(&recorder).await, ["status 200", "send done"]);
    }

    #[tokio::test]
    async fn failure_replays_nothing() {
        let (req, recorder, res) = exchange("/");
        let m = middleware::header::<&str>("X-Staged", "1").then(middleware::fail("denied"));

        match to_request_handler(m).handle(req, res).await {
            Next::Error(err) => assert_eq!(err.to_string(), "denied"),
            other => panic!("expected an error, got {other:?}"),
        }
        assert!(effects(&recorder).await.is_empty());
    }

    #[tokio::test]
    async fn error_handler_builds_its_chain_from_the_error() {
        let (req, recorder, res) = exchange("/");
        let handler = to_error_request_handler(|err: BoxError| {
            middleware::status::<BoxError>(StatusCode::BAD_REQUEST)
                .then(middleware::send(err.to_string()))
        });

        let next = handler.handle_error("bad input".into(), req, res).await;
        assert!(matches!(next, Next::Stop));
        assert_eq!(effects(&recorder).await, ["status 400", "send bad input"]);
    }

    #[tokio::test]
    async fn cancelled_chain_replays_nothing() {
        let (req, recorder, res) = exchange("/");
        let slow = middleware::header::<BoxError>("X-Early", "1")
            .then(from_connection(|_: &Connection| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, BoxError>(())
            }))
            .then(middleware::end());

        let outcome =
            tokio::time::timeout(Duration::from_millis(20), to_request_handler(slow).handle(req, res))
                .await;
        assert!(outcome.is_err());
        assert!(effects(&recorder).await.is_empty());
    }

    #[tokio::test]
    async fn lifted_handler_writes_live_and_resolves() {
        let (req, recorder, res) = exchange("/legacy");
        let legacy = |_: Arc<dyn RequestView>, res: ResponseHandle| async move {
            res.lock().await.set_status(StatusCode::ACCEPTED);
            Next::Continue
        };
        let m = from_request_handler::<_, BoxError, _, _>(legacy, |req| req.original_url().to_owned())
            .chain(|url| middleware::header("X-From", url));

        let handler = to_request_handler(m);
        assert!(matches!(handler.handle(req, res).await, Next::Continue));
        assert_eq!(effects(&recorder).await, ["status 202", "header X-From: /legacy"]);
    }

    #[tokio::test]
    async fn lifted_handler_outcomes_map_onto_the_chain() {
        let stopper = |_: Arc<dyn RequestView>, _: ResponseHandle| async { Next::Stop };
        let m = from_request_handler::<_, BoxError, _, _>(stopper, |_| ());
        let (req, _, res) = exchange("/");
        let c = exec_middleware(&m, Connection::new(req, res)).await.unwrap();
        assert!(c.is_ended());
        assert!(c.actions().is_empty());

        let failer =
            |_: Arc<dyn RequestView>, _: ResponseHandle| async { Next::Error("legacy broke".into()) };
        let m = from_request_handler::<_, BoxError, _, _>(failer, |_| ());
        let (req, _, res) = exchange("/");
        let err = exec_middleware(&m, Connection::new(req, res)).await.unwrap_err();
        assert_eq!(err.to_string(), "legacy broke");
    }
}
