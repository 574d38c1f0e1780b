//! Transport layer abstraction.
//!
//! The client never opens sockets itself. Every exchange with the homeserver
//! goes through the [`Transport`] trait: one method, one path, an optional
//! bearer token, an optional JSON body, and a decoded JSON response or a
//! classified failure. This keeps the engine independent of the HTTP library
//! (reqwest, ureq, a loopback fake for tests, ...).

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Result type for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// HTTP method of a transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET request.
    Get,
    /// POST request.
    Post,
    /// PUT request.
    Put,
}

impl Method {
    /// Returns the wire name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

/// A failed transport call, classified for the retry policy.
///
/// The classification is the transport's contract with the sync loop: the
/// loop never inspects status codes itself, it only asks
/// [`TransportError::is_retryable`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (DNS, connect, reset, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server returned status {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body or status line.
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Returns true if retrying the same call may succeed.
    ///
    /// Network failures and server-side (5xx) errors are transient; client
    /// errors (4xx) and undecodable bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Server { status, .. } => *status >= 500,
            TransportError::Decode(_) => false,
        }
    }
}

/// A transport performs one authenticated or unauthenticated exchange.
///
/// Implementations are injected into the client at construction; tests
/// substitute [`MockTransport`] without touching any global state.
pub trait Transport: Send + Sync {
    /// Performs one exchange and returns the decoded JSON response body.
    ///
    /// `access_token` is attached as a bearer credential when present. The
    /// call must not retry internally; retry is the sync loop's decision.
    fn call(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> TransportResult<serde_json::Value>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn call(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> TransportResult<serde_json::Value> {
        (**self).call(method, path, access_token, body)
    }
}

/// One call observed by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Method of the call.
    pub method: Method,
    /// Full path including any query string.
    pub path: String,
    /// Bearer token attached to the call, if any.
    pub access_token: Option<String>,
    /// JSON body sent with the call, if any.
    pub body: Option<serde_json::Value>,
}

/// Scripted responses for one mock route.
#[derive(Debug, Default)]
struct Route {
    queue: VecDeque<TransportResult<serde_json::Value>>,
    /// Response replayed once the queue is drained.
    terminal: Option<TransportResult<serde_json::Value>>,
}

/// A mock transport for testing.
///
/// Responses are scripted per route, where a route is a method plus a path
/// prefix; the longest matching prefix wins. Each scripted response is
/// consumed once, in order. A route may also carry a terminal response that
/// is replayed forever once the queue is drained, which keeps a background
/// sync loop fed after the interesting part of a test.
///
/// Every call is recorded and can be inspected with
/// [`MockTransport::calls`].
#[derive(Debug, Default)]
pub struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    routes: Mutex<HashMap<(Method, String), Route>>,
}

impl MockTransport {
    /// Creates a new mock with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts one response for calls matching `method` and `path_prefix`.
    pub fn stub(
        &self,
        method: Method,
        path_prefix: &str,
        response: TransportResult<serde_json::Value>,
    ) {
        self.routes
            .lock()
            .entry((method, path_prefix.to_string()))
            .or_default()
            .queue
            .push_back(response);
    }

    /// Scripts the response replayed after the route's queue is drained.
    pub fn stub_terminal(
        &self,
        method: Method,
        path_prefix: &str,
        response: TransportResult<serde_json::Value>,
    ) {
        self.routes
            .lock()
            .entry((method, path_prefix.to_string()))
            .or_default()
            .terminal = Some(response);
    }

    /// Returns all calls observed so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls whose path starts with `path_prefix`.
    pub fn calls_to(&self, path_prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.path.starts_with(path_prefix))
            .count()
    }
}

impl Transport for MockTransport {
    fn call(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> TransportResult<serde_json::Value> {
        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            access_token: access_token.map(str::to_string),
            body: body.cloned(),
        });

        let mut routes = self.routes.lock();
        let key = routes
            .keys()
            .filter(|(m, prefix)| *m == method && path.starts_with(prefix.as_str()))
            .max_by_key(|(_, prefix)| prefix.len())
            .cloned();

        match key.and_then(|k| routes.get_mut(&k)) {
            Some(route) => match route.queue.pop_front() {
                Some(response) => response,
                None => route.terminal.clone().unwrap_or_else(|| {
                    Err(TransportError::Network(format!(
                        "mock route for {} {path} is exhausted",
                        method.as_str()
                    )))
                }),
            },
            None => Err(TransportError::Network(format!(
                "no scripted response for {} {path}",
                method.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scripted_responses_are_consumed_in_order() {
        let mock = MockTransport::new();
        mock.stub(Method::Get, "/sync", Ok(json!({"n": 1})));
        mock.stub(Method::Get, "/sync", Ok(json!({"n": 2})));

        assert_eq!(
            mock.call(Method::Get, "/sync?timeout=0", None, None).unwrap(),
            json!({"n": 1})
        );
        assert_eq!(
            mock.call(Method::Get, "/sync?timeout=0", None, None).unwrap(),
            json!({"n": 2})
        );
        // Exhausted queue without a terminal response fails.
        assert!(mock.call(Method::Get, "/sync", None, None).is_err());
    }

    #[test]
    fn terminal_response_repeats() {
        let mock = MockTransport::new();
        mock.stub_terminal(Method::Get, "/sync", Ok(json!({"stable": true})));

        for _ in 0..3 {
            assert_eq!(
                mock.call(Method::Get, "/sync", None, None).unwrap(),
                json!({"stable": true})
            );
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let mock = MockTransport::new();
        mock.stub_terminal(Method::Post, "/rooms/", Ok(json!("generic")));
        mock.stub_terminal(Method::Post, "/rooms/!a:hs/invite", Ok(json!("specific")));

        assert_eq!(
            mock.call(Method::Post, "/rooms/!a:hs/invite", None, None)
                .unwrap(),
            json!("specific")
        );
        assert_eq!(
            mock.call(Method::Post, "/rooms/!b:hs/join", None, None)
                .unwrap(),
            json!("generic")
        );
    }

    #[test]
    fn calls_are_recorded() {
        let mock = MockTransport::new();
        mock.stub(Method::Put, "/rooms/", Ok(json!({})));

        let body = json!({"msgtype": "m.text", "body": "hi"});
        mock.call(
            Method::Put,
            "/rooms/!a:hs/send/m.room.message/m1.0",
            Some("token"),
            Some(&body),
        )
        .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Put);
        assert_eq!(calls[0].access_token.as_deref(), Some("token"));
        assert_eq!(calls[0].body.as_ref(), Some(&body));
        assert_eq!(mock.calls_to("/rooms/"), 1);
    }

    #[test]
    fn unmatched_route_is_a_network_error() {
        let mock = MockTransport::new();
        let result = mock.call(Method::Get, "/whoami", None, None);
        assert!(matches!(result, Err(TransportError::Network(_))));
    }

    #[test]
    fn retryability_classification() {
        assert!(TransportError::Network("reset".into()).is_retryable());
        assert!(TransportError::Server {
            status: 502,
            message: "bad gateway".into()
        }
        .is_retryable());
        assert!(!TransportError::Server {
            status: 404,
            message: "not found".into()
        }
        .is_retryable());
        assert!(!TransportError::Decode("trailing garbage".into()).is_retryable());
    }
}
