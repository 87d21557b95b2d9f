//! Scripted transport for testing.
//!
//! [`MockTransport`] implements [`HttpTransport`] without any network. Each
//! `(method, path)` route holds a queue of [`MockResponse`]s that are
//! handed out in order; the last one repeats once the queue is drained.
//! Requests to unscripted routes get a 404.
//!
//! # Features
//!
//! - **Failure injection**: script timeouts and refused connections
//! - **Latency simulation**: delay every answer via `tokio::time::sleep`
//! - **Request log**: inspect method, path, credentials and timing of every call
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use nam_core::{ConnectionOptions, MockResponse, MockTransport, NettigoAirMonitor};
//! use nam_core::transport::HttpMethod;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = Arc::new(
//!         MockTransport::new()
//!             .with(HttpMethod::Get, "/config.json", MockResponse::json(json!({})))
//!             .with(HttpMethod::Get, "/data.json", MockResponse::json(json!({
//!                 "software_version": "NAMF-2020-36",
//!                 "sensordatavalues": [{"value_type": "SDS_P1", "value": "12.1"}],
//!             }))),
//!     );
//!
//!     let options = ConnectionOptions::new("192.168.172.12");
//!     let nam = NettigoAirMonitor::create(transport.clone(), options).await.unwrap();
//!     let snapshot = nam.async_update().await.unwrap();
//!
//!     assert_eq!(snapshot.sensors.sds011_p1, Some(12.0));
//!     assert_eq!(transport.request_count(), 2);
//! }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::transport::{BasicAuth, HttpMethod, HttpResponse, HttpTransport, TransportError};

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// The device answers.
    Reply(HttpResponse),
    /// The request fails below HTTP.
    Fail(TransportError),
}

impl MockResponse {
    /// `200 OK` with a JSON body.
    pub fn json(body: Value) -> Self {
        Self::Reply(HttpResponse::new(200, body.to_string()))
    }

    /// `200 OK` with a text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Reply(HttpResponse::new(200, body))
    }

    /// Empty answer with the given status.
    pub fn status(status: u16) -> Self {
        Self::Reply(HttpResponse::new(status, ""))
    }

    /// The request times out.
    pub fn timeout() -> Self {
        Self::Fail(TransportError::Timeout)
    }

    /// Nothing listens on the host.
    pub fn connection_refused() -> Self {
        Self::Fail(TransportError::Connect("connection refused".to_string()))
    }
}

/// A request as seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Path component of `url`.
    pub path: String,
    /// Whether basic auth credentials were attached.
    pub authenticated: bool,
    /// When the request was received, on the tokio clock.
    pub at: Instant,
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<(HttpMethod, String), VecDeque<MockResponse>>,
    requests: Vec<RecordedRequest>,
    latency: Duration,
}

/// In-memory [`HttpTransport`] with scripted answers.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Create a transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an answer to a route (builder form).
    #[must_use]
    pub fn with(self, method: HttpMethod, path: &str, response: MockResponse) -> Self {
        self.push(method, path, response);
        self
    }

    /// Append an answer to a route.
    pub fn push(&self, method: HttpMethod, path: &str, response: MockResponse) {
        self.lock()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Replace everything scripted for a route.
    pub fn set(&self, method: HttpMethod, path: &str, responses: Vec<MockResponse>) {
        self.lock()
            .routes
            .insert((method, path.to_string()), responses.into());
    }

    /// Delay every answer by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests received for one route.
    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, method: HttpMethod, path: &str) -> MockResponse {
        let mut state = self.lock();
        match state.routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(MockResponse::status(404)),
            Some(queue) => queue.front().cloned().unwrap_or(MockResponse::status(404)),
            None => MockResponse::status(404),
        }
    }
}

/// Path component of an absolute URL.
fn path_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .find('/')
        .map_or("/", |index| &without_scheme[index..])
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        auth: Option<&BasicAuth>,
    ) -> Result<HttpResponse, TransportError> {
        let path = path_of(url).to_string();
        let latency = {
            let mut state = self.lock();
            state.requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                path: path.clone(),
                authenticated: auth.is_some(),
                at: Instant::now(),
            });
            state.latency
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match self.next_response(method, &path) {
            MockResponse::Reply(response) => Ok(response),
            MockResponse::Fail(err) => Err(err),
        }
    }
}
