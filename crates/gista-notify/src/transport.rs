//! Single-attempt HTTP execution.
//!
//! A transport performs exactly one request and either returns the decoded
//! JSON body of a 2xx response or a categorized [`TransportError`]. Retrying
//! is the caller's concern.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use http::{HeaderMap, Method};
use serde_json::Value;
use tracing::{info_span, Instrument};

use crate::error::{NotifyError, TransportError};

/// Longest response body kept in a status error.
const MAX_ERROR_BODY_SIZE: usize = 1024;

/// One outbound request. Immutable for the duration of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Headers sent with every attempt.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

/// Executes one HTTP request.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends the request once.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` for connection failures, timeouts, non-2xx
    /// statuses and bodies that are not valid JSON.
    async fn execute(&self, request: &TransportRequest) -> Result<Value, TransportError>;
}

/// Production transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport sending the given user agent.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(user_agent: &str) -> crate::Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build().map_err(|e| {
            NotifyError::configuration(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &TransportRequest) -> Result<Value, TransportError> {
        let span = info_span!(
            "crewai_request",
            method = %request.method,
            url = %request.url,
        );

        async move {
            tracing::debug!("Sending request");
            let start_time = std::time::Instant::now();

            let mut http_request = self
                .client
                .request(request.method.clone(), &request.url)
                .headers(request.headers.clone())
                .timeout(request.timeout);

            if let Some(body) = &request.body {
                http_request = http_request.json(body);
            }

            let response = http_request
                .send()
                .await
                .map_err(|e| categorize(&e, request.timeout))?;

            let status = response.status();
            let bytes = response.bytes().await.map_err(|e| categorize(&e, request.timeout))?;

            tracing::debug!(
                status = status.as_u16(),
                duration_ms = start_time.elapsed().as_millis(),
                "Received response"
            );

            if !status.is_success() {
                return Err(TransportError::status(status.as_u16(), truncate_body(&bytes)));
            }

            serde_json::from_slice(&bytes).map_err(|e| TransportError::decode(e.to_string()))
        }
        .instrument(span)
        .await
    }
}

fn categorize(error: &reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        return TransportError::timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
    }
    if error.is_connect() {
        return TransportError::network(format!("connection failed: {error}"));
    }
    TransportError::network(error.to_string())
}

fn truncate_body(bytes: &[u8]) -> String {
    if bytes.len() <= MAX_ERROR_BODY_SIZE {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let truncated = String::from_utf8_lossy(&bytes[..MAX_ERROR_BODY_SIZE]);
    format!("{truncated}... (truncated)")
}

pub mod mock {
    //! Scriptable in-memory transport.
    //!
    //! Responses are served from a FIFO script; once the script is empty the
    //! fallback responder answers. Every request is recorded.

    use std::{
        collections::VecDeque,
        fmt,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;
    use serde_json::Value;

    use super::{Transport, TransportRequest};
    use crate::error::TransportError;

    type Responder = Arc<dyn Fn(&TransportRequest) -> Result<Value, TransportError> + Send + Sync>;

    /// Transport double for tests.
    #[derive(Clone)]
    pub struct MockTransport {
        script: Arc<Mutex<VecDeque<Result<Value, TransportError>>>>,
        fallback: Responder,
        requests: Arc<Mutex<Vec<TransportRequest>>>,
    }

    impl MockTransport {
        /// Creates a transport whose unscripted requests fail with a network
        /// error.
        pub fn new() -> Self {
            Self::responding_with(|_| Err(TransportError::network("no scripted response")))
        }

        /// Creates a transport answering every unscripted request with
        /// `responder`.
        pub fn responding_with<F>(responder: F) -> Self
        where
            F: Fn(&TransportRequest) -> Result<Value, TransportError> + Send + Sync + 'static,
        {
            Self {
                script: Arc::new(Mutex::new(VecDeque::new())),
                fallback: Arc::new(responder),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Creates a transport that always fails with `error`.
        pub fn always_failing(error: TransportError) -> Self {
            Self::responding_with(move |_| Err(error.clone()))
        }

        /// Creates a transport that fails `failures` times, then succeeds
        /// with `body` forever.
        pub fn failing_then(failures: usize, error: TransportError, body: Value) -> Self {
            let transport = Self::responding_with(move |_| Ok(body.clone()));
            for _ in 0..failures {
                transport.push(Err(error.clone()));
            }
            transport
        }

        /// Appends a response to the script.
        pub fn push(&self, response: Result<Value, TransportError>) {
            if let Ok(mut script) = self.script.lock() {
                script.push_back(response);
            }
        }

        /// Returns every request received so far.
        pub fn requests(&self) -> Vec<TransportRequest> {
            self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
        }

        /// Returns the number of requests received so far.
        pub fn call_count(&self) -> usize {
            self.requests.lock().map(|requests| requests.len()).unwrap_or_default()
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl fmt::Debug for MockTransport {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("MockTransport").field("calls", &self.call_count()).finish()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: &TransportRequest) -> Result<Value, TransportError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }

            let scripted = self.script.lock().ok().and_then(|mut script| script.pop_front());
            scripted.unwrap_or_else(|| (self.fallback)(request))
        }
    }
}
