//! CrewAI notification client.
//!
//! Wraps the transport and retry policy behind the production service's
//! gist and link endpoints. Every request carries the service API key.
//!
//! Status notifications come in two flavors. The strict variants return
//! `Err` once retries are exhausted and suit callers whose primary purpose
//! is the notification. The plain variants never fail: they fold the error
//! into a [`NotificationResult::Failed`] so a caller that already finished
//! its own work (storing a gist, say) can report the failure and move on.

use std::{fmt, sync::Arc, time::Duration};

use gista_core::{Clock, ProductionStatus, RealClock};
use http::{
    header::{CONTENT_TYPE, USER_AGENT},
    HeaderMap, HeaderName, HeaderValue, Method,
};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::{
    config::normalize_base_url,
    error::{NotifyError, Result},
    retry::RetryPolicy,
    transport::{HttpTransport, Transport, TransportRequest},
};

/// Header carrying the service-to-service API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Validated client configuration. Immutable once the client is built.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without a trailing `/api`. [`ClientConfig::new`] and the
    /// client constructors normalize whatever is assigned here.
    pub base_url: String,
    /// Service-to-service API key.
    pub api_key: String,
    /// Attempts per request, including the first.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration with default retry and timeout settings.
    ///
    /// A trailing `/api` on `base_url` is dropped, since every endpoint path
    /// already carries it.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let retry = RetryPolicy::default();
        Self {
            base_url: normalize_base_url(&base_url.into()),
            api_key: api_key.into(),
            max_retries: retry.max_retries,
            retry_delay: retry.retry_delay,
            timeout: Duration::from_secs(30),
            user_agent: format!("gista-notify/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Outcome of a best-effort notification.
///
/// Serializes to the response body verbatim on success and to
/// `{"error": "<message>"}` on failure.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationResult {
    /// Server acknowledged with a 2xx response.
    Delivered(Value),
    /// Every attempt failed.
    Failed {
        /// Description of the final failure.
        error: String,
    },
}

impl NotificationResult {
    /// Returns `true` if the server acknowledged the notification.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }

    /// Returns the `link` field of a delivered response, if present.
    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Delivered(body) => body.get("link").and_then(Value::as_str),
            Self::Failed { .. } => None,
        }
    }

    /// Returns the failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Delivered(_) => None,
            Self::Failed { error } => Some(error),
        }
    }

    /// Converts into the JSON shape returned to API callers.
    pub fn into_value(self) -> Value {
        match self {
            Self::Delivered(body) => body,
            Self::Failed { error } => json!({ "error": error }),
        }
    }
}

impl From<Result<Value>> for NotificationResult {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(body) => Self::Delivered(body),
            Err(e) => Self::Failed { error: e.to_string() },
        }
    }
}

impl Serialize for NotificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Delivered(body) => body.serialize(serializer),
            Self::Failed { error } => json!({ "error": error }).serialize(serializer),
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchStatusPayload<'a> {
    #[serde(rename = "gistIds")]
    gist_ids: &'a [String],
    #[serde(rename = "inProduction")]
    in_production: bool,
    production_status: ProductionStatus,
}

#[derive(Debug, Serialize)]
struct GistLinksPayload<'a> {
    links: &'a [Value],
    #[serde(rename = "inProduction")]
    in_production: bool,
    production_status: ProductionStatus,
}

/// Client for the CrewAI production service.
///
/// Holds no per-call state; clone it or share it behind an `Arc` across
/// tasks.
#[derive(Debug, Clone)]
pub struct NotificationClient {
    config: ClientConfig,
    headers: HeaderMap,
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl NotificationClient {
    /// Creates a client sending real HTTP requests.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` if the API key is missing or not
    /// a valid header value, if `max_retries` is zero, or if the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::validate(&config)?;
        let transport = HttpTransport::new(&config.user_agent)?;
        Self::with_transport(config, Arc::new(transport), Arc::new(RealClock::new()))
    }

    /// Creates a client over an explicit transport and clock.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` under the same conditions as
    /// [`NotificationClient::new`], before any request is attempted.
    pub fn with_transport(
        mut config: ClientConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::validate(&config)?;
        config.base_url = normalize_base_url(&config.base_url);

        let mut api_key = HeaderValue::from_str(config.api_key.trim()).map_err(|_| {
            NotifyError::configuration("API key contains characters not allowed in a header")
        })?;
        api_key.set_sensitive(true);

        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| NotifyError::configuration("user agent is not a valid header value"))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);
        headers.insert(USER_AGENT, user_agent);

        let retry = RetryPolicy::new(config.max_retries, config.retry_delay);

        info!(base_url = %config.base_url, "CrewAI service client initialized");

        Ok(Self { config, headers, retry, transport, clock })
    }

    fn validate(config: &ClientConfig) -> Result<()> {
        if config.api_key.trim().is_empty() {
            return Err(NotifyError::configuration(
                "SERVICE_API_KEY environment variable is not set",
            ));
        }
        if config.max_retries == 0 {
            return Err(NotifyError::configuration("max_retries must be at least 1"));
        }
        Ok(())
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Joins an endpoint path onto the base URL with exactly one slash.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn request(&self, method: Method, endpoint: &str, body: Option<Value>) -> Result<Value> {
        let request = TransportRequest {
            method,
            url: self.endpoint_url(endpoint),
            headers: self.headers.clone(),
            body,
            timeout: self.config.timeout,
        };

        let transport = &self.transport;
        let request = &request;
        self.retry
            .run(self.clock.as_ref(), &request.url, move || transport.execute(request))
            .await
    }

    /// Signals that a gist should move into production.
    ///
    /// The request body is an empty object; the server decides the new state
    /// and answers with the gist's canonical `link`. The response is returned
    /// as-is without checking for that field.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::RetryExhausted` when every attempt fails.
    pub async fn notify_status_change_strict(&self, user_id: &str, gist_id: &str) -> Result<Value> {
        info!(user_id, gist_id, "Triggering status update");
        self.request(Method::PUT, &format!("/api/gists/{user_id}/{gist_id}/status"), Some(json!({})))
            .await
    }

    /// Best-effort variant of [`Self::notify_status_change_strict`].
    pub async fn notify_status_change(&self, user_id: &str, gist_id: &str) -> NotificationResult {
        let result = self.notify_status_change_strict(user_id, gist_id).await;
        if let Err(e) = &result {
            error!(user_id, gist_id, error = %e, "Error updating gist status");
        }
        result.into()
    }

    /// Updates the production status of several gists at once.
    ///
    /// `production_status` outside `draft`, `review` and `published` is
    /// sent as `review`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::RetryExhausted` when every attempt fails.
    pub async fn batch_notify_strict(
        &self,
        user_id: &str,
        gist_ids: &[String],
        in_production: bool,
        production_status: &str,
    ) -> Result<Value> {
        info!(user_id, count = gist_ids.len(), "Batch updating gists");

        let payload = BatchStatusPayload {
            gist_ids,
            in_production,
            production_status: ProductionStatus::coerce(production_status),
        };

        self.request(Method::PUT, &format!("/api/gists/{user_id}/batch/status"), Some(to_json(&payload)?))
            .await
    }

    /// Best-effort variant of [`Self::batch_notify_strict`].
    pub async fn batch_notify(
        &self,
        user_id: &str,
        gist_ids: &[String],
        in_production: bool,
        production_status: &str,
    ) -> NotificationResult {
        let result =
            self.batch_notify_strict(user_id, gist_ids, in_production, production_status).await;
        if let Err(e) = &result {
            error!(user_id, error = %e, "Error batch updating gists");
        }
        result.into()
    }

    /// Replaces a gist's links and production status.
    ///
    /// Applies the same status coercion as [`Self::batch_notify_strict`].
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::RetryExhausted` when every attempt fails.
    pub async fn update_gist_with_links_strict(
        &self,
        user_id: &str,
        gist_id: &str,
        links: &[Value],
        in_production: bool,
        production_status: &str,
    ) -> Result<Value> {
        info!(user_id, gist_id, count = links.len(), "Updating gist with links");

        let payload = GistLinksPayload {
            links,
            in_production,
            production_status: ProductionStatus::coerce(production_status),
        };

        self.request(
            Method::PUT,
            &format!("/api/gists/{user_id}/{gist_id}/with-links"),
            Some(to_json(&payload)?),
        )
        .await
    }

    /// Best-effort variant of [`Self::update_gist_with_links_strict`].
    pub async fn update_gist_with_links(
        &self,
        user_id: &str,
        gist_id: &str,
        links: &[Value],
        in_production: bool,
        production_status: &str,
    ) -> NotificationResult {
        let result = self
            .update_gist_with_links_strict(user_id, gist_id, links, in_production, production_status)
            .await;
        if let Err(e) = &result {
            error!(user_id, gist_id, error = %e, "Error updating gist with links");
        }
        result.into()
    }

    /// Fetches every gist of a user.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::RetryExhausted` when every attempt fails.
    pub async fn get_user_gists(&self, user_id: &str) -> Result<Value> {
        info!(user_id, "Getting gists for user");
        self.request(Method::GET, &format!("/api/gists/{user_id}"), None).await
    }

    /// Fetches a single gist.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::RetryExhausted` when every attempt fails.
    pub async fn get_user_gist(&self, user_id: &str, gist_id: &str) -> Result<Value> {
        info!(user_id, gist_id, "Getting gist");
        self.request(Method::GET, &format!("/api/gists/{user_id}/{gist_id}"), None).await
    }

    /// Fetches every link stored for a user.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::RetryExhausted` when every attempt fails.
    pub async fn get_user_links(&self, user_id: &str) -> Result<Value> {
        info!(user_id, "Getting links for user");
        self.request(Method::GET, &format!("/api/links/{user_id}"), None).await
    }

    /// Fetches the links attached to one gist.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::RetryExhausted` when every attempt fails.
    pub async fn get_gist_links(&self, user_id: &str, gist_id: &str) -> Result<Value> {
        info!(user_id, gist_id, "Getting links for gist");
        self.request(Method::GET, &format!("/api/gists/{user_id}/{gist_id}/links"), None).await
    }

    /// Attaches a link to a gist.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::InvalidPayload` if `link` cannot be encoded,
    /// or `NotifyError::RetryExhausted` when every attempt fails.
    pub async fn add_link_to_gist<L: Serialize + ?Sized>(
        &self,
        user_id: &str,
        gist_id: &str,
        link: &L,
    ) -> Result<Value> {
        info!(user_id, gist_id, "Adding link to gist");
        self.request(Method::POST, &format!("/api/gists/{user_id}/{gist_id}/links"), Some(to_json(link)?))
            .await
    }

    /// Stores a link under the user.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::InvalidPayload` if `link` cannot be encoded,
    /// or `NotifyError::RetryExhausted` when every attempt fails.
    pub async fn add_general_link<L: Serialize + ?Sized>(
        &self,
        user_id: &str,
        link: &L,
    ) -> Result<Value> {
        info!(user_id, "Adding general link");
        self.request(Method::POST, &format!("/api/links/{user_id}"), Some(to_json(link)?)).await
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| NotifyError::invalid_payload(e.to_string()))
}
