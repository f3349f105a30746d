use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::ACCEPT;
use http::Method;

use crate::config::ConsoleConfig;
use crate::error::{status_kind, FetchError, FetchErrorKind};
use crate::models::{Resource, ResourceKey};

// ── transport ─────────────────────────────────────────────────────────────────

/// One round-trip to the control plane. Paths are relative to the API base.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Read a JSON document.
    async fn get(&self, path: &str) -> Result<serde_json::Value, FetchError>;

    /// Run a state-changing operation. Never retried, coalesced or cached.
    async fn invoke(&self, method: Method, path: &str) -> Result<serde_json::Value, FetchError>;
}

/// reqwest-backed transport against the configured control plane.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ConsoleConfig,
}

impl HttpTransport {
    pub fn new(config: &ConsoleConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::new(&config.api_base, FetchErrorKind::Transport, e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn send(&self, method: Method, path: &str) -> Result<serde_json::Value, FetchError> {
        let url = self.config.url(path);
        log::debug!("client: {method} {url}");

        let response = self
            .client
            .request(method, &url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(path, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(FetchError::new(
                path,
                status_kind(status),
                format!("server responded {status}: {snippet}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(path, &e))?;

        serde_json::from_slice(&bytes).map_err(|e| FetchError::decode(path, e))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<serde_json::Value, FetchError> {
        self.send(Method::GET, path).await
    }

    async fn invoke(&self, method: Method, path: &str) -> Result<serde_json::Value, FetchError> {
        self.send(method, path).await
    }
}

// ── remote state client ───────────────────────────────────────────────────────

/// Typed reads and raw actions over a [`Transport`], each bounded by the
/// request timeout.
#[derive(Clone)]
pub struct ResourceClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl ResourceClient {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Client over HTTP using the given configuration.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, FetchError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.request_timeout))
    }

    /// Fetches the record behind `key`. Exactly one round-trip; the body must
    /// be a single JSON object of the key's record type.
    pub async fn fetch_resource(&self, key: &ResourceKey) -> Result<Resource, FetchError> {
        let path = key.path();
        let value = self.bounded(&path, self.transport.get(&path)).await?;

        if !value.is_object() {
            return Err(FetchError::decode(
                path,
                format!("expected a JSON object, got {}", json_kind(&value)),
            ));
        }

        Resource::decode(key, value).map_err(|e| FetchError::decode(path, e))
    }

    /// Runs a state-changing operation and returns the raw response body.
    pub async fn invoke(&self, method: Method, path: &str) -> Result<serde_json::Value, FetchError> {
        self.bounded(path, self.transport.invoke(method, path)).await
    }

    async fn bounded<F>(&self, path: &str, call: F) -> Result<serde_json::Value, FetchError>
    where
        F: Future<Output = Result<serde_json::Value, FetchError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(
                path,
                FetchErrorKind::Timeout,
                format!("no response within {:?}", self.timeout),
            )),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
