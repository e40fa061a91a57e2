//! reqwest-backed client engine
//!
//! One pooled `reqwest::Client` per engine, bound to a single base URL.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use application::ports::{ClientEngine, ClientEngineFactory, EngineError};
use async_trait::async_trait;
use domain::{Response, base_url};
use reqwest::{Client, RequestBuilder, header};
use tracing::{debug, instrument};

use crate::config::ClientConfig;

/// Label used in metric names
pub const ENGINE_NAME: &str = "reqwest";

/// Pool and timeout settings of a reqwest engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqwestEngineConfig {
    /// Idle connections kept per host
    pub max_pool_size: usize,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Read timeout
    pub read_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for ReqwestEngineConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for ReqwestEngineConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_pool_size: config.max_pool_size,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            user_agent: format!("clientbench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ReqwestEngineConfig {
    /// Override the pool size
    #[must_use]
    pub const fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Override the connect timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the read timeout
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Client engine backed by `reqwest`
#[derive(Debug)]
pub struct ReqwestEngine {
    client: Client,
    base_url: String,
    closed: AtomicBool,
}

impl ReqwestEngine {
    /// Create an engine for `http://host:port`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn new(config: &ReqwestEngineConfig, host: &str, port: u16) -> Result<Self, EngineError> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.max_pool_size)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| EngineError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url(host, port),
            closed: AtomicBool::new(false),
        })
    }

    /// `http://host:port` this engine talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, EngineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }

        let response = request.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_error)?;
        debug!(status, bytes = body.len(), "Response received");

        Ok(Response::new(status, body))
    }
}

fn map_error(error: reqwest::Error) -> EngineError {
    if error.is_timeout() {
        EngineError::Timeout(error.to_string())
    } else if error.is_connect() {
        EngineError::Connection(error.to_string())
    } else {
        EngineError::Request(error.to_string())
    }
}

#[async_trait]
impl ClientEngine for ReqwestEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn get(&self, path: &str) -> Result<Response, EngineError> {
        self.execute(self.client.get(self.url(path))).await
    }

    #[instrument(skip(self, body), fields(base = %self.base_url, bytes = body.len()))]
    async fn post(&self, path: &str, body: &str) -> Result<Response, EngineError> {
        let request = self
            .client
            .post(self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_owned());
        self.execute(request).await
    }

    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn delete(&self, path: &str) -> Result<Response, EngineError> {
        self.execute(self.client.delete(self.url(path))).await
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(base = %self.base_url, "Engine closed");
        }
    }
}

/// Creates [`ReqwestEngine`]s sharing one configuration
#[derive(Debug, Clone, Default)]
pub struct ReqwestEngineFactory {
    config: ReqwestEngineConfig,
}

impl ReqwestEngineFactory {
    /// Create a factory
    pub const fn new(config: ReqwestEngineConfig) -> Self {
        Self { config }
    }

    /// Settings applied to every engine
    pub const fn config(&self) -> &ReqwestEngineConfig {
        &self.config
    }
}

impl ClientEngineFactory for ReqwestEngineFactory {
    fn engine_name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn create_client(&self, host: &str, port: u16) -> Result<Arc<dyn ClientEngine>, EngineError> {
        Ok(Arc::new(ReqwestEngine::new(&self.config, host, port)?))
    }
}
