//! Client engine port
//!
//! The pluggable HTTP client under test. Each adapter implements the async
//! operations plus lifecycle; the blocking variants are derived from them
//! by [`BlockingClientExt`].

use std::sync::Arc;

use async_trait::async_trait;
use domain::Response;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::runtime::Handle;

/// Errors raised by a client engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Connection could not be established or was dropped
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Connect or read timeout elapsed
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other request failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Body extraction saw a non-200 status
    #[error("Expected a 200, got a {0}")]
    UnexpectedStatus(u16),

    /// The engine was closed
    #[error("Client is closed")]
    Closed,

    /// The request task was cancelled before producing a result
    #[error("Request aborted: {0}")]
    Aborted(String),
}

/// HTTP client under test
///
/// Plain HTTP against a single base URL fixed at creation time. Timeouts and
/// pool sizing are configured once by the factory.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClientEngine: Send + Sync {
    /// Short engine label used in metric names
    fn name(&self) -> &'static str;

    /// `GET path`
    async fn get(&self, path: &str) -> Result<Response, EngineError>;

    /// `POST path` with a text body
    async fn post(&self, path: &str, body: &str) -> Result<Response, EngineError>;

    /// `DELETE path`
    async fn delete(&self, path: &str) -> Result<Response, EngineError>;

    /// Release pooled connections; later calls fail with [`EngineError::Closed`]
    async fn close(&self) {}

    /// `GET path`, returning the body of a 200 response
    async fn get_body(&self, path: &str) -> Result<String, EngineError> {
        expect_ok(self.get(path).await?)
    }

    /// `POST path`, returning the body of a 200 response
    async fn post_body(&self, path: &str, body: &str) -> Result<String, EngineError> {
        expect_ok(self.post(path, body).await?)
    }
}

fn expect_ok(response: Response) -> Result<String, EngineError> {
    if response.is_ok() {
        Ok(response.into_body())
    } else {
        Err(EngineError::UnexpectedStatus(response.status()))
    }
}

/// Creates engines bound to a host and port
#[cfg_attr(test, automock)]
pub trait ClientEngineFactory: Send + Sync {
    /// Label of the engines this factory creates
    fn engine_name(&self) -> &'static str;

    /// Create a client for `http://host:port`
    fn create_client(&self, host: &str, port: u16) -> Result<Arc<dyn ClientEngine>, EngineError>;
}

/// Blocking wrappers over the async engine operations
///
/// Each call blocks the current thread on `runtime` until the async
/// operation completes. Must not be called from inside an async task.
pub trait BlockingClientExt: ClientEngine {
    /// Blocking `GET`
    fn blocking_get(&self, runtime: &Handle, path: &str) -> Result<Response, EngineError> {
        runtime.block_on(self.get(path))
    }

    /// Blocking `POST`
    fn blocking_post(
        &self,
        runtime: &Handle,
        path: &str,
        body: &str,
    ) -> Result<Response, EngineError> {
        runtime.block_on(self.post(path, body))
    }

    /// Blocking `DELETE`
    fn blocking_delete(&self, runtime: &Handle, path: &str) -> Result<Response, EngineError> {
        runtime.block_on(self.delete(path))
    }

    /// Blocking `GET` returning the body of a 200 response
    fn blocking_get_body(&self, runtime: &Handle, path: &str) -> Result<String, EngineError> {
        runtime.block_on(self.get_body(path))
    }

    /// Blocking `POST` returning the body of a 200 response
    fn blocking_post_body(
        &self,
        runtime: &Handle,
        path: &str,
        body: &str,
    ) -> Result<String, EngineError> {
        runtime.block_on(self.post_body(path, body))
    }
}

impl<T: ClientEngine + ?Sized> BlockingClientExt for T {}
