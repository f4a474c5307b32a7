//! Hyper-based HTTP transport.
//!
//! This module provides [`HyperTransport`], hyper_util's legacy client bound
//! to an [`EndpointDialer`]. Connection reuse is handled by the client's
//! internal pool.

use std::time::Duration;

use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use super::body::TransportBody;
use super::connector::EndpointDialer;
use crate::ClientError;
use crate::error::error_chain;

/// Type alias for the hyper client with the endpoint dialer.
type HyperClient = Client<EndpointDialer, TransportBody>;

/// Idle pooled connections are closed after this long.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// HTTP/1.1 transport over an [`EndpointDialer`].
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    dialer: EndpointDialer,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("dialer", &self.dialer)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport whose every connection comes from `dialer`.
    pub fn new(dialer: EndpointDialer) -> Self {
        let mut builder = Client::builder(TokioExecutor::new());

        // Required for pool_idle_timeout to work
        builder.pool_timer(TokioTimer::new());
        builder.pool_idle_timeout(POOL_IDLE_TIMEOUT);

        let client = builder.build(dialer.clone());

        Self { client, dialer }
    }

    pub fn dialer(&self) -> &EndpointDialer {
        &self.dialer
    }

    /// Send an HTTP request and receive the response head.
    pub async fn request(
        &self,
        request: http::Request<TransportBody>,
    ) -> Result<http::Response<Incoming>, ClientError> {
        self.client
            .request(request)
            .await
            .map_err(|e| ClientError::Transport(format!("request failed: {}", error_chain(&e))))
    }
}
