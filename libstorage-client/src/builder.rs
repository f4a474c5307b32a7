//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`]. The
//! builder performs connection setup once: it resolves the endpoint,
//! negotiates TLS and binds the transport's dialer to both.

use std::path::PathBuf;
use std::sync::Arc;

use crate::address::Endpoint;
use crate::client::Client;
use crate::config::{self, Config};
use crate::context::Context;
use crate::dump::{DiagnosticSink, TracingSink, WireLogger};
use crate::transport::{self, EndpointDialer, HyperTransport};
use crate::{ClientError, Result};

/// Builder for creating a [`Client`].
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use libstorage_client::{Client, Config, WriterSink};
///
/// let config = Config::new()
///     .set("libstorage.host", "unix:///var/run/libstorage/localhost.sock")
///     .set("libstorage.client.http.logging.logrequest", true);
///
/// let client = Client::builder(&config)
///     .diagnostic_sink(Arc::new(WriterSink::new(std::io::stderr())))
///     .build()?;
/// ```
pub struct ClientBuilder {
    config: Config,
    /// Parent context; a background context when not set.
    ctx: Option<Context>,
    /// Sink for wire dumps.
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a builder reading its settings from `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            ctx: None,
            sink: Arc::new(TracingSink),
        }
    }

    /// Use `ctx` as the parent of the client's default context.
    pub fn context(mut self, ctx: Context) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Send wire dumps to `sink` instead of the tracing sink.
    pub fn diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build the client.
    ///
    /// Fails with [`ClientError::Config`] when `libstorage.host` is missing
    /// or unparseable, or when TLS material is invalid.
    pub fn build(self) -> Result<Client> {
        let log_requests = self.config.get_bool(config::LOG_REQUESTS);
        let log_responses = self.config.get_bool(config::LOG_RESPONSES);

        let host = self
            .config
            .get_string(config::HOST)
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ClientError::Config(format!("{} is required", config::HOST)))?;

        let (tls, tls_fields) = transport::negotiate(&self.config.scope(config::CLIENT_SCOPE))?;

        let endpoint = Endpoint::parse(&host)?;

        let ctx = match self.ctx {
            Some(ctx) => ctx,
            None => {
                tracing::debug!("created empty context for client");
                Context::background()
            }
        };
        let ctx = ctx.with_value("host", host.clone());

        let dialer = EndpointDialer::new(endpoint.clone(), tls.as_ref())?;
        let transport = HyperTransport::new(dialer);

        let local_devices_file = self
            .config
            .get_string(config::LOCAL_DEVICES_FILE)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| config::DEFAULT_LOCAL_DEVICES_FILE.to_string());

        tracing::info!(
            host = %host,
            proto = %endpoint.kind(),
            addr = %endpoint.address(),
            tls = ?tls_fields,
            "configured client"
        );

        Ok(Client::from_parts(
            endpoint,
            tls.and_then(|t| t.server_name().map(String::from)),
            transport,
            WireLogger::new(self.sink, log_requests, log_responses),
            ctx,
            PathBuf::from(local_devices_file),
        ))
    }
}
