//! libStorage client implementation.
//!
//! This module provides the [`Client`] handle and its request dispatcher.
//! Every call is one exchange: build the request against the virtual host,
//! send it through the endpoint-bound transport, read the whole body and
//! decode it as JSON. The exchange is raced against its [`Context`], so
//! cancellation returns promptly with [`ClientError::Cancelled`].

use std::path::{Path, PathBuf};

use bytes::Bytes;
use http::{Method, Request, header};
use http_body_util::BodyExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::address::{Endpoint, TransportKind};
use crate::builder::ClientBuilder;
use crate::codec::{self, JSON_CONTENT_TYPE};
use crate::config::Config;
use crate::context::Context;
use crate::devices::scan_local_devices;
use crate::dump::WireLogger;
use crate::transport::HyperTransport;
use crate::types::{RootResponse, ServiceVolumeMap};
use crate::{ClientError, Result};

/// Virtual host used for requests sent over a Unix socket.
pub const UNIX_SOCKET_HOST: &str = "libstorage-server";

/// Handle to a libStorage service.
///
/// Immutable after construction and cheap to clone; clones share the
/// transport's connection pool. Safe to use from many tasks at once.
///
/// # Example
///
/// ```ignore
/// use libstorage_client::{Client, Config};
///
/// let config = Config::from_file("/etc/libstorage/config.toml")?.with_env();
/// let client = Client::dial(None, &config)?;
///
/// for name in client.root().await? {
///     println!("{name}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    endpoint: Endpoint,
    /// TLS server-name override; also the virtual host when set.
    tls_server_name: Option<String>,
    transport: HyperTransport,
    wire: WireLogger,
    ctx: Context,
    local_devices_file: PathBuf,
}

impl Client {
    /// Create a [`ClientBuilder`] reading from `config`.
    pub fn builder(config: &Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Connect to the service named by `libstorage.host`.
    ///
    /// No network I/O happens here; connections are dialed on first use.
    /// When `ctx` is `None` a background context is created. Either way the
    /// client's context is tagged with the configured host.
    pub fn dial(ctx: Option<Context>, config: &Config) -> Result<Self> {
        let builder = ClientBuilder::new(config);
        match ctx {
            Some(ctx) => builder.context(ctx).build(),
            None => builder.build(),
        }
    }

    pub(crate) fn from_parts(
        endpoint: Endpoint,
        tls_server_name: Option<String>,
        transport: HyperTransport,
        wire: WireLogger,
        ctx: Context,
        local_devices_file: PathBuf,
    ) -> Self {
        Self {
            endpoint,
            tls_server_name,
            transport,
            wire,
            ctx,
            local_devices_file,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Default context for exchanges issued without one.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Returns whether connections are TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        self.transport.dialer().is_tls()
    }

    pub fn logs_requests(&self) -> bool {
        self.wire.logs_requests()
    }

    pub fn logs_responses(&self) -> bool {
        self.wire.logs_responses()
    }

    /// Host placed in request URLs and the `Host` header.
    ///
    /// In priority order: the TLS server-name override, the synthetic
    /// [`UNIX_SOCKET_HOST`] for Unix sockets, the TCP `host:port`.
    pub fn virtual_host(&self) -> &str {
        if let Some(name) = &self.tls_server_name {
            return name;
        }
        match self.endpoint.kind() {
            TransportKind::Unix => UNIX_SOCKET_HOST,
            TransportKind::Tcp => self.endpoint.address(),
        }
    }

    /// URL for `path` on the virtual host.
    ///
    /// Always `http://`; TLS is applied by the dialer, not the URL.
    pub fn request_url(&self, path: &str) -> String {
        format!("http://{}{}", self.virtual_host(), path)
    }

    // ------------------------------------------------------------------
    // Public queries
    // ------------------------------------------------------------------

    /// List the root resources.
    pub async fn root(&self) -> Result<RootResponse> {
        self.get(&self.ctx, "/").await
    }

    /// List all volumes for all services.
    pub async fn volumes(&self) -> Result<ServiceVolumeMap> {
        self.get(&self.ctx, "/volumes").await
    }

    /// List local devices whose names start with `prefix`.
    ///
    /// Reads the file configured as `libstorage.client.localdevicesfile`
    /// (default `/proc/partitions`); see [`scan_local_devices`].
    pub fn local_devices(&self, prefix: &str) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(&self.local_devices_file)
            .map_err(|e| ClientError::io(&self.local_devices_file, e))?;
        scan_local_devices(&content, prefix)
    }

    pub fn local_devices_file(&self) -> &Path {
        &self.local_devices_file
    }

    // ------------------------------------------------------------------
    // Dispatcher
    // ------------------------------------------------------------------

    /// `GET path`, decoding the reply.
    pub async fn get<R>(&self, ctx: &Context, path: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.exchange::<(), R>(ctx, Method::GET, path, None).await
    }

    /// `POST path` with a JSON payload, decoding the reply.
    pub async fn post<P, R>(&self, ctx: &Context, path: &str, payload: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.exchange(ctx, Method::POST, path, Some(payload)).await
    }

    /// `DELETE path`, decoding the reply.
    pub async fn delete<R>(&self, ctx: &Context, path: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.exchange::<(), R>(ctx, Method::DELETE, path, None).await
    }

    /// Perform one exchange: encode, send, read, decode.
    ///
    /// The exchange is abandoned as soon as `ctx` is cancelled, yielding
    /// [`ClientError::Cancelled`]. There are no retries.
    pub async fn exchange<P, R>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        payload: Option<&P>,
    ) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = codec::encode_payload(payload)?;
        let url = self.request_url(path);
        tracing::debug!(url = %url, host = ctx.value("host"), "built request url");

        let request = self.build_request(method, &url, body)?;
        self.wire.request(&request);

        let roundtrip = async {
            let response = self.transport.request(request.map(Into::into)).await?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| ClientError::Decode(format!("failed to read response body: {}", e)))?
                .to_bytes();
            Ok::<_, ClientError>((parts, body))
        };

        let (parts, body) = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(ClientError::Cancelled),
            result = roundtrip => result?,
        };
        self.wire.response(&parts, &body);

        codec::decode_body(&body)
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<Request<Option<Bytes>>> {
        let mut builder = Request::builder()
            .method(method)
            .uri(url)
            .header(header::HOST, self.virtual_host());
        if let Some(bytes) = &body {
            builder = builder
                .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
                .header(header::CONTENT_LENGTH, bytes.len());
        }
        builder
            .body(body)
            .map_err(|e| ClientError::InvalidRequest(format!("{}: {}", url, e)))
    }
}
