//! Connector that always dials the configured endpoint.
//!
//! hyper's client hands its connector the request URI and expects a TCP
//! style `host:port` behind it. Requests here carry a *virtual* host (see
//! [`Client`](crate::Client)), so [`EndpointDialer`] ignores the URI it is
//! called with and reconnects to the endpoint resolved at construction time,
//! over TCP or a Unix socket, wrapped in TLS when configured.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tower_service::Service;

use super::tls::TlsSettings;
use crate::address::{Endpoint, TransportKind};

/// Byte stream a dialed connection is erased to.
trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// A dialed connection, plain or TLS, over TCP or a Unix socket.
pub struct EndpointStream {
    inner: TokioIo<Box<dyn Io>>,
    secure: bool,
}

impl EndpointStream {
    fn new(io: Box<dyn Io>, secure: bool) -> Self {
        Self {
            inner: TokioIo::new(io),
            secure,
        }
    }

    /// Returns whether the connection is TLS-wrapped.
    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl std::fmt::Debug for EndpointStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointStream")
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl hyper::rt::Read for EndpointStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        hyper::rt::Read::poll_read(Pin::new(&mut self.inner), cx, buf)
    }
}

impl hyper::rt::Write for EndpointStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        hyper::rt::Write::poll_write(Pin::new(&mut self.inner), cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        hyper::rt::Write::poll_flush(Pin::new(&mut self.inner), cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        hyper::rt::Write::poll_shutdown(Pin::new(&mut self.inner), cx)
    }

    fn is_write_vectored(&self) -> bool {
        hyper::rt::Write::is_write_vectored(&self.inner)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        hyper::rt::Write::poll_write_vectored(Pin::new(&mut self.inner), cx, bufs)
    }
}

impl Connection for EndpointStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

#[derive(Clone)]
struct TlsDial {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

/// Dials the pre-resolved endpoint regardless of the URI it is asked for.
#[derive(Clone)]
pub struct EndpointDialer {
    endpoint: Arc<Endpoint>,
    tls: Option<TlsDial>,
}

impl EndpointDialer {
    /// Create a dialer for `endpoint`, TLS-wrapping connections when
    /// `tls` is given.
    ///
    /// Fails if the TLS server name cannot be derived for the endpoint.
    pub fn new(endpoint: Endpoint, tls: Option<&TlsSettings>) -> crate::Result<Self> {
        let tls = tls
            .map(|settings| {
                Ok::<_, crate::ClientError>(TlsDial {
                    connector: TlsConnector::from(settings.client_config()),
                    server_name: settings.dial_server_name(&endpoint)?,
                })
            })
            .transpose()?;

        Ok(Self {
            endpoint: Arc::new(endpoint),
            tls,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns whether dialed connections are TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Open a new connection to the endpoint.
    pub async fn dial(&self) -> io::Result<EndpointStream> {
        match self.endpoint.kind() {
            TransportKind::Tcp => {
                let stream = TcpStream::connect(self.endpoint.address()).await?;
                stream.set_nodelay(true)?;
                self.secure(stream).await
            }
            TransportKind::Unix => self.dial_unix().await,
        }
    }

    #[cfg(unix)]
    async fn dial_unix(&self) -> io::Result<EndpointStream> {
        let stream = tokio::net::UnixStream::connect(self.endpoint.address()).await?;
        self.secure(stream).await
    }

    #[cfg(not(unix))]
    async fn dial_unix(&self) -> io::Result<EndpointStream> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unix sockets are not supported on this platform",
        ))
    }

    async fn secure<S>(&self, stream: S) -> io::Result<EndpointStream>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        match &self.tls {
            None => Ok(EndpointStream::new(Box::new(stream), false)),
            Some(tls) => {
                let stream = tls
                    .connector
                    .connect(tls.server_name.clone(), stream)
                    .await?;
                Ok(EndpointStream::new(Box::new(stream), true))
            }
        }
    }
}

impl std::fmt::Debug for EndpointDialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDialer")
            .field("endpoint", &self.endpoint)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

impl Service<Uri> for EndpointDialer {
    type Response = EndpointStream;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = io::Result<EndpointStream>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    // The URI names the virtual host, not a network destination.
    fn call(&mut self, _uri: Uri) -> Self::Future {
        let dialer = self.clone();
        Box::pin(async move { dialer.dial().await })
    }
}
