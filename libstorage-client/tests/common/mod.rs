#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;

use libstorage_client::DiagnosticSink;

pub type Handler = Arc<
    dyn Fn(Request<Bytes>) -> Pin<Box<dyn Future<Output = Response<Full<Bytes>>> + Send>>
        + Send
        + Sync,
>;

pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Full<Bytes>>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Handler that always answers `status` with `body`.
pub fn fixed(status: StatusCode, body: &'static str) -> Handler {
    handler(move |_req| async move { json_response(status, body) })
}

pub fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(body.into()))
        .unwrap()
}

/// What the server saw of one request.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub host: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<Recorded>>>);

impl RequestLog {
    pub fn record(&self, req: &Request<Bytes>) {
        let get = |name: header::HeaderName| {
            req.headers()
                .get(name)
                .map(|v| v.to_str().unwrap().to_string())
        };
        self.0.lock().unwrap().push(Recorded {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            host: get(header::HOST),
            content_type: get(header::CONTENT_TYPE),
            body: req.body().clone(),
        });
    }

    pub fn all(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    pub fn single(&self) -> Recorded {
        let all = self.all();
        assert_eq!(all.len(), 1, "expected exactly one request, got {all:?}");
        all.into_iter().next().unwrap()
    }
}

/// Handler that records each request and then answers `status` with `body`.
pub fn recording(log: RequestLog, status: StatusCode, body: &'static str) -> Handler {
    handler(move |req| {
        log.record(&req);
        async move { json_response(status, body) }
    })
}

/// Diagnostic sink that keeps every dump in memory.
#[derive(Debug, Default)]
pub struct MemorySink(Mutex<Vec<String>>);

impl MemorySink {
    pub fn dumps(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn write_dump(&self, dump: &str) -> std::io::Result<()> {
        self.0.lock().unwrap().push(dump.to_string());
        Ok(())
    }
}

/// Diagnostic sink that always fails.
#[derive(Debug, Default)]
pub struct BrokenSink;

impl DiagnosticSink for BrokenSink {
    fn write_dump(&self, _dump: &str) -> std::io::Result<()> {
        Err(std::io::Error::other("broken pipe"))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn serve_connection<IO>(io: IO, handler: Handler)
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req: Request<Incoming>| {
        let handler = handler.clone();
        async move {
            let (parts, body) = req.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, hyper::Error>(handler(Request::from_parts(parts, body)).await)
        }
    });
    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(io), service)
        .await
    {
        eprintln!("connection error: {e}");
    }
}

/// Serve `handler` on an ephemeral TCP port.
pub async fn spawn_tcp(handler: Handler) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(serve_connection(stream, handler.clone()));
        }
    });
    addr
}

/// Serve `handler` on a Unix socket at `path`.
#[cfg(unix)]
pub async fn spawn_unix(path: &Path, handler: Handler) {
    let listener = tokio::net::UnixListener::bind(path).unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(serve_connection(stream, handler.clone()));
        }
    });
}

/// Self-signed server certificate and the acceptor presenting it.
#[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
pub struct TestCert {
    /// PEM of the certificate, usable as a trusted roots file.
    pub cert_pem: String,
    pub acceptor: tokio_rustls::TlsAcceptor,
}

/// Issue a self-signed certificate for `name`.
#[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
pub fn self_signed(name: &str) -> TestCert {
    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};

    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    #[cfg(feature = "tls-ring")]
    let provider = rustls::crypto::ring::default_provider();
    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = rustls::crypto::aws_lc_rs::default_provider();

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(provider))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
        .unwrap();

    TestCert {
        cert_pem: cert.pem(),
        acceptor: tokio_rustls::TlsAcceptor::from(Arc::new(config)),
    }
}

/// Serve `handler` over TLS on an ephemeral TCP port.
#[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
pub async fn spawn_tls_tcp(acceptor: tokio_rustls::TlsAcceptor, handler: Handler) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(serve_tls(acceptor.clone(), stream, handler.clone()));
        }
    });
    addr
}

/// Serve `handler` over TLS on a Unix socket at `path`.
#[cfg(all(unix, any(feature = "tls-ring", feature = "tls-aws-lc")))]
pub async fn spawn_tls_unix(path: &Path, acceptor: tokio_rustls::TlsAcceptor, handler: Handler) {
    let listener = tokio::net::UnixListener::bind(path).unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(serve_tls(acceptor.clone(), stream, handler.clone()));
        }
    });
}

#[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
async fn serve_tls<IO>(acceptor: tokio_rustls::TlsAcceptor, io: IO, handler: Handler)
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match acceptor.accept(io).await {
        Ok(stream) => serve_connection(stream, handler).await,
        Err(e) => eprintln!("tls handshake failed: {e}"),
    }
}
