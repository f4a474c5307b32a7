//! Transport layer.
//!
//! This module turns a resolved [`Endpoint`](crate::address::Endpoint) and
//! optional TLS settings into an HTTP transport:
//!
//! - [`negotiate`] builds [`TlsSettings`] from a configuration scope
//! - [`EndpointDialer`] always dials the configured endpoint (TCP or Unix
//!   socket, optionally TLS-wrapped), whatever URI hyper asks for
//! - [`HyperTransport`] is hyper_util's pooled HTTP/1.1 client on top of it
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates

mod body;
mod connector;
mod hyper;
mod tls;

pub use body::TransportBody;
pub use connector::{EndpointDialer, EndpointStream};
pub use hyper::HyperTransport;
pub use tls::{
    DangerousAcceptAnyCertVerifier, TLS_CERT_FILE, TLS_ENABLED, TLS_INSECURE, TLS_KEY_FILE,
    TLS_SERVER_NAME, TLS_TRUSTED_CERTS_FILE, TlsFields, TlsSettings, negotiate,
};
