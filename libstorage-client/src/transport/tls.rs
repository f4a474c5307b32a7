//! TLS settings negotiated from configuration.
//!
//! [`negotiate`] reads the `tls` keys of a configuration scope and builds a
//! rustls [`ClientConfig`] together with a map of diagnostic fields for the
//! "configured client" log line.
//!
//! # Feature Flags
//!
//! TLS needs a crypto provider and, unless `tls.trustedCertsFile` is set,
//! root certificates:
//!
//! - **Crypto providers** (choose one):
//!   - `tls-ring` - Use ring crypto (default with `tls` feature)
//!   - `tls-aws-lc` - Use AWS LC crypto
//!
//! - **Root certificates** (choose one):
//!   - `tls-native-roots` - Use system root certificates (default with `tls` feature)
//!   - `tls-webpki-roots` - Use bundled Mozilla root certificates
//!
//! Without a feature-gated provider, a process-wide default installed via
//! `CryptoProvider::install_default()` is used.
//!
//! # Keys
//!
//! | key                    | meaning                                        |
//! |------------------------|------------------------------------------------|
//! | `tls.enabled`          | request TLS; an explicit `false` forces it off |
//! | `tls.serverName`       | SNI / verification name and virtual host       |
//! | `tls.certFile`         | client certificate chain (PEM), needs keyFile  |
//! | `tls.keyFile`          | client private key (PEM), needs certFile       |
//! | `tls.trustedCertsFile` | trusted root bundle (PEM)                      |
//! | `tls.insecure`         | skip server certificate verification           |
//!
//! Setting any of the file keys, `tls.serverName` or `tls.insecure` also
//! requests TLS, unless `tls.enabled` is explicitly `false`: an explicit
//! `false` turns TLS off and the other keys are ignored.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustls::ClientConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};

use crate::address::{Endpoint, TransportKind};
use crate::client::UNIX_SOCKET_HOST;
use crate::config::Config;
use crate::{ClientError, Result};

pub const TLS_ENABLED: &str = "tls.enabled";
pub const TLS_SERVER_NAME: &str = "tls.serverName";
pub const TLS_CERT_FILE: &str = "tls.certFile";
pub const TLS_KEY_FILE: &str = "tls.keyFile";
pub const TLS_TRUSTED_CERTS_FILE: &str = "tls.trustedCertsFile";
pub const TLS_INSECURE: &str = "tls.insecure";

/// Diagnostic fields describing the negotiated TLS settings.
pub type TlsFields = BTreeMap<String, String>;

/// Negotiated TLS configuration.
#[derive(Clone)]
pub struct TlsSettings {
    config: Arc<ClientConfig>,
    server_name: Option<String>,
}

impl TlsSettings {
    /// Wrap an existing rustls configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
            server_name: None,
        }
    }

    /// Override the server name used for SNI and as the virtual host.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    pub fn client_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.config)
    }

    /// The configured server-name override, if any.
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// Name presented in the handshake when dialing `endpoint`.
    ///
    /// The override wins; otherwise TCP endpoints use their host and Unix
    /// endpoints use the synthetic socket host.
    pub(crate) fn dial_server_name(&self, endpoint: &Endpoint) -> Result<ServerName<'static>> {
        let name = match (&self.server_name, endpoint.kind()) {
            (Some(name), _) => name.clone(),
            (None, TransportKind::Tcp) => endpoint.host().to_string(),
            (None, TransportKind::Unix) => UNIX_SOCKET_HOST.to_string(),
        };
        ServerName::try_from(name.clone())
            .map_err(|e| ClientError::Config(format!("invalid TLS server name {:?}: {}", name, e)))
    }
}

impl std::fmt::Debug for TlsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsSettings")
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

/// Build TLS settings from the `tls` keys of `scope`.
///
/// Returns `(None, {})` when TLS is not requested.
pub fn negotiate(scope: &Config) -> Result<(Option<TlsSettings>, TlsFields)> {
    let server_name = non_empty(scope.get_string(TLS_SERVER_NAME));
    let cert_file = non_empty(scope.get_string(TLS_CERT_FILE));
    let key_file = non_empty(scope.get_string(TLS_KEY_FILE));
    let trusted_file = non_empty(scope.get_string(TLS_TRUSTED_CERTS_FILE));
    let insecure = scope.get_bool(TLS_INSECURE);

    // An explicit `tls.enabled = false` overrides every other key
    if scope.is_set(TLS_ENABLED) && !scope.get_bool(TLS_ENABLED) {
        return Ok((None, TlsFields::new()));
    }

    let requested = scope.get_bool(TLS_ENABLED)
        || insecure
        || server_name.is_some()
        || cert_file.is_some()
        || key_file.is_some()
        || trusted_file.is_some();
    if !requested {
        return Ok((None, TlsFields::new()));
    }

    let mut fields = TlsFields::new();
    fields.insert("tls".into(), "true".into());

    let builder = crypto_provider_builder()?;
    let builder = if insecure {
        fields.insert(TLS_INSECURE.into(), "true".into());
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousAcceptAnyCertVerifier))
    } else {
        let roots = match &trusted_file {
            Some(path) => {
                fields.insert(TLS_TRUSTED_CERTS_FILE.into(), path.clone());
                trusted_root_store(path)?
            }
            None => default_root_store()?,
        };
        builder.with_root_certificates(roots)
    };

    let config = match (cert_file, key_file) {
        (Some(cert_path), Some(key_path)) => {
            let chain = load_certs(&cert_path, "client certificate")?;
            let key = PrivateKeyDer::from_pem_file(&key_path).map_err(|e| {
                ClientError::Config(format!("failed to load client key {}: {}", key_path, e))
            })?;
            fields.insert(TLS_CERT_FILE.into(), cert_path);
            fields.insert(TLS_KEY_FILE.into(), key_path);
            builder
                .with_client_auth_cert(chain, key)
                .map_err(|e| ClientError::Config(format!("invalid client certificate: {}", e)))?
        }
        (None, None) => builder.with_no_client_auth(),
        (Some(_), None) => {
            return Err(ClientError::Config(format!(
                "{} requires {}",
                TLS_CERT_FILE, TLS_KEY_FILE
            )));
        }
        (None, Some(_)) => {
            return Err(ClientError::Config(format!(
                "{} requires {}",
                TLS_KEY_FILE, TLS_CERT_FILE
            )));
        }
    };

    let mut settings = TlsSettings::new(config);
    if let Some(name) = server_name {
        fields.insert(TLS_SERVER_NAME.into(), name.clone());
        settings = settings.with_server_name(name);
    }

    Ok((Some(settings), fields))
}

/// Get a crypto provider ConfigBuilder.
///
/// Priority:
/// 1. Feature-gated provider (tls-ring or tls-aws-lc)
/// 2. User-installed global default provider
fn crypto_provider_builder()
-> Result<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = Some(Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let provider = rustls::crypto::CryptoProvider::get_default().cloned();

    let provider = provider.ok_or_else(|| {
        ClientError::Config(
            "TLS requires a crypto provider: enable `tls-ring` or `tls-aws-lc`, \
             or install one via `CryptoProvider::install_default()`"
                .into(),
        )
    })?;

    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientError::Config(format!("unsupported TLS protocol versions: {}", e)))
}

/// Build the root certificate store from enabled features.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn default_root_store() -> Result<rustls::RootCertStore> {
    let mut roots = rustls::RootCertStore::empty();

    // Prefer native over webpki if both are enabled
    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            // Some certs may still have loaded
            tracing::debug!("errors loading native certs: {:?}", native_certs.errors);
        }
        roots.add_parsable_certificates(native_certs.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    Ok(roots)
}

#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
fn default_root_store() -> Result<rustls::RootCertStore> {
    Err(ClientError::Config(format!(
        "no root certificates available: set {} or enable \
         `tls-native-roots` / `tls-webpki-roots`",
        TLS_TRUSTED_CERTS_FILE
    )))
}

fn trusted_root_store(path: &str) -> Result<rustls::RootCertStore> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in load_certs(path, "trusted certificates")? {
        roots.add(cert).map_err(|e| {
            ClientError::Config(format!("invalid trusted certificate in {}: {}", path, e))
        })?;
    }
    Ok(roots)
}

fn load_certs(path: &str, what: &str) -> Result<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| ClientError::Config(format!("failed to read {} {}: {}", what, path, e)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ClientError::Config(format!("malformed {} in {}: {}", what, path, e)))?;
    if certs.is_empty() {
        return Err(ClientError::Config(format!(
            "no {} found in {}",
            what, path
        )));
    }
    Ok(certs)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Dangerous: Accept Invalid Certificates
// ============================================================================

/// A certificate verifier that accepts any certificate.
///
/// # Warning
///
/// Only for development/testing. It makes the connection vulnerable to
/// man-in-the-middle attacks.
#[derive(Debug)]
pub struct DangerousAcceptAnyCertVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousAcceptAnyCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
