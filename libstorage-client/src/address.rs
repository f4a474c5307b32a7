//! Endpoint address parsing.
//!
//! Endpoints are written as `<scheme>://<address>`:
//!
//! - `tcp://host:port` (also `tcp4://` and `tcp6://`)
//! - `unix:///absolute/path/to/socket`

use std::fmt;

use crate::{ClientError, Result};

/// Network substrate used to reach the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Tcp,
    Unix,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Unix => "unix",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved endpoint: transport kind plus transport-specific address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    kind: TransportKind,
    address: String,
}

impl Endpoint {
    /// Parse an endpoint string such as `tcp://127.0.0.1:7979`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ClientError::Config("endpoint address is empty".into()));
        }

        let (scheme, rest) = s.split_once("://").ok_or_else(|| {
            ClientError::Config(format!("endpoint {:?} has no scheme", s))
        })?;

        let kind = match scheme.to_ascii_lowercase().as_str() {
            "tcp" | "tcp4" | "tcp6" => TransportKind::Tcp,
            "unix" => TransportKind::Unix,
            other => {
                return Err(ClientError::Config(format!(
                    "unsupported endpoint scheme {:?} in {:?}",
                    other, s
                )));
            }
        };

        if rest.is_empty() {
            return Err(ClientError::Config(format!(
                "endpoint {:?} has no address",
                s
            )));
        }

        if kind == TransportKind::Tcp {
            validate_host_port(rest).map_err(|reason| {
                ClientError::Config(format!("invalid tcp endpoint {:?}: {}", s, reason))
            })?;
        }

        Ok(Self {
            kind,
            address: rest.to_string(),
        })
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// `host:port` for TCP, the socket path for Unix.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Host part of a TCP address, without brackets or port.
    pub(crate) fn host(&self) -> &str {
        match self.kind {
            TransportKind::Tcp => self
                .address
                .rsplit_once(':')
                .map(|(host, _)| host.trim_start_matches('[').trim_end_matches(']'))
                .unwrap_or(&self.address),
            TransportKind::Unix => &self.address,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.kind, self.address)
    }
}

fn validate_host_port(addr: &str) -> std::result::Result<(), &'static str> {
    let (host, port) = addr.rsplit_once(':').ok_or("missing port")?;
    if host.is_empty() {
        return Err("missing host");
    }
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return Err("IPv6 hosts must be bracketed");
    }
    port.parse::<u16>().map_err(|_| "port is not a number in 0-65535")?;
    Ok(())
}
