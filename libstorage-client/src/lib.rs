//! Client for the libStorage service.
//!
//! This crate talks JSON over HTTP/1.1 to a libStorage server reachable over
//! TCP, TLS, or a Unix domain socket.
//!
//! ## Features
//!
//! - Endpoints written as `tcp://host:port` or `unix:///path/to/socket`
//! - Optional TLS with client certificates, custom roots and a
//!   server-name override
//! - Per-exchange cancellation through [`Context`]
//! - Optional wire dumps of requests and responses to a [`DiagnosticSink`]
//! - Local block-device discovery from a partition listing
//!
//! ## Example
//!
//! ```ignore
//! use libstorage_client::{Client, Config};
//!
//! let config = Config::from_toml_str(r#"
//!     [libstorage]
//!     host = "unix:///var/run/libstorage/localhost.sock"
//! "#)?;
//!
//! let client = Client::dial(None, &config)?;
//!
//! let resources = client.root().await?;
//! let volumes = client.volumes().await?;
//! for (service, vols) in &volumes {
//!     println!("{service}: {} volumes", vols.len());
//! }
//! ```
//!
//! ## Virtual hosts
//!
//! The dialer always connects to the configured endpoint, so the host in a
//! request URL is only a routing label for the server:
//!
//! 1. the TLS server-name override (`libstorage.client.tls.serverName`), else
//! 2. `libstorage-server` for Unix sockets, else
//! 3. the TCP `host:port`.
//!
//! URLs always use the `http` scheme; TLS is applied when dialing.
//!
//! ## Cancellation
//!
//! Every exchange runs under a [`Context`]. [`Client::root`] and
//! [`Client::volumes`] use the client's own context; the lower-level
//! [`Client::exchange`], [`Client::get`], [`Client::post`] and
//! [`Client::delete`] take one explicitly. Cancelling a context aborts the
//! exchanges running under it and under its children with
//! [`ClientError::Cancelled`], leaving siblings untouched:
//!
//! ```ignore
//! let ctx = client.context().child();
//! let call = client.get::<Vec<String>>(&ctx, "/");
//! ctx.cancel();
//! assert!(call.await.unwrap_err().is_cancelled());
//! ```

pub mod address;
mod builder;
mod client;
pub mod codec;
pub mod config;
mod context;
mod devices;
pub mod dump;
mod error;
pub mod transport;
pub mod types;

pub use address::{Endpoint, TransportKind};
pub use builder::ClientBuilder;
pub use client::{Client, UNIX_SOCKET_HOST};
pub use config::Config;
pub use context::Context;
pub use devices::scan_local_devices;
pub use dump::{DiagnosticSink, TracingSink, WriterSink};
pub use error::{ClientError, Result};
pub use types::{RootResponse, ServiceVolumeMap, Volume, VolumeAttachment};

// Re-export commonly used types
pub use http::Method;
