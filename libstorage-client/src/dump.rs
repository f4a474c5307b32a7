//! Wire-level request/response dumps.
//!
//! When enabled, every outgoing request and incoming response is rendered in
//! HTTP/1.1 wire form (start line, headers, body), indented, framed by a
//! banner, and written to a [`DiagnosticSink`]. Dumping is best effort: a
//! sink error is dropped and never reaches the exchange.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::HeaderMap;

/// Target used by [`TracingSink`] events.
pub const WIRE_TARGET: &str = "libstorage_client::wire";

const INDENT: &str = "    ";

/// Destination for wire dumps.
pub trait DiagnosticSink: Send + Sync {
    /// Write one complete dump.
    fn write_dump(&self, dump: &str) -> io::Result<()>;
}

/// Emits each dump as an `info` event under [`WIRE_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn write_dump(&self, dump: &str) -> io::Result<()> {
        tracing::info!(target: WIRE_TARGET, "{}", dump);
        Ok(())
    }
}

/// Writes each dump to an [`io::Write`].
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Run `f` with the underlying writer.
    pub fn with_writer<T>(&self, f: impl FnOnce(&mut W) -> T) -> T {
        let mut guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> DiagnosticSink for WriterSink<W> {
    fn write_dump(&self, dump: &str) -> io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("diagnostic writer poisoned"))?;
        writer.write_all(dump.as_bytes())?;
        writer.flush()
    }
}

/// Gated dumper held by the client.
#[derive(Clone)]
pub(crate) struct WireLogger {
    sink: Arc<dyn DiagnosticSink>,
    requests: bool,
    responses: bool,
}

impl WireLogger {
    pub(crate) fn new(sink: Arc<dyn DiagnosticSink>, requests: bool, responses: bool) -> Self {
        Self {
            sink,
            requests,
            responses,
        }
    }

    pub(crate) fn logs_requests(&self) -> bool {
        self.requests
    }

    pub(crate) fn logs_responses(&self) -> bool {
        self.responses
    }

    pub(crate) fn request(&self, request: &http::Request<Option<Bytes>>) {
        if !self.requests {
            return;
        }
        let wire = render_request(request);
        let _ = self.sink.write_dump(&frame("HTTP REQUEST (CLIENT)", &wire));
    }

    pub(crate) fn response(&self, parts: &http::response::Parts, body: &[u8]) {
        if !self.responses {
            return;
        }
        let wire = render_response(parts, body);
        let _ = self.sink.write_dump(&frame("HTTP RESPONSE (CLIENT)", &wire));
    }
}

impl std::fmt::Debug for WireLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireLogger")
            .field("requests", &self.requests)
            .field("responses", &self.responses)
            .finish_non_exhaustive()
    }
}

/// Render a request in wire form.
pub fn render_request(request: &http::Request<Option<Bytes>>) -> String {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut out = format!("{} {} {:?}\r\n", request.method(), target, request.version());
    push_headers(&mut out, request.headers());
    out.push_str("\r\n");
    if let Some(body) = request.body() {
        out.push_str(&String::from_utf8_lossy(body));
    }
    out
}

/// Render a response head and its already-read body in wire form.
pub fn render_response(parts: &http::response::Parts, body: &[u8]) -> String {
    let mut out = format!("{:?} {}\r\n", parts.version, parts.status);
    push_headers(&mut out, &parts.headers);
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(body));
    out
}

fn push_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        out.push_str(name.as_str());
        out.push_str(": ");
        out.push_str(&String::from_utf8_lossy(value.as_bytes()));
        out.push_str("\r\n");
    }
}

/// Banner, then `wire` indented line by line.
fn frame(title: &str, wire: &str) -> String {
    let mut out = format!(
        "\n{INDENT}-------------------------- {title} -------------------------\n"
    );
    write_indented(&mut out, wire);
    out
}

fn write_indented(out: &mut String, text: &str) {
    for line in text.lines() {
        if !line.is_empty() {
            out.push_str(INDENT);
            out.push_str(line);
        }
        out.push('\n');
    }
}
