//! # Response Sinks
//!
//! Handlers write through a [`ResponseSink`] rather than building a
//! response value, so list output can be streamed row by row. The first
//! status write or body write commits the head; later status writes are
//! ignored.

use std::io;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode};

/// Incoming request with its body already collected
pub type Request = axum::http::Request<Bytes>;

/// `Content-Type` of every JSON body this crate writes
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

pub trait ResponseSink {
    /// Response headers. Changes after the head is committed are dropped.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commit the head with `status`. No-op once committed.
    fn write_status(&mut self, status: StatusCode);

    /// Append body bytes, committing the head with 200 if needed
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Whether the head has been committed
    fn is_committed(&self) -> bool;
}

/// Set the JSON content type on `sink`
pub fn set_json_content_type(sink: &mut dyn ResponseSink) {
    sink.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
}

/// In-memory sink that records everything written to it.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    status_writes: usize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed status, 200 if only the body was written
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// How often a status was written, including ignored writes
    pub fn status_writes(&self) -> usize {
        self.status_writes
    }
}

impl ResponseSink for Recorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status_writes += 1;
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
        Ok(())
    }

    fn is_committed(&self) -> bool {
        self.status.is_some()
    }
}
