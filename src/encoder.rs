//! # Streaming Encoder
//!
//! Writes list results incrementally. Once [`EncodedStream::open`] has
//! flushed the opening delimiter the status is committed, so everything
//! after that point can only stop writing; [`EncodedStream`] makes sure the
//! closing delimiter is written exactly once on every exit path.

use std::io;

use axum::http::StatusCode;
use serde::Serialize;

use crate::errors::HandlerResult;
use crate::sink::{set_json_content_type, ResponseSink};

/// Incremental writer of a sequence of documents.
///
/// One encoder value serves one response; handlers create it with
/// `Default`.
pub trait StreamEncoder {
    /// Set headers and write the opening delimiter
    fn open(&mut self, sink: &mut dyn ResponseSink) -> io::Result<()>;

    /// Write one element
    fn encode<T: Serialize + ?Sized>(
        &mut self,
        sink: &mut dyn ResponseSink,
        value: &T,
    ) -> HandlerResult<()>;

    /// Write the closing delimiter
    fn finish(&mut self, sink: &mut dyn ResponseSink) -> io::Result<()>;
}

/// JSON array writer: `[` + comma-joined documents, one per line, + `]`.
#[derive(Debug)]
pub struct JsonStreamer {
    first: bool,
}

impl Default for JsonStreamer {
    fn default() -> Self {
        Self { first: true }
    }
}

impl StreamEncoder for JsonStreamer {
    fn open(&mut self, sink: &mut dyn ResponseSink) -> io::Result<()> {
        set_json_content_type(sink);
        sink.write(b"[")
    }

    fn encode<T: Serialize + ?Sized>(
        &mut self,
        sink: &mut dyn ResponseSink,
        value: &T,
    ) -> HandlerResult<()> {
        // serialize before writing anything so a failing value leaves no
        // dangling separator
        let mut buf = Vec::with_capacity(128);
        if !self.first {
            buf.push(b',');
        }
        serde_json::to_writer(&mut buf, value)?;
        buf.push(b'\n');
        sink.write(&buf)?;
        self.first = false;
        Ok(())
    }

    fn finish(&mut self, sink: &mut dyn ResponseSink) -> io::Result<()> {
        sink.write(b"]")
    }
}

/// Newline-delimited JSON writer (`application/jsonl`), one document per
/// line and no enclosing delimiters.
#[derive(Debug, Default)]
pub struct JsonLinesStreamer;

impl StreamEncoder for JsonLinesStreamer {
    fn open(&mut self, sink: &mut dyn ResponseSink) -> io::Result<()> {
        sink.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/jsonl"),
        );
        Ok(())
    }

    fn encode<T: Serialize + ?Sized>(
        &mut self,
        sink: &mut dyn ResponseSink,
        value: &T,
    ) -> HandlerResult<()> {
        let mut buf = serde_json::to_vec(value)?;
        buf.push(b'\n');
        sink.write(&buf)?;
        Ok(())
    }

    fn finish(&mut self, _sink: &mut dyn ResponseSink) -> io::Result<()> {
        Ok(())
    }
}

/// An opened encoder bound to its sink. Dropping it finishes the stream.
pub struct EncodedStream<'s, E: StreamEncoder> {
    sink: &'s mut dyn ResponseSink,
    encoder: E,
    finished: bool,
}

impl<'s, E: StreamEncoder> EncodedStream<'s, E> {
    /// Open `encoder` on `sink`. If the opening write fails, a 500 status is
    /// attempted and nothing needs finishing.
    pub fn open(sink: &'s mut dyn ResponseSink, mut encoder: E) -> HandlerResult<Self> {
        if let Err(err) = encoder.open(sink) {
            sink.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            return Err(err.into());
        }
        Ok(Self {
            sink,
            encoder,
            finished: false,
        })
    }

    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> HandlerResult<()> {
        self.encoder.encode(&mut *self.sink, value)
    }

    /// Finish explicitly to observe write errors of the closing delimiter
    pub fn finish(mut self) -> HandlerResult<()> {
        self.finished = true;
        self.encoder.finish(&mut *self.sink)?;
        Ok(())
    }
}

impl<E: StreamEncoder> Drop for EncodedStream<'_, E> {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            let _ = self.encoder.finish(&mut *self.sink);
        }
    }
}

/// Write `value` as a single JSON document with the JSON content type.
pub fn serve_json<T: Serialize + ?Sized>(value: &T, sink: &mut dyn ResponseSink) -> HandlerResult<()> {
    let mut buf = serde_json::to_vec(value)?;
    buf.push(b'\n');
    set_json_content_type(sink);
    sink.write(&buf)?;
    Ok(())
}

/// Like [`serve_json`], committing `status` first.
pub fn respond_json<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
    sink: &mut dyn ResponseSink,
) -> HandlerResult<()> {
    let mut buf = serde_json::to_vec(value)?;
    buf.push(b'\n');
    set_json_content_type(sink);
    sink.write_status(status);
    sink.write(&buf)?;
    Ok(())
}
