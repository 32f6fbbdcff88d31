//! Error callbacks.
//!
//! A handler reports each request's failure at most once to its callback,
//! together with the request that caused it. Callbacks must not panic.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::errors::HandlerError;
use crate::observability::{Logger, Severity};
use crate::service::RequestId;
use crate::sink::Request;

pub type ErrorCallback = Arc<dyn Fn(&Request, &HandlerError) + Send + Sync>;

/// Callback logging a `HANDLER_ERROR` event per failed request.
///
/// Client errors log at WARN, everything else at ERROR.
pub fn log_errors() -> ErrorCallback {
    Arc::new(|request: &Request, error: &HandlerError| {
        let (severity, fields) = event_fields(request, error);
        Logger::log(severity, "HANDLER_ERROR", &fields.as_refs());
    })
}

/// Like [`log_errors`], writing to `writer` instead of stderr.
pub fn log_errors_to<W: Write + Send + 'static>(writer: W) -> ErrorCallback {
    let writer = Mutex::new(writer);
    Arc::new(move |request: &Request, error: &HandlerError| {
        let (severity, fields) = event_fields(request, error);
        if let Ok(mut w) = writer.lock() {
            Logger::write_event(&mut *w, severity, "HANDLER_ERROR", &fields.as_refs());
        }
    })
}

struct Fields(Vec<(&'static str, String)>);

impl Fields {
    fn as_refs(&self) -> Vec<(&str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }
}

fn event_fields(request: &Request, error: &HandlerError) -> (Severity, Fields) {
    let status = error.status_code();
    let mut fields = vec![
        ("method", request.method().to_string()),
        ("path", request.uri().path().to_string()),
        ("status", status.as_u16().to_string()),
        ("error", error.to_string()),
    ];
    if let Some(id) = request.extensions().get::<RequestId>() {
        fields.push(("request_id", id.to_string()));
    }
    let severity = if error.is_client_error() {
        Severity::Warn
    } else {
        Severity::Error
    };
    (severity, Fields(fields))
}
