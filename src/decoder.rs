//! Request body decoders for the mutate handler.

use serde_json::{Map, Value};

use crate::errors::DecodeError;
use crate::record::Record;
use crate::sink::Request;

/// Decodes a request body into a record.
///
/// Decoders only read the collected body; the request stays intact for the
/// effect function and the error callback.
pub trait RequestDecoder<R>: Send + Sync {
    fn decode(&self, request: &Request, record: &mut R) -> Result<(), DecodeError>;
}

/// JSON object decoder writing through the record's column bindings.
///
/// Columns missing from the body keep the values the factory gave them.
/// Keys without a binding are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl<R: Record> RequestDecoder<R> for JsonDecoder {
    fn decode(&self, request: &Request, record: &mut R) -> Result<(), DecodeError> {
        let body: Map<String, Value> =
            serde_json::from_slice(request.body()).map_err(|e| DecodeError::Json(e.to_string()))?;
        let mut columns = record.describe();
        for (field, value) in &body {
            if let Some(slot) = columns.get_mut(field) {
                slot.set_json(value).map_err(|reason| DecodeError::InvalidValue {
                    field: field.clone(),
                    reason,
                })?;
            }
        }
        Ok(())
    }
}

/// `application/x-www-form-urlencoded` decoder writing through the record's
/// column bindings. Fields without a binding are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormDecoder;

impl<R: Record> RequestDecoder<R> for FormDecoder {
    fn decode(&self, request: &Request, record: &mut R) -> Result<(), DecodeError> {
        let mut columns = record.describe();
        for (field, value) in url::form_urlencoded::parse(request.body()) {
            if let Some(slot) = columns.get_mut(&field) {
                slot.parse_text(&value)
                    .map_err(|reason| DecodeError::InvalidValue {
                        field: field.to_string(),
                        reason,
                    })?;
            }
        }
        Ok(())
    }
}

/// Chooses [`FormDecoder`] for form content types and [`JsonDecoder`]
/// otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentDecoder;

impl ContentDecoder {
    fn is_form(request: &Request) -> bool {
        request
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_start().starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false)
    }
}

impl<R: Record> RequestDecoder<R> for ContentDecoder {
    fn decode(&self, request: &Request, record: &mut R) -> Result<(), DecodeError> {
        if Self::is_form(request) {
            FormDecoder.decode(request, record)
        } else {
            JsonDecoder.decode(request, record)
        }
    }
}
