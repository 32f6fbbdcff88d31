//! # Handler Errors
//!
//! Error types for cursors, decoding, column mapping and the handlers
//! themselves.

use std::io;

use axum::http::StatusCode;
use thiserror::Error;

use crate::record::SlotKind;

/// Boxed error returned by user-supplied query and effect functions
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for handler pipelines
pub type HandlerResult<T> = Result<T, HandlerError>;

/// A typed setter did not match the slot it was asked to write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("wrong type of target for column '{column}', must be '{expected}' but is '{found}'")]
pub struct SetError {
    pub column: String,
    pub expected: &'static str,
    pub found: SlotKind,
}

/// Row cursor errors. Cursors keep the first one and hand out clones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// A column of the result has no slot on the record
    #[error("unknown column {0}")]
    UnknownColumn(String),

    /// A value could not be written into its slot
    #[error(transparent)]
    TypeMismatch(#[from] SetError),

    /// Scan targets do not line up with the result columns
    #[error("expected {expected} scan targets, got {found}")]
    TargetCount { expected: usize, found: usize },

    /// Read attempted without a current row
    #[error("no current row")]
    NoRow,

    /// Failure reported by the underlying data source
    #[error("data source error: {0}")]
    Source(String),
}

/// Request body decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid JSON body: {0}")]
    Json(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors turning record fields into output values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("column {column} holds a {kind} value JSON cannot represent")]
    Unrepresentable { column: String, kind: SlotKind },

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// Everything that can reach a handler's error callback
#[derive(Debug, Error)]
pub enum HandlerError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Mutating request without a body
    #[error("empty body")]
    EmptyBody,

    /// Body could not be decoded into the record
    #[error(transparent)]
    Decode(#[from] DecodeError),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// The query function failed; it has written its own status
    #[error("query failed: {0}")]
    Query(#[source] BoxError),

    /// Cursor, scan or column mapping failure
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// Record values could not be mapped for output
    #[error(transparent)]
    Mapping(#[from] MapError),

    /// A value could not be serialized to JSON
    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writing to the response failed
    #[error("write failed: {0}")]
    Write(#[from] io::Error),

    /// The effect function reported a failure
    #[error("effect failed: {0}")]
    Effect(#[source] BoxError),
}

impl HandlerError {
    /// HTTP status this error maps to when nothing has been written yet
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            HandlerError::EmptyBody => StatusCode::BAD_REQUEST,
            HandlerError::Decode(_) => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            HandlerError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerError::Cursor(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerError::Mapping(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerError::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerError::Effect(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}
