//! aerorest - Streaming REST adapter between HTTP handlers and tabular data sources
//!
//! List requests stream query results as a JSON array, one record per row.
//! Mutate requests decode and validate a record and hand its column values
//! to an effect function.

pub mod callback;
pub mod config;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod errors;
pub mod list;
pub mod mutate;
pub mod observability;
pub mod options;
pub mod record;
pub mod resource;
pub mod service;
pub mod setter;
pub mod sink;
pub mod validate;

pub use callback::{log_errors, ErrorCallback};
pub use config::ServiceConfig;
pub use cursor::{BoxCursor, FailedCursor, ResultSet, RowCursor, SourceCursor, SyntheticCursor};
pub use decoder::{ContentDecoder, FormDecoder, JsonDecoder, RequestDecoder};
pub use encoder::{respond_json, serve_json, JsonLinesStreamer, JsonStreamer, StreamEncoder};
pub use errors::{BoxError, CursorError, DecodeError, HandlerError, HandlerResult, MapError, SetError};
pub use list::ListHandler;
pub use mutate::MutateHandler;
pub use options::{Direction, OrderBy, QueryOptions};
pub use record::{column_values, map_via_json, ColumnMap, ColumnValues, FieldSlot, Record, SlotKind};
pub use resource::Resource;
pub use service::{resource_router, RequestId};
pub use setter::{row, Row, Setter};
pub use sink::{Recorder, Request, ResponseSink};
pub use validate::{ValidationErrors, Validators};
