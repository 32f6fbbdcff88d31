//! # List Handler
//!
//! Runs one list request:
//!
//! 1. parse [`QueryOptions`] from the query string
//! 2. ask the query function for a cursor
//! 3. refuse with 500 if the cursor already failed
//! 4. open the stream encoder (commits status and opening bracket)
//! 5. scan every row into a fresh record and encode it
//!
//! Errors before step 4 can still pick a status. Errors after it only stop
//! the stream; the encoder guard closes the array and the cursor guard
//! releases the cursor on the way out.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;

use crate::callback::ErrorCallback;
use crate::cursor::{BoxCursor, ReleaseOnDrop};
use crate::encoder::{EncodedStream, JsonStreamer, StreamEncoder};
use crate::errors::{BoxError, HandlerError, HandlerResult};
use crate::options::QueryOptions;
use crate::record::Record;
use crate::sink::{Request, ResponseSink};

/// Produces a fresh, zero-valued record
pub type Factory<R> = Arc<dyn Fn() -> R + Send + Sync>;

/// Query function.
///
/// When it returns an error it must already have written a status. When it
/// returns a cursor it must not have written any body bytes.
pub type QueryFn =
    Arc<dyn Fn(QueryOptions, &mut dyn ResponseSink, &Request) -> Result<BoxCursor, BoxError> + Send + Sync>;

/// Streams query results as a JSON array of records.
pub struct ListHandler<R, E = JsonStreamer> {
    factory: Factory<R>,
    query: QueryFn,
    on_error: Option<ErrorCallback>,
    _encoder: PhantomData<fn() -> E>,
}

impl<R> ListHandler<R>
where
    R: Record + Serialize,
{
    pub fn new<F, Q>(factory: F, query: Q) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        Q: Fn(QueryOptions, &mut dyn ResponseSink, &Request) -> Result<BoxCursor, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self::from_parts(Arc::new(factory), Arc::new(query), None)
    }

    pub(crate) fn from_parts(
        factory: Factory<R>,
        query: QueryFn,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        Self {
            factory,
            query,
            on_error,
            _encoder: PhantomData,
        }
    }
}

impl<R, E> ListHandler<R, E>
where
    R: Record + Serialize,
    E: StreamEncoder + Default,
{
    pub fn with_error_callback(self, on_error: ErrorCallback) -> Self {
        Self {
            on_error: Some(on_error),
            ..self
        }
    }

    /// Same handler writing through another stream encoder
    pub fn with_encoder<E2>(self) -> ListHandler<R, E2>
    where
        E2: StreamEncoder + Default,
    {
        ListHandler {
            factory: self.factory,
            query: self.query,
            on_error: self.on_error,
            _encoder: PhantomData,
        }
    }

    /// Handle one request, reporting a failure to the error callback.
    pub fn serve(&self, sink: &mut dyn ResponseSink, request: &Request) {
        if let Err(err) = self.run(sink, request) {
            if let Some(on_error) = &self.on_error {
                on_error(request, &err);
            }
        }
    }

    fn run(&self, sink: &mut dyn ResponseSink, request: &Request) -> HandlerResult<()> {
        let options = QueryOptions::from_query(request.uri().query().unwrap_or(""));

        // the query function has written its own status on error
        let cursor = (self.query)(options, &mut *sink, request).map_err(HandlerError::Query)?;
        let mut cursor = ReleaseOnDrop::new(cursor);

        if let Some(err) = cursor.last_error() {
            let err = err.clone();
            sink.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            return Err(err.into());
        }

        let mut stream = EncodedStream::open(sink, E::default())?;

        while cursor.advance() {
            let mut record = (self.factory)();
            {
                let mut targets = record.describe().targets_for(cursor.columns())?;
                cursor.read_into(&mut targets)?;
            }
            stream.encode(&record)?;
        }

        // an advance that failed ends the loop like exhaustion does
        if let Some(err) = cursor.last_error() {
            return Err(err.clone().into());
        }

        stream.finish()
    }
}

impl<R, E> Clone for ListHandler<R, E> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            query: self.query.clone(),
            on_error: self.on_error.clone(),
            _encoder: PhantomData,
        }
    }
}

impl<R, E> fmt::Debug for ListHandler<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListHandler")
            .field("record", &std::any::type_name::<R>())
            .field("encoder", &std::any::type_name::<E>())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
