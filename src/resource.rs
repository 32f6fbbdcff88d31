//! Resources bundle what every handler of one record type shares: the
//! record factory and the error callback.

use std::fmt;
use std::sync::Arc;

use axum::Router;
use serde::Serialize;

use crate::callback::ErrorCallback;
use crate::config::ServiceConfig;
use crate::cursor::BoxCursor;
use crate::errors::BoxError;
use crate::list::{Factory, ListHandler};
use crate::mutate::MutateHandler;
use crate::options::QueryOptions;
use crate::record::{ColumnValues, Record};
use crate::service::resource_router;
use crate::sink::{Request, ResponseSink};

pub struct Resource<R> {
    factory: Factory<R>,
    on_error: Option<ErrorCallback>,
}

impl<R: Record> Resource<R> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            on_error: None,
        }
    }

    pub fn with_error_callback(self, on_error: ErrorCallback) -> Self {
        Self {
            on_error: Some(on_error),
            ..self
        }
    }

    /// List handler backed by `query`
    pub fn list<Q>(&self, query: Q) -> ListHandler<R>
    where
        R: Serialize,
        Q: Fn(QueryOptions, &mut dyn ResponseSink, &Request) -> Result<BoxCursor, BoxError>
            + Send
            + Sync
            + 'static,
    {
        ListHandler::from_parts(self.factory.clone(), Arc::new(query), self.on_error.clone())
    }

    /// Mutate handler backed by `effect`
    pub fn mutate<X>(&self, effect: X) -> MutateHandler<R>
    where
        X: Fn(ColumnValues, &mut dyn ResponseSink, &Request) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        MutateHandler::from_parts(self.factory.clone(), Arc::new(effect), self.on_error.clone())
    }

    /// Run a one-off list handler for `request`
    pub fn serve_list<Q>(&self, query: Q, sink: &mut dyn ResponseSink, request: &Request)
    where
        R: Serialize,
        Q: Fn(QueryOptions, &mut dyn ResponseSink, &Request) -> Result<BoxCursor, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.list(query).serve(sink, request);
    }

    /// Run a one-off mutate handler for `request`
    pub fn serve_mutate<X>(&self, effect: X, sink: &mut dyn ResponseSink, request: &Request)
    where
        X: Fn(ColumnValues, &mut dyn ResponseSink, &Request) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.mutate(effect).serve(sink, request);
    }

    /// Router serving `GET` from `query` and `POST`/`PUT`/`PATCH` through
    /// `effect`, all at `path`
    pub fn router<Q, X>(&self, path: &str, query: Q, effect: X, config: ServiceConfig) -> Router
    where
        R: Serialize,
        Q: Fn(QueryOptions, &mut dyn ResponseSink, &Request) -> Result<BoxCursor, BoxError>
            + Send
            + Sync
            + 'static,
        X: Fn(ColumnValues, &mut dyn ResponseSink, &Request) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        resource_router(path, self.list(query), self.mutate(effect), config)
    }
}

impl<R> Clone for Resource<R> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<R> fmt::Debug for Resource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("record", &std::any::type_name::<R>())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
