//! # Mutate Handler
//!
//! Runs one create/update request: decode the body into a fresh record,
//! validate it for the request method, read its column values and hand
//! them to the effect function, which owns the success response.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::callback::ErrorCallback;
use crate::decoder::{JsonDecoder, RequestDecoder};
use crate::encoder::respond_json;
use crate::errors::{BoxError, HandlerError, HandlerResult};
use crate::list::Factory;
use crate::record::{ColumnValues, Record};
use crate::sink::{Request, ResponseSink};
use crate::validate::Validators;

/// Effect function.
///
/// Writes the success response itself. An error return is only routed to
/// the error callback; whatever was written stays written.
pub type EffectFn =
    Arc<dyn Fn(ColumnValues, &mut dyn ResponseSink, &Request) -> Result<(), BoxError> + Send + Sync>;

pub struct MutateHandler<R> {
    factory: Factory<R>,
    effect: EffectFn,
    decoder: Arc<dyn RequestDecoder<R>>,
    validators: Validators<R>,
    on_error: Option<ErrorCallback>,
}

impl<R: Record> MutateHandler<R> {
    /// Handler decoding JSON bodies and validating with `R::validators()`
    pub fn new<F, X>(factory: F, effect: X) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        X: Fn(ColumnValues, &mut dyn ResponseSink, &Request) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self::from_parts(Arc::new(factory), Arc::new(effect), None)
    }

    pub(crate) fn from_parts(
        factory: Factory<R>,
        effect: EffectFn,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        Self {
            factory,
            effect,
            decoder: Arc::new(JsonDecoder),
            validators: R::validators(),
            on_error,
        }
    }

    pub fn with_decoder<D>(self, decoder: D) -> Self
    where
        D: RequestDecoder<R> + 'static,
    {
        Self {
            decoder: Arc::new(decoder),
            ..self
        }
    }

    pub fn with_error_callback(self, on_error: ErrorCallback) -> Self {
        Self {
            on_error: Some(on_error),
            ..self
        }
    }

    /// Replace the validators resolved from the record type
    pub fn with_validators(self, validators: Validators<R>) -> Self {
        Self { validators, ..self }
    }

    /// Handle one request, reporting a failure to the error callback.
    ///
    /// Rejected validation is an answer, not a failure, and is not reported.
    pub fn serve(&self, sink: &mut dyn ResponseSink, request: &Request) {
        if let Err(err) = self.run(sink, request) {
            if let Some(on_error) = &self.on_error {
                on_error(request, &err);
            }
        }
    }

    fn run(&self, sink: &mut dyn ResponseSink, request: &Request) -> HandlerResult<()> {
        if request.body().is_empty() {
            sink.write_status(StatusCode::BAD_REQUEST);
            return Err(HandlerError::EmptyBody);
        }

        let mut record = (self.factory)();
        if let Err(err) = self.decoder.decode(request, &mut record) {
            sink.write_status(StatusCode::BAD_REQUEST);
            return Err(err.into());
        }

        if let Some(validate) = self.validators.resolve(request.method()) {
            let errors = validate(&record);
            if !errors.is_empty() {
                return respond_json(StatusCode::BAD_REQUEST, &errors, sink);
            }
        }

        let values = match record.describe().values() {
            Ok(values) => values,
            Err(err) => {
                sink.write_status(StatusCode::INTERNAL_SERVER_ERROR);
                return Err(err.into());
            }
        };

        (self.effect)(values, sink, request).map_err(HandlerError::Effect)
    }
}

impl<R> Clone for MutateHandler<R> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            effect: self.effect.clone(),
            decoder: self.decoder.clone(),
            validators: self.validators,
            on_error: self.on_error.clone(),
        }
    }
}

impl<R> fmt::Debug for MutateHandler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutateHandler")
            .field("record", &std::any::type_name::<R>())
            .field("validators", &self.validators)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
