//! # axum Adapter
//!
//! Handlers are synchronous and write through a [`ResponseSink`]. The
//! adapter collects the request body, runs the handler on the blocking
//! pool and turns the sink into a streaming axum response:
//!
//! - the head (status and headers) is sent once, on first commit
//! - body chunks travel through a bounded channel into `Body::from_stream`
//! - a handler that panics before committing becomes a bare 500
//!
//! Every request carries a [`RequestId`] extension, echoed back in the
//! `x-request-id` response header.

use std::fmt;
use std::io;
use std::mem;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, on, MethodFilter, MethodRouter};
use axum::Router;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinError;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::encoder::StreamEncoder;
use crate::list::ListHandler;
use crate::mutate::MutateHandler;
use crate::observability::Logger;
use crate::record::Record;
use crate::sink::{Request, ResponseSink};

/// Response header carrying the request id
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Identifies one request in logs and error callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Head {
    status: StatusCode,
    headers: HeaderMap,
}

type Chunk = Result<Bytes, io::Error>;

/// Sink living on the blocking thread, feeding the async response.
struct StreamingSink {
    headers: HeaderMap,
    head: Option<oneshot::Sender<Head>>,
    body: mpsc::Sender<Chunk>,
}

impl StreamingSink {
    fn new(head: oneshot::Sender<Head>, body: mpsc::Sender<Chunk>) -> Self {
        Self {
            headers: HeaderMap::new(),
            head: Some(head),
            body,
        }
    }

    fn commit(&mut self, status: StatusCode) {
        if let Some(head) = self.head.take() {
            let headers = mem::take(&mut self.headers);
            // receiver gone means the client went away; writes will fail next
            let _ = head.send(Head { status, headers });
        }
    }

    /// Commit a 200 if the handler wrote nothing, then close the body
    fn finish(mut self) {
        self.commit(StatusCode::OK);
    }
}

impl ResponseSink for StreamingSink {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.commit(status);
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.commit(StatusCode::OK);
        if bytes.is_empty() {
            return Ok(());
        }
        self.body
            .blocking_send(Ok(Bytes::copy_from_slice(bytes)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body closed"))
    }

    fn is_committed(&self) -> bool {
        self.head.is_none()
    }
}

/// Run a list handler for one axum request
pub async fn serve_list<R, E>(
    handler: ListHandler<R, E>,
    config: &ServiceConfig,
    request: axum::extract::Request,
) -> Response
where
    R: Record + Serialize,
    E: StreamEncoder + Default + 'static,
{
    run_blocking(config, request, move |sink, request| handler.serve(sink, request)).await
}

/// Run a mutate handler for one axum request
pub async fn serve_mutate<R>(
    handler: MutateHandler<R>,
    config: &ServiceConfig,
    request: axum::extract::Request,
) -> Response
where
    R: Record,
{
    run_blocking(config, request, move |sink, request| handler.serve(sink, request)).await
}

/// `GET` route for a list handler
pub fn list_route<R, E>(handler: ListHandler<R, E>, config: Arc<ServiceConfig>) -> MethodRouter
where
    R: Record + Serialize,
    E: StreamEncoder + Default + 'static,
{
    get(move |request: axum::extract::Request| {
        let handler = handler.clone();
        let config = config.clone();
        async move { serve_list(handler, &config, request).await }
    })
}

/// `POST`, `PUT` and `PATCH` route for a mutate handler
pub fn mutate_route<R>(handler: MutateHandler<R>, config: Arc<ServiceConfig>) -> MethodRouter
where
    R: Record,
{
    let methods = MethodFilter::POST.or(MethodFilter::PUT).or(MethodFilter::PATCH);
    on(methods, move |request: axum::extract::Request| {
        let handler = handler.clone();
        let config = config.clone();
        async move { serve_mutate(handler, &config, request).await }
    })
}

/// Router mounting both handlers of one resource at `path`
pub fn resource_router<R, E>(
    path: &str,
    list: ListHandler<R, E>,
    mutate: MutateHandler<R>,
    config: ServiceConfig,
) -> Router
where
    R: Record + Serialize,
    E: StreamEncoder + Default + 'static,
{
    let config = Arc::new(config);
    Router::new().route(
        path,
        list_route(list, config.clone()).merge(mutate_route(mutate, config)),
    )
}

async fn run_blocking<F>(
    config: &ServiceConfig,
    request: axum::extract::Request,
    serve: F,
) -> Response
where
    F: FnOnce(&mut dyn ResponseSink, &Request) + Send + 'static,
{
    let (mut parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            Logger::warn(
                "REQUEST_BODY_REJECTED",
                &[("path", parts.uri.path()), ("error", &err.to_string())],
            );
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let id = match parts.extensions.get::<RequestId>() {
        Some(id) => *id,
        None => {
            let id = RequestId::new();
            parts.extensions.insert(id);
            id
        }
    };
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    let request = Request::from_parts(parts, bytes);

    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(config.channel_capacity());
    let task = tokio::task::spawn_blocking(move || {
        let mut sink = StreamingSink::new(head_tx, body_tx);
        serve(&mut sink, &request);
        sink.finish();
    });

    let mut response = match head_rx.await {
        Ok(head) => {
            // the handler keeps streaming after the head is out
            tokio::spawn(async move {
                if let Err(err) = task.await {
                    log_panic(&method, &path, id, &err);
                }
            });
            let mut response = Response::new(Body::from_stream(ReceiverStream::new(body_rx)));
            *response.status_mut() = head.status;
            *response.headers_mut() = head.headers;
            response
        }
        Err(_) => {
            if let Err(err) = task.await {
                log_panic(&method, &path, id, &err);
            }
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn log_panic(method: &str, path: &str, id: RequestId, err: &JoinError) {
    Logger::error(
        "HANDLER_PANICKED",
        &[
            ("method", method),
            ("path", path),
            ("request_id", &id.to_string()),
            ("error", &err.to_string()),
        ],
    );
}
