//! HTTP Router Tests
//!
//! A resource mounted on an axum router, backed by an in-memory store:
//! writes through POST become visible to GET, and every response carries
//! a request id.

use std::sync::{Arc, Mutex};

use aerorest::{
    respond_json, BoxCursor, BoxError, ColumnMap, ColumnValues, QueryOptions, Record, Request,
    Resource, ResponseSink, Row, ServiceConfig, Setter, SyntheticCursor,
};
use aerorest::service::REQUEST_ID_HEADER;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Debug, Default, Serialize)]
struct Task {
    id: i64,
    title: String,
    done: bool,
}

impl Record for Task {
    fn describe(&mut self) -> ColumnMap<'_> {
        ColumnMap::new()
            .bind("id", &mut self.id)
            .bind("title", &mut self.title)
            .bind("done", &mut self.done)
    }
}

type Store = Arc<Mutex<Vec<Row>>>;

fn app(store: Store) -> Router {
    let reads = store.clone();
    let writes = store;
    Resource::new(Task::default).router(
        "/tasks",
        move |options: QueryOptions, _: &mut dyn ResponseSink, _: &Request| -> Result<BoxCursor, BoxError> {
            let rows: Vec<Row> = reads
                .lock()
                .map_err(|_| "store poisoned")?
                .iter()
                .skip(options.offset)
                .take(options.effective_limit(30, 30))
                .cloned()
                .collect();
            Ok(Box::new(SyntheticCursor::new(["id", "title", "done"], rows)))
        },
        move |mut values: ColumnValues, sink: &mut dyn ResponseSink, _: &Request| -> Result<(), BoxError> {
            let mut rows = writes.lock().map_err(|_| "store poisoned")?;
            let id = rows.len() as i64 + 1;
            values.insert("id".to_string(), json!(id));

            let mut row = Row::new();
            row.insert("id".to_string(), Setter::Int(id));
            if let Some(Value::String(title)) = values.get("title") {
                row.insert("title".to_string(), Setter::from(title.as_str()));
            }
            if let Some(Value::Bool(done)) = values.get("done") {
                row.insert("done".to_string(), Setter::Bool(*done));
            }
            rows.push(row);

            respond_json(StatusCode::CREATED, &values, sink)?;
            Ok(())
        },
        ServiceConfig::default(),
    )
}

async fn send(app: &Router, method: &str, uri: &str, body: &'static str) -> Response {
    let request = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_empty_list() {
    let app = app(Store::default());

    let response = send(&app, "GET", "/tasks", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json; charset=utf-8"
    );
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn test_created_tasks_are_listed() {
    let app = app(Store::default());

    let response = send(&app, "POST", "/tasks", r#"{"title":"write docs"}"#).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        json_body(response).await,
        json!({"id": 1, "title": "write docs", "done": false})
    );

    let response = send(&app, "PUT", "/tasks", r#"{"title":"ship","done":true}"#).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, "GET", "/tasks", "").await;
    assert_eq!(
        json_body(response).await,
        json!([
            {"id": 1, "title": "write docs", "done": false},
            {"id": 2, "title": "ship", "done": true},
        ])
    );

    let response = send(&app, "GET", "/tasks?offset=1", "").await;
    assert_eq!(
        json_body(response).await,
        json!([{"id": 2, "title": "ship", "done": true}])
    );
}

#[tokio::test]
async fn test_rejected_bodies() {
    let store = Store::default();
    let app = app(store.clone());

    let response = send(&app, "POST", "/tasks", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "PATCH", "/tasks", "{").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(store.lock().unwrap().is_empty());
}
