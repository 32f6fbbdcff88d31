//! List Streaming Tests
//!
//! End-to-end list requests against an in-memory table:
//! - streamed output parses back into the rows the table holds
//! - query options reach the query function and shape the result
//! - failures after the first row still produce a closed array
//! - the cursor is released exactly once on every path

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aerorest::setter::set_row;
use aerorest::{
    row, BoxCursor, BoxError, ColumnMap, CursorError, FieldSlot, HandlerError, ListHandler,
    QueryOptions, Recorder, Record, Request, ResponseSink, ResultSet, Row, ServiceConfig,
    SourceCursor,
};
use axum::body::Bytes;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

// =============================================================================
// Helpers
// =============================================================================

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    #[serde(rename = "Id")]
    id: i64,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Email")]
    email: Option<String>,
}

impl Record for Person {
    fn describe(&mut self) -> ColumnMap<'_> {
        ColumnMap::new()
            .bind("Id", &mut self.id)
            .bind("Name", &mut self.name)
            .bind("Email", &mut self.email)
    }
}

/// Result set over rows held in memory, counting closes.
struct Table {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
    current: Option<Row>,
    fail_after: Option<usize>,
    served: usize,
    closes: Arc<AtomicUsize>,
}

impl Table {
    fn new(rows: Vec<Row>, closes: Arc<AtomicUsize>) -> Self {
        Self {
            columns: vec!["Id".to_string(), "Name".to_string(), "Email".to_string()],
            rows: rows.into_iter(),
            current: None,
            fail_after: None,
            served: 0,
            closes,
        }
    }
}

impl ResultSet for Table {
    fn columns(&self) -> Result<Vec<String>, CursorError> {
        Ok(self.columns.clone())
    }

    fn next_row(&mut self) -> Result<bool, CursorError> {
        if self.fail_after == Some(self.served) {
            return Err(CursorError::Source("connection reset".to_string()));
        }
        self.current = self.rows.next();
        if self.current.is_some() {
            self.served += 1;
        }
        Ok(self.current.is_some())
    }

    fn scan(&mut self, targets: &mut [FieldSlot<'_>]) -> Result<(), CursorError> {
        match &self.current {
            Some(row) => set_row(row, &self.columns, targets),
            None => Err(CursorError::NoRow),
        }
    }

    fn close(&mut self) -> Result<(), CursorError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn people(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let email = if i % 2 == 0 {
                Some(format!("p{i}@example.com"))
            } else {
                None
            };
            row([
                ("Id", (i as i64 + 1).into()),
                ("Name", format!("person-{i:02}").into()),
                ("Email", email.into()),
            ])
        })
        .collect()
}

fn get(uri: &str) -> Request {
    axum::http::Request::builder().uri(uri).body(Bytes::new()).unwrap()
}

fn collector() -> (aerorest::ErrorCallback, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: aerorest::ErrorCallback = Arc::new(move |_: &Request, err: &HandlerError| {
        sink.lock().unwrap().push(err.to_string());
    });
    (callback, seen)
}

fn table_handler(count: usize, closes: Arc<AtomicUsize>) -> ListHandler<Person> {
    ListHandler::new(
        Person::default,
        move |_: QueryOptions, _: &mut dyn ResponseSink, _: &Request| -> Result<BoxCursor, BoxError> {
            Ok(SourceCursor::open(Ok(Table::new(people(count), closes.clone()))))
        },
    )
}

// =============================================================================
// Round Trip
// =============================================================================

/// Streaming N rows and parsing the body yields the same N records.
#[test]
fn test_round_trip_for_zero_one_and_many_rows() {
    for count in [0, 1, 25] {
        let closes = Arc::new(AtomicUsize::new(0));
        let handler = table_handler(count, closes.clone());

        let mut rec = Recorder::new();
        handler.serve(&mut rec, &get("/people"));

        assert_eq!(rec.status(), StatusCode::OK);
        assert_eq!(rec.content_type(), Some("application/json; charset=utf-8"));

        let decoded: Vec<Person> = serde_json::from_slice(rec.body()).unwrap();
        assert_eq!(decoded.len(), count);
        for (i, person) in decoded.iter().enumerate() {
            assert_eq!(person.id, i as i64 + 1);
            assert_eq!(person.name, format!("person-{i:02}"));
            assert_eq!(person.email.is_some(), i % 2 == 0);
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}

/// NULL columns come out as JSON null, not as an empty string.
#[test]
fn test_null_column_streams_as_null() {
    let handler = table_handler(2, Arc::new(AtomicUsize::new(0)));

    let mut rec = Recorder::new();
    handler.serve(&mut rec, &get("/people"));

    assert_eq!(
        rec.body_str(),
        "[{\"Id\":1,\"Name\":\"person-00\",\"Email\":\"p0@example.com\"}\n\
         ,{\"Id\":2,\"Name\":\"person-01\",\"Email\":null}\n]"
    );
}

// =============================================================================
// Query Options
// =============================================================================

/// The query function pages and sorts with the parsed options.
#[test]
fn test_options_shape_the_result() {
    let config = ServiceConfig {
        max_limit: 100,
        ..Default::default()
    };
    let handler = ListHandler::new(
        Person::default,
        move |options: QueryOptions, _: &mut dyn ResponseSink, _: &Request| -> Result<BoxCursor, BoxError> {
            let mut rows = people(10);
            if options.order_clause_in(&["Id", "Name"], "Id ASC") == "Id DESC" {
                rows.reverse();
            }
            let rows: Vec<Row> = rows
                .into_iter()
                .skip(options.offset)
                .take(config.limit_for(&options))
                .collect();
            Ok(SourceCursor::open(Ok(Table::new(rows, Arc::new(AtomicUsize::new(0))))))
        },
    );

    let mut rec = Recorder::new();
    handler.serve(&mut rec, &get("/people?limit=3&offset=2&sort=-Id"));

    let decoded: Vec<Person> = serde_json::from_slice(rec.body()).unwrap();
    let ids: Vec<i64> = decoded.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![8, 7, 6]);
}

// =============================================================================
// Failures
// =============================================================================

/// A data source failing mid-stream still leaves a well-formed array.
#[test]
fn test_source_failure_mid_stream_closes_array() {
    let (callback, seen) = collector();
    let closes = Arc::new(AtomicUsize::new(0));
    let source_closes = closes.clone();
    let handler = ListHandler::new(
        Person::default,
        move |_: QueryOptions, _: &mut dyn ResponseSink, _: &Request| -> Result<BoxCursor, BoxError> {
            let mut table = Table::new(people(5), source_closes.clone());
            table.fail_after = Some(2);
            Ok(SourceCursor::open(Ok(table)))
        },
    )
    .with_error_callback(callback);

    let mut rec = Recorder::new();
    handler.serve(&mut rec, &get("/people"));

    assert_eq!(rec.status(), StatusCode::OK);
    let decoded: Vec<Person> = serde_json::from_slice(rec.body()).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["data source error: connection reset".to_string()]
    );
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

/// A cursor that failed to open is refused with 500 and no body.
#[test]
fn test_failed_open_is_500() {
    let (callback, seen) = collector();
    let handler = ListHandler::new(
        Person::default,
        |_: QueryOptions, _: &mut dyn ResponseSink, _: &Request| -> Result<BoxCursor, BoxError> {
            Ok(SourceCursor::<Table>::open(Err(CursorError::Source(
                "relation does not exist".to_string(),
            ))))
        },
    )
    .with_error_callback(callback);

    let mut rec = Recorder::new();
    handler.serve(&mut rec, &get("/people"));

    assert_eq!(rec.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(rec.body().is_empty());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

/// A column of the wrong type ends the stream after the good rows.
#[test]
fn test_type_mismatch_stops_stream() {
    let (callback, seen) = collector();
    let handler = ListHandler::new(
        Person::default,
        |_: QueryOptions, _: &mut dyn ResponseSink, _: &Request| -> Result<BoxCursor, BoxError> {
            let mut rows = people(1);
            rows.push(row([("Id", "not-a-number".into())]));
            Ok(SourceCursor::open(Ok(Table::new(rows, Arc::new(AtomicUsize::new(0))))))
        },
    )
    .with_error_callback(callback);

    let mut rec = Recorder::new();
    handler.serve(&mut rec, &get("/people"));

    let decoded: Vec<Person> = serde_json::from_slice(rec.body()).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["wrong type of target for column 'Id', must be 'String' but is 'i64'".to_string()]
    );
}
