//! Observability for aerorest
//!
//! Structured one-line JSON logging. The handler pipelines never log on
//! their own; events come from the ready-made error callbacks in
//! [`crate::callback`] and from the axum adapter.

mod logger;

pub use logger::{Logger, Severity};
