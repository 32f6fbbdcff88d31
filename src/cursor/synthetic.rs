//! Synthetic cursor for deterministic tests without a data source.

use std::collections::VecDeque;
use std::fmt;

use crate::errors::CursorError;
use crate::record::FieldSlot;
use crate::setter::{set_row, Row};

use super::RowCursor;

/// Scan callback: fill `targets` (ordered like `columns`) and report
/// whether this was the last row.
pub type ScanFn =
    Box<dyn FnMut(&[String], &mut [FieldSlot<'_>]) -> Result<bool, CursorError> + Send>;

enum Rows {
    Fixed {
        pending: VecDeque<Row>,
        current: Option<Row>,
    },
    Scripted {
        scan: ScanFn,
        stop: bool,
    },
}

/// Cursor replaying precomputed rows.
///
/// Each `advance`/`read_into` pair consumes one row; values are written
/// through the typed [`Setter`](crate::setter::Setter)s of the row.
pub struct SyntheticCursor {
    columns: Vec<String>,
    rows: Rows,
    error: Option<CursorError>,
    released: bool,
}

impl SyntheticCursor {
    pub fn new<C, I>(columns: C, rows: I) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        I: IntoIterator<Item = Row>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Rows::Fixed {
                pending: rows.into_iter().collect(),
                current: None,
            },
            error: None,
            released: false,
        }
    }

    /// Cursor driven by a scan callback.
    ///
    /// The callback runs on every `read_into`. Once it returns `Ok(true)` or
    /// an error, `advance` returns false; after an error the callback is not
    /// called again.
    pub fn from_fn<C, F>(columns: C, scan: F) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        F: FnMut(&[String], &mut [FieldSlot<'_>]) -> Result<bool, CursorError> + Send + 'static,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Rows::Scripted {
                scan: Box::new(scan),
                stop: false,
            },
            error: None,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn fail(&mut self, err: CursorError) -> CursorError {
        if self.error.is_none() {
            self.error = Some(err.clone());
        }
        self.release();
        err
    }
}

impl RowCursor for SyntheticCursor {
    fn advance(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        let more = match &mut self.rows {
            Rows::Fixed { pending, current } => {
                *current = pending.pop_front();
                current.is_some()
            }
            Rows::Scripted { stop, .. } => !*stop,
        };
        if !more {
            self.release();
        }
        more
    }

    fn read_into(&mut self, targets: &mut [FieldSlot<'_>]) -> Result<(), CursorError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if targets.len() != self.columns.len() {
            let err = CursorError::TargetCount {
                expected: self.columns.len(),
                found: targets.len(),
            };
            return Err(self.fail(err));
        }
        let result = match &mut self.rows {
            Rows::Fixed { current, .. } => match current.take() {
                Some(row) => set_row(&row, &self.columns, targets),
                None => Err(CursorError::NoRow),
            },
            Rows::Scripted { scan, stop } => scan(&self.columns, targets).map(|last| {
                *stop = last;
            }),
        };
        result.map_err(|err| self.fail(err))
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn last_error(&self) -> Option<&CursorError> {
        self.error.as_ref()
    }

    fn release(&mut self) {
        self.released = true;
    }
}

impl fmt::Debug for SyntheticCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticCursor")
            .field("columns", &self.columns)
            .field("error", &self.error)
            .field("released", &self.released)
            .finish()
    }
}
