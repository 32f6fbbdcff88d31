//! Live cursor over a data source result set.

use crate::errors::CursorError;
use crate::record::FieldSlot;

use super::RowCursor;

/// Minimal contract a data source driver's result set has to satisfy.
///
/// Drivers translate their own failures into [`CursorError::Source`].
pub trait ResultSet {
    /// Column names of the result, in positional order
    fn columns(&self) -> Result<Vec<String>, CursorError>;

    /// Step to the next row; `Ok(false)` when exhausted
    fn next_row(&mut self) -> Result<bool, CursorError>;

    /// Scan the current row into positional targets
    fn scan(&mut self, targets: &mut [FieldSlot<'_>]) -> Result<(), CursorError>;

    /// Release the result set. Called at most once.
    fn close(&mut self) -> Result<(), CursorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    OnRow,
    Exhausted,
    Failed,
}

/// Auto-closing cursor over a [`ResultSet`].
///
/// The result set is closed as soon as it is exhausted or fails, and at the
/// latest when the cursor is dropped.
pub struct SourceCursor<S: ResultSet> {
    rows: S,
    columns: Vec<String>,
    state: State,
    error: Option<CursorError>,
    closed: bool,
}

impl<S: ResultSet> SourceCursor<S> {
    pub fn new(rows: S) -> Self {
        let mut cursor = Self {
            rows,
            columns: Vec::new(),
            state: State::Ready,
            error: None,
            closed: false,
        };
        match cursor.rows.columns() {
            Ok(columns) => cursor.columns = columns,
            Err(err) => cursor.fail(err),
        }
        cursor
    }

    /// Box a freshly opened result set, or a cursor that only reports the
    /// error that prevented opening it.
    pub fn open(result: Result<S, CursorError>) -> super::BoxCursor
    where
        S: 'static,
    {
        match result {
            Ok(rows) => Box::new(Self::new(rows)),
            Err(err) => Box::new(super::FailedCursor::new(err)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn fail(&mut self, err: CursorError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.state = State::Failed;
        self.release();
    }
}

impl<S: ResultSet> RowCursor for SourceCursor<S> {
    fn advance(&mut self) -> bool {
        if matches!(self.state, State::Failed | State::Exhausted) {
            return false;
        }
        match self.rows.next_row() {
            Ok(true) => {
                self.state = State::OnRow;
                true
            }
            Ok(false) => {
                self.state = State::Exhausted;
                self.release();
                false
            }
            Err(err) => {
                self.fail(err);
                false
            }
        }
    }

    fn read_into(&mut self, targets: &mut [FieldSlot<'_>]) -> Result<(), CursorError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let result = if self.state != State::OnRow {
            Err(CursorError::NoRow)
        } else if targets.len() != self.columns.len() {
            Err(CursorError::TargetCount {
                expected: self.columns.len(),
                found: targets.len(),
            })
        } else {
            self.rows.scan(targets)
        };
        if let Err(err) = result {
            self.fail(err.clone());
            return Err(err);
        }
        Ok(())
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn last_error(&self) -> Option<&CursorError> {
        self.error.as_ref()
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.rows.close() {
            // a failing close still counts as the first error if nothing
            // else went wrong before
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
    }
}

impl<S: ResultSet> Drop for SourceCursor<S> {
    fn drop(&mut self) {
        self.release();
    }
}
