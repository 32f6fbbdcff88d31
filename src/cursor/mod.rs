//! # Row Cursors
//!
//! A row cursor is a forward-only view over a result set that scans rows
//! into record slots. Two variants exist:
//!
//! - [`SourceCursor`] wraps a live [`ResultSet`] from a data source driver
//! - [`SyntheticCursor`] replays precomputed rows for tests
//!
//! Both share the same state rules: the first error is sticky, a failed
//! cursor does no further work, and the underlying resources are released
//! exactly once, on exhaustion, on failure or when the owner drops it.

mod source;
mod synthetic;

pub use source::{ResultSet, SourceCursor};
pub use synthetic::SyntheticCursor;

use std::ops::{Deref, DerefMut};

use crate::errors::CursorError;
use crate::record::FieldSlot;

/// Cursor handed from a query function to the list handler
pub type BoxCursor = Box<dyn RowCursor>;

pub trait RowCursor {
    /// Move to the next row. Returns false when no rows remain or an
    /// error happened earlier.
    fn advance(&mut self) -> bool;

    /// Scan the current row into `targets`, ordered like [`columns`].
    ///
    /// On error the cursor fails and releases its resources.
    ///
    /// [`columns`]: RowCursor::columns
    fn read_into(&mut self, targets: &mut [FieldSlot<'_>]) -> Result<(), CursorError>;

    /// Column names of the result, in scan order
    fn columns(&self) -> &[String];

    /// The first error that happened, if any
    fn last_error(&self) -> Option<&CursorError>;

    /// Release underlying resources. Idempotent.
    fn release(&mut self);
}

/// A cursor that never yields rows and only reports `error`.
///
/// Useful when opening a result set already failed but the query function
/// still wants to hand the failure to the list handler.
#[derive(Debug, Clone)]
pub struct FailedCursor {
    error: CursorError,
}

impl FailedCursor {
    pub fn new(error: CursorError) -> Self {
        Self { error }
    }
}

impl RowCursor for FailedCursor {
    fn advance(&mut self) -> bool {
        false
    }

    fn read_into(&mut self, _targets: &mut [FieldSlot<'_>]) -> Result<(), CursorError> {
        Err(self.error.clone())
    }

    fn columns(&self) -> &[String] {
        &[]
    }

    fn last_error(&self) -> Option<&CursorError> {
        Some(&self.error)
    }

    fn release(&mut self) {}
}

/// Owns a cursor for the duration of a request and releases it on drop.
pub(crate) struct ReleaseOnDrop(BoxCursor);

impl ReleaseOnDrop {
    pub(crate) fn new(cursor: BoxCursor) -> Self {
        Self(cursor)
    }
}

impl Deref for ReleaseOnDrop {
    type Target = dyn RowCursor;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for ReleaseOnDrop {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_cursor_is_sticky() {
        let mut cursor = FailedCursor::new(CursorError::Source("connection refused".to_string()));

        assert!(!cursor.advance());
        assert!(cursor.read_into(&mut []).is_err());
        assert!(!cursor.advance());
        assert_eq!(
            cursor.last_error(),
            Some(&CursorError::Source("connection refused".to_string()))
        );
        assert!(cursor.columns().is_empty());
    }
}
