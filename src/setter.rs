//! Typed value setters for synthetic rows.
//!
//! A [`Setter`] carries one precomputed column value and knows which slot
//! kinds it may be written into. Writing into any other kind fails with a
//! [`SetError`] instead of coercing.

use std::collections::BTreeMap;

use crate::errors::{CursorError, SetError};
use crate::record::FieldSlot;

/// One precomputed row: column name to value.
pub type Row = BTreeMap<String, Setter>;

#[derive(Debug, Clone, PartialEq)]
pub enum Setter {
    Int(i64),
    Float64(f64),
    String(String),
    Bool(bool),
    /// SQL NULL; only nullable slots accept it
    Null,
}

impl Setter {
    /// Name of the slot type this setter writes into
    pub fn expected(&self) -> &'static str {
        match self {
            Setter::Int(_) => "i64",
            Setter::Float64(_) => "f64",
            Setter::String(_) => "String",
            Setter::Bool(_) => "bool",
            Setter::Null => "Option<_>",
        }
    }

    /// Write the value into `slot`, which is bound to `column`.
    pub fn set(&self, column: &str, slot: &mut FieldSlot<'_>) -> Result<(), SetError> {
        match (self, slot) {
            (Setter::Int(v), FieldSlot::Int(t)) => **t = *v,
            (Setter::Int(v), FieldSlot::NullableInt(t)) => **t = Some(*v),
            (Setter::Float64(v), FieldSlot::Float64(t)) => **t = *v,
            (Setter::Float64(v), FieldSlot::NullableFloat64(t)) => **t = Some(*v),
            (Setter::String(v), FieldSlot::String(t)) => **t = v.clone(),
            (Setter::String(v), FieldSlot::NullableString(t)) => **t = Some(v.clone()),
            (Setter::Bool(v), FieldSlot::Bool(t)) => **t = *v,
            (Setter::Bool(v), FieldSlot::NullableBool(t)) => **t = Some(*v),
            (Setter::Null, FieldSlot::NullableInt(t)) => **t = None,
            (Setter::Null, FieldSlot::NullableFloat64(t)) => **t = None,
            (Setter::Null, FieldSlot::NullableString(t)) => **t = None,
            (Setter::Null, FieldSlot::NullableBool(t)) => **t = None,
            (setter, target) => {
                return Err(SetError {
                    column: column.to_string(),
                    expected: setter.expected(),
                    found: target.kind(),
                })
            }
        }
        Ok(())
    }
}

impl From<i64> for Setter {
    fn from(v: i64) -> Self {
        Setter::Int(v)
    }
}

impl From<i32> for Setter {
    fn from(v: i32) -> Self {
        Setter::Int(v.into())
    }
}

impl From<f64> for Setter {
    fn from(v: f64) -> Self {
        Setter::Float64(v)
    }
}

impl From<&str> for Setter {
    fn from(v: &str) -> Self {
        Setter::String(v.to_string())
    }
}

impl From<String> for Setter {
    fn from(v: String) -> Self {
        Setter::String(v)
    }
}

impl From<bool> for Setter {
    fn from(v: bool) -> Self {
        Setter::Bool(v)
    }
}

impl<T: Into<Setter>> From<Option<T>> for Setter {
    fn from(v: Option<T>) -> Self {
        v.map_or(Setter::Null, Into::into)
    }
}

/// Build a [`Row`] from `(column, value)` pairs.
pub fn row<K, I>(pairs: I) -> Row
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Setter)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Write `row` into positional `targets` ordered like `columns`.
///
/// Columns the row has no value for are left untouched.
pub fn set_row(
    row: &Row,
    columns: &[String],
    targets: &mut [FieldSlot<'_>],
) -> Result<(), CursorError> {
    if targets.len() != columns.len() {
        return Err(CursorError::TargetCount {
            expected: columns.len(),
            found: targets.len(),
        });
    }
    for (column, target) in columns.iter().zip(targets.iter_mut()) {
        if let Some(setter) = row.get(column) {
            setter.set(column, target)?;
        }
    }
    Ok(())
}
