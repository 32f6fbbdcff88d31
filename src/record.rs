//! # Column Mapper
//!
//! Records describe themselves as an ordered set of column bindings. Each
//! binding is a [`FieldSlot`]: a typed, writable reference to exactly one
//! field of the record. The same description is used to build scan targets
//! for a cursor and to read the current values back out as JSON.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{CursorError, MapError};
use crate::validate::Validators;

/// Column name to JSON value, as handed to effect functions.
pub type ColumnValues = Map<String, Value>;

/// An application-defined row type bound to named columns.
///
/// A record is created fresh for every request (or every scanned row) by a
/// factory and never shared between requests.
///
/// ```ignore
/// #[derive(Default, Serialize)]
/// struct Person {
///     #[serde(rename = "Id")]
///     id: i64,
///     #[serde(rename = "Name")]
///     name: String,
/// }
///
/// impl Record for Person {
///     fn describe(&mut self) -> ColumnMap<'_> {
///         ColumnMap::new().bind("Id", &mut self.id).bind("Name", &mut self.name)
///     }
/// }
/// ```
pub trait Record: 'static {
    /// Bind every column this record knows to the field backing it.
    fn describe(&mut self) -> ColumnMap<'_>;

    /// Validators for incoming bodies, resolved once when a handler is built.
    fn validators() -> Validators<Self>
    where
        Self: Sized,
    {
        Validators::none()
    }
}

/// The storage kind behind a [`FieldSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Int,
    Float64,
    String,
    Bool,
    NullableInt,
    NullableFloat64,
    NullableString,
    NullableBool,
}

impl SlotKind {
    /// Rust spelling of the backing type, used in mismatch errors
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Int => "i64",
            SlotKind::Float64 => "f64",
            SlotKind::String => "String",
            SlotKind::Bool => "bool",
            SlotKind::NullableInt => "Option<i64>",
            SlotKind::NullableFloat64 => "Option<f64>",
            SlotKind::NullableString => "Option<String>",
            SlotKind::NullableBool => "Option<bool>",
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            SlotKind::NullableInt
                | SlotKind::NullableFloat64
                | SlotKind::NullableString
                | SlotKind::NullableBool
        )
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writable reference to one record field.
#[derive(Debug)]
pub enum FieldSlot<'a> {
    Int(&'a mut i64),
    Float64(&'a mut f64),
    String(&'a mut String),
    Bool(&'a mut bool),
    NullableInt(&'a mut Option<i64>),
    NullableFloat64(&'a mut Option<f64>),
    NullableString(&'a mut Option<String>),
    NullableBool(&'a mut Option<bool>),
}

impl<'a> FieldSlot<'a> {
    pub fn kind(&self) -> SlotKind {
        match self {
            FieldSlot::Int(_) => SlotKind::Int,
            FieldSlot::Float64(_) => SlotKind::Float64,
            FieldSlot::String(_) => SlotKind::String,
            FieldSlot::Bool(_) => SlotKind::Bool,
            FieldSlot::NullableInt(_) => SlotKind::NullableInt,
            FieldSlot::NullableFloat64(_) => SlotKind::NullableFloat64,
            FieldSlot::NullableString(_) => SlotKind::NullableString,
            FieldSlot::NullableBool(_) => SlotKind::NullableBool,
        }
    }

    /// Current value of the field as JSON.
    ///
    /// Returns `None` for values JSON cannot carry (NaN and infinities).
    pub fn to_value(&self) -> Option<Value> {
        let value = match self {
            FieldSlot::Int(v) => Value::from(**v),
            FieldSlot::Float64(v) => Value::Number(serde_json::Number::from_f64(**v)?),
            FieldSlot::String(v) => Value::String((**v).clone()),
            FieldSlot::Bool(v) => Value::Bool(**v),
            FieldSlot::NullableInt(v) => (**v).map_or(Value::Null, Value::from),
            FieldSlot::NullableFloat64(v) => match **v {
                Some(f) => Value::Number(serde_json::Number::from_f64(f)?),
                None => Value::Null,
            },
            FieldSlot::NullableString(v) => (**v).clone().map_or(Value::Null, Value::String),
            FieldSlot::NullableBool(v) => (**v).map_or(Value::Null, Value::Bool),
        };
        Some(value)
    }

    /// Write a decoded JSON value into the slot.
    ///
    /// `null` clears nullable slots and leaves plain slots untouched.
    pub fn set_json(&mut self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            match self {
                FieldSlot::NullableInt(v) => **v = None,
                FieldSlot::NullableFloat64(v) => **v = None,
                FieldSlot::NullableString(v) => **v = None,
                FieldSlot::NullableBool(v) => **v = None,
                _ => {}
            }
            return Ok(());
        }
        let kind = self.kind();
        let mismatch = || format!("expected {}, got {}", kind, json_type_name(value));
        match self {
            FieldSlot::Int(v) => **v = value.as_i64().ok_or_else(mismatch)?,
            FieldSlot::Float64(v) => **v = value.as_f64().ok_or_else(mismatch)?,
            FieldSlot::String(v) => **v = value.as_str().ok_or_else(mismatch)?.to_string(),
            FieldSlot::Bool(v) => **v = value.as_bool().ok_or_else(mismatch)?,
            FieldSlot::NullableInt(v) => **v = Some(value.as_i64().ok_or_else(mismatch)?),
            FieldSlot::NullableFloat64(v) => **v = Some(value.as_f64().ok_or_else(mismatch)?),
            FieldSlot::NullableString(v) => {
                **v = Some(value.as_str().ok_or_else(mismatch)?.to_string())
            }
            FieldSlot::NullableBool(v) => **v = Some(value.as_bool().ok_or_else(mismatch)?),
        }
        Ok(())
    }

    /// Parse a textual value (form fields) into the slot.
    ///
    /// Empty text clears nullable slots.
    pub fn parse_text(&mut self, text: &str) -> Result<(), String> {
        let nullable_empty = self.kind().is_nullable() && text.is_empty();
        match self {
            FieldSlot::Int(v) => **v = parse_int(text)?,
            FieldSlot::Float64(v) => **v = parse_float(text)?,
            FieldSlot::String(v) => **v = text.to_string(),
            FieldSlot::Bool(v) => **v = parse_bool(text)?,
            FieldSlot::NullableInt(v) if nullable_empty => **v = None,
            FieldSlot::NullableFloat64(v) if nullable_empty => **v = None,
            FieldSlot::NullableString(v) if nullable_empty => **v = None,
            FieldSlot::NullableBool(v) if nullable_empty => **v = None,
            FieldSlot::NullableInt(v) => **v = Some(parse_int(text)?),
            FieldSlot::NullableFloat64(v) => **v = Some(parse_float(text)?),
            FieldSlot::NullableString(v) => **v = Some(text.to_string()),
            FieldSlot::NullableBool(v) => **v = Some(parse_bool(text)?),
        }
        Ok(())
    }
}

fn parse_int(text: &str) -> Result<i64, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("'{}' is not an integer", text))
}

fn parse_float(text: &str) -> Result<f64, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", text))
}

fn parse_bool(text: &str) -> Result<bool, String> {
    match text.trim() {
        "true" | "on" | "1" => Ok(true),
        "false" | "off" | "0" => Ok(false),
        _ => Err(format!("'{}' is not a boolean", text)),
    }
}

macro_rules! slot_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a mut $ty> for FieldSlot<'a> {
                fn from(field: &'a mut $ty) -> Self {
                    FieldSlot::$variant(field)
                }
            }
        )*
    };
}

slot_from! {
    i64 => Int,
    f64 => Float64,
    String => String,
    bool => Bool,
    Option<i64> => NullableInt,
    Option<f64> => NullableFloat64,
    Option<String> => NullableString,
    Option<bool> => NullableBool,
}

/// Ordered column name to slot bindings of one record instance.
#[derive(Debug, Default)]
pub struct ColumnMap<'a> {
    slots: Vec<(&'static str, FieldSlot<'a>)>,
}

impl<'a> ColumnMap<'a> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Bind `column` to a field. Binding the same column twice keeps the
    /// later slot.
    pub fn bind(mut self, column: &'static str, slot: impl Into<FieldSlot<'a>>) -> Self {
        let slot = slot.into();
        match self.slots.iter_mut().find(|(name, _)| *name == column) {
            Some(existing) => existing.1 = slot,
            None => self.slots.push((column, slot)),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Column names in binding order
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|(name, _)| *name)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut FieldSlot<'a>> {
        self.slots
            .iter_mut()
            .find(|(name, _)| *name == column)
            .map(|(_, slot)| slot)
    }

    /// Scan targets ordered like `columns`, which is usually a cursor's
    /// result shape. Every column must have a slot.
    pub fn targets_for(self, columns: &[String]) -> Result<Vec<FieldSlot<'a>>, CursorError> {
        let mut remaining: Vec<Option<(&'static str, FieldSlot<'a>)>> =
            self.slots.into_iter().map(Some).collect();
        let mut targets = Vec::with_capacity(columns.len());

        for column in columns {
            let position = remaining
                .iter()
                .position(|entry| matches!(entry, Some((name, _)) if *name == column.as_str()))
                .ok_or_else(|| CursorError::UnknownColumn(column.clone()))?;
            if let Some((_, slot)) = remaining[position].take() {
                targets.push(slot);
            }
        }

        Ok(targets)
    }

    /// Dereference every slot into a JSON map.
    pub fn values(&self) -> Result<ColumnValues, MapError> {
        let mut values = ColumnValues::new();
        for (name, slot) in &self.slots {
            let value = slot.to_value().ok_or_else(|| MapError::Unrepresentable {
                column: name.to_string(),
                kind: slot.kind(),
            })?;
            values.insert(name.to_string(), value);
        }
        Ok(values)
    }
}

/// Column values of a record, read through its bindings.
pub fn column_values<R: Record>(record: &mut R) -> Result<ColumnValues, MapError> {
    record.describe().values()
}

/// Convert any serializable value into a JSON object map by way of its
/// serde representation. Slower than [`column_values`] but honors serde
/// attributes like `rename` and `skip_serializing_if`.
pub fn map_via_json<T: Serialize + ?Sized>(value: &T) -> Result<ColumnValues, MapError> {
    match serde_json::to_value(value).map_err(|e| MapError::Serialize(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(MapError::NotAnObject(json_type_name(&other))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize)]
    struct Person {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Score")]
        score: Option<f64>,
    }

    impl Record for Person {
        fn describe(&mut self) -> ColumnMap<'_> {
            ColumnMap::new()
                .bind("Id", &mut self.id)
                .bind("Name", &mut self.name)
                .bind("Score", &mut self.score)
        }
    }

    #[test]
    fn test_targets_follow_cursor_order() {
        let mut person = Person::default();
        let columns = vec!["Name".to_string(), "Id".to_string()];

        let targets = person.describe().targets_for(&columns).unwrap();
        assert_eq!(targets[0].kind(), SlotKind::String);
        assert_eq!(targets[1].kind(), SlotKind::Int);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut person = Person::default();
        let columns = vec!["Id".to_string(), "Age".to_string()];

        let err = person.describe().targets_for(&columns).unwrap_err();
        assert_eq!(err, CursorError::UnknownColumn("Age".to_string()));
        assert_eq!(err.to_string(), "unknown column Age");
    }

    #[test]
    fn test_duplicate_cursor_column_is_rejected() {
        let mut person = Person::default();
        let columns = vec!["Id".to_string(), "Id".to_string()];

        assert!(matches!(
            person.describe().targets_for(&columns),
            Err(CursorError::UnknownColumn(c)) if c == "Id"
        ));
    }

    #[test]
    fn test_writes_through_targets_land_in_record() {
        let mut person = Person::default();
        {
            let columns = vec!["Id".to_string(), "Name".to_string()];
            let mut targets = person.describe().targets_for(&columns).unwrap();
            if let FieldSlot::Int(id) = &mut targets[0] {
                **id = 7;
            }
            targets[1].parse_text("Ada").unwrap();
        }
        assert_eq!(person.id, 7);
        assert_eq!(person.name, "Ada");
    }

    #[test]
    fn test_column_values() {
        let mut person = Person {
            id: 3,
            name: "Grace".to_string(),
            score: None,
        };

        let values = column_values(&mut person).unwrap();
        assert_eq!(
            Value::Object(values),
            json!({"Id": 3, "Name": "Grace", "Score": null})
        );
    }

    #[test]
    fn test_non_finite_float_fails_loudly() {
        let mut person = Person {
            score: Some(f64::NAN),
            ..Default::default()
        };

        let err = column_values(&mut person).unwrap_err();
        assert!(matches!(err, MapError::Unrepresentable { ref column, .. } if column == "Score"));
    }

    #[test]
    fn test_parse_text() {
        let mut count = 0i64;
        let mut flag = false;
        let mut maybe: Option<i64> = Some(4);

        FieldSlot::from(&mut count).parse_text(" 42 ").unwrap();
        FieldSlot::from(&mut flag).parse_text("on").unwrap();
        FieldSlot::from(&mut maybe).parse_text("").unwrap();
        assert_eq!(count, 42);
        assert!(flag);
        assert_eq!(maybe, None);

        assert!(FieldSlot::from(&mut count).parse_text("forty").is_err());
    }

    #[test]
    fn test_set_json() {
        let mut count = 0i64;
        let mut ratio: Option<f64> = Some(1.0);
        let mut name = "kept".to_string();

        FieldSlot::from(&mut count).set_json(&json!(12)).unwrap();
        FieldSlot::from(&mut ratio).set_json(&json!(null)).unwrap();
        FieldSlot::from(&mut name).set_json(&json!(null)).unwrap();
        assert_eq!(count, 12);
        assert_eq!(ratio, None);
        assert_eq!(name, "kept");

        let err = FieldSlot::from(&mut count).set_json(&json!("12")).unwrap_err();
        assert_eq!(err, "expected i64, got string");
        assert!(FieldSlot::from(&mut count).set_json(&json!(1.5)).is_err());
        assert_eq!(count, 12);
    }

    #[test]
    fn test_rebinding_keeps_one_slot_per_column() {
        let mut a = 1i64;
        let mut b = 2i64;
        let map = ColumnMap::new().bind("x", &mut a).bind("x", &mut b);

        assert_eq!(map.len(), 1);
        assert_eq!(map.values().unwrap()["x"], json!(2));
    }

    #[test]
    fn test_map_via_json() {
        let person = Person {
            id: 1,
            name: "Linus".to_string(),
            score: Some(2.5),
        };

        let map = map_via_json(&person).unwrap();
        assert_eq!(map["Id"], json!(1));
        assert_eq!(map["Score"], json!(2.5));

        assert!(matches!(map_via_json(&5), Err(MapError::NotAnObject("number"))));
    }
}
