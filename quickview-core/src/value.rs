//! Field values, record ids and records.
//!
//! A [`Record`] is an insertion-ordered mapping from field name to [`Value`].
//! Raw rows fetched from a data source, related lookup-table entries and
//! formatted output rows all share this representation.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

/// An insertion-ordered mapping from field name to value.
pub type Record = IndexMap<String, Value>;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// Date-time value, rendered to a string when datetime handling is on.
    DateTime(NaiveDateTime),
    /// List of values.
    List(Vec<Value>),
    /// Nested record.
    Map(Record),
    /// Embedded JSON structure, passed through untouched.
    Json(JsonValue),
}

impl Value {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the inner list, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the inner record, if this is a map.
    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Self::Map(record) => Some(record),
            _ => None,
        }
    }

    /// Get the inner string, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value.
    ///
    /// Date-times that were not rendered become ISO 8601 strings; non-finite
    /// floats become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::DateTime(dt) => JsonValue::String(dt.format(ISO_DATETIME).to_string()),
            Self::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Self::Map(record) => record_to_json(record),
            Self::Json(json) => json.clone(),
        }
    }
}

const ISO_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Convert a record to a JSON object, keeping field order.
pub fn record_to_json(record: &Record) -> JsonValue {
    JsonValue::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Convert a slice of records to a JSON array.
pub fn records_to_json(records: &[Record]) -> JsonValue {
    JsonValue::Array(records.iter().map(record_to_json).collect())
}

/// Build a record from a JSON object; any other JSON value yields `None`.
pub fn record_from_json(json: JsonValue) -> Option<Record> {
    match Value::from(json) {
        Value::Map(record) => Some(record),
        _ => None,
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::DateTime(dt) => serializer.collect_str(&dt.format(ISO_DATETIME)),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(record) => {
                let mut map = serializer.serialize_map(Some(record.len()))?;
                for (k, v) in record {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Json(json) => json.serialize(serializer),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Self::Map(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// The identifier of a record: the `id` of a top-level row or the key of a
/// related lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Integer primary key.
    Int(i64),
    /// Text primary key (UUIDs, slugs, ...).
    Text(String),
}

impl RecordId {
    /// Extract an id from a value. Only integers and strings are ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(Self::Int(*i)),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Extract an id from a JSON value.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Number(n) => n.as_i64().map(Self::Int),
            JsonValue::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Read the `id` field of a record.
    pub fn of(record: &Record) -> Option<Self> {
        record.get("id").and_then(Self::from_value)
    }

    /// Convert into a field value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::Int(*i),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Parses path segments: integers become [`RecordId::Int`], anything else
/// [`RecordId::Text`].
impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Text(s.to_string())))
    }
}

impl From<i64> for RecordId {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for RecordId {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&str> for RecordId {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RecordId {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<RecordId> for Value {
    fn from(v: RecordId) -> Self {
        match v {
            RecordId::Int(i) => Value::Int(i),
            RecordId::Text(s) => Value::String(s),
        }
    }
}

/// Build a [`Record`] from `(field, value)` pairs.
///
/// ```rust
/// use quickview_core::{record, Value};
///
/// let row = record! { "id" => 1, "name" => "Breakfast" };
/// assert_eq!(row["name"], Value::from("Breakfast"));
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::value::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::value::Record::new();
        $( record.insert(::std::string::String::from($key), $crate::value::Value::from($value)); )+
        record
    }};
}
