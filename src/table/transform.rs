//! Transform Pipeline
//!
//! Pure conversions from raw provider values to typed column values. A column
//! reads a raw [`Value`] from its source, runs its [`Transform`] chain left to
//! right, then coerces the result to its declared [`ColumnType`].
//!
//! `Value::Null` is the "no value" sentinel: missing nested fields project to
//! it and every step passes it through unless documented otherwise.

use super::row::{ColumnType, ColumnValue};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// A single pure conversion step
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Project a dotted path out of the current value
    Field(&'static str),
    /// `[{key_field: k, value_field: v}, ...]` into `{k: v}`, last key wins
    TagListToMap {
        key_field: &'static str,
        value_field: &'static str,
    },
    /// ARN string into a one-element list of global names
    ArnToAkas,
    /// Name into a synthesised ARN list, for resources without one
    NameToAkas { prefix: &'static str },
    /// Zero, empty string, empty list or empty object become null
    NullIfZero,
}

impl Transform {
    /// Tag list with the usual `Key`/`Value` field names
    pub const fn tags() -> Self {
        Transform::TagListToMap {
            key_field: "Key",
            value_field: "Value",
        }
    }

    pub fn apply(&self, value: Value) -> Result<Value, String> {
        match self {
            Transform::Field(path) => Ok(project(&value, path).clone()),
            Transform::TagListToMap {
                key_field,
                value_field,
            } => tag_list_to_map(value, key_field, value_field),
            Transform::ArnToAkas => match value {
                Value::Null => Ok(Value::Null),
                Value::String(arn) => Ok(Value::Array(vec![Value::String(arn)])),
                other => Err(format!("expected ARN string, got {}", kind(&other))),
            },
            Transform::NameToAkas { prefix } => match value {
                Value::Null => Ok(Value::Null),
                Value::String(name) => Ok(Value::Array(vec![Value::String(format!(
                    "{}{}",
                    prefix, name
                ))])),
                other => Err(format!("expected name string, got {}", kind(&other))),
            },
            Transform::NullIfZero => Ok(if is_zero(&value) { Value::Null } else { value }),
        }
    }
}

/// Run a chain left to right
pub fn apply_chain(chain: &[Transform], value: Value) -> Result<Value, String> {
    chain.iter().try_fold(value, |current, step| step.apply(current))
}

/// Return the value at a dotted path, or `Value::Null` if any segment is absent.
///
/// Numeric segments index into arrays (`Services.0.ServiceCode`).
pub fn project<'a>(value: &'a Value, path: &str) -> &'a Value {
    if path.is_empty() {
        return value;
    }

    let mut current = value;
    for part in path.split('.') {
        let next = match current {
            Value::Array(items) => part.parse::<usize>().ok().and_then(|idx| items.get(idx)),
            Value::Object(map) => map.get(part),
            _ => None,
        };
        current = match next {
            Some(v) => v,
            None => return &Value::Null,
        };
    }
    current
}

/// Convert a column name to the provider's field naming
/// e.g., "domain_name" -> "DomainName", "e_tag" -> "ETag"
pub fn snake_to_camel(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn tag_list_to_map(value: Value, key_field: &str, value_field: &str) -> Result<Value, String> {
    let items = match value {
        Value::Null => return Ok(Value::Null),
        Value::Array(items) => items,
        other => return Err(format!("expected tag list, got {}", kind(&other))),
    };

    let mut map = Map::new();
    for item in items {
        let key = match item.get(key_field) {
            Some(Value::String(k)) => k.clone(),
            _ => return Err(format!("tag entry without string '{}'", key_field)),
        };
        let tag_value = item.get(value_field).cloned().unwrap_or(Value::Null);
        map.insert(key, tag_value);
    }
    Ok(Value::Object(map))
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce a transformed value into the column's declared type
pub fn coerce(column_type: ColumnType, value: Value) -> Result<ColumnValue, String> {
    if value.is_null() {
        return Ok(ColumnValue::Null);
    }

    match column_type {
        ColumnType::Json => Ok(ColumnValue::Json(value)),
        ColumnType::String => Ok(ColumnValue::String(match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        })),
        ColumnType::Bool => match &value {
            Value::Bool(b) => Ok(ColumnValue::Bool(*b)),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(ColumnValue::Bool(true)),
                "false" | "no" => Ok(ColumnValue::Bool(false)),
                _ => Err(format!("cannot read '{}' as BOOL", s)),
            },
            other => Err(format!("cannot read {} as BOOL", kind(other))),
        },
        ColumnType::Int => match &value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral_i64))
                .map(ColumnValue::Int)
                .ok_or_else(|| format!("cannot read {} as INT", n)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(ColumnValue::Int)
                .map_err(|_| format!("cannot read '{}' as INT", s)),
            other => Err(format!("cannot read {} as INT", kind(other))),
        },
        ColumnType::Double => match &value {
            Value::Number(n) => n
                .as_f64()
                .map(ColumnValue::Double)
                .ok_or_else(|| format!("cannot read {} as DOUBLE", n)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(ColumnValue::Double)
                .map_err(|_| format!("cannot read '{}' as DOUBLE", s)),
            other => Err(format!("cannot read {} as DOUBLE", kind(other))),
        },
        ColumnType::Timestamp => match &value {
            Value::String(s) => parse_timestamp(s)
                .map(ColumnValue::Timestamp)
                .ok_or_else(|| format!("cannot read '{}' as TIMESTAMP", s)),
            Value::Number(n) => n
                .as_f64()
                .and_then(epoch_seconds)
                .map(ColumnValue::Timestamp)
                .ok_or_else(|| format!("cannot read {} as TIMESTAMP", n)),
            other => Err(format!("cannot read {} as TIMESTAMP", kind(other))),
        },
    }
}

/// Whole floats inside the `i64` range
fn integral_i64(f: f64) -> Option<i64> {
    // i64::MAX is not representable as f64; 2^63 is the first value past it
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && f >= -LIMIT && f < LIMIT).then_some(f as i64)
}

/// Fractional epoch seconds, negative values included
fn epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    let whole = integral_i64(whole)?;
    // Rounding can carry a full second
    let (whole, nanos) = if nanos >= 1_000_000_000 {
        (whole.checked_add(1)?, 0)
    } else {
        (whole, nanos)
    };
    Utc.timestamp_opt(whole, nanos).single()
}

/// RFC 3339 date-time or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}
