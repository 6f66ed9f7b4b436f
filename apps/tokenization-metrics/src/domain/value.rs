//! Scalar cell values.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};

/// Date formats accepted for text period keys.
const TEXT_DATE_FORMAT: &str = "%Y-%m-%d";
const TEXT_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// Missing value. Numeric stages treat it as zero.
    #[default]
    Null,
    /// Numeric quantity.
    Number(Decimal),
    /// Free text (asset names, or dates the query returned as strings).
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone (query engines return UTC).
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Build a value from a decoded JSON scalar.
    ///
    /// Integers and floats become numbers, booleans `0`/`1`, strings text.
    /// Numbers outside the decimal range, arrays and objects are kept as
    /// their JSON text, so numeric stages reject them.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Number(Decimal::from(u8::from(*b))),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Decimal::from)
                .or_else(|| n.as_u64().map(Decimal::from))
                .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()))
                .map_or_else(|| Self::Text(n.to_string()), Self::Number),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    /// The numeric value, if this is a number.
    #[must_use]
    pub const fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(d) => Some(*d),
            _ => None,
        }
    }

    /// The numeric value with `Null` read as zero.
    ///
    /// Returns `None` for text and dates.
    #[must_use]
    pub const fn numeric_or_zero(&self) -> Option<Decimal> {
        match self {
            Self::Number(d) => Some(*d),
            Self::Null => Some(Decimal::ZERO),
            _ => None,
        }
    }

    /// Interpret the value as a calendar date.
    ///
    /// Timestamps keep their date part; text is parsed as `YYYY-MM-DD`,
    /// `YYYY-MM-DD HH:MM:SS` or RFC 3339.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Timestamp(ts) => Some(ts.date()),
            Self::Text(s) => parse_text_date(s.trim()),
            Self::Null | Self::Number(_) => None,
        }
    }

    /// Whether the value is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

fn parse_text_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, TEXT_DATE_FORMAT) {
        return Some(date);
    }
    for format in TEXT_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts.date());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_utc().date())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Number(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format(TEXT_DATE_FORMAT)),
            Self::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// Chart builders expect plain JSON numbers, not decimal strings.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Number(d) => {
                if d.fract().is_zero() {
                    if let Some(i) = d.to_i64() {
                        return serializer.serialize_i64(i);
                    }
                }
                serializer.serialize_f64(d.to_f64().unwrap_or(f64::NAN))
            }
            Self::Text(s) => serializer.serialize_str(s),
            Self::Date(_) | Self::Timestamp(_) => serializer.collect_str(self),
        }
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
