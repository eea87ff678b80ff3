//! Cell value representation.
//!
//! This module provides the `Value` type used for both raw cells coming out
//! of a table stream and the typed values produced by the type system.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// A single cell value.
///
/// Raw values delivered by a table stream are usually `String` cells, but
/// streams backed by typed sources (JSON, spreadsheets) may deliver native
/// booleans and numbers. Typed values produced by the type system use the
/// richer variants (dates, durations, geopoints).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Number(f64),
    /// String value
    String(String),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Date with time of day
    DateTime(NaiveDateTime),
    /// Calendar year
    Year(i32),
    /// Calendar year and month
    YearMonth { year: i32, month: u32 },
    /// ISO 8601 duration
    Duration(Duration),
    /// Geographic point (longitude, latitude)
    Geopoint { lon: f64, lat: f64 },
    /// JSON array value
    Array(Vec<serde_json::Value>),
    /// JSON object value (e.g. a geojson geometry)
    Object(serde_json::Map<String, serde_json::Value>),
}

impl Value {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Year(_) => "year",
            Value::YearMonth { .. } => "yearmonth",
            Value::Duration(_) => "duration",
            Value::Geopoint { .. } => "geopoint",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Attempts to get this value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get this value as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to get this value as a float.
    ///
    /// Integers widen to floats; no other coercion is applied.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Canonical textual form; the inverse of the type system's casting for
    /// well-formed values. Null renders as an empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Value::Year(y) => write!(f, "{y:04}"),
            Value::YearMonth { year, month } => write!(f, "{year:04}-{month:02}"),
            Value::Duration(d) => write!(f, "{d}"),
            Value::Geopoint { lon, lat } => write!(f, "{lon},{lat}"),
            Value::Array(items) => {
                write!(f, "{}", serde_json::Value::Array(items.clone()))
            }
            Value::Object(map) => {
                write!(f, "{}", serde_json::Value::Object(map.clone()))
            }
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// An ISO 8601 duration broken into calendar components.
///
/// Components are kept separate rather than collapsed to seconds because
/// calendar components (years, months) have no fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Duration {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: f64,
}

impl Duration {
    /// Parses an ISO 8601 duration designator string (`P1Y2M3DT4H5M6.5S`).
    ///
    /// Returns `None` for malformed input; at least one component must be
    /// present after the leading `P`.
    pub fn parse(text: &str) -> Option<Duration> {
        let rest = text.strip_prefix('P')?;
        if rest.is_empty() {
            return None;
        }
        let (date_part, time_part) = match rest.split_once('T') {
            Some((date, time)) if !time.is_empty() => (date, Some(time)),
            Some(_) => return None,
            None => (rest, None),
        };

        let mut duration = Duration::default();
        let mut components = 0;

        // Designator order is fixed within each part; `rank` enforces it.
        let mut scan = |part: &str, in_time: bool| -> Option<()> {
            let mut number = String::new();
            let mut last_rank = 0;
            for ch in part.chars() {
                if ch.is_ascii_digit() || ch == '.' {
                    number.push(ch);
                    continue;
                }
                if number.is_empty() {
                    return None;
                }
                let rank = match (in_time, ch) {
                    (false, 'Y') => 1,
                    (false, 'M') => 2,
                    (false, 'D') => 3,
                    (true, 'H') => 1,
                    (true, 'M') => 2,
                    (true, 'S') => 3,
                    _ => return None,
                };
                if rank <= last_rank {
                    return None;
                }
                last_rank = rank;
                if in_time && ch == 'S' {
                    // Seconds may carry a fraction; everything else is integral
                    duration.seconds = number.parse().ok()?;
                } else {
                    let value: u32 = number.parse().ok()?;
                    match (in_time, ch) {
                        (false, 'Y') => duration.years = value,
                        (false, 'M') => duration.months = value,
                        (false, 'D') => duration.days = value,
                        (true, 'H') => duration.hours = value,
                        (true, 'M') => duration.minutes = value,
                        _ => return None,
                    }
                }
                number.clear();
                components += 1;
            }
            if number.is_empty() { Some(()) } else { None }
        };

        scan(date_part, false)?;
        if let Some(time) = time_part {
            scan(time, true)?;
        }
        if components == 0 {
            return None;
        }
        Some(duration)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Duration::default() {
            return write!(f, "PT0S");
        }
        write!(f, "P")?;
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0.0 {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0.0 {
                write!(f, "{}S", self.seconds)?;
            }
        }
        Ok(())
    }
}
