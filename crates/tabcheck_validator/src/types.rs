//! Per-type cast and format behavior.
//!
//! One behavior set per logical type, each exposing:
//! - `read_cell`: cast-or-reject; rejection is a normal outcome and never
//!   panics, for any input including wrong-typed native values
//! - `write_cell`: the canonical textual form, the inverse of `read_cell`
//!   for well-formed values
//! - `supported_constraints`: which constraint predicates apply to the type
//!
//! Casting and constraint testing are deliberately separate operations so
//! the row validator can report a type error and a constraint error
//! independently for the same cell.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;
use tabcheck_core::{ConstraintKind, Duration, Field, FieldType, Value};

/// Truthy spellings accepted by the boolean type.
const TRUE_VALUES: [&str; 4] = ["true", "True", "TRUE", "1"];
/// Falsy spellings accepted by the boolean type.
const FALSE_VALUES: [&str; 4] = ["false", "False", "FALSE", "0"];

/// Patterns tried by the temporal types in "any" format mode.
const ANY_DATE_PATTERNS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"];
const ANY_TIME_PATTERNS: [&str; 3] = ["%H:%M:%S", "%H:%M", "%I:%M %p"];
const ANY_DATETIME_PATTERNS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Casts a raw cell against a field's type and format.
///
/// Returns `None` when the cell does not conform; this function is total
/// and never panics on malformed input.
pub fn read_cell(field: &Field, cell: &Value) -> Option<Value> {
    match field.field_type {
        FieldType::Any => Some(cell.clone()),
        FieldType::Array => read_array(cell),
        FieldType::Boolean => read_boolean(cell),
        FieldType::Date => read_date(field, cell),
        FieldType::DateTime => read_datetime(field, cell),
        FieldType::Duration => read_duration(cell),
        FieldType::Geojson => read_geojson(cell),
        FieldType::Geopoint => read_geopoint(field, cell),
        FieldType::Integer => read_integer(field, cell),
        FieldType::Number => read_number(field, cell),
        FieldType::String => read_string(field, cell),
        FieldType::Time => read_time(field, cell),
        FieldType::Year => read_year(cell),
        FieldType::YearMonth => read_yearmonth(cell),
    }
}

/// Formats a cast value back to its canonical textual form.
///
/// Numeric decoration configured on the field (decimal separator) is
/// applied so that `read_cell` accepts the output unchanged.
pub fn write_cell(field: &Field, value: &Value) -> String {
    match (field.field_type, value) {
        (FieldType::Number, Value::Number(_) | Value::Integer(_)) => {
            let mut text = value.to_string();
            if let Some(decimal_char) = field.decimal_char {
                text = text.replace('.', &decimal_char.to_string());
            }
            text
        }
        _ => value.to_string(),
    }
}

/// Constraints a logical type supports; others are ignored for the type.
pub fn supported_constraints(field_type: FieldType) -> &'static [ConstraintKind] {
    use ConstraintKind::*;
    match field_type {
        FieldType::Any => &[Required, Unique, Enum],
        FieldType::Array => &[Required, Unique, MinLength, MaxLength, Enum],
        FieldType::Boolean => &[Required, Enum],
        FieldType::Date
        | FieldType::DateTime
        | FieldType::Time
        | FieldType::Year
        | FieldType::YearMonth => &[Required, Unique, Minimum, Maximum, Enum],
        FieldType::Duration => &[Required, Unique, Enum],
        FieldType::Geojson => &[Required, Enum],
        FieldType::Geopoint => &[Required, Unique, Enum],
        FieldType::Integer | FieldType::Number => &[Required, Unique, Minimum, Maximum, Enum],
        FieldType::String => &[Required, Unique, MinLength, MaxLength, Pattern, Enum],
    }
}

/// Infers a logical type for one column from its sample cells.
///
/// Blank cells are skipped; the first candidate type that casts every
/// remaining cell wins, falling back to `string`, then `any` for an empty
/// sample.
pub fn infer_type(sample: &[&Value]) -> FieldType {
    const CANDIDATES: [FieldType; 10] = [
        FieldType::Boolean,
        FieldType::Integer,
        FieldType::Number,
        FieldType::Date,
        FieldType::Time,
        FieldType::DateTime,
        FieldType::Duration,
        FieldType::Geopoint,
        FieldType::Array,
        FieldType::Geojson,
    ];

    let cells: Vec<&&Value> = sample
        .iter()
        .filter(|cell| !cell.is_null() && cell.as_str() != Some(""))
        .collect();
    if cells.is_empty() {
        return FieldType::Any;
    }

    for candidate in CANDIDATES {
        let probe = Field::new("", candidate);
        if cells.iter().all(|cell| read_cell(&probe, cell).is_some()) {
            return candidate;
        }
    }
    FieldType::String
}

// Readers

fn read_boolean(cell: &Value) -> Option<Value> {
    match cell {
        Value::Bool(_) => Some(cell.clone()),
        Value::String(text) => {
            if TRUE_VALUES.contains(&text.as_str()) {
                Some(Value::Bool(true))
            } else if FALSE_VALUES.contains(&text.as_str()) {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn read_integer(field: &Field, cell: &Value) -> Option<Value> {
    match cell {
        Value::Integer(_) => Some(cell.clone()),
        // A boolean is not an integer
        Value::Bool(_) => None,
        Value::String(text) => {
            let mut text = text.trim().to_string();
            if field.bare_number == Some(false) {
                text = strip_decoration(&text);
            }
            text.parse::<i64>().ok().map(Value::Integer)
        }
        _ => None,
    }
}

fn read_number(field: &Field, cell: &Value) -> Option<Value> {
    match cell {
        Value::Number(_) => Some(cell.clone()),
        Value::Integer(value) => Some(Value::Number(*value as f64)),
        Value::Bool(_) => None,
        Value::String(text) => {
            let mut text = text.trim().to_string();
            if field.bare_number == Some(false) {
                text = strip_decoration(&text);
            }
            if let Some(group_char) = field.group_char {
                text = text.replace(group_char, "");
            }
            if let Some(decimal_char) = field.decimal_char
                && decimal_char != '.'
            {
                // A bare "." cannot appear when another decimal char is set
                if text.contains('.') {
                    return None;
                }
                text = text.replace(decimal_char, ".");
            }
            let number: f64 = text.parse().ok()?;
            number.is_finite().then_some(Value::Number(number))
        }
        _ => None,
    }
}

fn read_string(field: &Field, cell: &Value) -> Option<Value> {
    let text = cell.as_str()?;
    match field.format.as_deref() {
        None | Some("default") => Some(cell.clone()),
        Some("email") => format_matches(email_regex(), text).then(|| cell.clone()),
        Some("uri") => format_matches(uri_regex(), text).then(|| cell.clone()),
        Some("uuid") => format_matches(uuid_regex(), text).then(|| cell.clone()),
        Some(_) => None,
    }
}

fn read_date(field: &Field, cell: &Value) -> Option<Value> {
    match cell {
        Value::Date(_) => Some(cell.clone()),
        Value::String(text) => {
            let text = text.trim();
            let date = match field.format.as_deref() {
                None | Some("default") => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?,
                Some("any") => ANY_DATE_PATTERNS
                    .iter()
                    .find_map(|pattern| NaiveDate::parse_from_str(text, pattern).ok())?,
                Some(pattern) => NaiveDate::parse_from_str(text, pattern).ok()?,
            };
            Some(Value::Date(date))
        }
        _ => None,
    }
}

fn read_time(field: &Field, cell: &Value) -> Option<Value> {
    match cell {
        Value::Time(_) => Some(cell.clone()),
        Value::String(text) => {
            let text = text.trim();
            let time = match field.format.as_deref() {
                None | Some("default") => NaiveTime::parse_from_str(text, "%H:%M:%S").ok()?,
                Some("any") => ANY_TIME_PATTERNS
                    .iter()
                    .find_map(|pattern| NaiveTime::parse_from_str(text, pattern).ok())?,
                Some(pattern) => NaiveTime::parse_from_str(text, pattern).ok()?,
            };
            Some(Value::Time(time))
        }
        _ => None,
    }
}

fn read_datetime(field: &Field, cell: &Value) -> Option<Value> {
    match cell {
        Value::DateTime(_) => Some(cell.clone()),
        Value::String(text) => {
            let text = text.trim().trim_end_matches('Z');
            let datetime = match field.format.as_deref() {
                None | Some("default") => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                    .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
                    .ok()?,
                Some("any") => ANY_DATETIME_PATTERNS
                    .iter()
                    .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())?,
                Some(pattern) => NaiveDateTime::parse_from_str(text, pattern).ok()?,
            };
            Some(Value::DateTime(datetime))
        }
        _ => None,
    }
}

fn read_year(cell: &Value) -> Option<Value> {
    let year = match cell {
        Value::Year(year) => return Some(Value::Year(*year)),
        Value::Bool(_) => return None,
        Value::Integer(value) => i32::try_from(*value).ok()?,
        Value::String(text) => text.trim().parse::<i32>().ok()?,
        _ => return None,
    };
    (0..=9999).contains(&year).then_some(Value::Year(year))
}

fn read_yearmonth(cell: &Value) -> Option<Value> {
    match cell {
        Value::YearMonth { .. } => Some(cell.clone()),
        Value::String(text) => {
            let (year, month) = text.trim().split_once('-')?;
            let year: i32 = year.parse().ok()?;
            let month: u32 = month.parse().ok()?;
            ((0..=9999).contains(&year) && (1..=12).contains(&month))
                .then_some(Value::YearMonth { year, month })
        }
        _ => None,
    }
}

fn read_duration(cell: &Value) -> Option<Value> {
    match cell {
        Value::Duration(_) => Some(cell.clone()),
        Value::String(text) => Duration::parse(text.trim()).map(Value::Duration),
        _ => None,
    }
}

fn read_geopoint(field: &Field, cell: &Value) -> Option<Value> {
    let (lon, lat) = match (field.format.as_deref(), cell) {
        (_, Value::Geopoint { lon, lat }) => (*lon, *lat),
        (None | Some("default"), Value::String(text)) => {
            let (lon, lat) = text.split_once(',')?;
            (lon.trim().parse().ok()?, lat.trim().parse().ok()?)
        }
        (Some("array"), Value::Array(items)) => json_pair(items)?,
        (Some("array"), Value::String(text)) => {
            let parsed: Vec<serde_json::Value> = serde_json::from_str(text).ok()?;
            json_pair(&parsed)?
        }
        (Some("object"), Value::Object(map)) => object_pair(map)?,
        (Some("object"), Value::String(text)) => {
            let parsed: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(text).ok()?;
            object_pair(&parsed)?
        }
        _ => return None,
    };
    ((-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat))
        .then_some(Value::Geopoint { lon, lat })
}

fn json_pair(items: &[serde_json::Value]) -> Option<(f64, f64)> {
    match items {
        [lon, lat] => Some((lon.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}

fn object_pair(map: &serde_json::Map<String, serde_json::Value>) -> Option<(f64, f64)> {
    Some((map.get("lon")?.as_f64()?, map.get("lat")?.as_f64()?))
}

fn read_geojson(cell: &Value) -> Option<Value> {
    match cell {
        Value::Object(_) => Some(cell.clone()),
        Value::String(text) => {
            let parsed: serde_json::Value = serde_json::from_str(text).ok()?;
            match parsed {
                serde_json::Value::Object(map) => Some(Value::Object(map)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn read_array(cell: &Value) -> Option<Value> {
    match cell {
        Value::Array(_) => Some(cell.clone()),
        Value::String(text) => {
            let parsed: serde_json::Value = serde_json::from_str(text).ok()?;
            match parsed {
                serde_json::Value::Array(items) => Some(Value::Array(items)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Strips leading/trailing non-numeric decoration (currency symbols, units)
/// from a number spelled with surrounding text.
fn strip_decoration(text: &str) -> String {
    let start = text.find(|ch: char| ch.is_ascii_digit());
    let end = text.rfind(|ch: char| ch.is_ascii_digit());
    match (start, end) {
        (Some(start), Some(end)) => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

fn format_matches(regex: Option<&Regex>, text: &str) -> bool {
    regex.is_some_and(|regex| regex.is_match(text))
}

fn email_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
}

fn uri_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$").ok())
        .as_ref()
}

fn uuid_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| {
            Regex::new(
                r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
            )
            .ok()
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabcheck_core::FieldBuilder;

    fn field(field_type: FieldType) -> Field {
        Field::new("test", field_type)
    }

    #[test]
    fn test_boolean_read() {
        let f = field(FieldType::Boolean);
        assert_eq!(read_cell(&f, &"true".into()), Some(Value::Bool(true)));
        assert_eq!(read_cell(&f, &"TRUE".into()), Some(Value::Bool(true)));
        assert_eq!(read_cell(&f, &"0".into()), Some(Value::Bool(false)));
        assert_eq!(read_cell(&f, &Value::Bool(false)), Some(Value::Bool(false)));
        assert_eq!(read_cell(&f, &"yes".into()), None);
        assert_eq!(read_cell(&f, &Value::Integer(1)), None);
    }

    #[test]
    fn test_integer_read() {
        let f = field(FieldType::Integer);
        assert_eq!(read_cell(&f, &"42".into()), Some(Value::Integer(42)));
        assert_eq!(read_cell(&f, &" -7 ".into()), Some(Value::Integer(-7)));
        assert_eq!(read_cell(&f, &Value::Integer(3)), Some(Value::Integer(3)));
        // A boolean passed to the integer type is rejected
        assert_eq!(read_cell(&f, &Value::Bool(true)), None);
        assert_eq!(read_cell(&f, &Value::Number(3.5)), None);
        assert_eq!(read_cell(&f, &"3.5".into()), None);
        assert_eq!(read_cell(&f, &"abc".into()), None);
    }

    #[test]
    fn test_integer_decoration_stripping() {
        let f = FieldBuilder::new("price", FieldType::Integer)
            .bare_number(false)
            .build();
        assert_eq!(read_cell(&f, &"$129".into()), Some(Value::Integer(129)));
        assert_eq!(read_cell(&f, &"129 EUR".into()), Some(Value::Integer(129)));
        // Without the option the decoration is a cast failure
        let bare = field(FieldType::Integer);
        assert_eq!(read_cell(&bare, &"$129".into()), None);
    }

    #[test]
    fn test_number_read() {
        let f = field(FieldType::Number);
        assert_eq!(read_cell(&f, &"1.5".into()), Some(Value::Number(1.5)));
        assert_eq!(read_cell(&f, &Value::Integer(2)), Some(Value::Number(2.0)));
        assert_eq!(read_cell(&f, &Value::Bool(true)), None);
        assert_eq!(read_cell(&f, &"abc".into()), None);
    }

    #[test]
    fn test_number_separators() {
        let f = FieldBuilder::new("amount", FieldType::Number)
            .group_char(' ')
            .decimal_char(',')
            .build();
        assert_eq!(
            read_cell(&f, &"1 000,5".into()),
            Some(Value::Number(1000.5))
        );
        // A "." is rejected once another decimal char is configured
        assert_eq!(read_cell(&f, &"1000.5".into()), None);
    }

    #[test]
    fn test_string_formats() {
        let default = field(FieldType::String);
        assert_eq!(
            read_cell(&default, &"hello".into()),
            Some(Value::String("hello".into()))
        );
        assert_eq!(read_cell(&default, &Value::Integer(1)), None);

        let email = FieldBuilder::new("contact", FieldType::String)
            .format("email")
            .build();
        assert!(read_cell(&email, &"name@example.com".into()).is_some());
        assert_eq!(read_cell(&email, &"not-an-email".into()), None);

        let uuid = FieldBuilder::new("id", FieldType::String)
            .format("uuid")
            .build();
        assert!(read_cell(&uuid, &"123e4567-e89b-12d3-a456-426614174000".into()).is_some());
        assert_eq!(read_cell(&uuid, &"123".into()), None);
    }

    #[test]
    fn test_date_modes() {
        let default = field(FieldType::Date);
        assert!(read_cell(&default, &"2023-04-05".into()).is_some());
        assert_eq!(read_cell(&default, &"05/04/2023".into()), None);

        let any = FieldBuilder::new("when", FieldType::Date).format("any").build();
        assert!(read_cell(&any, &"05/04/2023".into()).is_some());
        assert!(read_cell(&any, &"2023-04-05".into()).is_some());
        assert_eq!(read_cell(&any, &"not a date".into()), None);

        let pattern = FieldBuilder::new("when", FieldType::Date)
            .format("%d %m %Y")
            .build();
        assert!(read_cell(&pattern, &"05 04 2023".into()).is_some());
        assert_eq!(read_cell(&pattern, &"2023-04-05".into()), None);
    }

    #[test]
    fn test_datetime_read() {
        let f = field(FieldType::DateTime);
        assert!(read_cell(&f, &"2023-04-05T12:30:00".into()).is_some());
        assert!(read_cell(&f, &"2023-04-05T12:30:00Z".into()).is_some());
        assert_eq!(read_cell(&f, &"2023-04-05".into()), None);
    }

    #[test]
    fn test_year_and_yearmonth() {
        let year = field(FieldType::Year);
        assert_eq!(read_cell(&year, &"2023".into()), Some(Value::Year(2023)));
        assert_eq!(read_cell(&year, &Value::Integer(2023)), Some(Value::Year(2023)));
        assert_eq!(read_cell(&year, &"20230".into()), None);

        let yearmonth = field(FieldType::YearMonth);
        assert_eq!(
            read_cell(&yearmonth, &"2023-04".into()),
            Some(Value::YearMonth { year: 2023, month: 4 })
        );
        assert_eq!(read_cell(&yearmonth, &"2023-13".into()), None);
    }

    #[test]
    fn test_duration_read() {
        let f = field(FieldType::Duration);
        assert!(read_cell(&f, &"P1Y2M".into()).is_some());
        assert_eq!(read_cell(&f, &"one year".into()), None);
    }

    #[test]
    fn test_geopoint_formats() {
        let default = field(FieldType::Geopoint);
        assert_eq!(
            read_cell(&default, &"33.33, 44.44".into()),
            Some(Value::Geopoint { lon: 33.33, lat: 44.44 })
        );
        assert_eq!(read_cell(&default, &"200, 44".into()), None);

        let array = FieldBuilder::new("point", FieldType::Geopoint)
            .format("array")
            .build();
        assert!(read_cell(&array, &"[33.33, 44.44]".into()).is_some());

        let object = FieldBuilder::new("point", FieldType::Geopoint)
            .format("object")
            .build();
        assert!(read_cell(&object, &r#"{"lon": 33.33, "lat": 44.44}"#.into()).is_some());
        assert_eq!(read_cell(&object, &"[33.33, 44.44]".into()), None);
    }

    #[test]
    fn test_array_and_geojson() {
        let array = field(FieldType::Array);
        assert!(read_cell(&array, &"[1, 2, 3]".into()).is_some());
        assert_eq!(read_cell(&array, &"{}".into()), None);

        let geojson = field(FieldType::Geojson);
        assert!(read_cell(&geojson, &r#"{"type": "Point", "coordinates": [0, 0]}"#.into()).is_some());
        assert_eq!(read_cell(&geojson, &"[1]".into()), None);
    }

    #[test]
    fn test_any_accepts_everything() {
        let f = field(FieldType::Any);
        assert_eq!(read_cell(&f, &Value::Bool(true)), Some(Value::Bool(true)));
        assert_eq!(
            read_cell(&f, &"text".into()),
            Some(Value::String("text".into()))
        );
    }

    #[test]
    fn test_write_read_round_trip() {
        let cases: Vec<(Field, Value)> = vec![
            (field(FieldType::Boolean), Value::Bool(true)),
            (field(FieldType::Integer), Value::Integer(-42)),
            (field(FieldType::Number), Value::Number(1.25)),
            (field(FieldType::String), Value::String("hello".into())),
            (
                field(FieldType::Date),
                Value::Date(NaiveDate::from_ymd_opt(2023, 4, 5).unwrap()),
            ),
            (field(FieldType::Year), Value::Year(2023)),
            (
                field(FieldType::YearMonth),
                Value::YearMonth { year: 2023, month: 4 },
            ),
            (
                field(FieldType::Duration),
                Value::Duration(Duration::parse("P1DT12H").unwrap()),
            ),
            (
                field(FieldType::Geopoint),
                Value::Geopoint { lon: 33.33, lat: 44.44 },
            ),
        ];
        for (f, value) in cases {
            let text = write_cell(&f, &value);
            let back = read_cell(&f, &Value::String(text.clone()));
            assert_eq!(back, Some(value), "round trip failed for \"{text}\"");
        }
    }

    #[test]
    fn test_number_round_trip_with_decimal_char() {
        let f = FieldBuilder::new("amount", FieldType::Number)
            .decimal_char(',')
            .build();
        let text = write_cell(&f, &Value::Number(1.5));
        assert_eq!(text, "1,5");
        assert_eq!(read_cell(&f, &Value::String(text)), Some(Value::Number(1.5)));
    }

    #[test]
    fn test_infer_type() {
        let integers: Vec<Value> = vec!["1".into(), "2".into(), "".into()];
        let refs: Vec<&Value> = integers.iter().collect();
        assert_eq!(infer_type(&refs), FieldType::Integer);

        let numbers: Vec<Value> = vec!["1.5".into(), "2".into()];
        let refs: Vec<&Value> = numbers.iter().collect();
        assert_eq!(infer_type(&refs), FieldType::Number);

        let dates: Vec<Value> = vec!["2023-01-01".into(), "2023-01-02".into()];
        let refs: Vec<&Value> = dates.iter().collect();
        assert_eq!(infer_type(&refs), FieldType::Date);

        let strings: Vec<Value> = vec!["a".into(), "1".into()];
        let refs: Vec<&Value> = strings.iter().collect();
        assert_eq!(infer_type(&refs), FieldType::String);

        let empty: Vec<&Value> = Vec::new();
        assert_eq!(infer_type(&empty), FieldType::Any);
    }
}
