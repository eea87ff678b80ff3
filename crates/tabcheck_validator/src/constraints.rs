//! Constraint predicates over typed cell values.
//!
//! Constraint testing runs after casting and is independent from it: a cell
//! that fails the cast reports a type error, a cast cell that fails a
//! predicate reports a constraint error. The `unique` constraint is not
//! tested here; it spans rows and is handled by the unique-value check.

use crate::types::{read_cell, supported_constraints};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use tabcheck_core::{ConstraintKind, Field, Value};

/// Compiled-regex cache keyed by pattern text.
///
/// Pattern constraints are tested once per cell, so each declared pattern is
/// compiled exactly once per validation run.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: HashMap<String, Option<Regex>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles the pattern anchored to the full cell text, or returns the
    /// cached result. An uncompilable pattern caches as `None` and never
    /// matches.
    fn get(&mut self, pattern: &str) -> Option<&Regex> {
        self.compiled
            .entry(pattern.to_string())
            .or_insert_with(|| Regex::new(&format!("^(?:{pattern})$")).ok())
            .as_ref()
    }
}

/// Tests a typed cell against every constraint its field declares and its
/// type supports, returning the violated kinds in declaration order.
///
/// A null cell only violates `required`; the remaining predicates apply to
/// present values.
pub fn check_cell(field: &Field, value: &Value, cache: &mut RegexCache) -> Vec<ConstraintKind> {
    let supported = supported_constraints(field.field_type);
    let mut violations = Vec::new();

    for kind in field.constraints.declared() {
        if !supported.contains(&kind) || kind == ConstraintKind::Unique {
            continue;
        }
        let satisfied = match kind {
            ConstraintKind::Required => !value.is_null(),
            _ if value.is_null() => true,
            ConstraintKind::Minimum => check_minimum(field, value),
            ConstraintKind::Maximum => check_maximum(field, value),
            ConstraintKind::MinLength => cell_length(value)
                .is_none_or(|length| length >= field.constraints.min_length.unwrap_or(0)),
            ConstraintKind::MaxLength => cell_length(value)
                .is_none_or(|length| length <= field.constraints.max_length.unwrap_or(usize::MAX)),
            ConstraintKind::Pattern => check_pattern(field, value, cache),
            ConstraintKind::Enum => check_enum(field, value),
            ConstraintKind::Unique => true,
        };
        if !satisfied {
            violations.push(kind);
        }
    }

    violations
}

/// Human-readable note for a constraint violation, naming the constraint and
/// its declared value.
pub fn constraint_note(field: &Field, kind: ConstraintKind) -> String {
    let declared = match kind {
        ConstraintKind::Required => "true".to_string(),
        ConstraintKind::Unique => "true".to_string(),
        ConstraintKind::Minimum => render_json(field.constraints.minimum.as_ref()),
        ConstraintKind::Maximum => render_json(field.constraints.maximum.as_ref()),
        ConstraintKind::MinLength => field
            .constraints
            .min_length
            .map(|length| length.to_string())
            .unwrap_or_default(),
        ConstraintKind::MaxLength => field
            .constraints
            .max_length
            .map(|length| length.to_string())
            .unwrap_or_default(),
        ConstraintKind::Pattern => field.constraints.pattern.clone().unwrap_or_default(),
        ConstraintKind::Enum => field
            .constraints
            .enum_values
            .as_ref()
            .map(|values| {
                serde_json::to_string(values).unwrap_or_default()
            })
            .unwrap_or_default(),
    };
    format!("constraint \"{}\" is \"{}\"", kind.as_str(), declared)
}

fn check_minimum(field: &Field, value: &Value) -> bool {
    let Some(bound) = bound_value(field, field.constraints.minimum.as_ref()) else {
        // An uncastable bound never triggers a violation
        return true;
    };
    matches!(
        compare(value, &bound),
        Some(Ordering::Greater | Ordering::Equal) | None
    )
}

fn check_maximum(field: &Field, value: &Value) -> bool {
    let Some(bound) = bound_value(field, field.constraints.maximum.as_ref()) else {
        return true;
    };
    matches!(
        compare(value, &bound),
        Some(Ordering::Less | Ordering::Equal) | None
    )
}

fn check_pattern(field: &Field, value: &Value, cache: &mut RegexCache) -> bool {
    let Some(pattern) = field.constraints.pattern.as_deref() else {
        return true;
    };
    let Some(regex) = cache.get(pattern) else {
        return false;
    };
    regex.is_match(&value.to_string())
}

fn check_enum(field: &Field, value: &Value) -> bool {
    let Some(members) = field.constraints.enum_values.as_ref() else {
        return true;
    };
    members
        .iter()
        .filter_map(|member| read_cell(field, &json_to_value(member)))
        .any(|member| member == *value)
}

/// Casts a declared bound with the owning field's type so comparisons happen
/// between typed values.
fn bound_value(field: &Field, raw: Option<&serde_json::Value>) -> Option<Value> {
    read_cell(field, &json_to_value(raw?))
}

pub(crate) fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(flag) => Value::Bool(*flag),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(integer) => Value::Integer(integer),
            None => Value::Number(number.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(text) => Value::String(text.clone()),
        serde_json::Value::Array(items) => Value::Array(items.clone()),
        serde_json::Value::Object(map) => Value::Object(map.clone()),
    }
}

/// Orders two typed values of the same logical type; numeric values compare
/// across the integer/number divide.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Year(a), Value::Year(b)) => Some(a.cmp(b)),
        (
            Value::YearMonth { year: ya, month: ma },
            Value::YearMonth { year: yb, month: mb },
        ) => Some((ya, ma).cmp(&(yb, mb))),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.as_number()?.partial_cmp(&right.as_number()?),
    }
}

fn cell_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn render_json(raw: Option<&serde_json::Value>) -> String {
    match raw {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
