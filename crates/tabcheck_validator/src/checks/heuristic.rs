//! Heuristic checks: duplicated rows, statistical outliers and values that
//! look truncated by an upstream system.

use crate::check::{Check, Preparation, TableContext};
use crate::row::Row;
use serde::Deserialize;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use tabcheck_core::{FieldType, ValidationError, Value};

/// Maximum string length commonly produced by truncating storage layers.
const TRUNCATED_STRING_LENGTH: usize = 255;

/// Integer ceilings of common storage types; a cell exactly at one of
/// these is suspect.
const TRUNCATED_INTEGER_SENTINELS: [i64; 6] = [
    32767,
    65535,
    2097152,
    2147483647,
    4294967295,
    9223372036854775807,
];

/// Flags rows whose cell texts repeat an earlier row verbatim.
///
/// Rows are tracked by hash rather than by content, keeping memory flat
/// for wide tables.
#[derive(Default)]
pub struct DuplicateRowCheck {
    seen: HashMap<u64, usize>,
}

impl DuplicateRowCheck {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Check for DuplicateRowCheck {
    fn code(&self) -> &'static str {
        "duplicate-row"
    }

    fn validate_row(&mut self, _context: &TableContext, row: &Row) -> Vec<ValidationError> {
        if row.blank {
            return Vec::new();
        }

        let mut hasher = DefaultHasher::new();
        for cell in &row.cells {
            cell.to_string().hash(&mut hasher);
        }
        let digest = hasher.finish();

        match self.seen.get(&digest) {
            Some(first) => vec![ValidationError::DuplicateRow {
                row_number: row.row_number,
                row_position: row.row_position,
                note: format!("the same as the row at position \"{first}\""),
            }],
            None => {
                self.seen.insert(digest, row.row_position);
                Vec::new()
            }
        }
    }
}

/// Averaging strategy for the deviated-value check.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Average {
    #[default]
    Mean,
    Median,
    Mode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DeviatedValueOptions {
    field_name: String,
    #[serde(default)]
    average: Average,
    #[serde(default = "default_interval")]
    interval: f64,
}

fn default_interval() -> f64 {
    3.0
}

/// Flags numeric values outside `average ± interval * stdev` for one
/// field. The verdict needs the whole column, so errors surface at end of
/// table.
pub struct DeviatedValueCheck {
    field_name: String,
    average: Average,
    interval: f64,
    field_index: usize,
    observations: Vec<Observation>,
}

struct Observation {
    row_position: usize,
    text: String,
    value: f64,
}

impl DeviatedValueCheck {
    pub fn from_options(options: serde_json::Value) -> Result<Self, ValidationError> {
        let options: DeviatedValueOptions =
            serde_json::from_value(options).map_err(|error| ValidationError::TaskError {
                note: format!("deviated-value options are invalid: {error}"),
            })?;
        Ok(Self {
            field_name: options.field_name,
            average: options.average,
            interval: options.interval,
            field_index: 0,
            observations: Vec::new(),
        })
    }
}

impl Check for DeviatedValueCheck {
    fn code(&self) -> &'static str {
        "deviated-value"
    }

    fn prepare(&mut self, context: &TableContext) -> Preparation {
        let Some(index) = context.schema.field_index(&self.field_name) else {
            return Preparation::Invalid(ValidationError::TaskError {
                note: format!(
                    "deviated-value check requires field \"{}\" to exist",
                    self.field_name,
                ),
            });
        };
        let field = &context.schema.fields[index];
        if !matches!(field.field_type, FieldType::Integer | FieldType::Number) {
            return Preparation::Invalid(ValidationError::TaskError {
                note: format!(
                    "deviated-value check requires field \"{}\" to be an integer or a number",
                    self.field_name,
                ),
            });
        }
        self.field_index = index;
        Preparation::Ready
    }

    fn validate_row(&mut self, _context: &TableContext, row: &Row) -> Vec<ValidationError> {
        if let Some(cell) = row.cells.get(self.field_index)
            && let Some(value) = cell.as_number()
        {
            self.observations.push(Observation {
                row_position: row.row_position,
                text: cell.to_string(),
                value,
            });
        }
        Vec::new()
    }

    fn validate_table(&mut self, _context: &TableContext) -> Vec<ValidationError> {
        // Deviation is undefined for fewer than two observations
        if self.observations.len() < 2 {
            return Vec::new();
        }

        let values: Vec<f64> = self.observations.iter().map(|o| o.value).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let center = match self.average {
            Average::Mean => mean,
            Average::Median => median(&values),
            Average::Mode => mode(&self.observations),
        };
        let variance = values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / (values.len() - 1) as f64;
        let stdev = variance.sqrt();
        let low = center - self.interval * stdev;
        let high = center + self.interval * stdev;

        self.observations
            .iter()
            .filter(|o| o.value < low || o.value > high)
            .map(|o| ValidationError::DeviatedValue {
                note: format!(
                    "value \"{}\" in row at position \"{}\" and field \"{}\" is deviated \"[{low:.2}, {high:.2}]\"",
                    o.text, o.row_position, self.field_name,
                ),
            })
            .collect()
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

/// Most frequent value; the first encountered wins a tie.
fn mode(observations: &[Observation]) -> f64 {
    let mut counted: Vec<(&str, f64, usize)> = Vec::new();
    for observation in observations {
        match counted
            .iter_mut()
            .find(|(text, _, _)| *text == observation.text)
        {
            Some((_, _, count)) => *count += 1,
            None => counted.push((&observation.text, observation.value, 1)),
        }
    }
    counted
        .iter()
        .max_by_key(|(_, _, count)| *count)
        .map(|(_, value, _)| *value)
        .unwrap_or(0.0)
}

/// Flags cells that sit exactly on a storage-type ceiling: strings of
/// length 255 and integers equal to a well-known maximum.
#[derive(Default)]
pub struct TruncatedValueCheck;

impl TruncatedValueCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Check for TruncatedValueCheck {
    fn code(&self) -> &'static str {
        "truncated-value"
    }

    fn validate_row(&mut self, context: &TableContext, row: &Row) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (index, cell) in row.cells.iter().enumerate() {
            let truncated = match cell {
                Value::String(text) => text.chars().count() == TRUNCATED_STRING_LENGTH,
                Value::Integer(value) => TRUNCATED_INTEGER_SENTINELS.contains(value),
                _ => false,
            };
            if truncated {
                errors.push(ValidationError::TruncatedValue {
                    cell: cell.to_string(),
                    row_number: row.row_number,
                    row_position: row.row_position,
                    field_name: context.schema.fields[index].name.clone(),
                    field_number: index + 1,
                    field_position: context.field_position(index),
                    note: "value is probably truncated".to_string(),
                });
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabcheck_core::{Field, FieldType, Schema, SchemaBuilder};

    fn context(schema: Schema) -> TableContext {
        let field_positions = (1..=schema.fields.len()).collect();
        TableContext {
            schema,
            field_positions,
            lookup: HashMap::new(),
        }
    }

    fn integer_rows(values: &[i64]) -> Vec<Row> {
        values
            .iter()
            .enumerate()
            .map(|(index, value)| Row {
                row_number: index + 1,
                row_position: index + 2,
                cells: vec![Value::Integer(*value)],
                errors: Vec::new(),
                blank: false,
            })
            .collect()
    }

    #[test]
    fn test_duplicate_row() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("id", FieldType::Integer))
                .field(Field::new("name", FieldType::String))
                .build(),
        );
        let mut check = DuplicateRowCheck::new();
        let make = |n: usize, id: i64, name: &str| Row {
            row_number: n,
            row_position: n + 1,
            cells: vec![Value::Integer(id), Value::String(name.into())],
            errors: Vec::new(),
            blank: false,
        };

        assert_eq!(check.validate_row(&ctx, &make(1, 1, "a")), vec![]);
        assert_eq!(check.validate_row(&ctx, &make(2, 2, "b")), vec![]);
        let errors = check.validate_row(&ctx, &make(3, 1, "a"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "duplicate-row");
        assert!(errors[0].message().contains("\"2\""));
    }

    #[test]
    fn test_deviated_value_boundary_inclusive() {
        let schema = SchemaBuilder::new()
            .field(Field::new("temperature", FieldType::Integer))
            .build();
        let ctx = context(schema);
        let mut check = DeviatedValueCheck::from_options(serde_json::json!({
            "fieldName": "temperature",
            "interval": 1,
        }))
        .unwrap();
        assert!(matches!(check.prepare(&ctx), Preparation::Ready));

        // mean 3, stdev ~1.58; 1 and 5 sit outside mean ± 1 * stdev
        for row in integer_rows(&[1, 2, 3, 4, 5]) {
            assert_eq!(check.validate_row(&ctx, &row), vec![]);
        }
        let errors = check.validate_table(&ctx);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code(), "deviated-value");
    }

    #[test]
    fn test_deviated_value_small_sample_is_silent() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("temperature", FieldType::Integer))
                .build(),
        );
        let mut check = DeviatedValueCheck::from_options(serde_json::json!({
            "fieldName": "temperature",
        }))
        .unwrap();
        check.prepare(&ctx);
        for row in integer_rows(&[42]) {
            check.validate_row(&ctx, &row);
        }
        assert_eq!(check.validate_table(&ctx), vec![]);
    }

    #[test]
    fn test_deviated_value_unknown_field() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("id", FieldType::Integer))
                .build(),
        );
        let mut check = DeviatedValueCheck::from_options(serde_json::json!({
            "fieldName": "nope",
        }))
        .unwrap();
        assert!(matches!(check.prepare(&ctx), Preparation::Invalid(_)));
    }

    #[test]
    fn test_deviated_value_rejects_non_numeric_field() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("name", FieldType::String))
                .build(),
        );
        let mut check = DeviatedValueCheck::from_options(serde_json::json!({
            "fieldName": "name",
        }))
        .unwrap();
        match check.prepare(&ctx) {
            Preparation::Invalid(error) => {
                assert_eq!(error.code(), "task-error");
                assert!(error.message().contains("integer"));
            }
            _ => panic!("expected invalid preparation"),
        }
    }

    #[test]
    fn test_deviated_value_rejects_unknown_options() {
        let result = DeviatedValueCheck::from_options(serde_json::json!({
            "fieldName": "temperature",
            "bogus": true,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_value_sentinels() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("count", FieldType::Integer))
                .field(Field::new("text", FieldType::String))
                .build(),
        );
        let mut check = TruncatedValueCheck::new();
        let row = Row {
            row_number: 1,
            row_position: 2,
            cells: vec![
                Value::Integer(32767),
                Value::String("a".repeat(255)),
            ],
            errors: Vec::new(),
            blank: false,
        };
        let errors = check.validate_row(&ctx, &row);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code(), "truncated-value");
        assert_eq!(errors[1].field_position(), Some(2));

        let clean = Row {
            row_number: 2,
            row_position: 3,
            cells: vec![Value::Integer(100), Value::String("short".into())],
            errors: Vec::new(),
            blank: false,
        };
        assert_eq!(check.validate_row(&ctx, &clean), vec![]);
    }
}
