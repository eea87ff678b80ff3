//! Regulation checks: user-configured rules over cells and rows.

use crate::check::{Check, Preparation, TableContext};
use crate::constraints::json_to_value;
use crate::expression::evaluate;
use crate::row::Row;
use crate::types::read_cell;
use serde::Deserialize;
use std::collections::HashMap;
use tabcheck_core::{ValidationError, Value};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SequentialValueOptions {
    field_name: String,
}

/// Requires one integer field to increase by exactly one per row.
///
/// The first observed value seeds the cursor; after a mismatch the cursor
/// re-seeds from the observed value, so one gap yields one error.
pub struct SequentialValueCheck {
    field_name: String,
    field_index: usize,
    cursor: Option<i64>,
}

impl SequentialValueCheck {
    pub fn from_options(options: serde_json::Value) -> Result<Self, ValidationError> {
        let options: SequentialValueOptions =
            serde_json::from_value(options).map_err(|error| ValidationError::TaskError {
                note: format!("sequential-value options are invalid: {error}"),
            })?;
        Ok(Self {
            field_name: options.field_name,
            field_index: 0,
            cursor: None,
        })
    }
}

impl Check for SequentialValueCheck {
    fn code(&self) -> &'static str {
        "sequential-value"
    }

    fn prepare(&mut self, context: &TableContext) -> Preparation {
        match context.schema.field_index(&self.field_name) {
            Some(index) => {
                self.field_index = index;
                Preparation::Ready
            }
            None => Preparation::Invalid(ValidationError::TaskError {
                note: format!(
                    "sequential-value check requires field \"{}\" to exist",
                    self.field_name,
                ),
            }),
        }
    }

    fn validate_row(&mut self, context: &TableContext, row: &Row) -> Vec<ValidationError> {
        // Null and non-integer cells do not advance the sequence
        let Some(value) = row.cells.get(self.field_index).and_then(Value::as_integer) else {
            return Vec::new();
        };

        match self.cursor {
            None => {
                self.cursor = Some(value + 1);
                Vec::new()
            }
            Some(expected) if value == expected => {
                self.cursor = Some(value + 1);
                Vec::new()
            }
            Some(expected) => {
                self.cursor = Some(value + 1);
                vec![ValidationError::SequentialValue {
                    cell: value.to_string(),
                    row_number: row.row_number,
                    row_position: row.row_position,
                    field_name: self.field_name.clone(),
                    field_number: self.field_index + 1,
                    field_position: context.field_position(self.field_index),
                    note: format!("the value is not sequential, expected \"{expected}\""),
                }]
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ForbiddenValueOptions {
    field_name: String,
    values: Vec<serde_json::Value>,
}

/// Rejects a closed set of values in one field.
pub struct ForbiddenValueCheck {
    field_name: String,
    raw_values: Vec<serde_json::Value>,
    field_index: usize,
    forbidden: Vec<Value>,
}

impl ForbiddenValueCheck {
    pub fn from_options(options: serde_json::Value) -> Result<Self, ValidationError> {
        let options: ForbiddenValueOptions =
            serde_json::from_value(options).map_err(|error| ValidationError::TaskError {
                note: format!("forbidden-value options are invalid: {error}"),
            })?;
        Ok(Self {
            field_name: options.field_name,
            raw_values: options.values,
            field_index: 0,
            forbidden: Vec::new(),
        })
    }
}

impl Check for ForbiddenValueCheck {
    fn code(&self) -> &'static str {
        "forbidden-value"
    }

    fn prepare(&mut self, context: &TableContext) -> Preparation {
        let Some(index) = context.schema.field_index(&self.field_name) else {
            return Preparation::Invalid(ValidationError::TaskError {
                note: format!(
                    "forbidden-value check requires field \"{}\" to exist",
                    self.field_name,
                ),
            });
        };
        self.field_index = index;
        // Forbidden members cast with the field's type so "2" forbids 2
        let field = &context.schema.fields[index];
        self.forbidden = self
            .raw_values
            .iter()
            .filter_map(|raw| read_cell(field, &json_to_value(raw)))
            .collect();
        Preparation::Ready
    }

    fn validate_row(&mut self, context: &TableContext, row: &Row) -> Vec<ValidationError> {
        let Some(cell) = row.cells.get(self.field_index) else {
            return Vec::new();
        };
        if cell.is_null() || !self.forbidden.contains(cell) {
            return Vec::new();
        }
        vec![ValidationError::ForbiddenValue {
            cell: cell.to_string(),
            row_number: row.row_number,
            row_position: row.row_position,
            field_name: self.field_name.clone(),
            field_number: self.field_index + 1,
            field_position: context.field_position(self.field_index),
            note: "the value is forbidden".to_string(),
        }]
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RowConstraintOptions {
    constraint: String,
}

/// Evaluates a boolean expression over each row's named cells; a false
/// verdict or an evaluation failure both flag the row.
pub struct RowConstraintCheck {
    constraint: String,
}

impl RowConstraintCheck {
    pub fn from_options(options: serde_json::Value) -> Result<Self, ValidationError> {
        let options: RowConstraintOptions =
            serde_json::from_value(options).map_err(|error| ValidationError::TaskError {
                note: format!("row-constraint options are invalid: {error}"),
            })?;
        Ok(Self {
            constraint: options.constraint,
        })
    }
}

impl Check for RowConstraintCheck {
    fn code(&self) -> &'static str {
        "row-constraint"
    }

    fn validate_row(&mut self, context: &TableContext, row: &Row) -> Vec<ValidationError> {
        if row.blank {
            return Vec::new();
        }

        let bindings: HashMap<String, Value> = context
            .schema
            .fields
            .iter()
            .enumerate()
            .filter_map(|(index, field)| {
                row.cells
                    .get(index)
                    .map(|cell| (field.name.clone(), cell.clone()))
            })
            .collect();

        if evaluate(&self.constraint, &bindings).unwrap_or(false) {
            return Vec::new();
        }
        vec![ValidationError::RowConstraint {
            row_number: row.row_number,
            row_position: row.row_position,
            note: format!("the row constraint to conform is \"{}\"", self.constraint),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::TableContext;
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

    fn integer_row(n: usize, cells: &[Option<i64>]) -> Row {
        Row {
            row_number: n,
            row_position: n + 1,
            cells: cells
                .iter()
                .map(|cell| cell.map(Value::Integer).unwrap_or(Value::Null))
                .collect(),
            errors: Vec::new(),
            blank: false,
        }
    }

    #[test]
    fn test_sequential_value_single_gap() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("index", FieldType::Integer))
                .build(),
        );
        let mut check = SequentialValueCheck::from_options(serde_json::json!({
            "fieldName": "index",
        }))
        .unwrap();
        assert!(matches!(check.prepare(&ctx), Preparation::Ready));

        let mut errors = Vec::new();
        for (n, value) in [1, 2, 3, 5, 6].into_iter().enumerate() {
            errors.extend(check.validate_row(&ctx, &integer_row(n + 1, &[Some(value)])));
        }
        // One gap yields exactly one error; the cursor re-seeds after it
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "sequential-value");
        assert_eq!(errors[0].row_number(), Some(4));
    }

    #[test]
    fn test_sequential_value_skips_nulls() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("index", FieldType::Integer))
                .build(),
        );
        let mut check = SequentialValueCheck::from_options(serde_json::json!({
            "fieldName": "index",
        }))
        .unwrap();
        check.prepare(&ctx);

        let mut errors = Vec::new();
        for (n, value) in [Some(1), None, Some(2)].into_iter().enumerate() {
            errors.extend(check.validate_row(&ctx, &integer_row(n + 1, &[value])));
        }
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn test_forbidden_value_casts_members() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("rank", FieldType::Integer))
                .build(),
        );
        let mut check = ForbiddenValueCheck::from_options(serde_json::json!({
            "fieldName": "rank",
            "values": ["2", 3],
        }))
        .unwrap();
        assert!(matches!(check.prepare(&ctx), Preparation::Ready));

        assert_eq!(check.validate_row(&ctx, &integer_row(1, &[Some(1)])), vec![]);
        let errors = check.validate_row(&ctx, &integer_row(2, &[Some(2)]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "forbidden-value");
        assert_eq!(check.validate_row(&ctx, &integer_row(3, &[None])), vec![]);
    }

    #[test]
    fn test_row_constraint() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("salary", FieldType::Integer))
                .field(Field::new("bonus", FieldType::Integer))
                .build(),
        );
        let mut check = RowConstraintCheck::from_options(serde_json::json!({
            "constraint": "salary > bonus",
        }))
        .unwrap();

        assert_eq!(
            check.validate_row(&ctx, &integer_row(1, &[Some(1000), Some(200)])),
            vec![]
        );
        let errors = check.validate_row(&ctx, &integer_row(2, &[Some(100), Some(200)]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "row-constraint");
        assert!(errors[0].message().contains("salary > bonus"));
    }

    #[test]
    fn test_row_constraint_evaluation_failure_flags_row() {
        let ctx = context(
            SchemaBuilder::new()
                .field(Field::new("salary", FieldType::Integer))
                .build(),
        );
        let mut check = RowConstraintCheck::from_options(serde_json::json!({
            "constraint": "unknown_field > 0",
        }))
        .unwrap();
        let errors = check.validate_row(&ctx, &integer_row(1, &[Some(1)]));
        assert_eq!(errors.len(), 1);
    }
}
