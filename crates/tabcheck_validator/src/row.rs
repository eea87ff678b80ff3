//! Row validation.
//!
//! Turns one raw stream row into typed cells plus cell-level errors. The
//! sequence per row is fixed: missing-value normalization, the blank-row
//! short circuit, then per-column structure (extra/missing cell), cast and
//! constraint testing.

use crate::constraints::{RegexCache, check_cell, constraint_note};
use crate::header::position_at;
use crate::types::read_cell;
use tabcheck_core::{Schema, ValidationError, Value};

/// One processed row: typed cells aligned with the schema's fields.
#[derive(Debug)]
pub struct Row {
    /// 1-based logical row number (header excluded)
    pub row_number: usize,

    /// 1-based physical row position in the stream
    pub row_position: usize,

    /// Typed cells, one per schema field; `Null` for missing values and
    /// failed casts
    pub cells: Vec<Value>,

    /// Cell-level errors in column order
    pub errors: Vec<ValidationError>,

    /// True when every source cell was blank or missing
    pub blank: bool,
}

/// Per-table row processor; owns the compiled-pattern cache.
pub struct RowValidator {
    schema: Schema,
    field_positions: Vec<usize>,
    cache: RegexCache,
}

impl RowValidator {
    /// Creates a processor for the effective schema produced by header
    /// validation.
    pub fn new(schema: Schema, field_positions: Vec<usize>) -> Self {
        Self {
            schema,
            field_positions,
            cache: RegexCache::new(),
        }
    }

    /// The effective schema rows are validated against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Processes one raw row.
    pub fn process(&mut self, raw: &[Value], row_number: usize, row_position: usize) -> Row {
        let normalized: Vec<Value> = raw
            .iter()
            .map(|cell| self.normalize(cell))
            .collect();

        // Blank-row short circuit: no cell-level checks on an all-blank row
        if normalized.iter().all(Value::is_null) {
            return Row {
                row_number,
                row_position,
                cells: vec![Value::Null; self.schema.fields.len()],
                errors: vec![ValidationError::BlankRow {
                    row_number,
                    row_position,
                }],
                blank: true,
            };
        }

        let mut cells = Vec::with_capacity(self.schema.fields.len());
        let mut errors = Vec::new();
        let window = self.schema.fields.len().max(normalized.len());

        for index in 0..window {
            let field_number = index + 1;
            let field_position = position_at(&self.field_positions, index);

            match (self.schema.fields.get(index), normalized.get(index)) {
                (None, Some(_)) => {
                    errors.push(ValidationError::ExtraCell {
                        cell: raw[index].to_string(),
                        row_number,
                        row_position,
                        field_number,
                        field_position,
                    });
                }
                (Some(field), None) => {
                    errors.push(ValidationError::MissingCell {
                        row_number,
                        row_position,
                        field_name: field.name.clone(),
                        field_number,
                        field_position,
                    });
                    cells.push(Value::Null);
                }
                (Some(field), Some(cell)) => {
                    let typed = if cell.is_null() {
                        Some(Value::Null)
                    } else {
                        read_cell(field, cell)
                    };
                    match typed {
                        None => {
                            errors.push(ValidationError::TypeError {
                                cell: raw[index].to_string(),
                                row_number,
                                row_position,
                                field_name: field.name.clone(),
                                field_number,
                                field_position,
                                note: format!(
                                    "type is \"{}/{}\"",
                                    field.field_type.as_str(),
                                    field.format.as_deref().unwrap_or("default"),
                                ),
                            });
                            cells.push(Value::Null);
                        }
                        Some(typed) => {
                            for kind in check_cell(field, &typed, &mut self.cache) {
                                errors.push(ValidationError::ConstraintError {
                                    cell: raw[index].to_string(),
                                    row_number,
                                    row_position,
                                    field_name: field.name.clone(),
                                    field_number,
                                    field_position,
                                    note: constraint_note(field, kind),
                                });
                            }
                            cells.push(typed);
                        }
                    }
                }
                (None, None) => {}
            }
        }

        Row {
            row_number,
            row_position,
            cells,
            errors,
            blank: false,
        }
    }

    fn normalize(&self, cell: &Value) -> Value {
        match cell {
            Value::Null => Value::Null,
            Value::String(text) if self.schema.is_missing_value(text) => Value::Null,
            other => other.clone(),
        }
    }
}

impl Row {
    /// Typed cell for a field name, if the schema declares it.
    pub fn value(&self, schema: &Schema, name: &str) -> Option<&Value> {
        self.cells.get(schema.field_index(name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabcheck_core::{Field, FieldBuilder, FieldType, SchemaBuilder};

    fn validator(fields: Vec<Field>) -> RowValidator {
        let mut builder = SchemaBuilder::new();
        for field in fields {
            builder = builder.field(field);
        }
        let schema = builder.build();
        let positions = (1..=schema.fields.len()).collect();
        RowValidator::new(schema, positions)
    }

    fn raw(cells: &[&str]) -> Vec<Value> {
        cells.iter().map(|cell| Value::String(cell.to_string())).collect()
    }

    #[test]
    fn test_clean_row() {
        let mut v = validator(vec![
            Field::new("id", FieldType::Integer),
            Field::new("name", FieldType::String),
        ]);
        let row = v.process(&raw(&["1", "english"]), 1, 2);
        assert_eq!(row.errors, vec![]);
        assert_eq!(row.cells, vec![Value::Integer(1), Value::String("english".into())]);
        assert!(!row.blank);
    }

    #[test]
    fn test_blank_row_short_circuits() {
        let mut v = validator(vec![
            FieldBuilder::new("id", FieldType::Integer).required(true).build(),
            Field::new("name", FieldType::String),
        ]);
        let row = v.process(&raw(&["", ""]), 3, 4);
        assert!(row.blank);
        assert_eq!(row.errors.len(), 1);
        assert_eq!(row.errors[0].code(), "blank-row");
        assert_eq!(row.errors[0].row_position(), Some(4));
    }

    #[test]
    fn test_extra_and_missing_cells() {
        let mut v = validator(vec![
            Field::new("id", FieldType::Integer),
            Field::new("name", FieldType::String),
        ]);

        let row = v.process(&raw(&["1", "english", "surplus"]), 1, 2);
        assert_eq!(row.errors.len(), 1);
        assert_eq!(row.errors[0].code(), "extra-cell");
        assert_eq!(row.errors[0].field_position(), Some(3));
        // Typed cells stay aligned with the schema
        assert_eq!(row.cells.len(), 2);

        let row = v.process(&raw(&["1"]), 2, 3);
        assert_eq!(row.errors.len(), 1);
        assert_eq!(row.errors[0].code(), "missing-cell");
        assert_eq!(row.cells, vec![Value::Integer(1), Value::Null]);
    }

    #[test]
    fn test_missing_cell_count_matches_window() {
        let mut v = validator(vec![
            Field::new("a", FieldType::String),
            Field::new("b", FieldType::String),
            Field::new("c", FieldType::String),
            Field::new("d", FieldType::String),
        ]);
        let row = v.process(&raw(&["x"]), 1, 2);
        let missing = row
            .errors
            .iter()
            .filter(|error| error.code() == "missing-cell")
            .count();
        assert_eq!(missing, 3);
    }

    #[test]
    fn test_type_error_note() {
        let mut v = validator(vec![Field::new("id", FieldType::Integer)]);
        let row = v.process(&raw(&["abc"]), 1, 2);
        assert_eq!(row.errors.len(), 1);
        assert_eq!(row.errors[0].code(), "type-error");
        assert!(row.errors[0].message().contains("integer/default"));
        assert_eq!(row.cells, vec![Value::Null]);
    }

    #[test]
    fn test_constraint_error_independent_of_cast() {
        let mut v = validator(vec![
            FieldBuilder::new("age", FieldType::Integer).minimum(18).build(),
        ]);
        let row = v.process(&raw(&["12"]), 1, 2);
        assert_eq!(row.errors.len(), 1);
        assert_eq!(row.errors[0].code(), "constraint-error");
        // The cast itself succeeded
        assert_eq!(row.cells, vec![Value::Integer(12)]);
    }

    #[test]
    fn test_missing_value_normalization() {
        let schema = SchemaBuilder::new()
            .field(Field::new("id", FieldType::Integer))
            .field(Field::new("name", FieldType::String))
            .missing_values(["", "n/a"])
            .build();
        let mut v = RowValidator::new(schema, vec![1, 2]);
        let row = v.process(&raw(&["1", "n/a"]), 1, 2);
        assert_eq!(row.errors, vec![]);
        assert_eq!(row.cells, vec![Value::Integer(1), Value::Null]);
    }

    #[test]
    fn test_required_fires_on_missing_value() {
        let mut v = validator(vec![
            FieldBuilder::new("id", FieldType::Integer).required(true).build(),
            Field::new("name", FieldType::String),
        ]);
        let row = v.process(&raw(&["", "english"]), 1, 2);
        assert_eq!(row.errors.len(), 1);
        assert_eq!(row.errors[0].code(), "constraint-error");
        assert!(row.errors[0].message().contains("required"));
    }

    #[test]
    fn test_value_lookup_by_name() {
        let mut v = validator(vec![
            Field::new("id", FieldType::Integer),
            Field::new("name", FieldType::String),
        ]);
        let schema = v.schema().clone();
        let row = v.process(&raw(&["7", "english"]), 1, 2);
        assert_eq!(row.value(&schema, "id"), Some(&Value::Integer(7)));
        assert_eq!(row.value(&schema, "nope"), None);
    }
}
