//! Integrity checks: unique values, primary keys and foreign keys.

use crate::check::{Check, Preparation, TableContext};
use crate::row::Row;
use std::collections::HashMap;
use tabcheck_core::{ValidationError, Value};

/// Enforces per-field `unique` constraints and the schema's primary key.
///
/// Seen values are tracked by canonical text, so differently spelled
/// forms of the same typed value collide. Every occurrence is recorded,
/// violating rows included, so each later repetition lists all rows that
/// carried the value before it.
#[derive(Default)]
pub struct UniqueValueCheck {
    unique_fields: Vec<usize>,
    primary_key: Vec<usize>,
    seen_values: HashMap<usize, HashMap<String, Vec<usize>>>,
    seen_keys: HashMap<Vec<String>, Vec<usize>>,
}

/// `row 1` for a single row, `rows 1, 3` for several.
fn rows_note(rows: &[usize]) -> String {
    let rendered: Vec<String> = rows.iter().map(usize::to_string).collect();
    if rendered.len() == 1 {
        format!("row {}", rendered[0])
    } else {
        format!("rows {}", rendered.join(", "))
    }
}

impl UniqueValueCheck {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Check for UniqueValueCheck {
    fn code(&self) -> &'static str {
        "unique-value"
    }

    fn prepare(&mut self, context: &TableContext) -> Preparation {
        self.unique_fields = context
            .schema
            .fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.constraints.unique)
            .map(|(index, _)| index)
            .collect();
        self.primary_key = context
            .schema
            .primary_key
            .iter()
            .filter_map(|name| context.schema.field_index(name))
            .collect();

        if self.unique_fields.is_empty() && self.primary_key.is_empty() {
            return Preparation::Inapplicable;
        }
        Preparation::Ready
    }

    fn validate_row(&mut self, context: &TableContext, row: &Row) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if row.blank {
            return errors;
        }

        for &index in &self.unique_fields {
            let Some(cell) = row.cells.get(index) else {
                continue;
            };
            if cell.is_null() {
                continue;
            }
            let text = cell.to_string();
            let seen = self.seen_values.entry(index).or_default();
            let priors = seen.entry(text.clone()).or_default();
            if !priors.is_empty() {
                errors.push(ValidationError::UniqueError {
                    cell: text,
                    row_number: row.row_number,
                    row_position: row.row_position,
                    field_name: context.schema.fields[index].name.clone(),
                    field_number: index + 1,
                    field_position: context.field_position(index),
                    note: format!("the same value appears in {}", rows_note(priors)),
                });
            }
            priors.push(row.row_number);
        }

        if !self.primary_key.is_empty() {
            let tuple: Vec<String> = self
                .primary_key
                .iter()
                .map(|&index| {
                    row.cells
                        .get(index)
                        .map(Value::to_string)
                        .unwrap_or_default()
                })
                .collect();
            if tuple.iter().any(|text| !text.is_empty()) {
                let priors = self.seen_keys.entry(tuple).or_default();
                if !priors.is_empty() {
                    errors.push(ValidationError::PrimaryKeyError {
                        row_number: row.row_number,
                        row_position: row.row_position,
                        note: format!("the same primary key appears in {}", rows_note(priors)),
                    });
                }
                priors.push(row.row_number);
            }
        }

        errors
    }
}

/// Resolves each row's foreign keys against the reference lookup tables.
pub struct ForeignKeyCheck {
    resolved: Vec<ResolvedKey>,
}

struct ResolvedKey {
    field_indexes: Vec<usize>,
    resource: String,
    reference_fields: Vec<String>,
}

impl ForeignKeyCheck {
    pub fn new() -> Self {
        Self {
            resolved: Vec::new(),
        }
    }
}

impl Check for ForeignKeyCheck {
    fn code(&self) -> &'static str {
        "foreign-key"
    }

    fn prepare(&mut self, context: &TableContext) -> Preparation {
        if context.schema.foreign_keys.is_empty() {
            return Preparation::Inapplicable;
        }

        for foreign_key in &context.schema.foreign_keys {
            if !context.lookup.contains_key(&foreign_key.reference.resource) {
                return Preparation::Invalid(ValidationError::TaskError {
                    note: format!(
                        "foreign key reference \"{}\" has no lookup data",
                        foreign_key.reference.resource,
                    ),
                });
            }
            self.resolved.push(ResolvedKey {
                field_indexes: foreign_key
                    .fields
                    .iter()
                    .filter_map(|name| context.schema.field_index(name))
                    .collect(),
                resource: foreign_key.reference.resource.clone(),
                reference_fields: foreign_key.reference.fields.clone(),
            });
        }
        Preparation::Ready
    }

    fn validate_row(&mut self, context: &TableContext, row: &Row) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if row.blank {
            return errors;
        }

        for key in &self.resolved {
            let tuple: Vec<Option<String>> = key
                .field_indexes
                .iter()
                .map(|&index| match row.cells.get(index) {
                    Some(Value::Null) | None => None,
                    Some(cell) => Some(cell.to_string()),
                })
                .collect();
            // A fully null key is trivially satisfied
            if tuple.iter().all(Option::is_none) {
                continue;
            }
            let known = context
                .lookup
                .get(&key.resource)
                .is_some_and(|entries| entries.contains(&tuple));
            if !known {
                let rendered: Vec<String> = tuple
                    .into_iter()
                    .map(|text| text.unwrap_or_default())
                    .collect();
                errors.push(ValidationError::ForeignKeyError {
                    row_number: row.row_number,
                    row_position: row.row_position,
                    note: format!(
                        "values [{}] not found in the reference \"{}\" fields [{}]",
                        rendered.join(", "),
                        key.resource,
                        key.reference_fields.join(", "),
                    ),
                });
            }
        }
        errors
    }
}
