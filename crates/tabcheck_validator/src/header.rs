//! Header validation.
//!
//! Pairs observed header labels with schema fields over a shared window and
//! reports structural defects (extra and missing headers) and schema
//! defects (blank, duplicate and non-matching headers). The pairing is a
//! pure function of its inputs, so re-validating the same header is
//! idempotent.

use tabcheck_core::{Field, FieldType, Schema, ValidationError};

/// Outcome of pairing a header row against a schema.
#[derive(Debug)]
pub struct HeaderValidation {
    /// Header errors in column order
    pub errors: Vec<ValidationError>,

    /// Effective schema for row validation; differs from the input schema
    /// when fields were reordered or inferred for extra labels
    pub schema: Schema,

    /// Physical column position for each effective field
    pub field_positions: Vec<usize>,
}

/// Options controlling the header/field pairing.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderOptions {
    /// Reorder schema fields by label name before pairing
    pub order_fields: bool,

    /// Append an `any` field for each extra label instead of reporting it;
    /// used when the schema itself was inferred from the stream
    pub infer_extra: bool,
}

/// Validates header labels against a schema.
///
/// `field_positions` carries the physical column position of each label;
/// positions for columns beyond the last label extrapolate from the final
/// entry.
pub fn validate_headers(
    schema: &Schema,
    labels: &[String],
    field_positions: &[usize],
    options: HeaderOptions,
) -> HeaderValidation {
    let mut schema = schema.clone();
    if options.order_fields {
        schema.fields = reorder_fields(schema.fields, labels);
    }

    let mut errors = Vec::new();
    let mut positions = Vec::new();
    let window = schema.fields.len().max(labels.len());

    for index in 0..window {
        let field_number = index + 1;
        let field_position = position_at(field_positions, index);

        match (schema.fields.get(index), labels.get(index)) {
            (Some(field), None) => {
                errors.push(ValidationError::MissingHeader {
                    field_name: field.name.clone(),
                    field_number,
                    field_position,
                });
                positions.push(field_position);
            }
            (None, Some(label)) => {
                if options.infer_extra {
                    schema.fields.push(Field::new(label.clone(), FieldType::Any));
                    positions.push(field_position);
                } else {
                    errors.push(ValidationError::ExtraHeader {
                        cell: label.clone(),
                        field_number,
                        field_position,
                    });
                }
            }
            (Some(field), Some(label)) => {
                positions.push(field_position);
                if label.trim().is_empty() {
                    errors.push(ValidationError::BlankHeader {
                        field_name: field.name.clone(),
                        field_number,
                        field_position,
                    });
                    continue;
                }
                let priors: Vec<String> = labels[..index]
                    .iter()
                    .enumerate()
                    .filter(|(_, prior)| *prior == label)
                    .map(|(prior_index, _)| position_at(field_positions, prior_index).to_string())
                    .collect();
                if !priors.is_empty() {
                    errors.push(ValidationError::DuplicateHeader {
                        cell: label.clone(),
                        field_name: field.name.clone(),
                        field_number,
                        field_position,
                        note: format!("at position(s) \"{}\"", priors.join(", ")),
                    });
                }
                let matches = if options.order_fields {
                    slugify(label) == slugify(&field.name)
                } else {
                    *label == field.name
                };
                if !matches {
                    errors.push(ValidationError::NonMatchingHeader {
                        cell: label.clone(),
                        field_name: field.name.clone(),
                        field_number,
                        field_position,
                    });
                }
            }
            (None, None) => {}
        }
    }

    HeaderValidation {
        errors,
        schema,
        field_positions: positions,
    }
}

/// Stable reorder: fields whose slugified name matches a label move to
/// that label's slot, the rest keep their relative order after them.
fn reorder_fields(fields: Vec<Field>, labels: &[String]) -> Vec<Field> {
    let mut remaining: Vec<Option<Field>> = fields.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(remaining.len());

    for label in labels {
        let slug = slugify(label);
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|field| slugify(&field.name) == slug))
            && let Some(field) = slot.take()
        {
            ordered.push(field);
        }
    }
    ordered.extend(remaining.into_iter().flatten());
    ordered
}

/// Lowercased text with everything but letters and digits stripped; the
/// key used to pair labels with fields when reordering.
fn slugify(text: &str) -> String {
    text.chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Physical position of the column at `index`, extrapolating past the end
/// of the known positions.
pub fn position_at(field_positions: &[usize], index: usize) -> usize {
    match field_positions.get(index) {
        Some(position) => *position,
        None => match field_positions.last() {
            Some(last) => last + (index - field_positions.len()) + 1,
            None => index + 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabcheck_core::SchemaBuilder;

    fn schema(names: &[&str]) -> Schema {
        let mut builder = SchemaBuilder::new();
        for name in names {
            builder = builder.field(Field::new(*name, FieldType::String));
        }
        builder.build()
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_matching_header_is_clean() {
        let outcome = validate_headers(
            &schema(&["id", "name"]),
            &labels(&["id", "name"]),
            &[1, 2],
            HeaderOptions::default(),
        );
        assert_eq!(outcome.errors, vec![]);
        assert_eq!(outcome.field_positions, vec![1, 2]);
    }

    #[test]
    fn test_extra_headers_positions() {
        let outcome = validate_headers(
            &schema(&["id", "name"]),
            &labels(&["id", "name", "extra-1", "extra-2"]),
            &[1, 2, 3, 4],
            HeaderOptions::default(),
        );
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].code(), "extra-header");
        assert_eq!(outcome.errors[0].field_position(), Some(3));
        assert_eq!(outcome.errors[1].field_position(), Some(4));
    }

    #[test]
    fn test_extra_headers_positions_extrapolate() {
        // Only the label positions are known; columns beyond them count on
        let outcome = validate_headers(
            &schema(&["id"]),
            &labels(&["id", "extra-1", "extra-2"]),
            &[1],
            HeaderOptions::default(),
        );
        assert_eq!(outcome.errors[0].field_position(), Some(2));
        assert_eq!(outcome.errors[1].field_position(), Some(3));
    }

    #[test]
    fn test_missing_header() {
        let outcome = validate_headers(
            &schema(&["id", "name", "age"]),
            &labels(&["id", "name"]),
            &[1, 2],
            HeaderOptions::default(),
        );
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].code(), "missing-header");
        assert_eq!(outcome.errors[0].field_position(), Some(3));
        // The missing field still occupies a slot for row validation
        assert_eq!(outcome.field_positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_blank_header_short_circuits() {
        let outcome = validate_headers(
            &schema(&["id", "name"]),
            &labels(&["id", ""]),
            &[1, 2],
            HeaderOptions::default(),
        );
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].code(), "blank-header");
    }

    #[test]
    fn test_duplicate_header_lists_all_priors() {
        let outcome = validate_headers(
            &schema(&["name", "name2", "name3"]),
            &labels(&["name", "name", "name"]),
            &[1, 2, 3],
            HeaderOptions::default(),
        );
        let duplicates: Vec<&ValidationError> = outcome
            .errors
            .iter()
            .filter(|error| error.code() == "duplicate-header")
            .collect();
        assert_eq!(duplicates.len(), 2);
        assert!(duplicates[0].message().contains("\"1\""));
        assert!(duplicates[1].message().contains("\"1, 2\""));
    }

    #[test]
    fn test_non_matching_header() {
        let outcome = validate_headers(
            &schema(&["id", "name"]),
            &labels(&["id", "title"]),
            &[1, 2],
            HeaderOptions::default(),
        );
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].code(), "non-matching-header");
    }

    #[test]
    fn test_order_fields_repairs_order() {
        let outcome = validate_headers(
            &schema(&["id", "name"]),
            &labels(&["name", "id"]),
            &[1, 2],
            HeaderOptions {
                order_fields: true,
                ..Default::default()
            },
        );
        assert_eq!(outcome.errors, vec![]);
        assert_eq!(outcome.schema.field_names(), vec!["name", "id"]);
    }

    #[test]
    fn test_order_fields_repairs_by_slug() {
        // Case and separators do not matter for the pairing
        let outcome = validate_headers(
            &schema(&["Id", "Full Name"]),
            &labels(&["full_name", "id"]),
            &[1, 2],
            HeaderOptions {
                order_fields: true,
                ..Default::default()
            },
        );
        assert_eq!(outcome.errors, vec![]);
        assert_eq!(outcome.schema.field_names(), vec!["Full Name", "Id"]);
    }

    #[test]
    fn test_order_fields_leaves_unmatched_labels_positional() {
        let outcome = validate_headers(
            &schema(&["id", "name"]),
            &labels(&["name", "title"]),
            &[1, 2],
            HeaderOptions {
                order_fields: true,
                ..Default::default()
            },
        );
        // "name" re-pairs; "title" falls back to the leftover "id" field
        assert_eq!(outcome.schema.field_names(), vec!["name", "id"]);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].code(), "non-matching-header");
    }

    #[test]
    fn test_infer_extra_appends_any_field() {
        let outcome = validate_headers(
            &schema(&["id"]),
            &labels(&["id", "note"]),
            &[1, 2],
            HeaderOptions {
                infer_extra: true,
                ..Default::default()
            },
        );
        assert_eq!(outcome.errors, vec![]);
        assert_eq!(outcome.schema.fields.len(), 2);
        assert_eq!(outcome.schema.fields[1].field_type, FieldType::Any);
        assert_eq!(outcome.field_positions, vec![1, 2]);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let schema = schema(&["id", "name"]);
        let labels = labels(&["id", "wrong", "extra"]);
        let first = validate_headers(&schema, &labels, &[1, 2, 3], HeaderOptions::default());
        let second = validate_headers(&schema, &labels, &[1, 2, 3], HeaderOptions::default());
        assert_eq!(first.errors, second.errors);
    }
}
