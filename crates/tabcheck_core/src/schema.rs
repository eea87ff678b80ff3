//! Schema and field definitions.
//!
//! This module contains the types describing the expected shape of a table:
//! ordered fields with logical types, formats and constraints, plus optional
//! primary and foreign key declarations. A `Schema` is immutable once built;
//! `check_metadata` validates a descriptor once at construction time.

use crate::ValidationError;
use serde::{Deserialize, Deserializer, Serialize};

/// Logical type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Accepts any value unchanged
    #[default]
    Any,
    /// JSON array
    Array,
    /// Boolean
    Boolean,
    /// Calendar date
    Date,
    /// Date with time of day
    DateTime,
    /// ISO 8601 duration
    Duration,
    /// GeoJSON object
    Geojson,
    /// Geographic point
    Geopoint,
    /// Integer
    Integer,
    /// Floating point number
    Number,
    /// String
    String,
    /// Time of day
    Time,
    /// Calendar year
    Year,
    /// Calendar year and month
    YearMonth,
}

impl FieldType {
    /// The descriptor spelling of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Any => "any",
            FieldType::Array => "array",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Duration => "duration",
            FieldType::Geojson => "geojson",
            FieldType::Geopoint => "geopoint",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Time => "time",
            FieldType::Year => "year",
            FieldType::YearMonth => "yearmonth",
        }
    }
}

/// A named constraint predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Required,
    Unique,
    Minimum,
    Maximum,
    MinLength,
    MaxLength,
    Pattern,
    Enum,
}

impl ConstraintKind {
    /// The descriptor spelling of this constraint.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Required => "required",
            ConstraintKind::Unique => "unique",
            ConstraintKind::Minimum => "minimum",
            ConstraintKind::Maximum => "maximum",
            ConstraintKind::MinLength => "minLength",
            ConstraintKind::MaxLength => "maxLength",
            ConstraintKind::Pattern => "pattern",
            ConstraintKind::Enum => "enum",
        }
    }
}

/// Constraint set attached to a field.
///
/// Bounds and enum members are kept as raw descriptor values; the type
/// system casts them with the owning field's type when testing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    /// Value must be present and non-blank
    pub required: bool,

    /// Value must not repeat across rows
    pub unique: bool,

    /// Inclusive lower bound for comparable types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Value>,

    /// Inclusive upper bound for comparable types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Value>,

    /// Minimum length for strings and arrays
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum length for strings and arrays
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Regular expression the textual form must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Closed set of allowed values
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
}

impl Constraints {
    /// Lists the constraints actually declared on this set, in the stable
    /// testing order.
    pub fn declared(&self) -> Vec<ConstraintKind> {
        let mut kinds = Vec::new();
        if self.required {
            kinds.push(ConstraintKind::Required);
        }
        if self.unique {
            kinds.push(ConstraintKind::Unique);
        }
        if self.minimum.is_some() {
            kinds.push(ConstraintKind::Minimum);
        }
        if self.maximum.is_some() {
            kinds.push(ConstraintKind::Maximum);
        }
        if self.min_length.is_some() {
            kinds.push(ConstraintKind::MinLength);
        }
        if self.max_length.is_some() {
            kinds.push(ConstraintKind::MaxLength);
        }
        if self.pattern.is_some() {
            kinds.push(ConstraintKind::Pattern);
        }
        if self.enum_values.is_some() {
            kinds.push(ConstraintKind::Enum);
        }
        kinds
    }

    /// Returns true if no constraint is declared.
    pub fn is_empty(&self) -> bool {
        self.declared().is_empty()
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Field name; the expected header label
    pub name: String,

    /// Logical type
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Type-specific format discriminator (e.g. "any" or a strftime
    /// pattern for temporal types, "array"/"object" for geopoints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Optional human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Numeric decoration: parse the value as a bare number (default) or
    /// strip leading/trailing non-numeric decoration first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bare_number: Option<bool>,

    /// Numeric group separator to strip (e.g. ",")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_char: Option<char>,

    /// Numeric decimal separator to normalize (default ".")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal_char: Option<char>,

    /// Validation constraints
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
}

impl Field {
    /// Creates a field of the given type with no format or constraints.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            format: None,
            description: None,
            bare_number: None,
            group_char: None,
            decimal_char: None,
            constraints: Constraints::default(),
        }
    }
}

/// Builder for `Field` definitions.
///
/// # Example
///
/// ```rust
/// use tabcheck_core::{FieldBuilder, FieldType};
///
/// let field = FieldBuilder::new("age", FieldType::Integer)
///     .required(true)
///     .minimum(0)
///     .maximum(120)
///     .build();
/// assert_eq!(field.name, "age");
/// ```
pub struct FieldBuilder {
    field: Field,
}

impl FieldBuilder {
    /// Starts a field with a name and logical type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field: Field::new(name, field_type),
        }
    }

    /// Sets the format discriminator.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.field.format = Some(format.into());
        self
    }

    /// Marks the field required.
    pub fn required(mut self, required: bool) -> Self {
        self.field.constraints.required = required;
        self
    }

    /// Marks the field unique.
    pub fn unique(mut self, unique: bool) -> Self {
        self.field.constraints.unique = unique;
        self
    }

    /// Sets the inclusive minimum bound.
    pub fn minimum(mut self, minimum: impl Into<serde_json::Value>) -> Self {
        self.field.constraints.minimum = Some(minimum.into());
        self
    }

    /// Sets the inclusive maximum bound.
    pub fn maximum(mut self, maximum: impl Into<serde_json::Value>) -> Self {
        self.field.constraints.maximum = Some(maximum.into());
        self
    }

    /// Sets the minimum length bound.
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.field.constraints.min_length = Some(min_length);
        self
    }

    /// Sets the maximum length bound.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.field.constraints.max_length = Some(max_length);
        self
    }

    /// Sets the regex pattern constraint.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.field.constraints.pattern = Some(pattern.into());
        self
    }

    /// Sets the enum constraint.
    pub fn enum_values(mut self, values: Vec<serde_json::Value>) -> Self {
        self.field.constraints.enum_values = Some(values);
        self
    }

    /// Strips non-numeric decoration before numeric parsing.
    pub fn bare_number(mut self, bare_number: bool) -> Self {
        self.field.bare_number = Some(bare_number);
        self
    }

    /// Sets the numeric group separator.
    pub fn group_char(mut self, group_char: char) -> Self {
        self.field.group_char = Some(group_char);
        self
    }

    /// Sets the numeric decimal separator.
    pub fn decimal_char(mut self, decimal_char: char) -> Self {
        self.field.decimal_char = Some(decimal_char);
        self
    }

    /// Finishes the field.
    pub fn build(self) -> Field {
        self.field
    }
}

/// A foreign key reference target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    /// Name of the reference table (empty for self-reference)
    pub resource: String,

    /// Referenced field names, aligned with the declaring fields
    pub fields: Vec<String>,
}

/// A foreign key declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Declaring field names in this schema
    pub fields: Vec<String>,

    /// Reference table and fields
    pub reference: ForeignKeyReference,
}

/// An ordered set of fields plus key declarations.
///
/// Field order is significant: it is the expected column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Ordered field definitions
    pub fields: Vec<Field>,

    /// Cell values treated as missing/null (defaults to the empty string)
    #[serde(default = "default_missing_values")]
    pub missing_values: Vec<String>,

    /// Primary key field names (descriptor accepts a string or a list)
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,

    /// Foreign key declarations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
}

fn default_missing_values() -> Vec<String> {
    vec![String::new()]
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }
    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::String(one) => vec![one],
        StringOrList::List(many) => many,
    })
}

impl Schema {
    /// Creates a schema from ordered fields with default missing values and
    /// no key declarations.
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            missing_values: default_missing_values(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Parses a schema from a JSON descriptor and validates its metadata.
    pub fn from_descriptor(descriptor: serde_json::Value) -> Result<Self, ValidationError> {
        let schema: Schema = serde_json::from_value(descriptor).map_err(|error| {
            ValidationError::SchemaError {
                note: error.to_string(),
            }
        })?;
        if let Some(error) = schema.check_metadata().into_iter().next() {
            return Err(error);
        }
        Ok(schema)
    }

    /// Ordered field names.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// Looks up a field by name.
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// 0-based index of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Returns true if the cell text is one of the configured missing values.
    pub fn is_missing_value(&self, cell: &str) -> bool {
        self.missing_values.iter().any(|missing| missing == cell)
    }

    /// Validates the schema metadata once at construction time.
    ///
    /// Checks for blank or duplicate field names and for primary/foreign key
    /// declarations that reference unknown fields. Returns one
    /// `schema-error` per defect.
    pub fn check_metadata(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let names = self.field_names();

        for (index, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                errors.push(ValidationError::SchemaError {
                    note: format!("field at position \"{}\" has a blank name", index + 1),
                });
            }
            if names.iter().filter(|name| **name == field.name).count() > 1
                && self.field_index(&field.name) == Some(index)
            {
                errors.push(ValidationError::SchemaError {
                    note: format!("field name \"{}\" is duplicated", field.name),
                });
            }
        }

        for name in &self.primary_key {
            if self.get_field(name).is_none() {
                errors.push(ValidationError::SchemaError {
                    note: format!("primary key references an unknown field \"{name}\""),
                });
            }
        }

        for foreign_key in &self.foreign_keys {
            for name in &foreign_key.fields {
                if self.get_field(name).is_none() {
                    errors.push(ValidationError::SchemaError {
                        note: format!("foreign key references an unknown field \"{name}\""),
                    });
                }
            }
            if foreign_key.fields.len() != foreign_key.reference.fields.len() {
                errors.push(ValidationError::SchemaError {
                    note: format!(
                        "foreign key for fields [{}] does not match its reference field count",
                        foreign_key.fields.join(", ")
                    ),
                });
            }
        }

        errors
    }
}

/// Builder for `Schema` values.
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Starts an empty schema.
    pub fn new() -> Self {
        Self {
            schema: Schema::new(Vec::new()),
        }
    }

    /// Appends a field.
    pub fn field(mut self, field: Field) -> Self {
        self.schema.fields.push(field);
        self
    }

    /// Sets the primary key field names.
    pub fn primary_key(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.schema.primary_key = names.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a foreign key declaration.
    pub fn foreign_key(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
        resource: impl Into<String>,
        reference_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.schema.foreign_keys.push(ForeignKey {
            fields: fields.into_iter().map(Into::into).collect(),
            reference: ForeignKeyReference {
                resource: resource.into(),
                fields: reference_fields.into_iter().map(Into::into).collect(),
            },
        });
        self
    }

    /// Replaces the missing-value set.
    pub fn missing_values(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.schema.missing_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Finishes the schema.
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
