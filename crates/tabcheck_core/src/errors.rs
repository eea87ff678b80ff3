//! Validation error taxonomy.
//!
//! Every defect the engine can report is a variant of [`ValidationError`].
//! Each variant carries exactly the context keys its message template needs,
//! so an error can never be constructed with a missing key. Codes, human
//! names, and category tags are static lookups keyed by kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single validation defect.
///
/// Serializes with the stable error code as the `code` tag and the context
/// keys in camelCase, which is the wire shape consumed by report readers.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ValidationError {
    // Resource-level: the table could not be processed at all.
    /// The source contents are unsupported or inconsistent
    #[error("The data source has not supported or has inconsistent contents: {note}")]
    SourceError { note: String },

    /// The source could not be loaded (bad scheme)
    #[error("The data source could not be successfully loaded: {note}")]
    SchemeError { note: String },

    /// The source could not be parsed (bad format)
    #[error("The data source could not be successfully parsed: {note}")]
    FormatError { note: String },

    /// The source could not be decoded (bad encoding)
    #[error("The data source could not be successfully decoded: {note}")]
    EncodingError { note: String },

    /// The source could not be decompressed
    #[error("The data source could not be successfully decompressed: {note}")]
    CompressionError { note: String },

    /// The data package descriptor has an error
    #[error("The data package has an error: {note}")]
    PackageError { note: String },

    /// The provided schema descriptor is not valid
    #[error("The provided schema is not valid: {note}")]
    SchemaError { note: String },

    /// A check or other validation task is misconfigured
    #[error("The validation task has an error: {note}")]
    TaskError { note: String },

    // Header-level
    /// More labels than schema fields
    #[error("There is an extra header \"{cell}\" in field at position \"{field_position}\"")]
    ExtraHeader {
        cell: String,
        field_number: usize,
        field_position: usize,
    },

    /// Fewer labels than schema fields
    #[error("There is a missing header in field \"{field_name}\" at position \"{field_position}\"")]
    MissingHeader {
        field_name: String,
        field_number: usize,
        field_position: usize,
    },

    /// An empty or whitespace-only label
    #[error("Header in field at position \"{field_position}\" is blank")]
    BlankHeader {
        field_name: String,
        field_number: usize,
        field_position: usize,
    },

    /// A label equal to an earlier label
    #[error("Header \"{cell}\" in field at position \"{field_position}\" is duplicated to a header in another field: {note}")]
    DuplicateHeader {
        cell: String,
        field_name: String,
        field_number: usize,
        field_position: usize,
        note: String,
    },

    /// A label differing from the declared field name
    #[error("Header \"{cell}\" in field \"{field_name}\" at position \"{field_position}\" does not match the field name in the schema")]
    NonMatchingHeader {
        cell: String,
        field_name: String,
        field_number: usize,
        field_position: usize,
    },

    // Row-level
    /// Every value in the row is blank or missing
    #[error("Row at position \"{row_position}\" is completely blank")]
    BlankRow {
        row_number: usize,
        row_position: usize,
    },

    /// The row repeats an earlier row verbatim
    #[error("Row at position \"{row_position}\" is duplicated: {note}")]
    DuplicateRow {
        row_number: usize,
        row_position: usize,
        note: String,
    },

    /// The row fails a custom rule expression
    #[error("The row at position \"{row_position}\" has an error: {note}")]
    RowConstraint {
        row_number: usize,
        row_position: usize,
        note: String,
    },

    /// The primary key tuple repeats an earlier row
    #[error("The row at position \"{row_position}\" does not conform to the primary key constraint: {note}")]
    PrimaryKeyError {
        row_number: usize,
        row_position: usize,
        note: String,
    },

    /// The foreign key tuple is absent from the reference table
    #[error("The row at position \"{row_position}\" does not conform to the foreign key constraint: {note}")]
    ForeignKeyError {
        row_number: usize,
        row_position: usize,
        note: String,
    },

    // Cell-level
    /// More values than schema fields
    #[error("Row at position \"{row_position}\" has an extra value in field at position \"{field_position}\"")]
    ExtraCell {
        cell: String,
        row_number: usize,
        row_position: usize,
        field_number: usize,
        field_position: usize,
    },

    /// Fewer values than schema fields
    #[error("Row at position \"{row_position}\" has a missing cell in field \"{field_name}\" at position \"{field_position}\"")]
    MissingCell {
        row_number: usize,
        row_position: usize,
        field_name: String,
        field_number: usize,
        field_position: usize,
    },

    /// The cell could not be cast to the field type
    #[error("Type error in the cell \"{cell}\" in row \"{row_position}\" and field \"{field_name}\" at position \"{field_position}\": {note}")]
    TypeError {
        cell: String,
        row_number: usize,
        row_position: usize,
        field_name: String,
        field_number: usize,
        field_position: usize,
        note: String,
    },

    /// The cast value fails one of the field constraints
    #[error("The cell \"{cell}\" in row at position \"{row_position}\" and field \"{field_name}\" at position \"{field_position}\" does not conform to a constraint: {note}")]
    ConstraintError {
        cell: String,
        row_number: usize,
        row_position: usize,
        field_name: String,
        field_number: usize,
        field_position: usize,
        note: String,
    },

    /// The value repeats an earlier value of a unique field
    #[error("Row at position \"{row_position}\" has unique constraint violation in field \"{field_name}\" at position \"{field_position}\": {note}")]
    UniqueError {
        cell: String,
        row_number: usize,
        row_position: usize,
        field_name: String,
        field_number: usize,
        field_position: usize,
        note: String,
    },

    /// The value breaks an expected integer sequence
    #[error("The cell \"{cell}\" in row at position \"{row_position}\" and field \"{field_name}\" at position \"{field_position}\" has an error: {note}")]
    SequentialValue {
        cell: String,
        row_number: usize,
        row_position: usize,
        field_name: String,
        field_number: usize,
        field_position: usize,
        note: String,
    },

    /// The value sits exactly on a driver truncation boundary
    #[error("The cell \"{cell}\" in row at position \"{row_position}\" and field \"{field_name}\" at position \"{field_position}\" has an error: {note}")]
    TruncatedValue {
        cell: String,
        row_number: usize,
        row_position: usize,
        field_name: String,
        field_number: usize,
        field_position: usize,
        note: String,
    },

    /// The value appears in a configured denylist
    #[error("The cell \"{cell}\" in row at position \"{row_position}\" and field \"{field_name}\" at position \"{field_position}\" has an error: {note}")]
    ForbiddenValue {
        cell: String,
        row_number: usize,
        row_position: usize,
        field_name: String,
        field_number: usize,
        field_position: usize,
        note: String,
    },

    // Table-level
    /// The value deviates from the statistical interval of its field
    #[error("There is a possible error because the value is deviated: {note}")]
    DeviatedValue { note: String },
}

impl ValidationError {
    /// Stable error code; doubles as the serde tag.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceError { .. } => "source-error",
            Self::SchemeError { .. } => "scheme-error",
            Self::FormatError { .. } => "format-error",
            Self::EncodingError { .. } => "encoding-error",
            Self::CompressionError { .. } => "compression-error",
            Self::PackageError { .. } => "package-error",
            Self::SchemaError { .. } => "schema-error",
            Self::TaskError { .. } => "task-error",
            Self::ExtraHeader { .. } => "extra-header",
            Self::MissingHeader { .. } => "missing-header",
            Self::BlankHeader { .. } => "blank-header",
            Self::DuplicateHeader { .. } => "duplicate-header",
            Self::NonMatchingHeader { .. } => "non-matching-header",
            Self::BlankRow { .. } => "blank-row",
            Self::DuplicateRow { .. } => "duplicate-row",
            Self::RowConstraint { .. } => "row-constraint",
            Self::PrimaryKeyError { .. } => "primary-key-error",
            Self::ForeignKeyError { .. } => "foreign-key-error",
            Self::ExtraCell { .. } => "extra-cell",
            Self::MissingCell { .. } => "missing-cell",
            Self::TypeError { .. } => "type-error",
            Self::ConstraintError { .. } => "constraint-error",
            Self::UniqueError { .. } => "unique-error",
            Self::SequentialValue { .. } => "sequential-value",
            Self::TruncatedValue { .. } => "truncated-value",
            Self::ForbiddenValue { .. } => "forbidden-value",
            Self::DeviatedValue { .. } => "deviated-value",
        }
    }

    /// Human-readable kind name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SourceError { .. } => "Source Error",
            Self::SchemeError { .. } => "Scheme Error",
            Self::FormatError { .. } => "Format Error",
            Self::EncodingError { .. } => "Encoding Error",
            Self::CompressionError { .. } => "Compression Error",
            Self::PackageError { .. } => "Package Error",
            Self::SchemaError { .. } => "Schema Error",
            Self::TaskError { .. } => "Task Error",
            Self::ExtraHeader { .. } => "Extra Header",
            Self::MissingHeader { .. } => "Missing Header",
            Self::BlankHeader { .. } => "Blank Header",
            Self::DuplicateHeader { .. } => "Duplicate Header",
            Self::NonMatchingHeader { .. } => "Non-matching Header",
            Self::BlankRow { .. } => "Blank Row",
            Self::DuplicateRow { .. } => "Duplicate Row",
            Self::RowConstraint { .. } => "Row Constraint",
            Self::PrimaryKeyError { .. } => "Primary Key Error",
            Self::ForeignKeyError { .. } => "Foreign Key Error",
            Self::ExtraCell { .. } => "Extra Cell",
            Self::MissingCell { .. } => "Missing Cell",
            Self::TypeError { .. } => "Type Error",
            Self::ConstraintError { .. } => "Constraint Error",
            Self::UniqueError { .. } => "Unique Error",
            Self::SequentialValue { .. } => "Sequential Value",
            Self::TruncatedValue { .. } => "Truncated Value",
            Self::ForbiddenValue { .. } => "Forbidden Value",
            Self::DeviatedValue { .. } => "Deviated Value",
        }
    }

    /// Category tags for grouping and selection.
    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Self::SourceError { .. }
            | Self::SchemeError { .. }
            | Self::FormatError { .. }
            | Self::EncodingError { .. }
            | Self::CompressionError { .. }
            | Self::PackageError { .. }
            | Self::SchemaError { .. }
            | Self::TaskError { .. } => &["#general"],
            Self::BlankHeader { .. } | Self::DuplicateHeader { .. } => {
                &["#table", "#head", "#structure"]
            }
            Self::ExtraHeader { .. }
            | Self::MissingHeader { .. }
            | Self::NonMatchingHeader { .. } => &["#table", "#head", "#schema"],
            Self::BlankRow { .. } | Self::DuplicateRow { .. } => {
                &["#table", "#body", "#row", "#structure"]
            }
            Self::ExtraCell { .. } | Self::MissingCell { .. } => {
                &["#table", "#body", "#row", "#cell", "#structure"]
            }
            Self::TypeError { .. } | Self::ConstraintError { .. } => {
                &["#table", "#body", "#row", "#cell", "#schema"]
            }
            Self::UniqueError { .. } => &["#table", "#body", "#row", "#cell", "#schema", "#integrity"],
            Self::PrimaryKeyError { .. } | Self::ForeignKeyError { .. } => {
                &["#table", "#body", "#row", "#schema", "#integrity"]
            }
            Self::SequentialValue { .. }
            | Self::TruncatedValue { .. }
            | Self::ForbiddenValue { .. } => &["#table", "#body", "#row", "#cell", "#custom"],
            Self::RowConstraint { .. } => &["#table", "#body", "#row", "#custom"],
            Self::DeviatedValue { .. } => &["#table", "#custom"],
        }
    }

    /// Rendered message (the `Display` template filled with context).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true for resource/task level errors that are not tied to the
    /// table body.
    pub fn is_general(&self) -> bool {
        self.tags() == ["#general"]
    }

    /// Returns true for errors produced by header validation.
    pub fn is_header(&self) -> bool {
        self.tags().contains(&"#head")
    }

    /// The 1-based data row number, for errors that carry one.
    pub fn row_number(&self) -> Option<usize> {
        self.context_usize("rowNumber")
    }

    /// The 1-based physical row position, for errors that carry one.
    pub fn row_position(&self) -> Option<usize> {
        self.context_usize("rowPosition")
    }

    /// The 1-based column position, for errors that carry one.
    pub fn field_position(&self) -> Option<usize> {
        self.context_usize("fieldPosition")
    }

    /// The context map: every declared key of this kind with its value,
    /// excluding the `code` tag.
    pub fn context(&self) -> serde_json::Map<String, serde_json::Value> {
        // The enum serializes as an object by construction
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.remove("code");
                map
            }
            _ => serde_json::Map::new(),
        }
    }

    /// Full wire descriptor: code, name, tags, message plus the context map.
    pub fn to_descriptor(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("code".into(), self.code().into());
        map.insert("name".into(), self.name().into());
        map.insert(
            "tags".into(),
            serde_json::Value::Array(self.tags().iter().map(|t| (*t).into()).collect()),
        );
        map.insert("message".into(), self.message().into());
        for (key, value) in self.context() {
            map.insert(key, value);
        }
        serde_json::Value::Object(map)
    }

    /// Projects this error onto an ordered list of context-key names.
    ///
    /// Keys the kind does not declare render as `None`. The synthetic keys
    /// `code`, `name`, `message` and `tags` are always available.
    pub fn flatten(&self, keys: &[&str]) -> Vec<Option<serde_json::Value>> {
        let descriptor = self.to_descriptor();
        keys.iter()
            .map(|key| descriptor.get(*key).cloned())
            .collect()
    }

    /// Ordering key for report assembly: general errors first, then header
    /// errors by column, then body errors by row and column, then
    /// table-level errors.
    pub fn sort_key(&self) -> (u8, usize, usize) {
        if self.is_general() {
            return (0, 0, 0);
        }
        if self.is_header() {
            return (1, 0, self.field_position().unwrap_or(0));
        }
        match self.row_number() {
            Some(row_number) => (2, row_number, self.field_position().unwrap_or(0)),
            None => (3, 0, 0),
        }
    }

    fn context_usize(&self, key: &str) -> Option<usize> {
        self.context()
            .get(key)
            .and_then(|value| value.as_u64())
            .map(|value| value as usize)
    }
}

/// Serializes an error list as full wire descriptors; used by the report
/// types so every error carries code, name, tags and message.
pub fn serialize_errors<S>(errors: &[ValidationError], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(errors.len()))?;
    for error in errors {
        seq.serialize_element(&error.to_descriptor())?;
    }
    seq.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn missing_cell() -> ValidationError {
        ValidationError::MissingCell {
            row_number: 2,
            row_position: 3,
            field_name: "name".into(),
            field_number: 2,
            field_position: 2,
        }
    }

    #[test]
    fn test_code_and_name() {
        let error = missing_cell();
        assert_eq!(error.code(), "missing-cell");
        assert_eq!(error.name(), "Missing Cell");
    }

    #[test]
    fn test_message_rendering() {
        let error = missing_cell();
        assert_eq!(
            error.message(),
            "Row at position \"3\" has a missing cell in field \"name\" at position \"2\""
        );
    }

    #[test]
    fn test_tags() {
        assert_eq!(
            missing_cell().tags(),
            ["#table", "#body", "#row", "#cell", "#structure"]
        );
        assert!(ValidationError::SchemeError { note: "oops".into() }.is_general());
        assert!(
            ValidationError::BlankHeader {
                field_name: "id".into(),
                field_number: 1,
                field_position: 1,
            }
            .is_header()
        );
    }

    #[test]
    fn test_serde_shape() {
        let error = missing_cell();
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["code"], "missing-cell");
        assert_eq!(value["rowNumber"], 2);
        assert_eq!(value["fieldPosition"], 2);

        let parsed: ValidationError = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, error);
    }

    #[test]
    fn test_flatten_declares_missing_keys_as_none() {
        let error = missing_cell();
        let flat = error.flatten(&["code", "rowNumber", "cell", "note"]);
        assert_eq!(flat[0], Some("missing-cell".into()));
        assert_eq!(flat[1], Some(2.into()));
        assert_eq!(flat[2], None); // missing-cell declares no cell value
        assert_eq!(flat[3], None);
    }

    #[test]
    fn test_descriptor_contains_message_and_tags() {
        let error = ValidationError::TaskError { note: "bad options".into() };
        let descriptor = error.to_descriptor();
        assert_eq!(descriptor["code"], "task-error");
        assert_eq!(descriptor["name"], "Task Error");
        assert_eq!(descriptor["tags"][0], "#general");
        assert_eq!(
            descriptor["message"],
            "The validation task has an error: bad options"
        );
        assert_eq!(descriptor["note"], "bad options");
    }

    #[test]
    fn test_sort_key_ordering() {
        let header = ValidationError::BlankHeader {
            field_name: "id".into(),
            field_number: 2,
            field_position: 2,
        };
        let body = missing_cell();
        let table = ValidationError::DeviatedValue { note: "deviated".into() };
        let general = ValidationError::TaskError { note: "oops".into() };
        let mut errors = vec![table.clone(), body.clone(), header.clone(), general.clone()];
        errors.sort_by_key(|error| error.sort_key());
        assert_eq!(errors, vec![general, header, body, table]);
    }
}
