//! Parser for schema and checklist descriptors (YAML/JSON/TOML formats).
//!
//! This module turns textual descriptors into the strongly-typed `Schema`
//! and `Checklist` structures, with format detection by file extension.
//!
//! # Example
//!
//! ```rust
//! use tabcheck_parser::parse_schema_yaml;
//!
//! let yaml = r#"
//! fields:
//!   - name: id
//!     type: integer
//!     constraints:
//!       required: true
//!   - name: name
//!     type: string
//! primaryKey: id
//! "#;
//!
//! let schema = parse_schema_yaml(yaml).expect("Failed to parse schema");
//! assert_eq!(schema.fields.len(), 2);
//! ```

use std::path::Path;
use tabcheck_core::{Checklist, Schema};
use thiserror::Error;

/// Errors that can occur during descriptor parsing.
#[derive(Debug, Error)]
pub enum ParserError {
    /// YAML parsing or deserialization failed
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// JSON parsing or deserialization failed
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing or deserialization failed
    #[error("Failed to parse TOML: {0}")]
    TomlError(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid file extension
    #[error("Invalid or missing file extension")]
    InvalidExtension,
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Supported descriptor file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// JSON format (.json)
    Json,
    /// TOML format (.toml)
    Toml,
}

/// Parse a schema from a YAML string.
pub fn parse_schema_yaml(content: &str) -> Result<Schema> {
    let schema: Schema = serde_yaml_ng::from_str(content)?;
    Ok(schema)
}

/// Parse a schema from a JSON string.
///
/// # Example
///
/// ```rust
/// use tabcheck_parser::parse_schema_json;
///
/// let json = r#"{"fields": [{"name": "id", "type": "integer"}]}"#;
/// let schema = parse_schema_json(json).unwrap();
/// assert_eq!(schema.fields[0].name, "id");
/// ```
pub fn parse_schema_json(content: &str) -> Result<Schema> {
    let schema: Schema = serde_json::from_str(content)?;
    Ok(schema)
}

/// Parse a schema from a TOML string.
pub fn parse_schema_toml(content: &str) -> Result<Schema> {
    let schema: Schema =
        toml::from_str(content).map_err(|e| ParserError::TomlError(e.to_string()))?;
    Ok(schema)
}

/// Parse a checklist from a YAML string.
///
/// # Example
///
/// ```rust
/// use tabcheck_parser::parse_checklist_yaml;
///
/// let yaml = r#"
/// checks:
///   - structure
///   - sequential-value:
///       fieldName: index
/// rowLimit: 1000
/// "#;
///
/// let checklist = parse_checklist_yaml(yaml).unwrap();
/// assert_eq!(checklist.row_limit, Some(1000));
/// ```
pub fn parse_checklist_yaml(content: &str) -> Result<Checklist> {
    let checklist: Checklist = serde_yaml_ng::from_str(content)?;
    Ok(checklist)
}

/// Parse a checklist from a JSON string.
pub fn parse_checklist_json(content: &str) -> Result<Checklist> {
    let checklist: Checklist = serde_json::from_str(content)?;
    Ok(checklist)
}

/// Parse a checklist from a TOML string.
pub fn parse_checklist_toml(content: &str) -> Result<Checklist> {
    let checklist: Checklist =
        toml::from_str(content).map_err(|e| ParserError::TomlError(e.to_string()))?;
    Ok(checklist)
}

/// Detect the descriptor format from a file path based on its extension.
///
/// # Supported Extensions
///
/// * `.yaml`, `.yml` → `DescriptorFormat::Yaml`
/// * `.json` → `DescriptorFormat::Json`
/// * `.toml` → `DescriptorFormat::Toml`
///
/// # Errors
///
/// Returns `ParserError::InvalidExtension` if the file has no extension.
/// Returns `ParserError::UnsupportedFormat` if the extension is not recognized.
pub fn detect_format(path: &Path) -> Result<DescriptorFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ParserError::InvalidExtension)?;

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(DescriptorFormat::Yaml),
        "json" => Ok(DescriptorFormat::Json),
        "toml" => Ok(DescriptorFormat::Toml),
        other => Err(ParserError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a schema from a file with automatic format detection.
pub fn parse_schema_file(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path)?;
    match detect_format(path)? {
        DescriptorFormat::Yaml => parse_schema_yaml(&content),
        DescriptorFormat::Json => parse_schema_json(&content),
        DescriptorFormat::Toml => parse_schema_toml(&content),
    }
}

/// Parse a checklist from a file with automatic format detection.
pub fn parse_checklist_file(path: &Path) -> Result<Checklist> {
    let content = std::fs::read_to_string(path)?;
    match detect_format(path)? {
        DescriptorFormat::Yaml => parse_checklist_yaml(&content),
        DescriptorFormat::Json => parse_checklist_json(&content),
        DescriptorFormat::Toml => parse_checklist_toml(&content),
    }
}
