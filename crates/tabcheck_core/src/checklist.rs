//! Validation-run configuration.
//!
//! A `Checklist` describes which checks a validation run should execute and
//! which limits apply. It is the typed form of the checklist descriptor
//! consumed from YAML/JSON/TOML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selection of one check for a run.
///
/// A descriptor is either a bare code (defaults applied) or a single-entry
/// map from code to an options object, e.g.
/// `{"deviated-value": {"fieldName": "temperature"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckDescriptor {
    /// Bare code or group selector ("structure", "schema")
    Code(String),
    /// Code mapped to check options
    Configured(BTreeMap<String, serde_json::Value>),
}

impl CheckDescriptor {
    /// Creates a bare-code descriptor.
    pub fn code(code: impl Into<String>) -> Self {
        CheckDescriptor::Code(code.into())
    }

    /// Creates a configured descriptor.
    pub fn configured(code: impl Into<String>, options: serde_json::Value) -> Self {
        let mut map = BTreeMap::new();
        map.insert(code.into(), options);
        CheckDescriptor::Configured(map)
    }

    /// The selected check code, if the descriptor is well-formed.
    pub fn selected_code(&self) -> Option<&str> {
        match self {
            CheckDescriptor::Code(code) => Some(code),
            CheckDescriptor::Configured(map) if map.len() == 1 => {
                map.keys().next().map(String::as_str)
            }
            CheckDescriptor::Configured(_) => None,
        }
    }

    /// The caller-supplied options, defaulting to an empty object.
    pub fn options(&self) -> serde_json::Value {
        match self {
            CheckDescriptor::Code(_) => serde_json::json!({}),
            CheckDescriptor::Configured(map) => map
                .values()
                .next()
                .cloned()
                .unwrap_or_else(|| serde_json::json!({})),
        }
    }
}

/// Configuration for one validation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Checklist {
    /// Checks to run; `None` selects the structure and schema groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<CheckDescriptor>>,

    /// Check codes to exclude (wins over inclusion)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skip_checks: Vec<String>,

    /// Stop iterating after this many data rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<usize>,

    /// Stop iterating after accumulating this many errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_limit: Option<usize>,

    /// Re-pair fields to labels by slugified text before positional
    /// header comparison
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub order_fields: bool,
}

impl Checklist {
    /// Creates a checklist with defaults (structure and schema checks, no
    /// limits).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the explicit check selection.
    pub fn with_checks(mut self, checks: Vec<CheckDescriptor>) -> Self {
        self.checks = Some(checks);
        self
    }

    /// Adds a check code to the exclusion list.
    pub fn with_skip_check(mut self, code: impl Into<String>) -> Self {
        self.skip_checks.push(code.into());
        self
    }

    /// Sets the row limit.
    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = Some(limit);
        self
    }

    /// Sets the error limit.
    pub fn with_error_limit(mut self, limit: usize) -> Self {
        self.error_limit = Some(limit);
        self
    }

    /// Enables order-fields header matching.
    pub fn with_order_fields(mut self, order_fields: bool) -> Self {
        self.order_fields = order_fields;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bare_code_descriptor() {
        let descriptor: CheckDescriptor = serde_json::from_value(serde_json::json!(
            "sequential-value"
        ))
        .unwrap();
        assert_eq!(descriptor.selected_code(), Some("sequential-value"));
        assert_eq!(descriptor.options(), serde_json::json!({}));
    }

    #[test]
    fn test_configured_descriptor() {
        let descriptor: CheckDescriptor = serde_json::from_value(serde_json::json!(
            {"deviated-value": {"fieldName": "temperature", "interval": 2}}
        ))
        .unwrap();
        assert_eq!(descriptor.selected_code(), Some("deviated-value"));
        assert_eq!(descriptor.options()["fieldName"], "temperature");
    }

    #[test]
    fn test_malformed_configured_descriptor() {
        let descriptor = CheckDescriptor::Configured(
            [
                ("a".to_string(), serde_json::json!({})),
                ("b".to_string(), serde_json::json!({})),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(descriptor.selected_code(), None);
    }

    #[test]
    fn test_checklist_round_trip() {
        let checklist = Checklist::new()
            .with_checks(vec![
                CheckDescriptor::code("structure"),
                CheckDescriptor::configured(
                    "row-constraint",
                    serde_json::json!({"constraint": "salary > 0"}),
                ),
            ])
            .with_row_limit(100)
            .with_skip_check("duplicate-row");

        let json = serde_json::to_value(&checklist).unwrap();
        assert_eq!(json["rowLimit"], 100);
        assert_eq!(json["skipChecks"][0], "duplicate-row");
        let parsed: Checklist = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, checklist);
    }
}
