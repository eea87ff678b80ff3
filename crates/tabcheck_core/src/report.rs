//! Validation report model.
//!
//! A `TableReport` aggregates the outcome of one table's validation; a
//! `Report` aggregates table reports plus any run-level errors. Reports are
//! plain values assembled by the orchestrator after all checks have run.

use crate::errors::{ValidationError, serialize_errors};
use serde::Serialize;

/// Per-table validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReport {
    /// True iff the error list is empty
    pub valid: bool,

    /// Source identifier
    pub source: String,

    /// Resolved scheme
    pub scheme: String,

    /// Resolved format
    pub format: String,

    /// Resolved encoding
    pub encoding: String,

    /// Observed header labels, if the stream carried any
    pub headers: Option<Vec<String>>,

    /// Number of data rows actually processed
    pub row_count: usize,

    /// Number of reported errors
    pub error_count: usize,

    /// True when a row or error limit caused early termination
    pub partial: bool,

    /// Validation wall time in seconds
    pub time: f64,

    /// Ordered error list
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<ValidationError>,
}

impl TableReport {
    /// Assembles a table report; `valid` and `error_count` derive from the
    /// error list.
    pub fn new(
        source: impl Into<String>,
        scheme: impl Into<String>,
        format: impl Into<String>,
        encoding: impl Into<String>,
        headers: Option<Vec<String>>,
        row_count: usize,
        partial: bool,
        time: f64,
        errors: Vec<ValidationError>,
    ) -> Self {
        Self {
            valid: errors.is_empty(),
            source: source.into(),
            scheme: scheme.into(),
            format: format.into(),
            encoding: encoding.into(),
            headers,
            row_count,
            error_count: errors.len(),
            partial,
            time,
            errors,
        }
    }

    /// Projects the table's errors onto an ordered context-key list, one
    /// projection per error.
    pub fn flatten(&self, keys: &[&str]) -> Vec<Vec<Option<serde_json::Value>>> {
        self.errors.iter().map(|error| error.flatten(keys)).collect()
    }
}

/// Aggregate validation outcome for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// True iff no run-level error exists and every table is valid
    pub valid: bool,

    /// Validation wall time in seconds
    pub time: f64,

    /// Number of validated tables
    pub table_count: usize,

    /// Total error count across run-level and table errors
    pub error_count: usize,

    /// Per-table reports, in input order
    pub tables: Vec<TableReport>,

    /// Run-level errors (e.g. a malformed package descriptor)
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<ValidationError>,
}

impl Report {
    /// Assembles a run report from table reports and run-level errors.
    pub fn new(tables: Vec<TableReport>, errors: Vec<ValidationError>, time: f64) -> Self {
        let error_count = errors.len() + tables.iter().map(|table| table.error_count).sum::<usize>();
        Self {
            valid: errors.is_empty() && tables.iter().all(|table| table.valid),
            time,
            table_count: tables.len(),
            error_count,
            tables,
            errors,
        }
    }

    /// Projects every error of the run (run-level first, then per table in
    /// input order) onto an ordered context-key list.
    pub fn flatten(&self, keys: &[&str]) -> Vec<Vec<Option<serde_json::Value>>> {
        let mut rows: Vec<Vec<Option<serde_json::Value>>> = self
            .errors
            .iter()
            .map(|error| error.flatten(keys))
            .collect();
        for table in &self.tables {
            rows.extend(table.flatten(keys));
        }
        rows
    }
}
