//! Table validation orchestrator.
//!
//! `TableValidator` drives the whole pipeline for a table: open the
//! stream, resolve or infer the schema, validate the header, process rows
//! through the row machine and the compiled checks, then collect
//! end-of-table verdicts into a sorted, optionally trimmed report.
//! Packages of tables validate in parallel, one thread per table, with
//! reports merged back in input order.

use crate::check::{Check, Lookup, Preparation, TableContext};
use crate::header::{HeaderOptions, validate_headers};
use crate::registry::CheckRegistry;
use crate::row::RowValidator;
use crate::source::{TableSource, TableStream};
use crate::types::infer_type;
use std::collections::HashSet;
use std::time::Instant;
use tabcheck_core::{
    Checklist, Field, Report, Schema, TableReport, ValidationError, Value,
};
use tracing::{debug, debug_span, info};

/// Rows sampled for schema inference when a source declares no schema.
const INFER_SAMPLE_LIMIT: usize = 100;

/// The validation engine. Owns the check registry; stateless across runs.
pub struct TableValidator {
    registry: CheckRegistry,
}

impl TableValidator {
    /// A validator with the standard check registry.
    pub fn new() -> Self {
        Self {
            registry: CheckRegistry::standard(),
        }
    }

    /// A validator with a caller-assembled registry.
    pub fn with_registry(registry: CheckRegistry) -> Self {
        Self { registry }
    }

    /// The registry, for registering additional checks.
    pub fn registry_mut(&mut self) -> &mut CheckRegistry {
        &mut self.registry
    }

    /// Validates one table.
    pub fn validate(&self, source: &dyn TableSource, checklist: &Checklist) -> TableReport {
        self.validate_with_lookup(source, checklist, Lookup::new())
    }

    /// Validates one table with reference data for foreign key resolution.
    pub fn validate_with_lookup(
        &self,
        source: &dyn TableSource,
        checklist: &Checklist,
        lookup: Lookup,
    ) -> TableReport {
        let span = debug_span!("validate_table", source = source.name());
        let _guard = span.enter();
        let started = Instant::now();

        let outcome = self.run_table(source, checklist, lookup, started);
        info!(
            source = source.name(),
            valid = outcome.valid,
            errors = outcome.error_count,
            rows = outcome.row_count,
            "table validated"
        );
        outcome
    }

    /// Validates a set of tables in parallel, one worker per table.
    ///
    /// Reference data for foreign keys resolves against sibling sources by
    /// name; an empty resource name refers to the declaring table itself.
    pub fn validate_package(
        &self,
        sources: &[&dyn TableSource],
        checklist: &Checklist,
    ) -> Report {
        let started = Instant::now();
        debug!(tables = sources.len(), "validating package");

        let mut reports: Vec<Option<TableReport>> = Vec::new();
        reports.resize_with(sources.len(), || None);

        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(sources.len());
            for (index, source) in sources.iter().enumerate() {
                let handle = scope.spawn(move || {
                    let lookup = self.build_lookup(*source, sources);
                    (index, self.validate_with_lookup(*source, checklist, lookup))
                });
                handles.push(handle);
            }
            for handle in handles {
                // A panicked worker would already have poisoned the scope
                if let Ok((index, report)) = handle.join() {
                    reports[index] = Some(report);
                }
            }
        });

        let tables: Vec<TableReport> = reports.into_iter().flatten().collect();
        Report::new(tables, Vec::new(), started.elapsed().as_secs_f64())
    }

    fn run_table(
        &self,
        source: &dyn TableSource,
        checklist: &Checklist,
        lookup: Lookup,
        started: Instant,
    ) -> TableReport {
        let failure = |errors: Vec<ValidationError>, started: Instant| {
            TableReport::new(
                source.name(),
                source.scheme(),
                source.format(),
                source.encoding(),
                None,
                0,
                false,
                started.elapsed().as_secs_f64(),
                errors,
            )
        };

        let mut stream = match source.open() {
            Ok(stream) => stream,
            Err(error) => return failure(vec![error], started),
        };
        let headers: Option<Vec<String>> = stream.headers().map(<[String]>::to_vec);

        // Buffer a sample up front: it feeds schema inference and the
        // empty-source verdict, then replays ahead of the live stream.
        let mut buffered: Vec<Vec<Value>> = Vec::new();
        let mut stream_failed = None;
        while buffered.len() < INFER_SAMPLE_LIMIT {
            match stream.next_row() {
                Ok(Some(row)) => buffered.push(row),
                Ok(None) => break,
                Err(error) => {
                    stream_failed = Some(error);
                    break;
                }
            }
        }
        if let Some(error) = stream_failed {
            return failure(vec![error], started);
        }
        if headers.is_none() && buffered.is_empty() {
            return failure(
                vec![ValidationError::SourceError {
                    note: "the source is empty".to_string(),
                }],
                started,
            );
        }

        let mut errors: Vec<ValidationError> = Vec::new();
        let (schema, inferred) = match source.schema() {
            Some(schema) => {
                errors.extend(schema.check_metadata());
                (schema.clone(), false)
            }
            None => (infer_schema(headers.as_deref(), &buffered), true),
        };

        // Header phase
        let (effective_schema, field_positions) = match &headers {
            Some(labels) => {
                let positions: Vec<usize> = (1..=labels.len()).collect();
                let outcome = validate_headers(
                    &schema,
                    labels,
                    &positions,
                    HeaderOptions {
                        order_fields: checklist.order_fields,
                        infer_extra: inferred,
                    },
                );
                errors.extend(outcome.errors);
                (outcome.schema, outcome.field_positions)
            }
            None => {
                let positions = (1..=schema.fields.len()).collect();
                (schema, positions)
            }
        };

        // Check phase setup
        let (compiled, task_errors) = self.registry.compile(checklist);
        errors.extend(task_errors);
        let context = TableContext {
            schema: effective_schema.clone(),
            field_positions: field_positions.clone(),
            lookup,
        };
        let mut checks: Vec<Box<dyn Check>> = Vec::new();
        for mut check in compiled {
            match check.prepare(&context) {
                Preparation::Ready => checks.push(check),
                Preparation::Inapplicable => {}
                Preparation::Invalid(error) => errors.push(error),
            }
        }
        if let Some(labels) = &headers {
            for check in checks.iter_mut() {
                errors.extend(check.validate_header(&context, labels));
            }
        }

        // Row phase
        let mut row_validator = RowValidator::new(effective_schema, field_positions);
        let first_data_position = if headers.is_some() { 2 } else { 1 };
        let mut buffered = buffered.into_iter();
        let mut row_count = 0usize;
        let mut partial = false;
        let mut error_limited = false;

        loop {
            let raw = match buffered.next() {
                Some(raw) => Some(raw),
                None => match stream.next_row() {
                    Ok(raw) => raw,
                    Err(error) => {
                        errors.push(error);
                        partial = true;
                        break;
                    }
                },
            };
            let Some(raw) = raw else {
                break;
            };
            // Partial only when rows actually remain past the limit
            if checklist.row_limit.is_some_and(|limit| row_count >= limit) {
                partial = true;
                break;
            }

            let row_number = row_count + 1;
            let row = row_validator.process(&raw, row_number, first_data_position + row_count);
            row_count += 1;
            errors.extend(row.errors.iter().cloned());
            for check in checks.iter_mut() {
                errors.extend(check.validate_row(&context, &row));
            }

            if checklist.error_limit.is_some_and(|limit| errors.len() >= limit) {
                partial = true;
                error_limited = true;
                break;
            }
        }

        // End-of-table verdicts are meaningless once the error limit cut
        // the run short; a plain row limit still gets them
        if !error_limited {
            for check in checks.iter_mut() {
                errors.extend(check.validate_table(&context));
            }
        }

        errors.sort_by_key(ValidationError::sort_key);
        if let Some(limit) = checklist.error_limit {
            errors.truncate(limit);
        }

        TableReport::new(
            source.name(),
            source.scheme(),
            source.format(),
            source.encoding(),
            headers,
            row_count,
            partial,
            started.elapsed().as_secs_f64(),
            errors,
        )
    }

    /// Assembles foreign key reference data for one table from its package
    /// siblings.
    fn build_lookup(&self, source: &dyn TableSource, siblings: &[&dyn TableSource]) -> Lookup {
        let mut lookup = Lookup::new();
        let Some(schema) = source.schema() else {
            return lookup;
        };

        for foreign_key in &schema.foreign_keys {
            let resource = &foreign_key.reference.resource;
            if lookup.contains_key(resource) {
                continue;
            }
            let target: Option<&dyn TableSource> = if resource.is_empty() {
                Some(source)
            } else {
                siblings
                    .iter()
                    .find(|sibling| sibling.name() == *resource)
                    .copied()
            };
            let Some(target) = target else {
                continue;
            };
            if let Some(entries) = collect_keys(target, &foreign_key.reference.fields) {
                lookup.insert(resource.clone(), entries);
            }
        }
        lookup
    }
}

impl Default for TableValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads every key tuple of the referenced fields out of a source.
fn collect_keys(
    source: &dyn TableSource,
    fields: &[String],
) -> Option<HashSet<Vec<Option<String>>>> {
    let mut stream = source.open().ok()?;

    let indexes: Vec<usize> = match stream.headers() {
        Some(labels) => fields
            .iter()
            .map(|name| labels.iter().position(|label| label == name))
            .collect::<Option<Vec<usize>>>()?,
        None => {
            let schema = source.schema()?;
            fields
                .iter()
                .map(|name| schema.field_index(name))
                .collect::<Option<Vec<usize>>>()?
        }
    };

    let mut entries = HashSet::new();
    while let Ok(Some(row)) = stream.next_row() {
        let tuple: Vec<Option<String>> = indexes
            .iter()
            .map(|&index| match row.get(index) {
                None | Some(Value::Null) => None,
                Some(cell) => {
                    let text = cell.to_string();
                    (!text.is_empty()).then_some(text)
                }
            })
            .collect();
        entries.insert(tuple);
    }
    Some(entries)
}

/// Builds a schema from a stream sample: labels (or positional names) plus
/// one inferred type per column.
fn infer_schema(headers: Option<&[String]>, sample: &[Vec<Value>]) -> Schema {
    // With a header row the labels set the width; surplus cells in the
    // sample surface later as extra-cell errors
    let width = match headers {
        Some(labels) => labels.len(),
        None => sample.iter().map(Vec::len).max().unwrap_or(0),
    };

    let fields = (0..width)
        .map(|index| {
            let name = match headers.and_then(|labels| labels.get(index)) {
                Some(label) => label.clone(),
                None => format!("field{}", index + 1),
            };
            let column: Vec<&Value> = sample
                .iter()
                .filter_map(|row| row.get(index))
                .collect();
            Field::new(name, infer_type(&column))
        })
        .collect();
    Schema::new(fields)
}
