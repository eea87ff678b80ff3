//! The check abstraction.
//!
//! A check is a stateful visitor driven by the table orchestrator: it is
//! prepared once against the table context, then offered the header, every
//! processed row, and finally the end of the table. Checks only ever append
//! errors; they cannot mutate rows or stop the run.

use crate::row::Row;
use std::collections::{HashMap, HashSet};
use tabcheck_core::{Schema, ValidationError};

/// Reference data for foreign key resolution: resource name to the set of
/// key tuples it contains. Tuple entries are canonical cell texts, `None`
/// for null cells.
pub type Lookup = HashMap<String, HashSet<Vec<Option<String>>>>;

/// Immutable per-table state shared by all checks.
pub struct TableContext {
    /// Effective schema after header validation
    pub schema: Schema,

    /// Physical column position per schema field
    pub field_positions: Vec<usize>,

    /// Reference data for foreign key resolution
    pub lookup: Lookup,
}

impl TableContext {
    /// Physical position of the field at `index`, defaulting to `index + 1`
    /// when the header carried no position for it.
    pub fn field_position(&self, index: usize) -> usize {
        crate::header::position_at(&self.field_positions, index)
    }
}

/// Outcome of preparing a check against a table.
pub enum Preparation {
    /// The check participates in this run
    Ready,

    /// The check has nothing to do for this table (e.g. a foreign key
    /// check on a schema without foreign keys); it is silently dropped
    Inapplicable,

    /// The check's configuration is unusable for this table; the error is
    /// reported and the check is dropped
    Invalid(ValidationError),
}

/// A validation check driven by the table orchestrator.
///
/// All hooks default to no-ops so a check implements only the phases it
/// cares about.
pub trait Check: Send {
    /// Stable error/check code, e.g. "duplicate-row".
    fn code(&self) -> &'static str;

    /// Binds the check to a table before any row is seen.
    fn prepare(&mut self, _context: &TableContext) -> Preparation {
        Preparation::Ready
    }

    /// Offered the observed header labels once.
    fn validate_header(&mut self, _context: &TableContext, _labels: &[String]) -> Vec<ValidationError> {
        Vec::new()
    }

    /// Offered every processed row in stream order.
    fn validate_row(&mut self, _context: &TableContext, _row: &Row) -> Vec<ValidationError> {
        Vec::new()
    }

    /// Offered the end of the table; the place for whole-table verdicts.
    fn validate_table(&mut self, _context: &TableContext) -> Vec<ValidationError> {
        Vec::new()
    }
}
