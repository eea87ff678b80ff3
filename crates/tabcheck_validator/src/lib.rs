//! # Tabcheck Validator
//!
//! The validation engine for tabular data:
//!
//! - Logical type system: cast, format and infer cell values (`types`)
//! - Constraint predicates over typed cells (`constraints`)
//! - Header and row state machines (`header`, `row`)
//! - The check abstraction, built-in checks and the ordered registry
//!   (`check`, `checks`, `registry`)
//! - Table sources and the orchestrator (`source`, `engine`)
//!
//! ## Example
//!
//! ```rust
//! use tabcheck_core::{Checklist, Field, FieldType, SchemaBuilder};
//! use tabcheck_validator::{InMemoryTable, TableValidator};
//!
//! let table = InMemoryTable::new("inline")
//!     .with_headers(["id", "name"])
//!     .with_row(["1", "english"])
//!     .with_row(["abc", "french"])
//!     .with_schema(
//!         SchemaBuilder::new()
//!             .field(Field::new("id", FieldType::Integer))
//!             .field(Field::new("name", FieldType::String))
//!             .build(),
//!     );
//!
//! let report = TableValidator::new().validate(&table, &Checklist::new());
//! assert!(!report.valid);
//! assert_eq!(report.errors[0].code(), "type-error");
//! ```

pub mod check;
pub mod checks;
pub mod constraints;
pub mod engine;
pub mod expression;
pub mod header;
pub mod registry;
pub mod row;
pub mod source;
pub mod types;

pub use check::{Check, Lookup, Preparation, TableContext};
pub use engine::TableValidator;
pub use header::{HeaderOptions, HeaderValidation, validate_headers};
pub use registry::{CheckCategory, CheckRegistry, Position, RegistryError};
pub use row::{Row, RowValidator};
pub use source::{InMemoryTable, TableSource, TableStream};
