//! # Tabcheck Core
//!
//! Core types for the tabcheck tabular data validation engine:
//!
//! - Cell values (`Value`) and schema definitions (`Schema`, `Field`)
//! - The closed validation error taxonomy (`ValidationError`)
//! - Report assembly (`Report`, `TableReport`) with the flatten projection
//! - Validation-run configuration (`Checklist`, `CheckDescriptor`)
//!
//! ## Example
//!
//! ```rust
//! use tabcheck_core::{FieldBuilder, FieldType, SchemaBuilder};
//!
//! let schema = SchemaBuilder::new()
//!     .field(FieldBuilder::new("id", FieldType::Integer).required(true).build())
//!     .field(FieldBuilder::new("name", FieldType::String).build())
//!     .primary_key(["id"])
//!     .build();
//!
//! assert!(schema.check_metadata().is_empty());
//! ```

mod checklist;
mod errors;
mod report;
mod schema;
mod value;

pub use checklist::*;
pub use errors::*;
pub use report::*;
pub use schema::*;
pub use value::*;
