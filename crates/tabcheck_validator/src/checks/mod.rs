//! Built-in checks.
//!
//! - `integrity`: unique values, primary keys, foreign keys
//! - `heuristic`: duplicate rows, statistical outliers, truncation suspects
//! - `regulation`: user-configured value and row rules

pub mod heuristic;
pub mod integrity;
pub mod regulation;

pub use heuristic::{DeviatedValueCheck, DuplicateRowCheck, TruncatedValueCheck};
pub use integrity::{ForeignKeyCheck, UniqueValueCheck};
pub use regulation::{ForbiddenValueCheck, RowConstraintCheck, SequentialValueCheck};
