pub mod result;
pub mod stats;
pub mod table;

pub use result::{SessionSummary, TerminationReason};
pub use stats::{ColumnStats, NumericSummary};
pub use table::{Cell, Table, TableKind, TableShapeError};
