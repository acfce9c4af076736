pub mod loader;
pub mod merge;
pub mod summary;

pub use loader::TableLoader;
pub use merge::{merge_tables, JOIN_KEY};
pub use summary::column_stats;
