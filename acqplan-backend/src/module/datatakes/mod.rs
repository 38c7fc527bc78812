///! Upstream datatake index
///!
///! Read side of the production records: per day, per satellite, datatake
///! id -> observation window and per-level completeness.

mod types;
pub use types::{DatatakeRecord, LevelCompleteness, ProductCompleteness, ProcessingLevel};

mod index;
pub use index::{DatatakeIndex, InMemoryDatatakeIndex};
