///! Datatake completeness
///!
///! ## Main Components
///! - `evaluate`: ACQ/PUB state machine over per-level percentages
///! - `DatatakeIdCodec`: mission-specific id decoding and prefixing
///! - `CompletenessEngine`: annotates stored fragments from the datatake index

// ============ Core Data Structures ============
mod types;
pub use types::{CompletenessStatus, TrackStatus};

// ============ State Machine ============
mod engine;
pub use engine::{CompletenessThresholds, evaluate};

// ============ Datatake Identity ============
mod ids;
pub use ids::DatatakeIdCodec;

// ============ Fragment Annotation ============
mod annotate;
pub use annotate::{AnnotationReport, CompletenessEngine};
