///! Day-indexed acquisition fragments
///!
///! ## Main Components
///! - `AcquisitionEvent`: the persisted unit (placemark) with identity = name
///! - `DayFragment`: events of one satellite for one calendar day
///! - `FragmentStore`: per-satellite day -> fragment map with retention
///! - `FragmentRepository`: JSON snapshots of stores on disk

// ============ Core Data Structures ============
mod types;
pub use types::{AcquisitionEvent, DayFragment, EventAttribute, TimeInterval};

// ============ Store and Merge ============
mod store;
pub use store::{AddOutcome, FragmentStore, MergePolicy};

// ============ Persistence ============
mod persist;
pub use persist::FragmentRepository;
