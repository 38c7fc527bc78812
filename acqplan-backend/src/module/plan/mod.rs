///! Plan ingestion
///!
///! Orchestration of one ingestion pass and the products built from the
///! stored fragments.

// ============ Run Outcomes ============
mod outcome;
pub use outcome::{RunReport, UnitOutcome, UnitStatus};

// ============ Orbit-Derived Acquisitions ============
mod orbit_builder;
pub use orbit_builder::{
    DatatakeAcquisition, OBSERVATION_START_KEY, OBSERVATION_STOP_KEY, OrbitAcquisitionBuilder,
    SATELLITE_UNIT_KEY,
};

// ============ Export ============
mod export;
pub use export::{Coverage, build_export, coverage, export_event, export_label, status_styles};

// ============ Orchestrator ============
mod orchestrator;
pub use orchestrator::PlanOrchestrator;
