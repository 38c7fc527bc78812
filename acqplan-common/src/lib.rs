///! Shared types for the acquisition plan services
///!
///! Mission and status vocabularies plus the typed export tree that the
///! backend produces and any consumer (map viewer, API layer) reads.

pub mod types;
pub mod export;

pub use types::{CompletenessState, Mission, Track, DAY_FORMAT, INSTANT_FORMAT};
pub use export::{
    DayFolder, ExportDocument, ExportEvent, GeoCoordinate, Geometry, SatelliteFolder,
    StatusStyle,
};
