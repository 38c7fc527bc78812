pub mod completeness;
pub mod datatakes;
pub mod fragments;
pub mod geometry;
pub mod kml;
pub mod links;
pub mod plan;
pub mod scheduled;
pub mod tle;
