///! Geometry kernel, orbit propagation and footprint profiles
///!
///! Everything here is pure computation: no I/O, no clock reads.
///! - `kernel`: spherical bearing and destination formulas
///! - `propagator`: SGP4 ground-track sampling projected on WGS-84
///! - `footprint`: line / swath-polygon profiles and their registry

// ============ Core Data Structures ============
mod types;
pub use types::{GroundTrack, GroundTrackPoint};

// ============ Spherical Kernel ============
pub mod kernel;
pub use kernel::{bearing, destination, normalize_longitude, EARTH_RADIUS_M};

// ============ Orbit Propagation ============
mod propagator;
pub use propagator::{
    OrbitPropagator, ecef_to_geodetic, gmst_radians, sample_instants, teme_to_ecef,
};

// ============ Footprint Profiles ============
mod footprint;
pub use footprint::{
    FootprintBuilder, LineProfile, PolygonProfile, ProfileBuilder, ProfileRegistry,
};

#[cfg(test)]
pub(crate) use propagator::tests::S3A_TLE;
