use acqplan_common::GeoCoordinate;
use serde::{Deserialize, Serialize};

/// Sub-satellite point (or a point derived from it)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTrackPoint {
    /// Degrees, WGS-84
    pub latitude: f64,
    /// Degrees, WGS-84
    pub longitude: f64,
    /// Metres above the ellipsoid
    pub elevation: f64,
    /// Seconds since the start of the sampled interval
    pub offset_secs: f64,
}

impl GroundTrackPoint {
    pub fn new(latitude: f64, longitude: f64, elevation: f64, offset_secs: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            offset_secs,
        }
    }

    pub fn to_coordinate(&self) -> GeoCoordinate {
        GeoCoordinate::new(self.longitude, self.latitude, self.elevation)
    }
}

/// Samples of one propagation run.
///
/// The first `in_range` points cover `[start, end]`; a trailing point past
/// `end` may follow, used only for headings.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTrack {
    pub points: Vec<GroundTrackPoint>,
    pub in_range: usize,
}

impl GroundTrack {
    pub fn in_range_points(&self) -> &[GroundTrackPoint] {
        &self.points[..self.in_range.min(self.points.len())]
    }

    pub fn extra_point(&self) -> Option<&GroundTrackPoint> {
        self.points.get(self.in_range)
    }
}
