///! Footprint profiles
///!
///! A profile turns a sampled ground track into the geometry attached to an
///! acquisition. Profiles are looked up by name in a `ProfileRegistry`.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use acqplan_common::Geometry;
use chrono::{DateTime, Duration, Utc};

use super::kernel::{bearing, destination};
use super::propagator::OrbitPropagator;
use super::types::{GroundTrack, GroundTrackPoint};
use crate::error::{PlanError, PlanResult};

pub trait ProfileBuilder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the track must carry one sample past the interval end
    fn needs_extra_point(&self) -> bool;

    fn build_profile(&self, track: &GroundTrack) -> Vec<GroundTrackPoint>;

    fn to_geometry(&self, profile: &[GroundTrackPoint]) -> Geometry;
}

/// Ground track as an open polyline
#[derive(Debug, Clone, Default)]
pub struct LineProfile;

impl ProfileBuilder for LineProfile {
    fn name(&self) -> &'static str {
        "Line"
    }

    fn needs_extra_point(&self) -> bool {
        false
    }

    fn build_profile(&self, track: &GroundTrack) -> Vec<GroundTrackPoint> {
        track.in_range_points().to_vec()
    }

    fn to_geometry(&self, profile: &[GroundTrackPoint]) -> Geometry {
        Geometry::LineString(profile.iter().map(GroundTrackPoint::to_coordinate).collect())
    }
}

/// Swath polygon straddling the ground track
#[derive(Debug, Clone)]
pub struct PolygonProfile {
    half_swath_m: f64,
}

impl PolygonProfile {
    pub fn new(swath_width_m: f64) -> Self {
        Self {
            half_swath_m: swath_width_m / 2.0,
        }
    }

    /// Heading of the track at sample `i`, taken towards the next sample at
    /// a later instant; the last sample reuses the heading from the previous
    /// distinct one.
    fn heading_at(points: &[GroundTrackPoint], i: usize) -> f64 {
        let current = &points[i];
        if let Some(next) = points[i + 1..]
            .iter()
            .find(|p| p.offset_secs > current.offset_secs)
        {
            return bearing(current, next);
        }
        points[..i]
            .iter()
            .rev()
            .find(|p| p.offset_secs < current.offset_secs)
            .map(|previous| bearing(previous, current))
            .unwrap_or(0.0)
    }
}

impl ProfileBuilder for PolygonProfile {
    fn name(&self) -> &'static str {
        "Polygon"
    }

    fn needs_extra_point(&self) -> bool {
        true
    }

    fn build_profile(&self, track: &GroundTrack) -> Vec<GroundTrackPoint> {
        let in_range = track.in_range.min(track.points.len());
        let mut east = Vec::with_capacity(in_range);
        let mut west = Vec::with_capacity(in_range);

        for i in 0..in_range {
            let sample = &track.points[i];
            let heading = Self::heading_at(&track.points, i);
            east.push(destination(sample, heading + FRAC_PI_2, self.half_swath_m));
            west.push(destination(sample, heading - FRAC_PI_2, self.half_swath_m));
        }

        east.extend(west.into_iter().rev());
        east
    }

    fn to_geometry(&self, profile: &[GroundTrackPoint]) -> Geometry {
        Geometry::Polygon(profile.iter().map(GroundTrackPoint::to_coordinate).collect())
    }
}

type ProfileFactory = fn(swath_width_m: f64) -> Box<dyn ProfileBuilder>;

/// Profile constructors keyed by profile name
pub struct ProfileRegistry {
    factories: BTreeMap<String, ProfileFactory>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the "Line" and "Polygon" profiles
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("Line", |_| Box::new(LineProfile));
        registry.register("Polygon", |swath| Box::new(PolygonProfile::new(swath)));
        registry
    }

    pub fn register(&mut self, name: &str, factory: ProfileFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str, swath_width_m: f64) -> PlanResult<Box<dyn ProfileBuilder>> {
        self.factories
            .get(name)
            .map(|factory| factory(swath_width_m))
            .ok_or_else(|| {
                PlanError::config(format!(
                    "unknown footprint profile '{}' (known: {})",
                    name,
                    self.names().join(", ")
                ))
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Propagator + profile for one satellite
pub struct FootprintBuilder {
    propagator: OrbitPropagator,
    profile: Box<dyn ProfileBuilder>,
    step: Duration,
}

impl FootprintBuilder {
    pub fn new(propagator: OrbitPropagator, profile: Box<dyn ProfileBuilder>, step: Duration) -> Self {
        Self {
            propagator,
            profile,
            step,
        }
    }

    pub fn profile_name(&self) -> &'static str {
        self.profile.name()
    }

    pub fn build_points(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> PlanResult<Vec<GroundTrackPoint>> {
        let track = self
            .propagator
            .ground_track(start, end, self.step, self.profile.needs_extra_point())?;
        Ok(self.profile.build_profile(&track))
    }

    pub fn build(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> PlanResult<Geometry> {
        let points = self.build_points(start, end)?;
        Ok(self.profile.to_geometry(&points))
    }
}
