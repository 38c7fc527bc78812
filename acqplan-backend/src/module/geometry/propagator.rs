///! SGP4 ground-track sampling
///!
///! Positions come out of SGP4 in the TEME frame (km); they are rotated to
///! Earth-fixed coordinates with the mean sidereal angle and projected on
///! the WGS-84 ellipsoid.

use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, Elements, MinutesSinceEpoch};

use super::types::{GroundTrack, GroundTrackPoint};
use crate::error::{PlanError, PlanResult};
use crate::module::tle::OrbitalElements;

const WGS84_A_KM: f64 = 6378.137;
const WGS84_F: f64 = 1.0 / 298.257223563;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const J2000_JD: f64 = 2_451_545.0;

/// Sampling instants for `[start, end]` at `step`.
///
/// Yields `floor((end - start) / step) + 2` in-range instants, the last ones
/// clamped to `end`, plus one instant at `end + step` when `extra` is set.
/// Returns the instants and the in-range count.
pub fn sample_instants(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
    extra: bool,
) -> PlanResult<(Vec<DateTime<Utc>>, usize)> {
    if end < start {
        return Err(PlanError::InvalidInterval { start, end });
    }
    let step_ms = step.num_milliseconds();
    if step_ms <= 0 {
        return Err(PlanError::config(format!("propagation step must be positive, got {}", step)));
    }

    let span_ms = (end - start).num_milliseconds();
    let in_range = (span_ms / step_ms) as usize + 2;

    let mut instants = Vec::with_capacity(in_range + usize::from(extra));
    for i in 0..in_range {
        let instant = start + Duration::milliseconds(step_ms * i as i64);
        instants.push(instant.min(end));
    }
    if extra {
        instants.push(end + step);
    }
    Ok((instants, in_range))
}

/// Julian date of an instant
fn julian_date(t: DateTime<Utc>) -> f64 {
    let secs = t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1.0e9;
    UNIX_EPOCH_JD + secs / 86_400.0
}

/// Greenwich mean sidereal angle, radians in [0, 2π)
pub fn gmst_radians(t: DateTime<Utc>) -> f64 {
    let d = julian_date(t) - J2000_JD;
    let c = d / 36_525.0;
    let gmst_deg = 280.46061837 + 360.98564736629 * d + 0.000387933 * c * c - c * c * c / 38_710_000.0;
    gmst_deg.rem_euclid(360.0).to_radians()
}

/// Rotates a TEME position about the polar axis into Earth-fixed axes
pub fn teme_to_ecef(position_km: [f64; 3], gmst: f64) -> [f64; 3] {
    let (st, ct) = gmst.sin_cos();
    [
        ct * position_km[0] + st * position_km[1],
        -st * position_km[0] + ct * position_km[1],
        position_km[2],
    ]
}

/// Earth-fixed km to WGS-84 (latitude deg, longitude deg, height m)
pub fn ecef_to_geodetic(ecef_km: [f64; 3]) -> (f64, f64, f64) {
    let [x, y, z] = ecef_km;
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let p = x.hypot(y);
    let lon = y.atan2(x);

    let mut lat = z.atan2(p * (1.0 - e2));
    let mut height = 0.0;
    for _ in 0..8 {
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        height = p * cos_lat + z * sin_lat - WGS84_A_KM * (1.0 - e2 * sin_lat * sin_lat).sqrt();
        lat = z.atan2(p * (1.0 - e2 * n / (n + height)));
    }

    (lat.to_degrees(), lon.to_degrees(), height * 1000.0)
}

/// One satellite's SGP4 state, built from a single element set
pub struct OrbitPropagator {
    name: String,
    elements: Elements,
    constants: Constants,
}

impl OrbitPropagator {
    pub fn new(elements: &OrbitalElements) -> PlanResult<Self> {
        let sgp4_elements = elements.to_sgp4()?;
        let constants = Constants::from_elements(&sgp4_elements)
            .map_err(|e| PlanError::Propagation(format!("{}: {}", elements.name, e)))?;
        Ok(Self {
            name: elements.name.clone(),
            elements: sgp4_elements,
            constants,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sub-satellite point at `t`; `offset_secs` is relative to `origin`
    pub fn sub_satellite_point(&self, t: DateTime<Utc>, origin: DateTime<Utc>) -> PlanResult<GroundTrackPoint> {
        let minutes: MinutesSinceEpoch = self
            .elements
            .datetime_to_minutes_since_epoch(&t.naive_utc())
            .map_err(|e| PlanError::Propagation(format!("{} at {}: {}", self.name, t, e)))?;
        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| PlanError::Propagation(format!("{} at {}: {}", self.name, t, e)))?;

        let ecef = teme_to_ecef(prediction.position, gmst_radians(t));
        let (latitude, longitude, elevation) = ecef_to_geodetic(ecef);
        let offset_secs = (t - origin).num_milliseconds() as f64 / 1000.0;
        Ok(GroundTrackPoint::new(latitude, longitude, elevation, offset_secs))
    }

    /// Samples the ground track over `[start, end]`
    pub fn ground_track(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
        extra: bool,
    ) -> PlanResult<GroundTrack> {
        let (instants, in_range) = sample_instants(start, end, step, extra)?;
        let points = instants
            .into_iter()
            .map(|t| self.sub_satellite_point(t, start))
            .collect::<PlanResult<Vec<_>>>()?;
        tracing::trace!(
            "Propagated {} over {} .. {}: {} samples ({} in range)",
            self.name,
            start,
            end,
            points.len(),
            in_range
        );
        Ok(GroundTrack { points, in_range })
    }
}
