///! Spherical forward azimuth and great-circle destination

use super::types::GroundTrackPoint;

/// Sphere radius used for footprint offsets
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Forward azimuth from `from` towards `to`, in radians clockwise from north.
pub fn bearing(from: &GroundTrackPoint, to: &GroundTrackPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    y.atan2(x)
}

/// Point reached travelling `distance_m` along a great circle starting at
/// `from` with initial `bearing` (radians). Elevation of the result is 0,
/// the time offset is carried over.
pub fn destination(from: &GroundTrackPoint, bearing: f64, distance_m: f64) -> GroundTrackPoint {
    let lat1 = from.latitude.to_radians();
    let lon1 = from.longitude.to_radians();
    let angular = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    GroundTrackPoint::new(
        lat2.to_degrees(),
        normalize_longitude(lon2.to_degrees()),
        0.0,
        from.offset_secs,
    )
}

/// Wraps a longitude into [-180, 180)
pub fn normalize_longitude(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}
