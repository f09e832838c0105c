//! Great-circle geometry used when no road route can be obtained.

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}

/// Haversine distance between two WGS84 points, in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = deg_to_rad(lat2 - lat1);
    let d_lon = deg_to_rad(lon2 - lon1);
    let a = (d_lat / 2.0).sin().powi(2) +
        deg_to_rad(lat1).cos() * deg_to_rad(lat2).cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

pub fn meters_to_km(meters: i64) -> f64 {
    meters as f64 / 1000.0
}
