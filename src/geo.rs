use crate::angles::deg_to_rad;
use crate::types::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = deg_to_rad(b.latitude() - a.latitude());
    let d_lon = deg_to_rad(b.longitude() - a.longitude());
    let h = (d_lat / 2.0).sin().powi(2)
        + deg_to_rad(a.latitude()).cos()
            * deg_to_rad(b.latitude()).cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}
