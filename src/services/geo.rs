//! Geographic estimates used by the offline travel-time provider

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road distance coefficient (straight line to road)
pub const ROAD_COEFFICIENT: f64 = 1.3;

/// Average speed in km/h for travel time estimation
pub const AVERAGE_SPEED_KMH: f64 = 40.0;

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimated driving time in whole seconds.
pub fn travel_time_seconds(
    from: &Coordinates,
    to: &Coordinates,
    road_coefficient: f64,
    average_speed_kmh: f64,
) -> u64 {
    let road_km = haversine_distance(from, to) * road_coefficient;
    (road_km / average_speed_kmh * 3600.0).round() as u64
}

/// Deterministic pseudo-coordinates for an address string.
///
/// Same (trimmed, case-insensitive) address always lands on the same point
/// inside a ~100 km box, so offline matrices look like a metro service area.
pub fn address_to_coordinates(address: &str) -> Coordinates {
    let mut hasher = DefaultHasher::new();
    address.trim().to_lowercase().hash(&mut hasher);
    let hash = hasher.finish();

    const LAT_MIN: f64 = 39.5;
    const LAT_MAX: f64 = 40.3;
    const LNG_MIN: f64 = -105.4;
    const LNG_MAX: f64 = -104.5;

    let lat_normalized = ((hash >> 32) as f64) / (u32::MAX as f64);
    let lng_normalized = ((hash & 0xFFFF_FFFF) as f64) / (u32::MAX as f64);

    Coordinates {
        lat: LAT_MIN + lat_normalized * (LAT_MAX - LAT_MIN),
        lng: LNG_MIN + lng_normalized * (LNG_MAX - LNG_MIN),
    }
}
