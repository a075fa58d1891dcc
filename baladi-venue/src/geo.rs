use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair already known to be in range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Returns None unless latitude is within -90..=90 and longitude within
    /// -180..=180.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
            Some(Self {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }
}

/// Great-circle distance between two points in kilometers, spherical
/// law-of-cosines form. Pure so it can run against any storage backend or
/// entirely in memory.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlng = b.longitude.to_radians() - a.longitude.to_radians();

    let cos_angle = lat1.cos() * lat2.cos() * dlng.cos() + lat1.sin() * lat2.sin();
    // Rounding can push the cosine a hair outside [-1, 1].
    EARTH_RADIUS_KM * cos_angle.clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(GeoPoint::new(90.1, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -180.5).is_none());
        assert!(GeoPoint::new(-90.0, 180.0).is_some());
    }

    #[test]
    fn zero_distance_for_identical_points() {
        let p = GeoPoint::new(25.2048, 55.2708).unwrap();
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn dubai_to_abu_dhabi_is_roughly_120km() {
        let dubai = GeoPoint::new(25.2048, 55.2708).unwrap();
        let abu_dhabi = GeoPoint::new(24.4539, 54.3773).unwrap();
        let d = haversine_km(dubai, abu_dhabi);
        assert!((110.0..135.0).contains(&d), "got {d}");
        // Symmetric.
        assert!((haversine_km(abu_dhabi, dubai) - d).abs() < 1e-9);
    }
}
