use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geodetic position: degrees latitude/longitude, altitude in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Position {
        Position { lat, lon, alt }
    }

    /// Great-circle ground distance in meters (haversine).
    pub fn ground_distance(&self, other: &Position) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Moves toward `target` for `dt` seconds at the given horizontal and
    /// vertical speeds without overshooting it on either axis.
    pub fn step_toward(&self, target: &Position, v_horizontal: f64, v_vertical: f64, dt: f64) -> Position {
        let horizontal = self.ground_distance(target);
        let vertical = target.alt - self.alt;

        let step_h = (v_horizontal.abs() * dt).min(horizontal);
        let step_v = (v_vertical.abs() * dt).min(vertical.abs()) * vertical.signum();
        let ratio = if horizontal > 0.0 { step_h / horizontal } else { 0.0 };

        Position {
            lat: self.lat + ratio * (target.lat - self.lat),
            lon: self.lon + ratio * (target.lon - self.lon),
            alt: self.alt + step_v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_distance_one_degree_latitude() {
        let a = Position::new(37.0, -122.0, 0.0);
        let b = Position::new(38.0, -122.0, 0.0);
        assert!((a.ground_distance(&b) - 111_195.0).abs() < 50.0);
    }

    #[test]
    fn test_step_does_not_overshoot() {
        let a = Position::new(37.0, -122.0, 0.0);
        let b = Position::new(37.001, -122.0, 100.0);
        let next = a.step_toward(&b, 1_000.0, 50.0, 10.0);
        assert_eq!(b.lat, next.lat);
        assert_eq!(100.0, next.alt);
    }

    #[test]
    fn test_step_descends_with_positive_vertical_speed() {
        let a = Position::new(37.0, -122.0, 450.0);
        let b = Position::new(37.0, -122.0, 0.0);
        let next = a.step_toward(&b, 0.0, 2.0, 10.0);
        assert_eq!(430.0, next.alt);
        assert_eq!(a.lat, next.lat);
    }
}
