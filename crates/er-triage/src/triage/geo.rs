use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres (IUGG).
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Road-indirectness factor applied when no routing service is available.
pub const ROAD_INDIRECTNESS: f64 = 1.3;

/// Effective ambulance speed assumed by the fallback ETA estimate.
pub const FALLBACK_SPEED_KMH: f64 = 40.0;

/// WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `None` for non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    pub fn parse(latitude: &str, longitude: &str) -> Option<Self> {
        let lat = latitude.trim().parse::<f64>().ok()?;
        let lon = longitude.trim().parse::<f64>().ok()?;
        Self::new(lat, lon)
    }

    pub fn is_valid(&self) -> bool {
        Self::new(self.latitude, self.longitude).is_some()
    }
}

/// Great-circle (haversine) distance in kilometres.
pub fn great_circle_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Fallback drive-time estimate in whole minutes.
pub fn estimate_eta_minutes(distance_km: f64) -> u32 {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return 0;
    }
    let minutes = distance_km * ROAD_INDIRECTNESS / FALLBACK_SPEED_KMH * 60.0;
    minutes.min(u32::MAX as f64) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    RoutingService,
    Estimated,
}

/// Distance, drive time, and polyline between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub eta_minutes: u32,
    pub path: Vec<Coordinates>,
    pub source: RouteSource,
}

impl RouteEstimate {
    /// Straight-line route with the speed-based ETA.
    pub fn estimated(origin: Coordinates, destination: Coordinates) -> Self {
        let distance_km = great_circle_km(origin, destination);
        Self {
            distance_km,
            eta_minutes: estimate_eta_minutes(distance_km),
            path: vec![origin, destination],
            source: RouteSource::Estimated,
        }
    }
}
