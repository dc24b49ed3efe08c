//! Geographic primitives: validated points and locations, Haversine distance,
//! and the H3 cell lookups used by the presence index.
//!
//! Every distance in the crate goes through [`distance_km`]; the matching code
//! relies on that single formula so that push and pull paths agree.

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(lat: f64, lng: f64) -> Result<Self, DispatchError> {
        let point = Self { lat, lng };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(DispatchError::invalid_input(format!(
                "latitude {} is outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(DispatchError::invalid_input(format!(
                "longitude {} is outside [-180, 180]",
                self.lng
            )));
        }
        // Range checks already reject NaN; h3o additionally rejects infinities.
        LatLng::new(self.lat, self.lng)
            .map(|_| ())
            .map_err(|err| DispatchError::invalid_input(format!("invalid coordinate: {err}")))
    }

    /// H3 cell containing this point at `resolution`.
    pub fn cell(&self, resolution: Resolution) -> Result<CellIndex, DispatchError> {
        LatLng::new(self.lat, self.lng)
            .map(|ll| ll.to_cell(resolution))
            .map_err(|err| DispatchError::invalid_input(format!("invalid coordinate: {err}")))
    }

    /// Point reached by moving `north_km` and `east_km` from this one.
    ///
    /// Uses a local flat-earth approximation; good enough for test geometry
    /// and short offsets inside a city.
    pub fn offset_km(&self, north_km: f64, east_km: f64) -> Self {
        let dlat = (north_km / EARTH_RADIUS_KM).to_degrees();
        let dlng = (east_km / (EARTH_RADIUS_KM * self.lat.to_radians().cos())).to_degrees();
        Self {
            lat: self.lat + dlat,
            lng: self.lng + dlng,
        }
    }
}

impl From<CellIndex> for GeoPoint {
    fn from(cell: CellIndex) -> Self {
        let ll: LatLng = cell.into();
        Self {
            lat: ll.lat(),
            lng: ll.lng(),
        }
    }
}

/// A pickup or dropoff: coordinates plus the human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Location {
    pub fn new(lat: f64, lng: f64, address: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            address: address.into(),
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }

    /// Coordinates must be well-formed and the address non-blank.
    pub fn validate(&self, label: &str) -> Result<(), DispatchError> {
        self.point()
            .validate()
            .map_err(|err| DispatchError::invalid_input(format!("{label}: {err}")))?;
        if self.address.trim().is_empty() {
            return Err(DispatchError::invalid_input(format!(
                "{label}: address is required"
            )));
        }
        Ok(())
    }
}

/// Great-circle distance in kilometres (Haversine).
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Grid radius `k` such that `grid_disk(origin, k)` covers every point within
/// `radius_km` of any point inside `origin`.
///
/// The neighbour spacing is measured locally and halved, so the disk is a
/// generous superset; callers still filter with [`distance_km`].
pub fn covering_grid_radius(origin: CellIndex, radius_km: f64) -> u32 {
    let center = GeoPoint::from(origin);
    let spacing_km = origin
        .grid_disk::<Vec<_>>(1)
        .into_iter()
        .filter(|cell| *cell != origin)
        .map(|cell| distance_km(center, GeoPoint::from(cell)))
        .fold(f64::INFINITY, f64::min);
    if !spacing_km.is_finite() || spacing_km <= 0.0 {
        return u32::MAX;
    }
    let rings = (radius_km / (spacing_km * 0.5)).ceil();
    if rings >= f64::from(u32::MAX - 1) {
        return u32::MAX;
    }
    rings as u32 + 1
}

/// Number of cells in a grid disk of radius `k` (hexagonal numbers).
pub fn grid_disk_size(k: u32) -> u64 {
    let k = u64::from(k);
    k.saturating_mul(k.saturating_add(1))
        .saturating_mul(3)
        .saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bangalore() -> GeoPoint {
        GeoPoint::new(12.90, 77.59).expect("valid point")
    }

    #[test]
    fn distance_is_zero_for_identical_points() {
        assert_eq!(distance_km(bangalore(), bangalore()), 0.0);
    }

    #[test]
    fn distance_matches_known_value() {
        // Pickup to dropoff of the reference scenario, ~4.6 km.
        let dropoff = GeoPoint::new(12.93, 77.62).expect("valid point");
        let d = distance_km(bangalore(), dropoff);
        assert!((d - 4.6).abs() < 0.1, "unexpected distance {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let other = bangalore().offset_km(3.0, -2.0);
        assert_eq!(distance_km(bangalore(), other), distance_km(other, bangalore()));
    }

    #[test]
    fn offset_produces_requested_distance() {
        let moved = bangalore().offset_km(2.0, 0.0);
        let d = distance_km(bangalore(), moved);
        assert!((d - 2.0).abs() < 0.01, "unexpected distance {d}");
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn location_requires_address() {
        let location = Location::new(12.9, 77.6, "   ");
        let err = location.validate("pickup").expect_err("blank address");
        assert!(matches!(err, DispatchError::InvalidInput { .. }));
    }

    #[test]
    fn covering_disk_contains_cells_within_radius() {
        let resolution = Resolution::Eight;
        let origin = bangalore().cell(resolution).expect("cell");
        let k = covering_grid_radius(origin, 2.0);
        let disk = origin.grid_disk::<Vec<_>>(k);
        for (north, east) in [(1.9, 0.0), (0.0, -1.9), (-1.4, 1.4), (1.2, -1.5)] {
            let cell = bangalore().offset_km(north, east).cell(resolution).expect("cell");
            assert!(disk.contains(&cell), "cell at ({north}, {east}) missing");
        }
    }

    #[test]
    fn grid_disk_size_matches_h3() {
        let origin = bangalore().cell(Resolution::Nine).expect("cell");
        for k in 0..4 {
            let actual = origin.grid_disk::<Vec<_>>(k).len() as u64;
            assert_eq!(actual, grid_disk_size(k));
        }
    }
}
