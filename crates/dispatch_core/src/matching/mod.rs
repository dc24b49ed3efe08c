pub mod algorithm;
pub mod engine;
pub mod types;

pub use algorithm::{MatchingAlgorithm, NearestFirst};
pub use engine::MatchingEngine;
pub use types::{Candidate, PendingRide};

/// The single inclusion predicate shared by the push and pull paths.
///
/// Callers always pass `distance_km(pickup, driver)`; the bound is inclusive.
pub fn within_radius(distance_km: f64, radius_km: f64) -> bool {
    distance_km <= radius_km
}
