use super::types::{Candidate, PendingRide};

/// Trait for ordering the drivers and rides that passed the radius filter.
pub trait MatchingAlgorithm: Send + Sync {
    /// Order candidates for a new ride, best first.
    fn rank_candidates(&self, candidates: &mut [Candidate]);

    /// Order pending rides for a driver, best first.
    fn rank_pending(&self, rides: &mut [PendingRide]);
}

/// Nearest first; ties by driver id, or by request time then ride id.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestFirst;

impl MatchingAlgorithm for NearestFirst {
    fn rank_candidates(&self, candidates: &mut [Candidate]) {
        candidates.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.driver_id.cmp(&b.driver_id))
        });
    }

    fn rank_pending(&self, rides: &mut [PendingRide]) {
        rides.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.ride.requested_at.cmp(&b.ride.requested_at))
                .then_with(|| a.ride.id.cmp(&b.ride.id))
        });
    }
}
