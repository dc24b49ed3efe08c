use serde::Serialize;

use crate::ride::{Ride, UserId};

/// An online driver eligible for a ride, with their distance to the pickup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub driver_id: UserId,
    pub distance_km: f64,
}

/// A still-requested ride near a driver, for the pull path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingRide {
    pub ride: Ride,
    pub distance_km: f64,
}
