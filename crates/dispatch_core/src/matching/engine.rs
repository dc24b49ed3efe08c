//! Candidate search for both directions of the handshake: drivers near a new
//! pickup (push) and requested rides near a driver who just came online (pull).

use std::sync::Arc;

use crate::error::{DispatchError, DispatchResult};
use crate::geo::{distance_km, GeoPoint};
use crate::presence::PresenceRegistry;
use crate::ride::{RideStatus, UserId};
use crate::store::RideStore;

use super::algorithm::{MatchingAlgorithm, NearestFirst};
use super::types::{Candidate, PendingRide};
use super::within_radius;

pub struct MatchingEngine {
    radius_km: f64,
    algorithm: Box<dyn MatchingAlgorithm>,
    presence: Arc<PresenceRegistry>,
    rides: Arc<RideStore>,
}

impl MatchingEngine {
    pub fn new(radius_km: f64, presence: Arc<PresenceRegistry>, rides: Arc<RideStore>) -> Self {
        Self {
            radius_km,
            algorithm: Box::new(NearestFirst),
            presence,
            rides,
        }
    }

    pub fn with_algorithm(mut self, algorithm: Box<dyn MatchingAlgorithm>) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Online drivers with a known location within the radius of `pickup`,
    /// ranked by the configured algorithm. Empty when nobody is nearby.
    pub fn find_candidates(&self, pickup: GeoPoint) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .presence
            .drivers_near(pickup, self.radius_km)
            .into_iter()
            .map(|(driver_id, distance_km)| Candidate {
                driver_id,
                distance_km,
            })
            .collect();
        self.algorithm.rank_candidates(&mut candidates);
        candidates
    }

    /// Requested rides whose pickup is within the radius of the driver's
    /// current location. Every returned ride records the driver as offered so
    /// they hear about it when it is taken or cancelled.
    pub fn pending_rides_for(&self, driver: &UserId) -> DispatchResult<Vec<PendingRide>> {
        let presence = self.presence.get(driver).ok_or_else(|| DispatchError::DriverOffline {
            driver_id: driver.to_string(),
        })?;
        let location = presence.location.ok_or_else(|| {
            DispatchError::invalid_input(format!("driver {driver} has no known location"))
        })?;

        let radius_km = self.radius_km;
        let offered = self.rides.touch(
            |ride| {
                ride.status == RideStatus::Requested
                    && ride.driver.is_none()
                    && within_radius(distance_km(ride.pickup.point(), location), radius_km)
            },
            |ride| {
                ride.offered_to.insert(driver.clone());
            },
        );

        let mut pending: Vec<PendingRide> = offered
            .into_iter()
            .map(|ride| {
                let distance_km = distance_km(ride.pickup.point(), location);
                PendingRide { ride, distance_km }
            })
            .collect();
        self.algorithm.rank_pending(&mut pending);
        Ok(pending)
    }
}
