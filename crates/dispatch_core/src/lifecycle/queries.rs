use crate::error::{DispatchError, DispatchResult};
use crate::matching::PendingRide;
use crate::presence::DriverPresence;
use crate::ride::{Actor, Ride, RideId, RideStatus, Role};

use super::{require_role, ActiveRide, Earnings, LifecycleCoordinator};

impl LifecycleCoordinator {
    /// Requested rides near the calling driver; see
    /// [`MatchingEngine::pending_rides_for`](crate::matching::MatchingEngine::pending_rides_for).
    pub fn pending_rides(&self, actor: &Actor) -> DispatchResult<Vec<PendingRide>> {
        require_role(actor, Role::Driver, "listing pending rides")?;
        self.matching.pending_rides_for(&actor.user_id)
    }

    /// The rider's most recent unfinished ride, with the driver's profile
    /// once one is assigned.
    pub fn active_ride_for(&self, actor: &Actor) -> DispatchResult<Option<ActiveRide>> {
        require_role(actor, Role::Rider, "reading ride status")?;
        let latest = self
            .rides
            .find(|ride| ride.rider == actor.user_id && !ride.status.is_terminal())
            .into_iter()
            .max_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Ok(latest.map(|ride| {
            let driver = ride
                .driver
                .as_ref()
                .map(|driver| self.profile_of(driver, Role::Driver));
            ActiveRide { ride, driver }
        }))
    }

    /// Rides the calling driver has accepted and not yet finished, oldest first.
    pub fn accepted_rides_for(&self, actor: &Actor) -> DispatchResult<Vec<Ride>> {
        require_role(actor, Role::Driver, "listing accepted rides")?;
        let mut rides = self
            .rides
            .find(|ride| ride.is_driven_by(&actor.user_id) && ride.status.is_in_progress());
        rides.sort_by(|a, b| a.accepted_at.cmp(&b.accepted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rides)
    }

    /// A single ride, visible to its rider, its driver, and admins. Rides that
    /// already left the active set are looked up in the caller's history, or
    /// in any party's history for admins.
    pub fn ride(&self, actor: &Actor, ride_id: RideId) -> DispatchResult<Ride> {
        let ride = match self.rides.get(ride_id) {
            Some(ride) => Some(ride),
            None if actor.role == Role::Admin => self.accounts.archived_ride(ride_id)?,
            None => self
                .accounts
                .history(&actor.user_id)?
                .into_iter()
                .find(|ride| ride.id == ride_id),
        }
        .ok_or_else(|| DispatchError::ride_not_found(ride_id))?;
        let is_party = ride.rider == actor.user_id || ride.is_driven_by(&actor.user_id);
        if !is_party && actor.role != Role::Admin {
            return Err(DispatchError::not_authorized(format!(
                "{} is not a party to ride {ride_id}",
                actor.user_id
            )));
        }
        Ok(ride)
    }

    pub fn history(&self, actor: &Actor) -> DispatchResult<Vec<Ride>> {
        self.accounts.history(&actor.user_id)
    }

    /// Sum of fares over the driver's completed rides.
    pub fn earnings(&self, actor: &Actor) -> DispatchResult<Earnings> {
        require_role(actor, Role::Driver, "reading earnings")?;
        let completed: Vec<Ride> = self
            .accounts
            .history(&actor.user_id)?
            .into_iter()
            .filter(|ride| ride.status == RideStatus::Completed && ride.is_driven_by(&actor.user_id))
            .collect();
        let total = completed.iter().map(|ride| ride.fare).sum::<f64>();
        Ok(Earnings {
            driver_id: actor.user_id.clone(),
            completed_rides: completed.len(),
            total: (total * 100.0).round() / 100.0,
        })
    }

    pub fn online_drivers(&self) -> Vec<DriverPresence> {
        self.presence.list_online()
    }
}
