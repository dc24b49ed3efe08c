use crate::account::{require_user, AccountStatus};
use crate::error::{DispatchError, DispatchResult};
use crate::events::{Notification, RideEvent};
use crate::geo::GeoPoint;
use crate::presence::DriverPresence;
use crate::ride::{Actor, RideId, Role, UserId};

use super::{require_role, LifecycleCoordinator};

impl LifecycleCoordinator {
    /// Make the driver eligible for matching. Only active driver accounts may
    /// go online. Idempotent.
    pub fn go_online(
        &self,
        actor: &Actor,
        location: Option<GeoPoint>,
    ) -> DispatchResult<DriverPresence> {
        require_role(actor, Role::Driver, "going online")?;
        if let Some(point) = &location {
            point.validate()?;
        }
        let account = require_user(self.accounts.as_ref(), &actor.user_id)?;
        if account.role != Role::Driver {
            return Err(DispatchError::not_authorized(format!(
                "user {} is not a driver",
                actor.user_id
            )));
        }
        if account.status != AccountStatus::Active {
            return Err(DispatchError::not_authorized(format!(
                "driver {} account is not active",
                actor.user_id
            )));
        }

        let newly_online = self
            .presence
            .set_online(&actor.user_id, location, self.clock.now());
        self.write_presence(&actor.user_id, true, location);
        if newly_online {
            tracing::info!(driver_id = %actor.user_id, "driver online");
        }
        self.presence.get(&actor.user_id).ok_or_else(|| DispatchError::DriverOffline {
            driver_id: actor.user_id.to_string(),
        })
    }

    /// Remove the driver from matching. Rides already assigned keep their
    /// driver. Idempotent; returns whether the driver was online.
    pub fn go_offline(&self, actor: &Actor) -> DispatchResult<bool> {
        require_role(actor, Role::Driver, "going offline")?;
        Ok(self.take_offline(&actor.user_id))
    }

    /// A live channel closed. Drivers leave presence; rides are untouched.
    pub fn handle_disconnect(&self, user_id: &UserId) {
        self.take_offline(user_id);
    }

    fn take_offline(&self, driver: &UserId) -> bool {
        let was_online = self.presence.set_offline(driver);
        if was_online {
            self.write_presence(driver, false, None);
            tracing::info!(driver_id = %driver, "driver offline");
        }
        was_online
    }

    /// Record a driver's position and relay it to the rider of every ride
    /// the driver is currently on.
    ///
    /// A driver who is not online still has the position relayed, but
    /// presence ignores it with a warning.
    pub fn update_location(&self, actor: &Actor, location: GeoPoint) -> DispatchResult<()> {
        require_role(actor, Role::Driver, "updating location")?;
        location.validate()?;
        let driver = &actor.user_id;
        if self.presence.update_location(driver, location, self.clock.now()) {
            self.write_presence(driver, true, Some(location));
        }

        let notifications = self
            .rides
            .find(|ride| ride.is_driven_by(driver) && ride.status.is_in_progress())
            .into_iter()
            .map(|ride| {
                Notification::new(
                    ride.rider.clone(),
                    RideEvent::DriverLocation {
                        ride_id: ride.id,
                        driver_id: driver.clone(),
                        location,
                    },
                )
            })
            .collect();
        self.emit(notifications);
        Ok(())
    }

    /// Relay the caller's position to the other party of an active ride.
    pub fn share_location(
        &self,
        actor: &Actor,
        ride_id: RideId,
        location: GeoPoint,
    ) -> DispatchResult<()> {
        location.validate()?;
        let ride = self.ride_snapshot(ride_id)?;
        let counterpart = ride.counterpart_of(&actor.user_id).cloned().ok_or_else(|| {
            DispatchError::not_authorized(format!(
                "{} is not a party to ride {ride_id}",
                actor.user_id
            ))
        })?;
        if !ride.status.is_in_progress() {
            return Err(DispatchError::InvalidState {
                ride_id,
                status: ride.status,
                operation: "share location",
            });
        }

        let event = if ride.rider == actor.user_id {
            RideEvent::RiderLocation {
                ride_id,
                rider_id: actor.user_id.clone(),
                location,
            }
        } else {
            RideEvent::DriverLocation {
                ride_id,
                driver_id: actor.user_id.clone(),
                location,
            }
        };
        self.emit(vec![Notification::new(counterpart, event)]);
        Ok(())
    }

    /// Mirror presence into the account record. Failures are logged only.
    fn write_presence(&self, user_id: &UserId, online: bool, location: Option<GeoPoint>) {
        if let Err(err) = self.accounts.set_presence(user_id, online, location) {
            tracing::warn!(user_id = %user_id, error = %err, "presence write-through failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::account::{AccountStore, InMemoryAccountStore, UserAccount};

    fn coordinator(accounts: InMemoryAccountStore) -> LifecycleCoordinator {
        LifecycleCoordinator::builder()
            .accounts(Arc::new(accounts))
            .build()
            .expect("coordinator")
    }

    #[test]
    fn suspended_driver_cannot_go_online() {
        let accounts = InMemoryAccountStore::with_users([
            UserAccount::new("d1", "Asha", Role::Driver).with_status(AccountStatus::Suspended),
        ]);
        let coordinator = coordinator(accounts);
        let err = coordinator
            .go_online(&Actor::driver("d1"), None)
            .expect_err("suspended");
        assert!(matches!(err, DispatchError::NotAuthorized { .. }));
        assert!(!coordinator.presence().is_online(&UserId::from("d1")));
    }

    #[test]
    fn online_state_is_written_through() {
        let accounts = InMemoryAccountStore::with_users([UserAccount::new("d1", "Asha", Role::Driver)]);
        let coordinator = coordinator(accounts);
        let driver = Actor::driver("d1");
        let point = GeoPoint::new(12.9, 77.6).expect("point");

        coordinator.go_online(&driver, Some(point)).expect("online");
        let stored = coordinator
            .accounts()
            .get_user(&driver.user_id)
            .expect("read")
            .expect("user");
        assert!(stored.online);
        assert_eq!(stored.location, Some(point));

        assert!(coordinator.go_offline(&driver).expect("offline"));
        assert!(!coordinator.go_offline(&driver).expect("offline again"));
        let stored = coordinator
            .accounts()
            .get_user(&driver.user_id)
            .expect("read")
            .expect("user");
        assert!(!stored.online);
    }

    #[test]
    fn riders_cannot_toggle_presence() {
        let coordinator = coordinator(InMemoryAccountStore::new());
        let err = coordinator
            .go_online(&Actor::rider("r1"), None)
            .expect_err("rider");
        assert!(matches!(err, DispatchError::NotAuthorized { .. }));
    }
}
