use crate::clock::not_before;
use crate::error::{DispatchError, DispatchResult};
use crate::events::{Notification, RideEvent, UnavailableReason};
use crate::ride::{Actor, Ride, RideId, RideStatus, Role};

use super::pickup_code::codes_match;
use super::{require_role, LifecycleCoordinator, PickupVerification, RideRequest};

fn invalid_state(ride: &Ride, operation: &'static str) -> DispatchError {
    DispatchError::InvalidState {
        ride_id: ride.id,
        status: ride.status,
        operation,
    }
}

impl LifecycleCoordinator {
    /// Record a new ride in `requested` and offer it to every nearby driver.
    pub fn create_ride(&self, actor: &Actor, request: RideRequest) -> DispatchResult<Ride> {
        require_role(actor, Role::Rider, "requesting a ride")?;
        let RideRequest {
            pickup,
            dropoff,
            fare,
            vehicle_class,
        } = request;
        pickup.validate("pickup")?;
        dropoff.validate("dropoff")?;

        let fare = match fare {
            Some(fare) if !fare.is_finite() || fare < 0.0 => {
                return Err(DispatchError::invalid_input(
                    "fare must be a non-negative number",
                ));
            }
            Some(fare) => fare,
            None => self.config.pricing.quote(&pickup, &dropoff),
        };
        let vehicle_class = vehicle_class
            .map(|class| class.trim().to_string())
            .filter(|class| !class.is_empty())
            .unwrap_or_else(|| self.config.default_vehicle_class.clone());

        let candidates = self.matching.find_candidates(pickup.point());
        let ride = Ride {
            id: RideId::new(),
            rider: actor.user_id.clone(),
            driver: None,
            pickup,
            dropoff,
            fare,
            vehicle_class,
            status: RideStatus::Requested,
            pickup_code: None,
            pickup_code_failures: 0,
            offered_to: candidates.iter().map(|c| c.driver_id.clone()).collect(),
            requested_at: self.clock.now(),
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
        };
        self.rides.insert(ride.clone());
        self.stats.record_requested();
        tracing::info!(
            ride_id = %ride.id,
            rider_id = %ride.rider,
            fare = ride.fare,
            candidates = candidates.len(),
            "ride requested"
        );

        let mut notifications: Vec<Notification> = candidates
            .iter()
            .map(|candidate| {
                Notification::new(
                    candidate.driver_id.clone(),
                    RideEvent::RideAvailable {
                        ride: ride.clone(),
                        distance_km: candidate.distance_km,
                    },
                )
            })
            .collect();
        notifications.push(Notification::new(
            ride.rider.clone(),
            RideEvent::RideRequested {
                ride: ride.clone(),
                candidates: candidates.len(),
            },
        ));
        self.emit(notifications);
        Ok(ride)
    }

    /// Claim a requested ride. Exactly one of any number of concurrent
    /// accepts succeeds; the rest see `RideUnavailable`.
    pub fn accept_ride(&self, actor: &Actor, ride_id: RideId) -> DispatchResult<Ride> {
        require_role(actor, Role::Driver, "accepting a ride")?;
        let driver = &actor.user_id;
        let now = self.clock.now();

        let result = self.rides.transition(ride_id, |ride| {
            match &ride.driver {
                Some(holder) if holder == driver => {
                    return Err(invalid_state(ride, "accept"));
                }
                Some(_) => return Err(DispatchError::RideUnavailable { ride_id }),
                None => {}
            }
            if ride.status != RideStatus::Requested {
                return Err(invalid_state(ride, "accept"));
            }
            if !self.presence.is_online(driver) {
                return Err(DispatchError::DriverOffline {
                    driver_id: driver.to_string(),
                });
            }
            let code = self.codes.next_code();
            ride.driver = Some(driver.clone());
            ride.status = RideStatus::Accepted;
            ride.accepted_at = Some(not_before(now, ride.requested_at));
            ride.pickup_code = Some(code.clone());
            ride.pickup_code_failures = 0;
            Ok(code)
        });

        let (ride, code) = match result {
            Ok(committed) => committed,
            Err(err) => {
                if matches!(err, DispatchError::RideUnavailable { .. }) {
                    self.stats.record_accept_conflict();
                }
                tracing::debug!(ride_id = %ride_id, driver_id = %driver, error = %err, "accept refused");
                return Err(err);
            }
        };
        self.stats.record_accepted();
        tracing::info!(ride_id = %ride.id, driver_id = %driver, rider_id = %ride.rider, "ride accepted");

        // Losing drivers hear first; the winner's view waits on profile reads.
        self.emit(
            ride.offered_to
                .iter()
                .filter(|offered| *offered != driver)
                .map(|offered| {
                    Notification::new(
                        offered.clone(),
                        RideEvent::RideNoLongerAvailable {
                            ride_id: ride.id,
                            reason: UnavailableReason::Taken,
                        },
                    )
                })
                .collect(),
        );

        let driver_profile = self.profile_of(driver, Role::Driver);
        let rider_profile = self.profile_of(&ride.rider, Role::Rider);
        self.emit(vec![
            Notification::new(
                ride.rider.clone(),
                RideEvent::RideAccepted {
                    ride: ride.clone(),
                    driver: driver_profile,
                    pickup_code: code,
                },
            ),
            Notification::new(
                driver.clone(),
                RideEvent::RideAssigned {
                    ride: ride.clone(),
                    rider: rider_profile,
                },
            ),
        ]);
        Ok(ride)
    }

    /// Decline a requested ride. The ride is untouched; the rider hears that
    /// the search continues.
    pub fn reject_ride(&self, actor: &Actor, ride_id: RideId) -> DispatchResult<()> {
        require_role(actor, Role::Driver, "rejecting a ride")?;
        let ride = self.ride_snapshot(ride_id)?;
        if ride.status != RideStatus::Requested {
            return Err(invalid_state(&ride, "reject"));
        }
        self.stats.record_rejected();
        tracing::info!(ride_id = %ride.id, driver_id = %actor.user_id, "ride rejected");
        self.emit(vec![Notification::new(
            ride.rider.clone(),
            RideEvent::RideRejected {
                ride_id: ride.id,
                driver_id: actor.user_id.clone(),
            },
        )]);
        Ok(())
    }

    /// Check the rider's pickup code. A match starts the trip; mismatches are
    /// counted and lock verification once the configured limit is reached.
    pub fn verify_pickup_code(
        &self,
        actor: &Actor,
        ride_id: RideId,
        code: &str,
    ) -> DispatchResult<PickupVerification> {
        require_role(actor, Role::Driver, "verifying a pickup code")?;
        if code.trim().is_empty() {
            return Err(DispatchError::invalid_input("pickup code is required"));
        }
        let driver = &actor.user_id;
        let max_attempts = self.config.pickup_code_max_attempts;
        let now = self.clock.now();

        let (ride, verification) = self.rides.transition(ride_id, |ride| {
            if !ride.is_driven_by(driver) {
                return Err(DispatchError::not_authorized(format!(
                    "ride {ride_id} is not assigned to {driver}"
                )));
            }
            if ride.status != RideStatus::Accepted {
                return Err(invalid_state(ride, "verify pickup code"));
            }
            if ride.pickup_code_failures >= max_attempts {
                return Err(DispatchError::PickupCodeLocked {
                    ride_id,
                    attempts: ride.pickup_code_failures,
                });
            }
            let matched = ride
                .pickup_code
                .as_deref()
                .is_some_and(|expected| codes_match(expected, code));
            if matched {
                let floor = ride.accepted_at.unwrap_or(ride.requested_at);
                ride.status = RideStatus::Ongoing;
                ride.started_at = Some(not_before(now, floor));
                ride.pickup_code = None;
            } else {
                ride.pickup_code_failures += 1;
            }
            Ok(PickupVerification {
                matched,
                attempts_remaining: max_attempts.saturating_sub(ride.pickup_code_failures),
            })
        })?;

        let event = RideEvent::PickupVerified {
            ride_id,
            matched: verification.matched,
            attempts_remaining: verification.attempts_remaining,
        };
        let mut notifications = vec![Notification::new(driver.clone(), event.clone())];
        if verification.matched {
            tracing::info!(ride_id = %ride_id, driver_id = %driver, "pickup verified, ride ongoing");
            notifications.push(Notification::new(ride.rider.clone(), event));
        } else {
            self.stats.record_pickup_code_mismatch();
            tracing::info!(
                ride_id = %ride_id,
                driver_id = %driver,
                attempts_remaining = verification.attempts_remaining,
                "pickup code mismatch"
            );
        }
        self.emit(notifications);
        Ok(verification)
    }

    /// Finish the trip, retire the ride, and file it in both parties' history.
    pub fn complete_ride(&self, actor: &Actor, ride_id: RideId) -> DispatchResult<Ride> {
        require_role(actor, Role::Driver, "completing a ride")?;
        let driver = &actor.user_id;
        let now = self.clock.now();

        let (ride, ()) = self.rides.retire(ride_id, |ride| {
            if !ride.is_driven_by(driver) {
                return Err(DispatchError::not_authorized(format!(
                    "ride {ride_id} is not assigned to {driver}"
                )));
            }
            if !ride.status.is_in_progress() {
                return Err(invalid_state(ride, "complete"));
            }
            let floor = ride
                .started_at
                .or(ride.accepted_at)
                .unwrap_or(ride.requested_at);
            ride.status = RideStatus::Completed;
            ride.completed_at = Some(not_before(now, floor));
            ride.pickup_code = None;
            Ok(())
        })?;
        self.stats.record_completed();
        tracing::info!(ride_id = %ride.id, driver_id = %driver, fare = ride.fare, "ride completed");

        for party in [&ride.rider, driver] {
            if let Err(err) = self.accounts.append_history(party, ride.clone()) {
                tracing::error!(ride_id = %ride.id, user_id = %party, error = %err, "failed to record ride history");
            }
        }

        self.emit(vec![Notification::new(
            ride.rider.clone(),
            RideEvent::RideCompleted { ride: ride.clone() },
        )]);
        Ok(ride)
    }

    /// Withdraw a ride that has not started. It leaves the active set and is
    /// not recorded in history; a driver who had accepted it is released.
    pub fn cancel_ride(&self, actor: &Actor, ride_id: RideId) -> DispatchResult<Ride> {
        let rider = &actor.user_id;
        let now = self.clock.now();

        let (ride, (previous, assigned)) = self.rides.retire(ride_id, |ride| {
            if &ride.rider != rider {
                return Err(DispatchError::not_authorized(format!(
                    "ride {ride_id} belongs to another rider"
                )));
            }
            let previous = ride.status;
            if !matches!(previous, RideStatus::Requested | RideStatus::Accepted) {
                return Err(invalid_state(ride, "cancel"));
            }
            let floor = ride.accepted_at.unwrap_or(ride.requested_at);
            ride.status = RideStatus::Cancelled;
            ride.cancelled_at = Some(not_before(now, floor));
            ride.pickup_code = None;
            Ok((previous, ride.driver.take()))
        })?;
        self.stats.record_cancelled();
        tracing::info!(ride_id = %ride.id, rider_id = %rider, previous = %previous, "ride cancelled");

        let notifications = match assigned {
            Some(driver) => vec![Notification::new(
                driver,
                RideEvent::RideCancelled { ride: ride.clone() },
            )],
            _ => ride
                .offered_to
                .iter()
                .map(|offered| {
                    Notification::new(
                        offered.clone(),
                        RideEvent::RideNoLongerAvailable {
                            ride_id: ride.id,
                            reason: UnavailableReason::Cancelled,
                        },
                    )
                })
                .collect(),
        };
        self.emit(notifications);
        Ok(ride)
    }
}
