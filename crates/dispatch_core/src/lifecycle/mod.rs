//! The lifecycle coordinator: the one place ride state changes.
//!
//! Every operation takes the verified [`Actor`], checks its preconditions
//! under the ride's lock, commits, and only then builds the notifications the
//! commit implies and hands them to the [`NotificationSink`]. A failed
//! delivery never rolls a transition back.
//!
//! Surfaces (HTTP handlers, WebSocket sessions) translate into these calls
//! and never mutate rides themselves.

mod pickup_code;
mod presence;
mod queries;
mod ratings;
mod rides;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::account::{AccountStore, InMemoryAccountStore, PublicProfile, UserAccount, UserEntry};
use crate::clock::{Clock, SystemClock};
use crate::config::DispatchConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::events::{DiscardSink, Notification, NotificationSink};
use crate::geo::Location;
use crate::matching::{MatchingAlgorithm, MatchingEngine};
use crate::presence::PresenceRegistry;
use crate::ride::{Actor, Ride, RideId, Role, UserId};
use crate::stats::{DispatchStats, StatsSnapshot};
use crate::store::RideStore;

pub use pickup_code::PickupCodeGenerator;
pub use ratings::{RatingRequest, RatingSummary, MAX_STARS, MIN_STARS};

/// Rider input for [`LifecycleCoordinator::create_ride`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRequest {
    pub pickup: Location,
    pub dropoff: Location,
    /// Quoted from distance when omitted.
    #[serde(default)]
    pub fare: Option<f64>,
    #[serde(default)]
    pub vehicle_class: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PickupVerification {
    pub matched: bool,
    /// Wrong submissions still allowed before verification locks.
    pub attempts_remaining: u32,
}

/// A rider's current ride together with the assigned driver, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveRide {
    pub ride: Ride,
    pub driver: Option<PublicProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Earnings {
    pub driver_id: UserId,
    pub completed_rides: usize,
    pub total: f64,
}

pub struct LifecycleCoordinator {
    config: DispatchConfig,
    clock: Arc<dyn Clock>,
    accounts: Arc<dyn AccountStore>,
    presence: Arc<PresenceRegistry>,
    rides: Arc<RideStore>,
    matching: MatchingEngine,
    sink: Arc<dyn NotificationSink>,
    codes: PickupCodeGenerator,
    stats: DispatchStats,
}

#[derive(Default)]
pub struct CoordinatorBuilder {
    config: DispatchConfig,
    clock: Option<Arc<dyn Clock>>,
    accounts: Option<Arc<dyn AccountStore>>,
    sink: Option<Arc<dyn NotificationSink>>,
    algorithm: Option<Box<dyn MatchingAlgorithm>>,
}

impl CoordinatorBuilder {
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn accounts(mut self, accounts: Arc<dyn AccountStore>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn algorithm(mut self, algorithm: Box<dyn MatchingAlgorithm>) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Validate the configuration and wire fresh registries.
    pub fn build(self) -> DispatchResult<LifecycleCoordinator> {
        self.config.validate()?;
        let presence = Arc::new(PresenceRegistry::new(self.config.resolution()?));
        let rides = Arc::new(RideStore::new());
        let mut matching = MatchingEngine::new(
            self.config.match_radius_km,
            Arc::clone(&presence),
            Arc::clone(&rides),
        );
        if let Some(algorithm) = self.algorithm {
            matching = matching.with_algorithm(algorithm);
        }
        let codes = match self.config.pickup_code_seed {
            Some(seed) => PickupCodeGenerator::seeded(seed),
            None => PickupCodeGenerator::from_entropy(),
        };

        Ok(LifecycleCoordinator {
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            accounts: self
                .accounts
                .unwrap_or_else(|| Arc::new(InMemoryAccountStore::new())),
            sink: self.sink.unwrap_or_else(|| Arc::new(DiscardSink)),
            config: self.config,
            presence,
            rides,
            matching,
            codes,
            stats: DispatchStats::default(),
        })
    }
}

fn require_role(actor: &Actor, role: Role, operation: &str) -> DispatchResult<()> {
    if actor.role == role {
        Ok(())
    } else {
        Err(DispatchError::not_authorized(format!(
            "{operation} requires role {role}, caller is {}",
            actor.role
        )))
    }
}

impl LifecycleCoordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn rides(&self) -> &RideStore {
        &self.rides
    }

    pub fn accounts(&self) -> &dyn AccountStore {
        self.accounts.as_ref()
    }

    pub fn matching(&self) -> &MatchingEngine {
        &self.matching
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Resolve the account behind a verified identity, creating a minimal
    /// record on first contact. A stored role that disagrees with the
    /// presented one is refused.
    pub fn register(&self, actor: &Actor) -> DispatchResult<UserAccount> {
        if actor.user_id.as_str().trim().is_empty() {
            return Err(DispatchError::invalid_input("user id is required"));
        }
        let mut account = UserAccount::new(
            actor.user_id.as_str(),
            actor.user_id.as_str(),
            actor.role,
        );
        if actor.role == Role::Driver {
            account = account.with_vehicle_class(self.config.default_vehicle_class.clone());
        }
        let account = match self.accounts.insert_user(account)? {
            UserEntry::Created(account) => {
                tracing::info!(user_id = %actor.user_id, role = %actor.role, "registered new account");
                account
            }
            UserEntry::Existing(account) => account,
        };
        if account.role != actor.role {
            return Err(DispatchError::not_authorized(format!(
                "user {} is registered as {}",
                actor.user_id, account.role
            )));
        }
        Ok(account)
    }

    /// Public profile of `user_id`, or a placeholder if the record is
    /// missing or unreadable.
    fn profile_of(&self, user_id: &UserId, role: Role) -> PublicProfile {
        match self.accounts.get_user(user_id) {
            Ok(Some(account)) => account.public_profile(),
            Ok(None) => PublicProfile::fallback(user_id, role),
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "profile lookup failed");
                PublicProfile::fallback(user_id, role)
            }
        }
    }

    fn emit(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            let recipient = notification.recipient.clone();
            let kind = notification.event.kind();
            let delivered = self.sink.deliver(notification);
            self.stats.record_delivery(delivered);
            if !delivered {
                tracing::debug!(recipient = %recipient, event = kind, "notification dropped");
            }
        }
    }

    fn ride_snapshot(&self, ride_id: RideId) -> DispatchResult<Ride> {
        self.rides
            .get(ride_id)
            .ok_or_else(|| DispatchError::ride_not_found(ride_id))
    }
}
