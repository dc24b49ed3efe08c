//! Test helpers shared by unit tests, integration tests, and the gateway.
//!
//! Geography is anchored at the Bangalore reference pickup so every test
//! reasons about the same distances.

use std::sync::{Mutex, PoisonError};

use crate::account::{InMemoryAccountStore, UserAccount};
use crate::events::{Notification, NotificationSink, RideEvent};
use crate::geo::{GeoPoint, Location};
use crate::ride::{Role, UserId};

pub use crate::clock::ManualClock;

pub const PICKUP_LAT: f64 = 12.90;
pub const PICKUP_LNG: f64 = 77.59;
pub const DROPOFF_LAT: f64 = 12.93;
pub const DROPOFF_LNG: f64 = 77.62;

pub fn pickup_point() -> GeoPoint {
    GeoPoint {
        lat: PICKUP_LAT,
        lng: PICKUP_LNG,
    }
}

pub fn pickup_location() -> Location {
    Location::new(PICKUP_LAT, PICKUP_LNG, "MG Road, Bangalore")
}

pub fn dropoff_location() -> Location {
    Location::new(DROPOFF_LAT, DROPOFF_LNG, "Indiranagar, Bangalore")
}

/// A point `km` due north of the reference pickup.
pub fn point_north_of_pickup(km: f64) -> GeoPoint {
    pickup_point().offset_km(km, 0.0)
}

/// Account store holding active riders `r1..` and drivers `d1..`.
pub fn seeded_accounts(riders: usize, drivers: usize) -> InMemoryAccountStore {
    let riders = (1..=riders).map(|i| UserAccount::new(format!("r{i}"), format!("Rider {i}"), Role::Rider));
    let drivers = (1..=drivers).map(|i| {
        UserAccount::new(format!("d{i}"), format!("Driver {i}"), Role::Driver)
            .with_vehicle_class(crate::config::DEFAULT_VEHICLE_CLASS)
    });
    InMemoryAccountStore::with_users(riders.chain(drivers))
}

/// Sink that keeps every notification for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.delivered.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn events_for(&self, user: &str) -> Vec<RideEvent> {
        let user = UserId::from(user);
        self.all()
            .into_iter()
            .filter(|n| n.recipient == user)
            .map(|n| n.event)
            .collect()
    }

    /// Event kinds received by `user`, in delivery order.
    pub fn kinds_for(&self, user: &str) -> Vec<&'static str> {
        self.events_for(user).iter().map(RideEvent::kind).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: Notification) -> bool {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        true
    }
}
