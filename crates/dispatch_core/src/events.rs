//! Outbound ride events and the delivery seam.
//!
//! The coordinator builds notifications only after a transition commits and
//! hands them to a [`NotificationSink`]. Delivery is best effort: a sink that
//! cannot reach the recipient reports it and the committed state stands.

use serde::Serialize;

use crate::account::PublicProfile;
use crate::geo::GeoPoint;
use crate::ride::{Ride, RideId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Another driver accepted the ride.
    Taken,
    /// The rider cancelled before anyone accepted.
    Cancelled,
}

/// Events pushed to a single user's live channel.
///
/// Serialized as `{"type": ..., "payload": {...}}`, the same envelope the
/// gateway uses for its own replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RideEvent {
    /// To the rider: the request was recorded and offered to `candidates` drivers.
    RideRequested { ride: Ride, candidates: usize },
    /// To each candidate driver.
    RideAvailable { ride: Ride, distance_km: f64 },
    /// To the rider; the only event that carries the pickup code.
    RideAccepted {
        ride: Ride,
        driver: PublicProfile,
        pickup_code: String,
    },
    /// To the accepting driver.
    RideAssigned { ride: Ride, rider: PublicProfile },
    /// To drivers who were offered the ride and can no longer take it.
    RideNoLongerAvailable {
        ride_id: RideId,
        reason: UnavailableReason,
    },
    /// To the rider: one driver declined, the search goes on.
    RideRejected { ride_id: RideId, driver_id: UserId },
    /// To the assigned driver when the rider cancels.
    RideCancelled { ride: Ride },
    DriverLocation {
        ride_id: RideId,
        driver_id: UserId,
        location: GeoPoint,
    },
    RiderLocation {
        ride_id: RideId,
        rider_id: UserId,
        location: GeoPoint,
    },
    PickupVerified {
        ride_id: RideId,
        matched: bool,
        attempts_remaining: u32,
    },
    RideCompleted { ride: Ride },
}

impl RideEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RideRequested { .. } => "ride_requested",
            Self::RideAvailable { .. } => "ride_available",
            Self::RideAccepted { .. } => "ride_accepted",
            Self::RideAssigned { .. } => "ride_assigned",
            Self::RideNoLongerAvailable { .. } => "ride_no_longer_available",
            Self::RideRejected { .. } => "ride_rejected",
            Self::RideCancelled { .. } => "ride_cancelled",
            Self::DriverLocation { .. } => "driver_location",
            Self::RiderLocation { .. } => "rider_location",
            Self::PickupVerified { .. } => "pickup_verified",
            Self::RideCompleted { .. } => "ride_completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub recipient: UserId,
    pub event: RideEvent,
}

impl Notification {
    pub fn new(recipient: UserId, event: RideEvent) -> Self {
        Self { recipient, event }
    }
}

/// Delivery seam between the coordinator and whatever live channels exist.
pub trait NotificationSink: Send + Sync {
    /// Hand off one notification. Returns `false` when the recipient has no
    /// live channel and the notification was dropped.
    fn deliver(&self, notification: Notification) -> bool;
}

/// Sink that drops everything; used when no gateway is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl NotificationSink for DiscardSink {
    fn deliver(&self, _notification: Notification) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_use_type_payload_envelope() {
        let event = RideEvent::RideNoLongerAvailable {
            ride_id: RideId::new(),
            reason: UnavailableReason::Taken,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "ride_no_longer_available");
        assert_eq!(json["payload"]["reason"], "taken");
        assert_eq!(event.kind(), "ride_no_longer_available");
    }
}
