//! Wire format of the live channel: JSON text frames shaped as
//! `{"type": "...", "payload": {...}}` in both directions.
//!
//! Ride events produced by the coordinator use the same envelope; see
//! [`dispatch_core::events::RideEvent`].

use dispatch_core::geo::GeoPoint;
use dispatch_core::lifecycle::RideRequest;
use dispatch_core::ride::{RideId, Role, UserId};
use dispatch_core::DispatchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First frame on every connection; identity as verified upstream.
    Register { user_id: String, role: Role },
    GoOnline {
        #[serde(default)]
        location: Option<GeoPoint>,
    },
    GoOffline,
    LocationUpdate { lat: f64, lng: f64 },
    RequestRide(RideRequest),
    AcceptRide { ride_id: RideId },
    RejectRide { ride_id: RideId },
    CancelRide { ride_id: RideId },
    CompleteRide { ride_id: RideId },
    SubmitPickupCode { ride_id: RideId, code: String },
    ShareLocation { ride_id: RideId, lat: f64, lng: f64 },
    PendingRides,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::GoOnline { .. } => "go_online",
            Self::GoOffline => "go_offline",
            Self::LocationUpdate { .. } => "location_update",
            Self::RequestRide(_) => "request_ride",
            Self::AcceptRide { .. } => "accept_ride",
            Self::RejectRide { .. } => "reject_ride",
            Self::CancelRide { .. } => "cancel_ride",
            Self::CompleteRide { .. } => "complete_ride",
            Self::SubmitPickupCode { .. } => "submit_pickup_code",
            Self::ShareLocation { .. } => "share_location",
            Self::PendingRides => "pending_rides",
        }
    }
}

/// Replies addressed to the connection that sent a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    Registered { user_id: UserId, role: Role },
    PendingRides { rides: Value },
    /// The request was applied; `data` carries the operation's result.
    Ack { request: String, data: Value },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        request: Option<String>,
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn ack(request: &str, data: impl Serialize) -> Self {
        Self::Ack {
            request: request.to_string(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    pub fn error(request: Option<&str>, err: &DispatchError) -> Self {
        Self::Error {
            request: request.map(str::to_string),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
