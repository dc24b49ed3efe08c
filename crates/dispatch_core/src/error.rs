//! Typed failures returned by every dispatch operation.
//!
//! Precondition failures are always one of these variants, never an opaque
//! internal error, so the request and event layers can map each to a
//! specific user-facing message.

use thiserror::Error;

use crate::ride::{RideId, RideStatus};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Malformed coordinates, missing fields, out-of-range values.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Unknown ride or user id.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The actor is not the ride's owner or assigned driver, or lacks the role.
    #[error("not authorized: {message}")]
    NotAuthorized { message: String },

    /// The operation is illegal for the ride's current status.
    #[error("ride {ride_id} is {status}, cannot {operation}")]
    InvalidState {
        ride_id: RideId,
        status: RideStatus,
        operation: &'static str,
    },

    /// Another driver claimed the ride first.
    #[error("ride {ride_id} is no longer available")]
    RideUnavailable { ride_id: RideId },

    /// The driver is not registered online.
    #[error("driver {driver_id} is offline")]
    DriverOffline { driver_id: String },

    /// Too many wrong pickup codes were submitted for this ride.
    #[error("pickup code for ride {ride_id} is locked after {attempts} failed attempts")]
    PickupCodeLocked { ride_id: RideId, attempts: u32 },

    /// The account-storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DispatchError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::NotAuthorized {
            message: message.into(),
        }
    }

    pub fn ride_not_found(ride_id: RideId) -> Self {
        Self::NotFound {
            entity: "ride",
            id: ride_id.to_string(),
        }
    }

    pub fn user_not_found(user_id: impl ToString) -> Self {
        Self::NotFound {
            entity: "user",
            id: user_id.to_string(),
        }
    }

    /// Stable machine-readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::NotFound { .. } => "not_found",
            Self::NotAuthorized { .. } => "not_authorized",
            Self::InvalidState { .. } => "invalid_state",
            Self::RideUnavailable { .. } => "ride_unavailable",
            Self::DriverOffline { .. } => "driver_offline",
            Self::PickupCodeLocked { .. } => "pickup_code_locked",
            Self::Storage(_) => "storage_error",
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
