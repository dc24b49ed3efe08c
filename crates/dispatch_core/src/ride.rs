//! Ride entity, identities, and the status enumeration.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Location;

/// Stable ride handle, issued once at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideId(Uuid);

impl RideId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RideId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RideId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// User identity as issued by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "user")]
    Rider,
    Driver,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rider" | "user" => Ok(Self::Rider),
            "driver" => Ok(Self::Driver),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Rider => "rider",
            Self::Driver => "driver",
            Self::Admin => "admin",
        };
        f.write_str(label)
    }
}

/// A verified `(user id, role)` pair supplied with every core call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(user_id),
            role,
        }
    }

    pub fn rider(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Rider)
    }

    pub fn driver(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Driver)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Requested,
    Accepted,
    Ongoing,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The ride has an assigned driver and the trip has not ended.
    pub fn is_in_progress(self) -> bool {
        matches!(self, Self::Accepted | Self::Ongoing)
    }

    /// States in which a driver must be assigned.
    pub fn requires_driver(self) -> bool {
        matches!(self, Self::Accepted | Self::Ongoing | Self::Completed)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Requested => "requested",
            Self::Accepted => "accepted",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// One trip request from creation to completion or cancellation.
///
/// The pickup code and the bookkeeping sets are never serialized; the code
/// travels only inside the rider's acceptance notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ride {
    pub id: RideId,
    pub rider: UserId,
    pub driver: Option<UserId>,
    pub pickup: Location,
    pub dropoff: Location,
    pub fare: f64,
    pub vehicle_class: String,
    pub status: RideStatus,
    #[serde(skip)]
    pub pickup_code: Option<String>,
    #[serde(skip)]
    pub pickup_code_failures: u32,
    /// Drivers who were shown this ride, by push or by pull.
    #[serde(skip)]
    pub offered_to: BTreeSet<UserId>,
    pub requested_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Ride {
    pub fn is_driven_by(&self, driver: &UserId) -> bool {
        self.driver.as_ref() == Some(driver)
    }

    /// The other party of the ride from `user`'s point of view.
    pub fn counterpart_of(&self, user: &UserId) -> Option<&UserId> {
        if &self.rider == user {
            self.driver.as_ref()
        } else if self.is_driven_by(user) {
            Some(&self.rider)
        } else {
            None
        }
    }

    /// `driver` is set exactly in the states that require one.
    pub fn driver_assignment_consistent(&self) -> bool {
        self.driver.is_some() == self.status.requires_driver()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_legacy_user_alias() {
        assert_eq!("user".parse::<Role>(), Ok(Role::Rider));
        assert_eq!("Driver".parse::<Role>(), Ok(Role::Driver));
        assert!("pilot".parse::<Role>().is_err());
    }

    #[test]
    fn ride_ids_are_unique_and_round_trip_through_strings() {
        let a = RideId::new();
        let b = RideId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<RideId>().expect("parse"), a);
    }

    #[test]
    fn terminal_states() {
        assert!(RideStatus::Completed.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
        assert!(!RideStatus::Accepted.is_terminal());
        assert!(RideStatus::Ongoing.is_in_progress());
        assert!(!RideStatus::Requested.requires_driver());
    }
}
