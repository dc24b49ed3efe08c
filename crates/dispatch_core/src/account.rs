//! Account-storage collaborator: user records, ride history, ratings.
//!
//! The dispatcher treats storage as synchronous key-value access with
//! single-record atomicity and nothing more.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, DispatchResult};
use crate::geo::GeoPoint;
use crate::ride::{Ride, RideId, Role, UserId};

/// Avatar shown when a user never uploaded one.
pub const DEFAULT_PHOTO_URL: &str = "https://cdn-icons-png.flaticon.com/512/3135/3135715.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub status: AccountStatus,
    pub mobile: Option<String>,
    pub photo_url: Option<String>,
    /// Drivers only.
    pub vehicle_class: Option<String>,
    pub online: bool,
    pub location: Option<GeoPoint>,
}

impl UserAccount {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            role,
            status: AccountStatus::Active,
            mobile: None,
            photo_url: None,
            vehicle_class: None,
            online: false,
            location: None,
        }
    }

    pub fn with_vehicle_class(mut self, vehicle_class: impl Into<String>) -> Self {
        self.vehicle_class = Some(vehicle_class.into());
        self
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            user_id: self.id.clone(),
            name: self.name.clone(),
            vehicle_class: self.vehicle_class.clone(),
            photo_url: self
                .photo_url
                .clone()
                .unwrap_or_else(|| DEFAULT_PHOTO_URL.to_string()),
            mobile: self.mobile.clone(),
        }
    }
}

/// Fields each party of a ride may see about the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub user_id: UserId,
    pub name: String,
    pub vehicle_class: Option<String>,
    pub photo_url: String,
    pub mobile: Option<String>,
}

impl PublicProfile {
    /// Placeholder used when the account record cannot be read.
    pub fn fallback(user_id: &UserId, role: Role) -> Self {
        let (name, vehicle_class) = match role {
            Role::Driver => ("Driver", Some(crate::config::DEFAULT_VEHICLE_CLASS.to_string())),
            _ => ("Rider", None),
        };
        Self {
            user_id: user_id.clone(),
            name: name.to_string(),
            vehicle_class,
            photo_url: DEFAULT_PHOTO_URL.to_string(),
            mobile: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub ride_id: RideId,
    pub from: UserId,
    pub to: UserId,
    pub stars: u8,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub type StoreResult<T> = Result<T, DispatchError>;

/// Outcome of [`AccountStore::insert_user`].
#[derive(Debug, Clone, PartialEq)]
pub enum UserEntry {
    Created(UserAccount),
    /// A record already existed and was left untouched.
    Existing(UserAccount),
}

impl UserEntry {
    pub fn account(&self) -> &UserAccount {
        match self {
            Self::Created(account) | Self::Existing(account) => account,
        }
    }

    pub fn into_account(self) -> UserAccount {
        match self {
            Self::Created(account) | Self::Existing(account) => account,
        }
    }
}

/// Trait for user, history, and rating storage.
pub trait AccountStore: Send + Sync {
    fn get_user(&self, user_id: &UserId) -> StoreResult<Option<UserAccount>>;

    /// Create or replace a user record.
    fn upsert_user(&self, account: UserAccount) -> StoreResult<()>;

    /// Store `account` only if no record with its id exists, in one step.
    fn insert_user(&self, account: UserAccount) -> StoreResult<UserEntry>;

    /// Write the online flag and, when given, the last-known location.
    fn set_presence(
        &self,
        user_id: &UserId,
        online: bool,
        location: Option<GeoPoint>,
    ) -> StoreResult<()>;

    /// Append a terminal ride to the user's read-only history.
    fn append_history(&self, user_id: &UserId, ride: Ride) -> StoreResult<()>;

    /// History in completion order, oldest first.
    fn history(&self, user_id: &UserId) -> StoreResult<Vec<Ride>>;

    /// A ride from anyone's history.
    fn archived_ride(&self, ride_id: RideId) -> StoreResult<Option<Ride>>;

    /// Record a rating. A second rating from the same author for the same
    /// ride is refused with `InvalidInput`, atomically with the insert.
    fn add_rating(&self, rating: Rating) -> StoreResult<()>;

    /// Ratings received by `user_id`.
    fn ratings_for(&self, user_id: &UserId) -> StoreResult<Vec<Rating>>;

    /// Ratings written by `user_id`.
    fn ratings_by(&self, user_id: &UserId) -> StoreResult<Vec<Rating>>;
}

#[derive(Debug, Default)]
struct AccountTables {
    users: HashMap<UserId, UserAccount>,
    history: HashMap<UserId, Vec<Ride>>,
    ratings: Vec<Rating>,
}

/// Process-local store used by the server binary and by tests.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    tables: RwLock<AccountTables>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserAccount>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write().unwrap_or_else(PoisonError::into_inner);
            for user in users {
                tables.users.insert(user.id.clone(), user);
            }
        }
        store
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get_user(&self, user_id: &UserId) -> StoreResult<Option<UserAccount>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.users.get(user_id).cloned())
    }

    fn upsert_user(&self, account: UserAccount) -> StoreResult<()> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.users.insert(account.id.clone(), account);
        Ok(())
    }

    fn insert_user(&self, account: UserAccount) -> StoreResult<UserEntry> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        match tables.users.entry(account.id.clone()) {
            Entry::Occupied(existing) => Ok(UserEntry::Existing(existing.get().clone())),
            Entry::Vacant(slot) => Ok(UserEntry::Created(slot.insert(account).clone())),
        }
    }

    fn set_presence(
        &self,
        user_id: &UserId,
        online: bool,
        location: Option<GeoPoint>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let user = tables
            .users
            .get_mut(user_id)
            .ok_or_else(|| DispatchError::user_not_found(user_id))?;
        user.online = online;
        if location.is_some() {
            user.location = location;
        }
        Ok(())
    }

    fn append_history(&self, user_id: &UserId, ride: Ride) -> StoreResult<()> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.history.entry(user_id.clone()).or_default().push(ride);
        Ok(())
    }

    fn history(&self, user_id: &UserId) -> StoreResult<Vec<Ride>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.history.get(user_id).cloned().unwrap_or_default())
    }

    fn archived_ride(&self, ride_id: RideId) -> StoreResult<Option<Ride>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .history
            .values()
            .flatten()
            .find(|ride| ride.id == ride_id)
            .cloned())
    }

    fn add_rating(&self, rating: Rating) -> StoreResult<()> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let duplicate = tables
            .ratings
            .iter()
            .any(|existing| existing.ride_id == rating.ride_id && existing.from == rating.from);
        if duplicate {
            return Err(DispatchError::invalid_input(format!(
                "ride {} was already rated by {}",
                rating.ride_id, rating.from
            )));
        }
        tables.ratings.push(rating);
        Ok(())
    }

    fn ratings_for(&self, user_id: &UserId) -> StoreResult<Vec<Rating>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .ratings
            .iter()
            .filter(|rating| &rating.to == user_id)
            .cloned()
            .collect())
    }

    fn ratings_by(&self, user_id: &UserId) -> StoreResult<Vec<Rating>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .ratings
            .iter()
            .filter(|rating| &rating.from == user_id)
            .cloned()
            .collect())
    }
}

/// Look up a user, turning a missing record into `NotFound`.
pub(crate) fn require_user(store: &dyn AccountStore, user_id: &UserId) -> DispatchResult<UserAccount> {
    store
        .get_user(user_id)?
        .ok_or_else(|| DispatchError::user_not_found(user_id))
}
