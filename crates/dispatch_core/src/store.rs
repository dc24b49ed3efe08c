//! Authoritative collection of active rides, keyed by ride id.
//!
//! Each ride sits behind its own mutex so mutation is serialized per ride and
//! unrelated rides never contend. The id map lock is held only long enough to
//! insert, look up, or remove a handle, and never while a ride lock is being
//! acquired by [`RideStore::transition`].
//!
//! Transitions are applied to a copy and committed only when the closure
//! succeeds, so a failed precondition leaves the stored ride untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::error::{DispatchError, DispatchResult};
use crate::ride::{Ride, RideId};

type RideSlot = Arc<Mutex<Ride>>;

#[derive(Debug, Default)]
pub struct RideStore {
    rides: RwLock<HashMap<RideId, RideSlot>>,
}

fn lock(slot: &RideSlot) -> MutexGuard<'_, Ride> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RideStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, ride_id: RideId) -> Option<RideSlot> {
        self.rides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ride_id)
            .cloned()
    }

    fn slots(&self) -> Vec<RideSlot> {
        self.rides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Add a freshly created ride to the active set.
    pub fn insert(&self, ride: Ride) -> RideId {
        let id = ride.id;
        self.rides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(ride)));
        id
    }

    pub fn get(&self, ride_id: RideId) -> Option<Ride> {
        self.slot(ride_id).map(|slot| lock(&slot).clone())
    }

    pub fn contains(&self, ride_id: RideId) -> bool {
        self.slot(ride_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.rides.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `apply` atomically under the ride's lock.
    ///
    /// The closure sees a working copy; the copy replaces the stored ride only
    /// if the closure returns `Ok`. Returns the committed ride alongside the
    /// closure's value.
    pub fn transition<T, F>(&self, ride_id: RideId, apply: F) -> DispatchResult<(Ride, T)>
    where
        F: FnOnce(&mut Ride) -> DispatchResult<T>,
    {
        let slot = self
            .slot(ride_id)
            .ok_or_else(|| DispatchError::ride_not_found(ride_id))?;
        let mut guard = lock(&slot);
        let mut working = guard.clone();
        let value = apply(&mut working)?;
        *guard = working;
        Ok((guard.clone(), value))
    }

    /// Like [`transition`](Self::transition), but the committed ride must be
    /// terminal and is removed from the active set before returning.
    ///
    /// Between the commit and the removal other callers may still reach the
    /// ride, but they observe a terminal status and every transition rejects.
    pub fn retire<T, F>(&self, ride_id: RideId, apply: F) -> DispatchResult<(Ride, T)>
    where
        F: FnOnce(&mut Ride) -> DispatchResult<T>,
    {
        let (ride, value) = self.transition(ride_id, apply)?;
        debug_assert!(ride.status.is_terminal(), "retired rides must be terminal");
        self.rides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ride_id);
        Ok((ride, value))
    }

    /// Snapshot of every active ride matching `predicate`.
    ///
    /// Each ride is read under its own lock; the result is consistent per ride
    /// but not across rides.
    pub fn find<P>(&self, mut predicate: P) -> Vec<Ride>
    where
        P: FnMut(&Ride) -> bool,
    {
        self.slots()
            .iter()
            .filter_map(|slot| {
                let ride = lock(slot);
                predicate(&ride).then(|| ride.clone())
            })
            .collect()
    }

    /// Run `update` on every matching ride under its lock, returning the
    /// updated snapshots. Only for bookkeeping that never changes status.
    pub fn touch<P, U>(&self, mut predicate: P, mut update: U) -> Vec<Ride>
    where
        P: FnMut(&Ride) -> bool,
        U: FnMut(&mut Ride),
    {
        self.slots()
            .iter()
            .filter_map(|slot| {
                let mut ride = lock(slot);
                if !predicate(&ride) {
                    return None;
                }
                update(&mut ride);
                Some(ride.clone())
            })
            .collect()
    }
}
