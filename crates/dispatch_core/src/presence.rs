//! Driver presence: who is online, where they were last seen, and an H3
//! spatial index over those positions.
//!
//! The registry is the only presence state the dispatcher consults. Entries
//! are created when a driver goes online and removed when they go offline or
//! disconnect. Reads return snapshots; callers must tolerate entries that went
//! stale a moment later.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use h3o::{CellIndex, Resolution};
use serde::Serialize;

use crate::geo::{covering_grid_radius, distance_km, grid_disk_size, GeoPoint};
use crate::ride::UserId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverPresence {
    pub driver_id: UserId,
    pub location: Option<GeoPoint>,
    pub online_since: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// H3 cell -> driver mappings, kept in step with the presence map.
#[derive(Debug, Default)]
struct SpatialIndex {
    drivers_by_cell: HashMap<CellIndex, BTreeSet<UserId>>,
    driver_to_cell: HashMap<UserId, CellIndex>,
}

impl SpatialIndex {
    fn place(&mut self, driver: &UserId, cell: CellIndex) {
        if self.driver_to_cell.get(driver) == Some(&cell) {
            return;
        }
        self.remove(driver);
        self.drivers_by_cell
            .entry(cell)
            .or_default()
            .insert(driver.clone());
        self.driver_to_cell.insert(driver.clone(), cell);
    }

    fn remove(&mut self, driver: &UserId) {
        if let Some(cell) = self.driver_to_cell.remove(driver) {
            if let Some(drivers) = self.drivers_by_cell.get_mut(&cell) {
                drivers.remove(driver);
                if drivers.is_empty() {
                    self.drivers_by_cell.remove(&cell);
                }
            }
        }
    }

    fn drivers_in_cells<'a>(&'a self, cells: &'a [CellIndex]) -> impl Iterator<Item = &'a UserId> {
        cells
            .iter()
            .filter_map(|cell| self.drivers_by_cell.get(cell))
            .flatten()
    }

    fn len(&self) -> usize {
        self.driver_to_cell.len()
    }
}

#[derive(Debug, Default)]
struct PresenceState {
    drivers: HashMap<UserId, DriverPresence>,
    index: SpatialIndex,
}

#[derive(Debug)]
pub struct PresenceRegistry {
    resolution: Resolution,
    state: RwLock<PresenceState>,
}

impl PresenceRegistry {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            state: RwLock::new(PresenceState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PresenceState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PresenceState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a driver eligible for matching. Idempotent; a repeated call only
    /// refreshes the location when one is given. Returns `true` if the driver
    /// was previously offline.
    pub fn set_online(
        &self,
        driver: &UserId,
        location: Option<GeoPoint>,
        now: DateTime<Utc>,
    ) -> bool {
        let location = location.filter(|point| point.validate().is_ok());
        let cell = location.and_then(|point| point.cell(self.resolution).ok());
        let mut state = self.write();
        let newly_online = !state.drivers.contains_key(driver);
        let entry = state
            .drivers
            .entry(driver.clone())
            .or_insert_with(|| DriverPresence {
                driver_id: driver.clone(),
                location: None,
                online_since: now,
                last_seen: now,
            });
        entry.last_seen = now;
        if location.is_some() {
            entry.location = location;
        }
        if let Some(cell) = cell {
            state.index.place(driver, cell);
        }
        newly_online
    }

    /// Remove eligibility. Idempotent; rides already assigned are untouched.
    /// Returns `true` if the driver was online.
    pub fn set_offline(&self, driver: &UserId) -> bool {
        let mut state = self.write();
        state.index.remove(driver);
        state.drivers.remove(driver).is_some()
    }

    /// Overwrite the driver's position (last write wins). A driver who is not
    /// online is ignored with a warning; `false` is returned in that case.
    pub fn update_location(&self, driver: &UserId, point: GeoPoint, now: DateTime<Utc>) -> bool {
        let cell = match point.cell(self.resolution) {
            Ok(cell) => cell,
            Err(err) => {
                tracing::warn!(driver_id = %driver, error = %err, "ignoring malformed location update");
                return false;
            }
        };
        let mut state = self.write();
        let Some(entry) = state.drivers.get_mut(driver) else {
            tracing::warn!(driver_id = %driver, "location update from driver who is not online");
            return false;
        };
        entry.location = Some(point);
        entry.last_seen = now;
        state.index.place(driver, cell);
        true
    }

    pub fn is_online(&self, driver: &UserId) -> bool {
        self.read().drivers.contains_key(driver)
    }

    pub fn get(&self, driver: &UserId) -> Option<DriverPresence> {
        self.read().drivers.get(driver).cloned()
    }

    pub fn location_of(&self, driver: &UserId) -> Option<GeoPoint> {
        self.read().drivers.get(driver).and_then(|p| p.location)
    }

    /// Snapshot of every online driver, ordered by driver id.
    pub fn list_online(&self) -> Vec<DriverPresence> {
        let mut online: Vec<_> = self.read().drivers.values().cloned().collect();
        online.sort_by(|a, b| a.driver_id.cmp(&b.driver_id));
        online
    }

    pub fn online_count(&self) -> usize {
        self.read().drivers.len()
    }

    /// Online drivers with a known location whose Haversine distance from
    /// `origin` is at most `radius_km`, with that distance.
    ///
    /// The H3 disk is only a prefilter; inclusion is decided by
    /// `distance_km(origin, driver) <= radius_km`.
    pub fn drivers_near(&self, origin: GeoPoint, radius_km: f64) -> Vec<(UserId, f64)> {
        let state = self.read();
        let within = |driver: &UserId| -> Option<(UserId, f64)> {
            let location = state.drivers.get(driver)?.location?;
            let distance = distance_km(origin, location);
            crate::matching::within_radius(distance, radius_km).then(|| (driver.clone(), distance))
        };

        let indexed = state.index.len();
        let disk = origin.cell(self.resolution).ok().and_then(|cell| {
            let k = covering_grid_radius(cell, radius_km);
            // A disk larger than the population is slower than a full scan.
            (grid_disk_size(k) <= indexed as u64).then(|| cell.grid_disk::<Vec<_>>(k))
        });

        match disk {
            Some(cells) => state.index.drivers_in_cells(&cells).filter_map(within).collect(),
            None => state.drivers.keys().filter_map(within).collect(),
        }
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new(Resolution::Eight)
    }
}
