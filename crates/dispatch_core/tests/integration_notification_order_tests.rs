use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use dispatch_core::account::{
    AccountStore, InMemoryAccountStore, Rating, StoreResult, UserAccount, UserEntry,
};
use dispatch_core::config::DispatchConfig;
use dispatch_core::events::{Notification, NotificationSink};
use dispatch_core::geo::GeoPoint;
use dispatch_core::lifecycle::RideRequest;
use dispatch_core::ride::{Actor, Ride, RideId, UserId};
use dispatch_core::test_helpers::{
    dropoff_location, pickup_location, point_north_of_pickup, seeded_accounts, ManualClock,
};
use dispatch_core::LifecycleCoordinator;

const PROFILE_DELAY: Duration = Duration::from_millis(300);

type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, entry: String) {
    journal.lock().expect("journal").push(entry);
}

/// Account store whose profile reads stall once armed.
struct SlowProfiles {
    inner: InMemoryAccountStore,
    armed: AtomicBool,
    journal: Journal,
}

impl AccountStore for SlowProfiles {
    fn get_user(&self, user_id: &UserId) -> StoreResult<Option<UserAccount>> {
        if self.armed.load(Ordering::SeqCst) {
            record(&self.journal, format!("get_user:{user_id}"));
            thread::sleep(PROFILE_DELAY);
        }
        self.inner.get_user(user_id)
    }

    fn upsert_user(&self, account: UserAccount) -> StoreResult<()> {
        self.inner.upsert_user(account)
    }

    fn insert_user(&self, account: UserAccount) -> StoreResult<UserEntry> {
        self.inner.insert_user(account)
    }

    fn set_presence(
        &self,
        user_id: &UserId,
        online: bool,
        location: Option<GeoPoint>,
    ) -> StoreResult<()> {
        self.inner.set_presence(user_id, online, location)
    }

    fn append_history(&self, user_id: &UserId, ride: Ride) -> StoreResult<()> {
        self.inner.append_history(user_id, ride)
    }

    fn history(&self, user_id: &UserId) -> StoreResult<Vec<Ride>> {
        self.inner.history(user_id)
    }

    fn archived_ride(&self, ride_id: RideId) -> StoreResult<Option<Ride>> {
        self.inner.archived_ride(ride_id)
    }

    fn add_rating(&self, rating: Rating) -> StoreResult<()> {
        self.inner.add_rating(rating)
    }

    fn ratings_for(&self, user_id: &UserId) -> StoreResult<Vec<Rating>> {
        self.inner.ratings_for(user_id)
    }

    fn ratings_by(&self, user_id: &UserId) -> StoreResult<Vec<Rating>> {
        self.inner.ratings_by(user_id)
    }
}

/// Sink that journals deliveries and when they happened.
struct JournalSink {
    journal: Journal,
    delivered_at: Mutex<Vec<(String, Instant)>>,
}

impl NotificationSink for JournalSink {
    fn deliver(&self, notification: Notification) -> bool {
        let entry = format!(
            "deliver:{}:{}",
            notification.recipient,
            notification.event.kind()
        );
        self.delivered_at
            .lock()
            .expect("timestamps")
            .push((entry.clone(), Instant::now()));
        record(&self.journal, entry);
        true
    }
}

#[test]
fn losing_drivers_hear_taken_before_profile_reads() {
    let journal = Journal::default();
    let accounts = Arc::new(SlowProfiles {
        inner: seeded_accounts(1, 3),
        armed: AtomicBool::new(false),
        journal: journal.clone(),
    });
    let sink = Arc::new(JournalSink {
        journal: journal.clone(),
        delivered_at: Mutex::new(Vec::new()),
    });
    let coordinator = LifecycleCoordinator::builder()
        .config(DispatchConfig::default().with_pickup_code_seed(42))
        .clock(Arc::new(ManualClock::default()))
        .accounts(accounts.clone())
        .sink(sink.clone())
        .build()
        .expect("coordinator");

    let drivers: Vec<_> = (1..=3)
        .map(|i| {
            let driver = Actor::driver(format!("d{i}"));
            coordinator
                .go_online(&driver, Some(point_north_of_pickup(0.5 * i as f64)))
                .expect("online");
            driver
        })
        .collect();
    let ride = coordinator
        .create_ride(
            &Actor::rider("r1"),
            RideRequest {
                pickup: pickup_location(),
                dropoff: dropoff_location(),
                fare: Some(150.0),
                vehicle_class: None,
            },
        )
        .expect("ride");
    assert_eq!(ride.offered_to.len(), 3);

    journal.lock().expect("journal").clear();
    sink.delivered_at.lock().expect("timestamps").clear();
    accounts.armed.store(true, Ordering::SeqCst);
    let started = Instant::now();
    coordinator.accept_ride(&drivers[0], ride.id).expect("accept");

    let entries = journal.lock().expect("journal").clone();
    let first_read = entries
        .iter()
        .position(|entry| entry.starts_with("get_user:"))
        .expect("profiles were read");
    for loser in ["d2", "d3"] {
        let taken = format!("deliver:{loser}:ride_no_longer_available");
        let position = entries
            .iter()
            .position(|entry| *entry == taken)
            .unwrap_or_else(|| panic!("{loser} was not told: {entries:?}"));
        assert!(position < first_read, "{loser} waited on a profile read: {entries:?}");
    }

    let delivered_at = sink.delivered_at.lock().expect("timestamps");
    for (entry, at) in delivered_at.iter() {
        if entry.ends_with("ride_no_longer_available") {
            assert!(at.duration_since(started) < PROFILE_DELAY, "{entry} was late");
        }
    }
    assert!(delivered_at
        .iter()
        .any(|(entry, _)| entry == "deliver:r1:ride_accepted"));
    assert!(delivered_at
        .iter()
        .any(|(entry, _)| entry == "deliver:d1:ride_assigned"));
}
