#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use dispatch_core::config::DispatchConfig;
use dispatch_core::geo::GeoPoint;
use dispatch_core::lifecycle::RideRequest;
use dispatch_core::ride::{Actor, Ride};
use dispatch_core::test_helpers::{
    dropoff_location, pickup_location, seeded_accounts, ManualClock, RecordingSink,
};
use dispatch_core::LifecycleCoordinator;

/// Builder configuration for reproducible coordinators.
#[derive(Clone, Debug)]
pub struct TestDispatchConfig {
    pub riders: usize,
    pub drivers: usize,
    pub seed: u64,
    pub match_radius_km: f64,
    pub pickup_code_max_attempts: u32,
}

impl Default for TestDispatchConfig {
    fn default() -> Self {
        Self {
            riders: 2,
            drivers: 4,
            seed: 42,
            match_radius_km: 5.0,
            pickup_code_max_attempts: 5,
        }
    }
}

/// Wires a coordinator to a manual clock, seeded accounts, and a recording sink.
#[derive(Debug, Default)]
pub struct TestDispatchBuilder {
    config: TestDispatchConfig,
}

impl TestDispatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed riders `r1..=count`.
    pub fn with_riders(mut self, count: usize) -> Self {
        self.config.riders = count;
        self
    }

    /// Seed drivers `d1..=count`.
    pub fn with_drivers(mut self, count: usize) -> Self {
        self.config.drivers = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn with_match_radius_km(mut self, radius_km: f64) -> Self {
        self.config.match_radius_km = radius_km;
        self
    }

    pub fn with_pickup_code_max_attempts(mut self, attempts: u32) -> Self {
        self.config.pickup_code_max_attempts = attempts;
        self
    }

    pub fn build(self) -> TestDispatch {
        let clock = Arc::new(ManualClock::default());
        let sink = Arc::new(RecordingSink::new());
        let config = DispatchConfig::default()
            .with_match_radius_km(self.config.match_radius_km)
            .with_pickup_code_seed(self.config.seed)
            .with_pickup_code_max_attempts(self.config.pickup_code_max_attempts);
        let coordinator = LifecycleCoordinator::builder()
            .config(config)
            .clock(clock.clone())
            .accounts(Arc::new(seeded_accounts(self.config.riders, self.config.drivers)))
            .sink(sink.clone())
            .build()
            .expect("test coordinator");
        TestDispatch {
            coordinator,
            clock,
            sink,
        }
    }
}

pub struct TestDispatch {
    pub coordinator: LifecycleCoordinator,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
}

impl TestDispatch {
    pub fn online_driver(&self, id: &str, at: GeoPoint) -> Actor {
        let driver = Actor::driver(id);
        self.coordinator
            .go_online(&driver, Some(at))
            .expect("driver goes online");
        driver
    }

    /// Request the reference Bangalore trip with the formula fare.
    pub fn request_ride(&self, rider: &str) -> Ride {
        self.request_ride_with(rider, None)
    }

    pub fn request_ride_with(&self, rider: &str, fare: Option<f64>) -> Ride {
        self.coordinator
            .create_ride(
                &Actor::rider(rider),
                RideRequest {
                    pickup: pickup_location(),
                    dropoff: dropoff_location(),
                    fare,
                    vehicle_class: None,
                },
            )
            .expect("ride requested")
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(Duration::seconds(secs));
    }

    /// The pickup code the rider received when the ride was accepted.
    pub fn pickup_code_for(&self, rider: &str) -> String {
        self.sink
            .events_for(rider)
            .into_iter()
            .rev()
            .find_map(|event| match event {
                dispatch_core::events::RideEvent::RideAccepted { pickup_code, .. } => {
                    Some(pickup_code)
                }
                _ => None,
            })
            .expect("rider was sent a pickup code")
    }
}
