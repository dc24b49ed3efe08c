mod support;

use dispatch_core::events::RideEvent;
use dispatch_core::ride::{Actor, RideStatus, UserId};
use dispatch_core::test_helpers::{pickup_point, point_north_of_pickup, DROPOFF_LAT, PICKUP_LAT};
use support::TestDispatchBuilder;

/// MG Road to Indiranagar with one driver 2 km away and one 8 km away.
#[test]
fn bangalore_trip_is_offered_to_the_near_driver_only() {
    let dispatch = TestDispatchBuilder::new().build();
    let near = dispatch.online_driver("d1", point_north_of_pickup(2.0));
    let far = dispatch.online_driver("d2", pickup_point().offset_km(0.0, 8.0));

    let ride = dispatch.request_ride_with("r1", Some(120.0));
    assert_eq!(ride.fare, 120.0);
    assert_eq!(ride.vehicle_class, "Standard Car");
    assert_eq!(ride.pickup.lat, PICKUP_LAT);
    assert_eq!(ride.dropoff.lat, DROPOFF_LAT);

    let offers = dispatch.sink.events_for("d1");
    assert_eq!(offers.len(), 1);
    match &offers[0] {
        RideEvent::RideAvailable { ride: offered, distance_km } => {
            assert_eq!(offered.id, ride.id);
            assert!((distance_km - 2.0).abs() < 0.01, "distance {distance_km}");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(dispatch.sink.events_for("d2").is_empty());
    assert!(dispatch.coordinator.pending_rides(&far).expect("pending").is_empty());

    let accepted = dispatch
        .coordinator
        .accept_ride(&near, ride.id)
        .expect("accept");
    assert_eq!(accepted.driver, Some(UserId::from("d1")));

    let code = dispatch.pickup_code_for("r1");
    assert!(dispatch
        .coordinator
        .verify_pickup_code(&near, ride.id, &code)
        .expect("verify")
        .matched);
    let completed = dispatch
        .coordinator
        .complete_ride(&near, ride.id)
        .expect("complete");
    assert_eq!(completed.status, RideStatus::Completed);

    let earnings = dispatch.coordinator.earnings(&near).expect("earnings");
    assert_eq!(earnings.completed_rides, 1);
    assert_eq!(earnings.total, 120.0);
    assert_eq!(
        dispatch
            .coordinator
            .history(&Actor::rider("r1"))
            .expect("history")
            .len(),
        1
    );
}

#[test]
fn omitted_fare_is_quoted_from_distance() {
    let dispatch = TestDispatchBuilder::new().build();
    let ride = dispatch.request_ride("r1");
    // 30 base + ~4.6 km at 12/km.
    assert!(ride.fare > 80.0 && ride.fare < 90.0, "fare {}", ride.fare);
    assert_eq!((ride.fare * 100.0).round() / 100.0, ride.fare);
}
