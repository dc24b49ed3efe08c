mod support;

use dispatch_core::geo::{distance_km, GeoPoint};
use dispatch_core::ride::Actor;
use dispatch_core::test_helpers::{pickup_point, point_north_of_pickup};
use dispatch_core::DispatchError;
use support::TestDispatchBuilder;

/// A point just under `km` from the pickup, found by bisection along the
/// meridian.
fn point_at_distance(km: f64) -> GeoPoint {
    let (mut lo, mut hi) = (km * 0.9, km * 1.1);
    for _ in 0..100 {
        let mid = (lo + hi) / 2.0;
        if distance_km(pickup_point(), point_north_of_pickup(mid)) < km {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    point_north_of_pickup(lo)
}

#[test]
fn radius_boundary_is_inclusive_on_both_paths() {
    let dispatch = TestDispatchBuilder::new().build();
    let inside = point_at_distance(5.0);
    let outside = point_at_distance(5.01);
    assert!(distance_km(pickup_point(), inside) <= 5.0);
    assert!(distance_km(pickup_point(), outside) > 5.0);

    let edge = dispatch.online_driver("d1", inside);
    let beyond = dispatch.online_driver("d2", outside);

    let candidates = dispatch.coordinator.matching().find_candidates(pickup_point());
    let ids: Vec<_> = candidates.iter().map(|c| c.driver_id.as_str()).collect();
    assert_eq!(ids, ["d1"]);

    dispatch.request_ride("r1");
    assert_eq!(dispatch.sink.kinds_for("d1"), ["ride_available"]);
    assert!(dispatch.sink.kinds_for("d2").is_empty());

    // The pull path uses the same predicate and agrees.
    assert_eq!(dispatch.coordinator.pending_rides(&edge).expect("pending").len(), 1);
    assert!(dispatch.coordinator.pending_rides(&beyond).expect("pending").is_empty());
}

#[test]
fn candidates_are_ordered_by_distance() {
    let dispatch = TestDispatchBuilder::new().build();
    dispatch.online_driver("d3", point_north_of_pickup(3.0));
    dispatch.online_driver("d1", point_north_of_pickup(4.5));
    dispatch.online_driver("d2", point_north_of_pickup(0.5));

    let candidates = dispatch.coordinator.matching().find_candidates(pickup_point());
    let ids: Vec<_> = candidates.iter().map(|c| c.driver_id.as_str()).collect();
    assert_eq!(ids, ["d2", "d3", "d1"]);
    assert!(candidates
        .windows(2)
        .all(|pair| pair[0].distance_km <= pair[1].distance_km));
}

#[test]
fn offline_and_unlocated_drivers_are_not_candidates() {
    let dispatch = TestDispatchBuilder::new().build();
    let gone = dispatch.online_driver("d1", point_north_of_pickup(1.0));
    dispatch
        .coordinator
        .go_offline(&gone)
        .expect("offline");
    dispatch
        .coordinator
        .go_online(&Actor::driver("d2"), None)
        .expect("online without location");

    assert!(dispatch
        .coordinator
        .matching()
        .find_candidates(pickup_point())
        .is_empty());

    let ride = dispatch.request_ride("r1");
    assert_eq!(dispatch.sink.all().len(), 1, "only the rider acknowledgement");
    assert!(matches!(
        dispatch.coordinator.pending_rides(&Actor::driver("d2")),
        Err(DispatchError::InvalidInput { .. })
    ));
    assert!(matches!(
        dispatch.coordinator.pending_rides(&gone),
        Err(DispatchError::DriverOffline { .. })
    ));
    assert!(dispatch.coordinator.rides().contains(ride.id));
}

#[test]
fn driver_coming_online_later_pulls_waiting_ride_and_hears_when_taken() {
    let dispatch = TestDispatchBuilder::new().build();
    let early = dispatch.online_driver("d1", point_north_of_pickup(1.0));
    let ride = dispatch.request_ride("r1");

    let late = dispatch.online_driver("d2", point_north_of_pickup(2.0));
    let pending = dispatch.coordinator.pending_rides(&late).expect("pending");
    assert_eq!(pending.len(), 1);

    dispatch
        .coordinator
        .accept_ride(&early, ride.id)
        .expect("accept");
    assert_eq!(
        dispatch.sink.kinds_for("d2").last(),
        Some(&"ride_no_longer_available")
    );
    assert!(dispatch
        .coordinator
        .pending_rides(&late)
        .expect("pending")
        .is_empty());
}

#[test]
fn online_and_offline_are_idempotent() {
    let dispatch = TestDispatchBuilder::new().build();
    let driver = dispatch.online_driver("d1", point_north_of_pickup(1.0));
    dispatch
        .coordinator
        .go_online(&driver, None)
        .expect("online again");
    assert_eq!(dispatch.coordinator.online_drivers().len(), 1);
    assert_eq!(
        dispatch.coordinator.presence().location_of(&driver.user_id),
        Some(point_north_of_pickup(1.0))
    );

    assert!(dispatch.coordinator.go_offline(&driver).expect("offline"));
    assert!(!dispatch.coordinator.go_offline(&driver).expect("offline again"));
    assert!(dispatch.coordinator.online_drivers().is_empty());
}
