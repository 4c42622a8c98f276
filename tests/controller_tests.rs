mod common;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use common::*;
use snapcharge::{
    controller::{PLAN_FAILED_MESSAGE, TIMEOUT_MESSAGE},
    prelude::*,
    trip::StopSource,
};

fn controller(service: Arc<MockService>) -> TripPanelController {
    let config = ControllerConfig {
        error_display: None,
        ..Default::default()
    };
    TripPanelController::new(service, home(), config)
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(2)).await;
}

#[tokio::test(start_paused = true)]
async fn starts_with_current_location() {
    let service = MockService::new();
    let panel = controller(service.clone());
    let state = panel.snapshot();
    assert_eq!(state.stops.len(), 1);
    assert_eq!(state.stops[0].label, "Pune");
    assert_eq!(state.stops[0].source, StopSource::Current);
    assert_eq!(state.phase(), Phase::Idle);
    settle().await;
    assert_eq!(service.plan_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn adding_a_destination_plans_the_trip() {
    let service = MockService::new();
    let stops = vec![
        TripStop::from(&home()),
        TripStop::from(&place("Hinjewadi", HINJEWADI)),
    ];
    service.push_plan(
        Duration::from_millis(50),
        common::Reply::Ok(plan_for(&stops, &["st-b", "st-a"])),
    );
    let panel = controller(service.clone());
    let notified = Arc::new(Mutex::new(Vec::new()));
    let sink = notified.clone();
    panel.set_plan_listener(move |plan, stops| {
        sink.lock()
            .unwrap()
            .push((plan.map(|plan| plan.route.legs.len()), stops.len()));
    });
    let mut rx = panel.subscribe();

    panel.add_stop(&place("Hinjewadi", HINJEWADI));
    assert_eq!(panel.snapshot().phase(), Phase::Planning);

    let state = rx
        .wait_for(|state| state.plan.is_some())
        .await
        .unwrap()
        .clone();
    assert_eq!(state.route_legs().len(), 1);
    assert_eq!(state.route_stations().len(), 2);
    // sorted by distance from start
    assert_eq!(state.route_stations()[0].station.id, "st-a");
    assert!(!state.is_planning);
    assert_eq!(state.plan_error, None);

    let calls = service.plan_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].stops.len(), 2);
    assert_eq!(calls[0].vehicle_type, Some(VehicleType::FourWheeler));
    assert_eq!(calls[0].corridor_km, Some(2.0));
    assert_eq!(*notified.lock().unwrap(), vec![(Some(1), 2)]);
}

#[tokio::test(start_paused = true)]
async fn empty_search_result_is_not_an_error() {
    let service = MockService::new();
    service.push_search(Duration::from_millis(20), common::Reply::Ok(Vec::new()));
    let panel = controller(service.clone());
    let mut rx = panel.subscribe();

    panel.set_query("Baner");
    assert_eq!(panel.snapshot().phase(), Phase::Searching);
    let state = rx
        .wait_for(|state| !state.is_searching)
        .await
        .unwrap()
        .clone();
    assert!(state.results.is_empty());
    assert_eq!(state.search_error, None);
    assert_eq!(*service.search_calls.lock().unwrap(), vec!["Baner"]);

    settle().await;
    assert_eq!(service.plan_count(), 0);
    assert!(panel.snapshot().plan.is_none());
}

#[tokio::test(start_paused = true)]
async fn typing_is_debounced() {
    let service = MockService::new();
    service.push_search(
        Duration::ZERO,
        common::Reply::Ok(vec![place("Baner, Pune", BANER)]),
    );
    let panel = controller(service.clone());

    panel.set_query("B");
    tokio::time::sleep(Duration::from_millis(100)).await;
    panel.set_query("Ba");
    tokio::time::sleep(Duration::from_millis(100)).await;
    panel.set_query("Baner ");
    settle().await;

    assert_eq!(*service.search_calls.lock().unwrap(), vec!["Baner"]);
    let state = panel.snapshot();
    assert_eq!(state.query, "Baner ");
    assert_eq!(state.results.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn blank_query_clears_without_a_request() {
    let service = MockService::new();
    service.push_search(
        Duration::ZERO,
        common::Reply::Ok(vec![place("Baner, Pune", BANER)]),
    );
    let panel = controller(service.clone());
    panel.set_query("Baner");
    settle().await;
    assert_eq!(panel.snapshot().results.len(), 1);

    panel.set_query("   ");
    let state = panel.snapshot();
    assert!(state.results.is_empty());
    assert_eq!(state.phase(), Phase::Idle);
    settle().await;
    assert_eq!(service.search_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_search_results_are_dropped() {
    let service = MockService::new();
    // first request resolves last
    service.push_search(
        Duration::from_secs(3),
        common::Reply::Ok(vec![place("Aundh", (18.558, 73.8075))]),
    );
    service.push_search(
        Duration::from_millis(10),
        common::Reply::Ok(vec![place("Baner, Pune", BANER)]),
    );
    let panel = controller(service.clone());

    panel.set_query("Aundh");
    // let the first request leave, then supersede it while in flight
    tokio::time::sleep(Duration::from_millis(500)).await;
    panel.set_query("Baner");
    tokio::time::sleep(Duration::from_secs(5)).await;

    let state = panel.snapshot();
    assert_eq!(service.search_count(), 2);
    assert_eq!(state.results.len(), 1);
    assert_eq!(state.results[0].label, "Baner, Pune");
    assert!(!state.is_searching);
}

#[tokio::test(start_paused = true)]
async fn stale_plan_is_dropped() {
    let service = MockService::new();
    let first = vec![
        TripStop::from(&home()),
        TripStop::from(&place("Baner", BANER)),
    ];
    let second = vec![
        TripStop::from(&home()),
        TripStop::from(&place("Baner", BANER)),
        TripStop::from(&place("Hinjewadi", HINJEWADI)),
    ];
    service.push_plan(
        Duration::from_secs(3),
        common::Reply::Ok(plan_for(&first, &["st-old"])),
    );
    service.push_plan(
        Duration::from_millis(10),
        common::Reply::Ok(plan_for(&second, &["st-new"])),
    );
    let panel = controller(service.clone());

    panel.add_stop(&place("Baner", BANER));
    tokio::time::sleep(Duration::from_millis(500)).await;
    panel.add_stop(&place("Hinjewadi", HINJEWADI));
    tokio::time::sleep(Duration::from_secs(5)).await;

    let state = panel.snapshot();
    assert_eq!(service.plan_count(), 2);
    assert_eq!(state.route_legs().len(), 2);
    assert_eq!(state.route_stations()[0].station.id, "st-new");
}

#[tokio::test(start_paused = true)]
async fn failed_plan_keeps_the_stops() {
    let service = MockService::new();
    service.push_plan(
        Duration::from_millis(10),
        common::Reply::Fail("Routing service unavailable".into()),
    );
    let panel = controller(service.clone());
    let mut rx = panel.subscribe();

    panel.add_stop(&place("Hinjewadi", HINJEWADI));
    let before = panel.snapshot().stops;
    let state = rx
        .wait_for(|state| !state.is_planning)
        .await
        .unwrap()
        .clone();

    assert!(state.plan.is_none());
    assert_eq!(state.plan_error.as_deref(), Some("Routing service unavailable"));
    assert_eq!(state.stops, before);
    assert_eq!(state.stops.len(), 2);

    panel.dismiss_plan_error();
    assert_eq!(panel.snapshot().plan_error, None);
}

#[tokio::test(start_paused = true)]
async fn slow_plan_times_out() {
    let service = MockService::new();
    service.push_plan(
        Duration::from_secs(60),
        common::Reply::Ok(plan_for(&[], &[])),
    );
    let panel = controller(service.clone());
    let mut rx = panel.subscribe();

    panel.add_stop(&place("Hinjewadi", HINJEWADI));
    let state = rx
        .wait_for(|state| !state.is_planning)
        .await
        .unwrap()
        .clone();
    assert!(state.plan.is_none());
    assert_eq!(state.plan_error.as_deref(), Some(TIMEOUT_MESSAGE));
    assert_ne!(PLAN_FAILED_MESSAGE, TIMEOUT_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn dropping_below_two_stops_clears_the_plan() {
    let service = MockService::new();
    let panel = controller(service.clone());
    let notified = Arc::new(Mutex::new(Vec::new()));
    let sink = notified.clone();
    panel.set_plan_listener(move |plan, stops| {
        sink.lock().unwrap().push((plan.is_some(), stops.len()));
    });

    panel.add_stop(&place("Hinjewadi", HINJEWADI));
    settle().await;
    assert!(panel.snapshot().plan.is_some());

    panel.remove_stop(1);
    let state = panel.snapshot();
    assert!(state.plan.is_none());
    assert!(!state.is_planning);
    assert_eq!(state.stops.len(), 1);
    settle().await;
    assert_eq!(service.plan_count(), 1);
    assert_eq!(*notified.lock().unwrap(), vec![(true, 2), (false, 1)]);
}

#[tokio::test(start_paused = true)]
async fn no_op_edits_do_not_replan() {
    let service = MockService::new();
    let panel = controller(service.clone());
    panel.add_stop(&place("Hinjewadi", HINJEWADI));
    settle().await;
    assert_eq!(service.plan_count(), 1);

    panel.move_stop(0, Direction::Up);
    panel.move_stop(1, Direction::Down);
    panel.remove_stop(0);
    panel.set_vehicle_type(VehicleType::FourWheeler);
    settle().await;
    assert_eq!(service.plan_count(), 1);

    panel.set_vehicle_type(VehicleType::TwoWheeler);
    settle().await;
    let calls = service.plan_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].vehicle_type, Some(VehicleType::TwoWheeler));
}

#[tokio::test(start_paused = true)]
async fn picking_a_result_clears_the_search() {
    let service = MockService::new();
    service.push_search(
        Duration::ZERO,
        common::Reply::Ok(vec![place("Baner, Pune", BANER)]),
    );
    let panel = controller(service.clone());
    panel.set_query("Baner");
    settle().await;

    let result = panel.snapshot().results[0].clone();
    panel.set_start(&result);
    let state = panel.snapshot();
    assert_eq!(state.query, "");
    assert!(state.results.is_empty());
    assert_eq!(state.stops[0].label, "Baner, Pune");
    assert_eq!(state.stops[0].source, StopSource::Search);

    panel.reset_start();
    let state = panel.snapshot();
    assert_eq!(state.stops[0].label, "Pune");
    assert_eq!(state.stops[0].source, StopSource::Current);
}

#[tokio::test(start_paused = true)]
async fn search_errors_clear_themselves() {
    let service = MockService::new();
    service.push_search(
        Duration::ZERO,
        common::Reply::Fail("Geocoder is down".into()),
    );
    let config = ControllerConfig {
        error_display: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let panel = TripPanelController::new(service.clone(), home(), config);

    panel.set_query("Baner");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        panel.snapshot().search_error.as_deref(),
        Some("Geocoder is down")
    );
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(panel.snapshot().search_error, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_notification_matches_final_stops() {
    let service = MockService::new();
    let config = ControllerConfig {
        debounce: Duration::ZERO,
        error_display: None,
        ..Default::default()
    };
    let panel = TripPanelController::new(service.clone(), home(), config);
    let notified = Arc::new(Mutex::new(Vec::new()));
    let sink = notified.clone();
    panel.set_plan_listener(move |plan, stops| {
        sink.lock().unwrap().push((plan.is_some(), stops.to_vec()));
    });

    for round in 0..200 {
        panel.add_stop(&place("Hinjewadi", HINJEWADI));
        if round % 3 == 0 {
            tokio::task::yield_now().await;
        }
        panel.remove_stop(1);
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let state = panel.snapshot();
    assert!(!state.is_planning);
    assert!(state.plan.is_none());
    let notified = notified.lock().unwrap();
    let (has_plan, stops) = notified.last().unwrap();
    assert!(!has_plan);
    assert_eq!(stops, &state.stops.to_vec());
}
