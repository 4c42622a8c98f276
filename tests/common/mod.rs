#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use snapcharge::{
    planner::{self, GeocodedPlace, Geocoder, RoadLeg, RoadRoute, RouteProvider},
    prelude::*,
    service,
    shared::{BoundingBox, polyline, time},
    trip::{AvailabilitySummary, RouteStationInfo, TripLeg, TripRoute},
};

pub const PUNE: (f64, f64) = (18.5204, 73.8567);
pub const BANER: (f64, f64) = (18.5590, 73.7868);
pub const HINJEWADI: (f64, f64) = (18.5912, 73.7389);

pub fn fixture_path() -> String {
    format!("{}/tests/fixtures/stations.csv", env!("CARGO_MANIFEST_DIR"))
}

pub fn repository() -> StationRepository {
    StationRepository::new()
        .load_csv_path(fixture_path())
        .expect("fixture loads")
}

pub fn home() -> DriverLocation {
    DriverLocation::new("Pune", PUNE.into())
}

pub fn place(label: &str, coordinate: (f64, f64)) -> LocationSearchResult {
    LocationSearchResult {
        label: label.to_string(),
        coordinate: coordinate.into(),
        availability: AvailabilitySummary::default(),
    }
}

pub fn route_points() -> Vec<Coordinate> {
    vec![PUNE.into(), BANER.into(), HINJEWADI.into()]
}

pub fn station(id: &str, coordinate: (f64, f64)) -> Station {
    Station {
        id: id.to_string(),
        host_name: "Host".into(),
        title: format!("Charger {id}"),
        location: "Pune".into(),
        rating: 4.5,
        review_count: 3,
        price_per_hour: 150,
        status: StationStatus::Available,
        connector_type: "Type 2".into(),
        power_output: "22 kW".into(),
        coordinate: coordinate.into(),
        supported_vehicle_types: vec![VehicleType::FourWheeler],
        ..Default::default()
    }
}

/// A one leg plan between the given stops with the given stations.
pub fn plan_for(stops: &[TripStop], station_ids: &[&str]) -> TripPlanResponse {
    let points: Vec<Coordinate> = stops.iter().map(|stop| stop.coordinate).collect();
    let legs = stops
        .windows(2)
        .map(|pair| TripLeg {
            from_label: pair[0].label.clone(),
            to_label: pair[1].label.clone(),
            distance_km: 7.5,
            duration_min: 15.0,
        })
        .collect::<Vec<_>>();
    let stations = station_ids
        .iter()
        .enumerate()
        .map(|(i, id)| RouteStationInfo {
            station: station(id, BANER),
            distance_to_route_km: 0.4,
            distance_from_start_km: 8.0 - i as f64,
            eta_from_start_min: 16.0 - i as f64,
            estimated_charge_min: 66,
            capacity_ports: 2,
            available_ports: 2,
        })
        .collect();
    TripPlanResponse {
        route: TripRoute {
            distance_km: 7.5 * legs.len() as f64,
            duration_min: 15.0 * legs.len() as f64,
            polyline: polyline::encode(&points),
            bbox: BoundingBox::from_coordinates(&points).unwrap_or(BoundingBox::from([0.0; 4])),
            legs,
        },
        stations,
    }
}

pub enum Reply<T> {
    Ok(T),
    Fail(String),
}

/// Scripted [`TripService`]: each call pops the next reply and waits for
/// its delay first. Calls beyond the script get an empty search or a plan
/// built from the request.
#[derive(Default)]
pub struct MockService {
    searches: Mutex<VecDeque<(Duration, Reply<Vec<LocationSearchResult>>)>>,
    plans: Mutex<VecDeque<(Duration, Reply<TripPlanResponse>)>>,
    pub search_calls: Mutex<Vec<String>>,
    pub plan_calls: Mutex<Vec<TripPlanRequest>>,
}

impl MockService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_search(&self, delay: Duration, reply: Reply<Vec<LocationSearchResult>>) {
        self.searches.lock().unwrap().push_back((delay, reply));
    }

    pub fn push_plan(&self, delay: Duration, reply: Reply<TripPlanResponse>) {
        self.plans.lock().unwrap().push_back((delay, reply));
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.lock().unwrap().len()
    }

    pub fn plan_count(&self) -> usize {
        self.plan_calls.lock().unwrap().len()
    }
}

fn failure(message: String) -> service::Error {
    snapcharge::client::Error::Api {
        status: 500,
        message,
    }
    .into()
}

#[async_trait]
impl TripService for MockService {
    async fn search_locations(
        &self,
        query: &str,
        _radius: Distance,
    ) -> Result<Vec<LocationSearchResult>, service::Error> {
        self.search_calls.lock().unwrap().push(query.to_string());
        let next = self.searches.lock().unwrap().pop_front();
        match next {
            Some((delay, reply)) => {
                tokio::time::sleep(delay).await;
                match reply {
                    Reply::Ok(results) => Ok(results),
                    Reply::Fail(message) => Err(failure(message)),
                }
            }
            None => Ok(Vec::new()),
        }
    }

    async fn plan_trip(&self, request: &TripPlanRequest) -> Result<TripPlanResponse, service::Error> {
        self.plan_calls.lock().unwrap().push(request.clone());
        let next = self.plans.lock().unwrap().pop_front();
        match next {
            Some((delay, reply)) => {
                tokio::time::sleep(delay).await;
                match reply {
                    Reply::Ok(plan) => Ok(plan),
                    Reply::Fail(message) => Err(failure(message)),
                }
            }
            None => Ok(plan_for(&request.stops, &[])),
        }
    }
}

/// Road router returning the fixed Pune, Baner, Hinjewadi line.
#[derive(Default)]
pub struct FixedRoutes {
    calls: Mutex<usize>,
}

impl FixedRoutes {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RouteProvider for FixedRoutes {
    async fn route(
        &self,
        stops: &[Coordinate],
        _vehicle_type: Option<VehicleType>,
    ) -> Result<RoadRoute, planner::Error> {
        *self.calls.lock().unwrap() += 1;
        let legs = stops.len().saturating_sub(1).max(1);
        let distance = Distance::from_meters(14_717.5);
        let duration = time::Duration::from_minutes(30);
        Ok(RoadRoute {
            distance,
            duration,
            polyline: polyline::encode(&route_points()),
            legs: (0..legs)
                .map(|_| RoadLeg {
                    distance: Distance::from_meters(distance.as_meters() / legs as f64),
                    duration: time::Duration::from_seconds(duration.as_seconds() / legs as u32),
                })
                .collect(),
        })
    }
}

pub struct FixedGeocoder(pub Vec<GeocodedPlace>);

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, _query: &str, limit: usize) -> Result<Vec<GeocodedPlace>, planner::Error> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}
