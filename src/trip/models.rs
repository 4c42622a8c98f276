use serde::{Deserialize, Serialize};

use crate::{
    repository::{Station, StationStatus, VehicleType},
    shared::geo::{BoundingBox, Coordinate},
};

/// Where a stop came from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopSource {
    /// The driver's current (or default) location.
    Current,
    /// Picked from location search results.
    #[default]
    Search,
}

/// A waypoint of a planned trip. Identity is its position in the stop list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStop {
    pub label: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub source: StopSource,
}

impl TripStop {
    pub fn new(label: impl Into<String>, coordinate: Coordinate, source: StopSource) -> Self {
        Self {
            label: label.into(),
            coordinate,
            source,
        }
    }
}

/// The driver's default position, usually the configured home city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverLocation {
    pub name: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
}

impl DriverLocation {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinate,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySummary {
    pub available: u32,
    pub busy: u32,
    pub offline: u32,
    pub total: u32,
}

impl AvailabilitySummary {
    pub fn record(&mut self, status: StationStatus) {
        match status {
            StationStatus::Available => self.available += 1,
            StationStatus::Busy => self.busy += 1,
            StationStatus::Offline => self.offline += 1,
        }
        self.total += 1;
    }
}

/// A candidate place returned by location search. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSearchResult {
    pub label: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub availability: AvailabilitySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlanRequest {
    pub stops: Vec<TripStop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,
    /// Half width of the search corridor around the route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corridor_km: Option<f64>,
}

/// Route section between two consecutive stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripLeg {
    pub from_label: String,
    pub to_label: String,
    pub distance_km: f64,
    pub duration_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRoute {
    pub distance_km: f64,
    pub duration_min: f64,
    /// Encoded polyline, precision 5.
    pub polyline: String,
    pub bbox: BoundingBox,
    /// One entry per consecutive stop pair.
    pub legs: Vec<TripLeg>,
}

/// A station along the route with metrics relative to the trip start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStationInfo {
    pub station: Station,
    pub distance_to_route_km: f64,
    /// Along-route distance from the first stop to the station's nearest
    /// point on the route.
    pub distance_from_start_km: f64,
    pub eta_from_start_min: f64,
    pub estimated_charge_min: u32,
    pub capacity_ports: u32,
    pub available_ports: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlanResponse {
    pub route: TripRoute,
    pub stations: Vec<RouteStationInfo>,
}

impl TripPlanResponse {
    /// Orders stations by distance from start, then by id.
    pub fn sort_stations(&mut self) {
        sort_by_distance_from_start(&mut self.stations);
    }
}

pub(crate) fn sort_by_distance_from_start(stations: &mut [RouteStationInfo]) {
    stations.sort_by(|a, b| {
        a.distance_from_start_km
            .total_cmp(&b.distance_from_start_km)
            .then_with(|| a.station.id.cmp(&b.station.id))
    });
}
