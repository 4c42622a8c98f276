//! Matching stations against a route corridor.
//!
//! A station is on the route when its distance to the route polyline is at
//! most the corridor half width. Its position along the trip is the
//! cumulative polyline length up to its nearest point on the route.

use rayon::prelude::*;

use crate::{
    repository::{Station, VehicleType},
    shared::{
        geo::{BoundingBox, Coordinate, Distance, project_onto_segment},
        round_to,
        time::Duration,
    },
    trip::{RouteStationInfo, estimate, sort_by_distance_from_start},
};

pub const DEFAULT_CORRIDOR: Distance = Distance::from_kilometers(2.0);

/// Where a point sits relative to a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePosition {
    pub distance_to_route: Distance,
    pub distance_from_start: Distance,
}

/// A decoded route polyline with its cumulative lengths.
#[derive(Debug, Clone, Default)]
pub struct RouteGeometry {
    points: Vec<Coordinate>,
    /// `cumulative[i]` is the along-route length from the first point to point `i`.
    cumulative: Vec<Distance>,
}

impl RouteGeometry {
    pub fn new(points: Vec<Coordinate>) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = Distance::ZERO;
        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                total += points[i - 1].distance(point);
            }
            cumulative.push(total);
        }
        Self { points, cumulative }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn length(&self) -> Distance {
        self.cumulative.last().copied().unwrap_or_default()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_coordinates(&self.points)
    }

    /// Nearest point of the route to `point`. None for an empty route.
    pub fn locate(&self, point: &Coordinate) -> Option<RoutePosition> {
        match self.points.as_slice() {
            [] => None,
            [only] => Some(RoutePosition {
                distance_to_route: only.distance(point),
                distance_from_start: Distance::ZERO,
            }),
            points => points
                .windows(2)
                .enumerate()
                .map(|(i, segment)| {
                    let projection = project_onto_segment(point, &segment[0], &segment[1]);
                    let segment_length = self.cumulative[i + 1] - self.cumulative[i];
                    RoutePosition {
                        distance_to_route: projection.distance,
                        distance_from_start: self.cumulative[i]
                            + segment_length * projection.fraction,
                    }
                })
                // Earliest segment wins ties, so a station at a shared vertex
                // gets the smaller along-route distance.
                .reduce(|best, candidate| {
                    if candidate.distance_to_route < best.distance_to_route {
                        candidate
                    } else {
                        best
                    }
                }),
        }
    }
}

/// Totals reported by the routing engine, used to turn distance into ETA.
#[derive(Debug, Clone, Copy)]
pub struct RouteTotals {
    pub distance: Distance,
    pub duration: Duration,
}

impl RouteTotals {
    /// Minutes to cover `distance` at the route's average speed.
    pub fn eta(&self, distance: Distance) -> f64 {
        if self.distance.as_meters() <= 0.0 {
            return 0.0;
        }
        (distance / self.distance) * self.duration.as_minutes()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CorridorMatcher {
    corridor: Distance,
    vehicle_type: Option<VehicleType>,
}

impl CorridorMatcher {
    pub fn new(corridor: Distance) -> Self {
        Self {
            corridor,
            vehicle_type: None,
        }
    }

    pub fn for_vehicle(mut self, vehicle_type: Option<VehicleType>) -> Self {
        self.vehicle_type = vehicle_type;
        self
    }

    pub fn corridor(&self) -> Distance {
        self.corridor
    }

    /// Annotates the stations inside the corridor and orders them by
    /// distance from start, then by id.
    pub fn match_stations<'a, I>(
        &self,
        stations: I,
        geometry: &RouteGeometry,
        totals: RouteTotals,
    ) -> Vec<RouteStationInfo>
    where
        I: IntoParallelIterator<Item = &'a Station>,
    {
        if geometry.is_empty() {
            return Vec::new();
        }
        let corridor_km = self.corridor.as_kilometers();
        let mut matches: Vec<_> = stations
            .into_par_iter()
            .filter_map(|station| {
                let position = geometry.locate(&station.coordinate)?;
                if position.distance_to_route > self.corridor {
                    return None;
                }
                let power_kw = station.power_kw();
                let capacity_ports = estimate::estimate_capacity_ports(power_kw);
                Some(RouteStationInfo {
                    station: station.clone(),
                    distance_to_route_km: round_to(
                        position.distance_to_route.as_kilometers(),
                        2,
                    )
                    .min(corridor_km),
                    distance_from_start_km: round_to(
                        position.distance_from_start.as_kilometers(),
                        2,
                    ),
                    eta_from_start_min: round_to(totals.eta(position.distance_from_start), 1),
                    estimated_charge_min: estimate::estimate_charge_minutes(
                        power_kw,
                        self.vehicle_type,
                    ),
                    capacity_ports,
                    available_ports: estimate::available_ports(station, capacity_ports),
                })
            })
            .collect();
        sort_by_distance_from_start(&mut matches);
        matches
    }
}

impl Default for CorridorMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CORRIDOR)
    }
}
