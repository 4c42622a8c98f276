use std::collections::HashMap;

mod entities;
pub mod source;
pub use entities::*;
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::{
    shared::geo::{BoundingBox, Coordinate, Distance},
    trip::AvailabilitySummary,
};

/// Edge length of the buckets used by the coordinate lookup.
pub const CELL_SIZE: Distance = Distance::from_kilometers(1.0);

type IdToIndex = HashMap<String, usize>;
type CellToIndexes = HashMap<(i32, i32), Vec<usize>>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid station row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
    #[error("Station id does not match any entry: {0}")]
    UnknownStation(String),
}

/// Driver side search filters, named the way the marketplace exposes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTag {
    /// At least 11 kW.
    FastCharge,
    /// Connector mentions "type 2".
    Type2,
    /// Cheaper than 200 per hour.
    Under200,
}

impl FilterTag {
    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "fast_charge" => Some(Self::FastCharge),
            "type_2" => Some(Self::Type2),
            "under_200" => Some(Self::Under200),
            _ => None,
        }
    }

    pub const fn id(&self) -> &'static str {
        match self {
            Self::FastCharge => "fast_charge",
            Self::Type2 => "type_2",
            Self::Under200 => "under_200",
        }
    }

    pub fn matches(&self, station: &Station) -> bool {
        match self {
            Self::FastCharge => station.power_kw() >= 11.0,
            Self::Type2 => station.connector_type.to_lowercase().contains("type 2"),
            Self::Under200 => station.price_per_hour < 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StationQuery {
    pub center: Coordinate,
    pub radius: Distance,
    pub status: Option<StationStatus>,
    pub vehicle_type: Option<VehicleType>,
    pub tags: Vec<FilterTag>,
    /// Case insensitive substring over title, location and host name.
    pub text: Option<String>,
}

impl StationQuery {
    pub fn new(center: Coordinate, radius: Distance) -> Self {
        Self {
            center,
            radius,
            status: None,
            vehicle_type: None,
            tags: Vec::new(),
            text: None,
        }
    }

    fn matches(&self, station: &Station, needle: Option<&str>) -> bool {
        if self.status.is_some_and(|status| station.status != status) {
            return false;
        }
        if self
            .vehicle_type
            .is_some_and(|vehicle| !station.supports(vehicle))
        {
            return false;
        }
        if let Some(needle) = needle
            && !(station.title.to_lowercase().contains(needle)
                || station.location.to_lowercase().contains(needle)
                || station.host_name.to_lowercase().contains(needle))
        {
            return false;
        }
        self.tags.iter().all(|tag| tag.matches(station))
    }
}

/// In-memory store of listed chargers with a coarse spatial index.
#[derive(Debug, Clone, Default)]
pub struct StationRepository {
    stations: Vec<Station>,
    station_lookup: IdToIndex,
    cells: CellToIndexes,
}

impl StationRepository {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_stations<I>(mut self, stations: I) -> Self
    where
        I: IntoIterator<Item = Station>,
    {
        stations.into_iter().for_each(|station| {
            self.upsert(station);
        });
        self
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Inserts a station or replaces the one with the same id.
    /// Returns the internal index of the stored station.
    pub fn upsert(&mut self, station: Station) -> usize {
        let cell = station.coordinate.to_grid(CELL_SIZE);
        if let Some(&index) = self.station_lookup.get(&station.id) {
            let old_cell = self.stations[index].coordinate.to_grid(CELL_SIZE);
            if old_cell != cell {
                if let Some(indexes) = self.cells.get_mut(&old_cell) {
                    indexes.retain(|i| *i != index);
                }
                self.cells.entry(cell).or_default().push(index);
            }
            self.stations[index] = station;
            index
        } else {
            let index = self.stations.len();
            self.station_lookup.insert(station.id.clone(), index);
            self.cells.entry(cell).or_default().push(index);
            self.stations.push(station);
            index
        }
    }

    /// Get a station with the given id.
    /// If no station is found with the given id None is returned.
    pub fn station_by_id(&self, id: &str) -> Option<&Station> {
        let index = self.station_lookup.get(id)?;
        Some(&self.stations[*index])
    }

    pub fn set_status(&mut self, id: &str, status: StationStatus) -> Result<(), self::Error> {
        let index = self.index_of(id)?;
        self.stations[index].status = status;
        Ok(())
    }

    /// Marks a slot as taken. Booking the same slot twice is a no-op.
    pub fn book_slot(&mut self, id: &str, slot: &str) -> Result<(), self::Error> {
        let index = self.index_of(id)?;
        let station = &mut self.stations[index];
        if !station.is_slot_booked(slot) {
            station.booked_time_slots.push(slot.trim().to_string());
        }
        Ok(())
    }

    fn index_of(&self, id: &str) -> Result<usize, self::Error> {
        self.station_lookup
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownStation(id.to_string()))
    }

    /// Returns stations within `distance` of the coordinate, paired with
    /// their great-circle distance.
    pub fn stations_by_coordinate(
        &self,
        coordinate: &Coordinate,
        distance: Distance,
    ) -> Vec<(&Station, Distance)> {
        let (origin_x, origin_y) = coordinate.to_grid(CELL_SIZE);
        // Longitude cells shrink towards the poles, so the x reach grows with latitude.
        let shrink = f64::to_radians(coordinate.latitude.abs().min(89.0)).cos();
        let reach_y = (distance / CELL_SIZE).ceil() + 1.0;
        let reach_x = (distance / CELL_SIZE / shrink).ceil() + 1.0;

        // Past one cell per station a plain scan is cheaper than the grid walk.
        let cells = (2.0 * reach_x + 1.0) * (2.0 * reach_y + 1.0);
        if !cells.is_finite() || cells > self.stations.len() as f64 {
            return self
                .stations
                .par_iter()
                .filter_map(|station| {
                    let between = station.coordinate.distance(coordinate);
                    (between <= distance).then_some((station, between))
                })
                .collect();
        }
        let (reach_x, reach_y) = (reach_x as i32, reach_y as i32);

        (-reach_x..=reach_x)
            .into_par_iter()
            .flat_map(|x| {
                (-reach_y..=reach_y)
                    .flat_map(move |y| {
                        let cell = (origin_x + x, origin_y + y);
                        self.cells
                            .get(&cell)
                            .map(|indexes| {
                                indexes
                                    .iter()
                                    .filter_map(|index| {
                                        let station = &self.stations[*index];
                                        let between = station.coordinate.distance(coordinate);
                                        (between <= distance).then_some((station, between))
                                    })
                                    .collect::<Vec<_>>()
                            })
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Stations whose position falls inside the box.
    pub fn stations_in_bounds(&self, bounds: &BoundingBox) -> Vec<&Station> {
        self.stations
            .par_iter()
            .filter(|station| bounds.contains(&station.coordinate))
            .collect()
    }

    /// Counts stations by status around a coordinate.
    pub fn availability_summary(
        &self,
        coordinate: &Coordinate,
        radius: Distance,
    ) -> AvailabilitySummary {
        self.stations_by_coordinate(coordinate, radius)
            .into_iter()
            .fold(AvailabilitySummary::default(), |mut summary, (station, _)| {
                summary.record(station.status);
                summary
            })
    }

    /// Driver station search. Results are ordered nearest first and carry a
    /// display distance such as "2.4 km".
    pub fn search(&self, query: &StationQuery) -> Vec<Station> {
        let needle = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase);
        let mut hits: Vec<_> = self
            .stations_by_coordinate(&query.center, query.radius)
            .into_par_iter()
            .filter(|(station, _)| query.matches(station, needle.as_deref()))
            .collect();
        hits.par_sort_by(|(a, da), (b, db)| {
            da.as_meters()
                .total_cmp(&db.as_meters())
                .then_with(|| a.id.cmp(&b.id))
        });
        debug!(
            "Station search around {} matched {} stations",
            query.center,
            hits.len()
        );
        hits.into_iter()
            .map(|(station, distance)| {
                let mut station = station.clone();
                station.distance = Some(format!("{:.1} km", distance.as_kilometers()));
                station
            })
            .collect()
    }
}
