use crate::{
    repository::{self, Station, StationRepository, StationStatus, VehicleType},
    shared::geo::Coordinate,
};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Read, path::Path, time::Instant};
use tracing::{debug, warn};

/// One row of a station fixture file.
///
/// `supported_vehicle_types` and `booked_time_slots` hold `|` separated lists.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CsvStation {
    pub id: String,
    pub host_name: String,
    pub title: String,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    pub status: Option<String>,
    pub connector_type: String,
    pub power_output: String,
    pub price_per_hour: u32,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub supported_vehicle_types: Option<String>,
    pub booked_time_slots: Option<String>,
    pub phone_number: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl TryFrom<CsvStation> for Station {
    type Error = String;

    fn try_from(value: CsvStation) -> Result<Self, Self::Error> {
        let status = match value.status.as_deref().map(str::trim) {
            None | Some("") => StationStatus::Available,
            Some(status) => StationStatus::parse_filter(status)
                .ok_or_else(|| format!("unknown status {status:?}"))?,
        };
        let supported_vehicle_types = match value.supported_vehicle_types.as_deref() {
            None => vec![VehicleType::TwoWheeler, VehicleType::FourWheeler],
            Some(list) => list
                .split('|')
                .filter(|item| !item.trim().is_empty())
                .map(|item| {
                    VehicleType::parse(item).ok_or_else(|| format!("unknown vehicle type {item:?}"))
                })
                .collect::<Result<_, _>>()?,
        };
        let booked_time_slots = value
            .booked_time_slots
            .as_deref()
            .unwrap_or_default()
            .split('|')
            .map(str::trim)
            .filter(|slot| !slot.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Station {
            id: value.id,
            host_name: value.host_name,
            title: value.title,
            location: value.location,
            rating: value.rating.unwrap_or_default(),
            review_count: value.review_count.unwrap_or_default(),
            price_per_hour: value.price_per_hour,
            status,
            image: value.image.unwrap_or_default(),
            connector_type: value.connector_type,
            power_output: value.power_output,
            description: value.description.unwrap_or_default(),
            coordinate: Coordinate::new(value.lat, value.lng),
            distance: None,
            phone_number: value.phone_number.filter(|phone| !phone.trim().is_empty()),
            supported_vehicle_types,
            booked_time_slots,
        })
    }
}

impl StationRepository {
    pub fn load_csv_path<P: AsRef<Path>>(self, path: P) -> Result<Self, repository::Error> {
        let file = File::open(path)?;
        self.load_csv(file)
    }

    /// Streams station rows into the repository.
    /// Rows that parse as CSV but carry invalid values fail the whole load.
    pub fn load_csv<R: Read>(mut self, reader: R) -> Result<Self, repository::Error> {
        debug!("Loading stations...");
        let now = Instant::now();
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        for (i, row) in reader.deserialize::<CsvStation>().enumerate() {
            let row = row?;
            let station = Station::try_from(row)
                .map_err(|reason| repository::Error::InvalidRow { row: i + 1, reason })?;
            if self.station_by_id(&station.id).is_some() {
                warn!("Duplicate station id {}, keeping the last row", station.id);
            }
            self.upsert(station);
        }
        debug!(
            "Loading {} stations took {:?}",
            self.len(),
            now.elapsed()
        );
        Ok(self)
    }
}
