use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    repository::{Station, StationStatus},
    shared::{geo::Coordinate, time::parse_slot},
};

/// Reasons a booking is refused before it reaches the backend. The
/// messages are shown to the driver as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("Select a booking date.")]
    MissingDate,
    #[error("Start time is required to book a station.")]
    MissingStartTime,
    #[error("Start time {0:?} is not a valid time slot.")]
    InvalidStartTime(String),
    #[error("Station is not available.")]
    StationUnavailable,
    #[error("Selected time slot is already booked.")]
    SlotTaken,
    #[error("Rating must be between 1 and 5.")]
    InvalidRating(u8),
}

/// What the driver has picked so far in the booking sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub user_location: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub station_id: String,
    pub booking_date: NaiveDate,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_lng: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverBooking {
    pub id: String,
    pub station_id: String,
    pub station_title: String,
    pub station_location: String,
    pub station_price_per_hour: u32,
    #[serde(default)]
    pub station_image: String,
    pub station_lat: f64,
    pub station_lng: f64,
    pub host_id: String,
    pub host_name: String,
    /// Station phone, falling back to the host's.
    #[serde(default)]
    pub host_phone_number: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub review: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBookingRequest {
    pub booking_id: String,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
}

impl CompleteBookingRequest {
    pub fn new(
        booking_id: impl Into<String>,
        rating: u8,
        review: Option<String>,
    ) -> Result<Self, BookingError> {
        if !(1..=5).contains(&rating) {
            return Err(BookingError::InvalidRating(rating));
        }
        let review = review
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Ok(Self {
            booking_id: booking_id.into(),
            rating,
            review,
        })
    }
}

/// Checks a draft against the station as last seen and builds the request.
/// The backend repeats these checks, this only saves a round trip.
pub fn validate_booking(
    station: &Station,
    draft: &BookingDraft,
) -> Result<BookingRequest, BookingError> {
    let booking_date = draft.date.ok_or(BookingError::MissingDate)?;
    let start_time = draft
        .start_time
        .as_deref()
        .map(str::trim)
        .filter(|slot| !slot.is_empty())
        .ok_or(BookingError::MissingStartTime)?;
    if parse_slot(start_time).is_none() {
        return Err(BookingError::InvalidStartTime(start_time.to_string()));
    }
    if station.status == StationStatus::Offline {
        return Err(BookingError::StationUnavailable);
    }
    if station.is_slot_booked(start_time) {
        return Err(BookingError::SlotTaken);
    }
    Ok(BookingRequest {
        station_id: station.id.clone(),
        booking_date,
        start_time: start_time.to_string(),
        user_lat: draft.user_location.map(|coord| coord.latitude),
        user_lng: draft.user_location.map(|coord| coord.longitude),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::VehicleType;

    fn station(status: StationStatus) -> Station {
        Station {
            id: "st-1".into(),
            host_name: "Asha".into(),
            title: "Baner Home Charger".into(),
            location: "Baner, Pune".into(),
            rating: 4.6,
            review_count: 12,
            price_per_hour: 150,
            status,
            image: String::new(),
            connector_type: "Type 2".into(),
            power_output: "7.4 kW".into(),
            description: String::new(),
            coordinate: Coordinate::new(18.559, 73.7868),
            distance: None,
            phone_number: None,
            supported_vehicle_types: vec![VehicleType::FourWheeler],
            booked_time_slots: vec!["10:00 AM".into()],
        }
    }

    fn draft(slot: &str) -> BookingDraft {
        BookingDraft {
            date: NaiveDate::from_ymd_opt(2026, 10, 18),
            start_time: Some(slot.into()),
            user_location: Some(Coordinate::new(18.5204, 73.8567)),
        }
    }

    #[test]
    fn builds_request_for_free_slot() {
        let request = validate_booking(&station(StationStatus::Available), &draft("11:30 AM"))
            .expect("valid booking");
        assert_eq!(request.station_id, "st-1");
        assert_eq!(request.start_time, "11:30 AM");
        assert_eq!(request.user_lat, Some(18.5204));
    }

    #[test]
    fn rejects_in_order() {
        let available = station(StationStatus::Available);
        let no_date = BookingDraft {
            date: None,
            ..draft("11:30 AM")
        };
        assert_eq!(
            validate_booking(&available, &no_date),
            Err(BookingError::MissingDate)
        );
        assert_eq!(
            validate_booking(&available, &draft("  ")),
            Err(BookingError::MissingStartTime)
        );
        assert_eq!(
            validate_booking(&station(StationStatus::Offline), &draft("11:30 AM")),
            Err(BookingError::StationUnavailable)
        );
        assert!(validate_booking(&station(StationStatus::Busy), &draft("11:30 AM")).is_ok());
        assert_eq!(
            validate_booking(&available, &draft("10:00 am")),
            Err(BookingError::SlotTaken)
        );
    }

    #[test]
    fn messages_match_backend() {
        assert_eq!(
            BookingError::MissingStartTime.to_string(),
            "Start time is required to book a station."
        );
        assert_eq!(
            BookingError::SlotTaken.to_string(),
            "Selected time slot is already booked."
        );
    }

    #[test]
    fn rating_is_bounded() {
        assert_eq!(
            CompleteBookingRequest::new("b-1", 0, None),
            Err(BookingError::InvalidRating(0))
        );
        let request = CompleteBookingRequest::new("b-1", 5, Some("  ".into())).unwrap();
        assert_eq!(request.review, None);
    }
}
