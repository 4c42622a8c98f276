use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::shared::geo::Coordinate;

/// Live operating state of a charger as reported by its host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationStatus {
    #[default]
    Available,
    Busy,
    Offline,
}

impl StationStatus {
    /// Parses the status names used in query strings, `ALL` yields None.
    pub fn parse_filter(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" => Some(Self::Available),
            "BUSY" => Some(Self::Busy),
            "OFFLINE" => Some(Self::Offline),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Busy => "BUSY",
            Self::Offline => "OFFLINE",
        }
    }
}

impl Display for StationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle class a charger can serve.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    #[serde(rename = "2W")]
    TwoWheeler,
    #[default]
    #[serde(rename = "4W")]
    FourWheeler,
}

impl VehicleType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "2W" => Some(Self::TwoWheeler),
            "4W" => Some(Self::FourWheeler),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TwoWheeler => "2W",
            Self::FourWheeler => "4W",
        }
    }
}

impl Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A charger listed by a host.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Unique external identifier.
    pub id: String,
    pub host_name: String,
    /// Listing headline shown on cards and map pins.
    pub title: String,
    /// Free text address.
    pub location: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    /// Price in whole currency units.
    pub price_per_hour: u32,
    pub status: StationStatus,
    #[serde(default)]
    pub image: String,
    /// Connector description, e.g. "Type 2" or "CCS2".
    pub connector_type: String,
    /// Power rating as entered by the host, e.g. "7.4 kW".
    pub power_output: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    /// Human readable distance from the searcher, filled in by station search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub supported_vehicle_types: Vec<VehicleType>,
    /// Slot labels (e.g. "3:00 PM") that already hold an active booking.
    #[serde(default)]
    pub booked_time_slots: Vec<String>,
}

impl Station {
    /// Numeric power rating in kW, 0 when the text holds no number.
    pub fn power_kw(&self) -> f64 {
        parse_power_kw(&self.power_output)
    }

    pub fn supports(&self, vehicle_type: VehicleType) -> bool {
        self.supported_vehicle_types.contains(&vehicle_type)
    }

    pub fn is_slot_booked(&self, slot: &str) -> bool {
        let slot = slot.trim();
        self.booked_time_slots
            .iter()
            .any(|booked| booked.trim().eq_ignore_ascii_case(slot))
    }
}

/// Reads the first decimal number out of a free text power rating.
pub fn parse_power_kw(power_output: &str) -> f64 {
    let Some(start) = power_output.find(|c: char| c.is_ascii_digit()) else {
        return 0.0;
    };
    let rest = &power_output[start..];
    let mut end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if rest[end..].starts_with('.') {
        let fraction = &rest[end + 1..];
        let digits = fraction
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(fraction.len());
        if digits > 0 {
            end += 1 + digits;
        }
    }
    rest[..end].parse().unwrap_or(0.0)
}
