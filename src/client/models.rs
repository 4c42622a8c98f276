use serde::Deserialize;

use crate::trip::DriverLocation;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelledOption {
    #[serde(alias = "id", alias = "status")]
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfig {
    pub service_fee: u32,
    /// Upcoming slot labels such as "3:00 PM".
    pub time_slots: Vec<String>,
    #[serde(default)]
    pub slot_duration_minutes: Option<u32>,
}

/// Screen configuration served by the marketplace for the driver app.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    pub location: DriverLocation,
    pub location_label: String,
    pub search_radius_km: f64,
    pub display_radius_km: f64,
    pub personalized_label: String,
    pub search_placeholder: String,
    pub filter_tags: Vec<LabelledOption>,
    pub status_options: Vec<LabelledOption>,
    pub vehicle_type_options: Vec<LabelledOption>,
    pub legend: Vec<LabelledOption>,
    pub booking: BookingConfig,
}
