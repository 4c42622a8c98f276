use crate::repository::{Station, StationStatus, VehicleType};

const CAR_BATTERY_KWH: f64 = 40.0;
const SCOOTER_BATTERY_KWH: f64 = 3.0;
/// Share of the battery a typical top-up adds.
const TOP_UP_SHARE: f64 = 0.6;
const MIN_CHARGE_MIN: u32 = 10;
const MAX_CHARGE_MIN: u32 = 180;

/// Minutes needed for a typical top-up at the given power.
/// Returns 0 when the power is unknown.
pub fn estimate_charge_minutes(power_kw: f64, vehicle_type: Option<VehicleType>) -> u32 {
    if power_kw <= 0.0 {
        return 0;
    }
    let battery_kwh = match vehicle_type {
        Some(VehicleType::TwoWheeler) => SCOOTER_BATTERY_KWH,
        _ => CAR_BATTERY_KWH,
    };
    let energy_needed = battery_kwh * TOP_UP_SHARE;
    let minutes = ((energy_needed / power_kw) * 60.0).ceil() as u32;
    minutes.clamp(MIN_CHARGE_MIN, MAX_CHARGE_MIN)
}

/// Number of plugs a charger of this power usually exposes.
pub fn estimate_capacity_ports(power_kw: f64) -> u32 {
    match power_kw {
        p if p >= 50.0 => 6,
        p if p >= 25.0 => 4,
        p if p >= 11.0 => 2,
        _ => 1,
    }
}

/// Free plugs right now. Busy and offline chargers have none.
pub fn available_ports(station: &Station, capacity: u32) -> u32 {
    match station.status {
        StationStatus::Available => capacity,
        StationStatus::Busy | StationStatus::Offline => 0,
    }
}
