pub mod geo;
pub mod polyline;
pub mod time;

pub use geo::*;
pub use time::*;

/// Rounds to a fixed number of decimals, the precision used on the wire.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
