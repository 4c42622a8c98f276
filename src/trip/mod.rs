pub mod corridor;
pub mod estimate;
mod models;
mod stops;

pub use corridor::{CorridorMatcher, RouteGeometry, RoutePosition, RouteTotals};
pub use models::*;
pub use stops::*;
