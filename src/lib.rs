pub mod booking;
pub mod client;
pub mod config;
pub mod controller;
pub mod planner;
pub mod repository;
pub mod service;
pub mod shared;
pub mod trip;

pub mod prelude {
    pub use crate::booking::{BookingDraft, BookingError, validate_booking};
    pub use crate::client::{ApiClient, AuthSession};
    pub use crate::config::Config;
    pub use crate::controller::{ControllerConfig, PanelState, Phase, TripPanelController};
    pub use crate::planner::{Geocoder, LocalPlanner, RouteProvider};
    pub use crate::repository::{
        FilterTag, Station, StationQuery, StationRepository, StationStatus, VehicleType,
    };
    pub use crate::service::TripService;
    pub use crate::shared::{Coordinate, Distance};
    pub use crate::trip::{
        Direction, DriverLocation, LocationSearchResult, StopList, TripPlanRequest,
        TripPlanResponse, TripStop,
    };
}
