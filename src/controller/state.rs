use crate::{
    repository::VehicleType,
    trip::{LocationSearchResult, RouteStationInfo, StopList, TripLeg, TripPlanResponse},
};

/// Activity of the trip panel. Searching and planning run independently,
/// so both can be active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Searching,
    Planning,
    SearchingAndPlanning,
}

/// Snapshot of everything the trip panel shows. Replaced as a whole on
/// every transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    pub query: String,
    pub results: Vec<LocationSearchResult>,
    pub is_searching: bool,
    pub search_error: Option<String>,
    pub stops: StopList,
    pub vehicle_type: VehicleType,
    /// Latest successful plan for the current stops, None while fewer than
    /// two stops exist or after a failed attempt.
    pub plan: Option<TripPlanResponse>,
    pub is_planning: bool,
    pub plan_error: Option<String>,
}

impl PanelState {
    pub fn phase(&self) -> Phase {
        match (self.is_searching, self.is_planning) {
            (false, false) => Phase::Idle,
            (true, false) => Phase::Searching,
            (false, true) => Phase::Planning,
            (true, true) => Phase::SearchingAndPlanning,
        }
    }

    pub fn route_legs(&self) -> &[TripLeg] {
        self.plan
            .as_ref()
            .map(|plan| plan.route.legs.as_slice())
            .unwrap_or_default()
    }

    pub fn route_stations(&self) -> &[RouteStationInfo] {
        self.plan
            .as_ref()
            .map(|plan| plan.stations.as_slice())
            .unwrap_or_default()
    }
}
