use async_trait::async_trait;
use thiserror::Error;

use crate::{
    client, planner,
    shared::geo::Distance,
    trip::{LocationSearchResult, TripPlanRequest, TripPlanResponse},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] client::Error),
    #[error(transparent)]
    Planner(#[from] planner::Error),
}

/// Location search and trip planning, either against the marketplace
/// backend ([`client::ApiClient`]) or computed locally
/// ([`planner::LocalPlanner`]).
#[async_trait]
pub trait TripService: Send + Sync {
    async fn search_locations(
        &self,
        query: &str,
        radius: Distance,
    ) -> Result<Vec<LocationSearchResult>, Error>;

    async fn plan_trip(&self, request: &TripPlanRequest) -> Result<TripPlanResponse, Error>;
}
