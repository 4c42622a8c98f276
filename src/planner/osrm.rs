use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::Config,
    planner::{Error, RoadLeg, RoadRoute, RouteProvider},
    repository::VehicleType,
    shared::{
        geo::{Coordinate, Distance},
        time::Duration,
    },
};

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: String,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
}

/// Road routes from an OSRM `route/v1` endpoint.
pub struct OsrmRouteProvider {
    http: reqwest::Client,
    base_url: String,
    profile: String,
}

impl OsrmRouteProvider {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(Error::Routing)?;
        Ok(Self {
            http,
            base_url: config.osrm_base_url.trim_end_matches('/').to_string(),
            profile: "driving".into(),
        })
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    fn route_url(&self, stops: &[Coordinate]) -> Result<Url, Error> {
        let coordinates: Vec<String> = stops
            .iter()
            .map(|coord| format!("{},{}", coord.longitude, coord.latitude))
            .collect();
        let url = format!(
            "{}/route/v1/{}/{}",
            self.base_url,
            self.profile,
            coordinates.join(";")
        );
        Url::parse_with_params(
            &url,
            &[
                ("overview", "full"),
                ("geometries", "polyline"),
                ("steps", "false"),
            ],
        )
        .map_err(|err| Error::InvalidUrl(format!("{url}: {err}")))
    }
}

#[async_trait]
impl RouteProvider for OsrmRouteProvider {
    // OSRM has no two wheeler profile, every vehicle drives the same roads.
    async fn route(
        &self,
        stops: &[Coordinate],
        _vehicle_type: Option<VehicleType>,
    ) -> Result<RoadRoute, Error> {
        if stops.len() < 2 {
            return Err(Error::NotEnoughStops(stops.len()));
        }
        let url = self.route_url(stops)?;
        debug!("Requesting route through {} stops", stops.len());
        let response = self.http.get(url).send().await.map_err(Error::Routing)?;
        let status = response.status();
        let body = response.bytes().await.map_err(Error::Routing)?;
        let payload: OsrmResponse = match serde_json::from_slice(&body) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => return Err(Error::RoutingStatus(status.as_u16())),
            Err(err) => return Err(err.into()),
        };
        if payload.code != "Ok" {
            return Err(Error::NoRoute(payload.message.unwrap_or(payload.code)));
        }
        let route = payload
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoRoute("No route returned".into()))?;
        Ok(RoadRoute {
            distance: Distance::from_meters(route.distance),
            duration: Duration::from_seconds_f64(route.duration),
            polyline: route.geometry,
            legs: route
                .legs
                .into_iter()
                .map(|leg| RoadLeg {
                    distance: Distance::from_meters(leg.distance),
                    duration: Duration::from_seconds_f64(leg.duration),
                })
                .collect(),
        })
    }
}
