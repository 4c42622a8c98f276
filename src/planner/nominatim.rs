use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    config::Config,
    planner::{Error, GeocodedPlace, Geocoder},
    shared::geo::Coordinate,
};

/// Nominatim reports coordinates as strings.
#[derive(Deserialize)]
struct Place {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
}

impl Place {
    fn into_geocoded(self, query: &str) -> Option<GeocodedPlace> {
        let latitude = self.lat?.trim().parse::<f64>().ok()?;
        let longitude = self.lon?.trim().parse::<f64>().ok()?;
        let label = self
            .display_name
            .filter(|name| !name.is_empty())
            .or(self.name.filter(|name| !name.is_empty()))
            .unwrap_or_else(|| query.to_string());
        Some(GeocodedPlace {
            label,
            coordinate: Coordinate::new(latitude, longitude),
        })
    }
}

/// Forward geocoding against a Nominatim `search` endpoint.
pub struct NominatimGeocoder {
    http: reqwest::Client,
    url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(Error::Geocoding)?;
        Ok(Self {
            http,
            url: config.nominatim_url.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str, limit: usize) -> Result<Vec<GeocodedPlace>, Error> {
        let limit = limit.to_string();
        let url = Url::parse_with_params(
            &self.url,
            &[
                ("q", query),
                ("format", "jsonv2"),
                ("limit", limit.as_str()),
                ("addressdetails", "1"),
            ],
        )
        .map_err(|err| Error::InvalidUrl(format!("{}: {err}", self.url)))?;
        let response = self.http.get(url).send().await.map_err(Error::Geocoding)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::GeocodingStatus(status.as_u16()));
        }
        let body = response.bytes().await.map_err(Error::Geocoding)?;
        let places: Vec<Place> = serde_json::from_slice(&body)?;
        let total = places.len();
        let places: Vec<GeocodedPlace> = places
            .into_iter()
            .filter_map(|place| place.into_geocoded(query))
            .collect();
        if places.len() < total {
            warn!(
                "Skipped {} geocoding results without a valid position",
                total - places.len()
            );
        }
        debug!("Geocoded {query:?} to {} places", places.len());
        Ok(places)
    }
}
