//! HTTP client for the marketplace's driver endpoints.

mod models;
mod session;

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, StatusCode, Url, header::AUTHORIZATION};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub use models::*;
pub use session::*;

use crate::{
    booking::{
        BookingDraft, BookingError, CompleteBookingRequest, DriverBooking, validate_booking,
    },
    config::Config,
    repository::{Station, StationQuery},
    service::{self, TripService},
    shared::geo::Distance,
    trip::{LocationSearchResult, TripPlanRequest, TripPlanResponse},
};

pub const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Non success response. The message is the one the backend sent.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Missing authentication session.")]
    MissingSession,
    #[error("Session expired. Please log in again.")]
    SessionExpired,
    #[error("{0}")]
    Booking(#[from] BookingError),
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid url: {0}")]
    InvalidUrl(String),
}

impl Error {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<Value>,
    detail: Option<Value>,
}

/// Picks the human readable message out of an error response body:
/// `error.message`, then `detail.message`, then a plain string `detail`.
pub fn parse_error_message(body: &[u8]) -> String {
    let Ok(body) = serde_json::from_slice::<ErrorBody>(body) else {
        return FALLBACK_ERROR_MESSAGE.to_string();
    };
    let message_of = |value: &Option<Value>| {
        value
            .as_ref()
            .and_then(|value| value.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    message_of(&body.error)
        .or_else(|| message_of(&body.detail))
        .or_else(|| body.detail.as_ref().and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationReview {
    pub driver_name: String,
    pub rating: u8,
    #[serde(default)]
    pub review: Option<String>,
    pub created_at: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session_skew: std::time::Duration,
    session: RwLock<Option<AuthSession>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, self::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session_skew: config.session_skew,
            session: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_session(&self, session: AuthSession) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn clear_session(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, self::Error> {
        let url = format!("{}{}", self.base_url, path);
        let parsed = if params.is_empty() {
            Url::parse(&url)
        } else {
            Url::parse_with_params(&url, params)
        };
        parsed.map_err(|err| Error::InvalidUrl(format!("{url}: {err}")))
    }

    /// Bearer header for the stored session. An expired session is dropped.
    fn authorization(&self) -> Result<String, self::Error> {
        let session = self.session().ok_or(Error::MissingSession)?;
        if session.is_expired(self.session_skew) {
            warn!("Session expired, clearing it");
            self.clear_session();
            return Err(Error::SessionExpired);
        }
        Ok(session.bearer())
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        authorized: bool,
    ) -> Result<RequestBuilder, self::Error> {
        let url = self.url(path, params)?;
        debug!("{method} {url}");
        let mut request = self.http.request(method, url);
        if authorized {
            request = request.header(AUTHORIZATION, self.authorization()?);
        }
        Ok(request)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, self::Error> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.clear_session();
            }
            let message = parse_error_message(&body);
            debug!("Request failed with {status}: {message}");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// `GET /api/driver/locations/search`
    pub async fn search_locations(
        &self,
        query: &str,
        radius: Distance,
    ) -> Result<Vec<LocationSearchResult>, self::Error> {
        let params = [
            ("q", query.trim().to_string()),
            ("radius_km", radius.as_kilometers().to_string()),
        ];
        let request = self.request(Method::GET, "/api/driver/locations/search", &params, false)?;
        self.send(request).await
    }

    /// `POST /api/driver/trips/plan`
    pub async fn plan_trip(
        &self,
        request: &TripPlanRequest,
    ) -> Result<TripPlanResponse, self::Error> {
        let builder = self
            .request(Method::POST, "/api/driver/trips/plan", &[], false)?
            .json(request);
        let mut plan: TripPlanResponse = self.send(builder).await?;
        plan.sort_stations();
        Ok(plan)
    }

    /// `GET /api/driver/config`
    pub async fn driver_config(&self) -> Result<DriverConfig, self::Error> {
        let request = self.request(Method::GET, "/api/driver/config", &[], false)?;
        self.send(request).await
    }

    /// `GET /api/driver/search`
    pub async fn search_stations(
        &self,
        query: &StationQuery,
        booking_date: Option<NaiveDate>,
    ) -> Result<Vec<Station>, self::Error> {
        let mut params = vec![
            ("lat", query.center.latitude.to_string()),
            ("lng", query.center.longitude.to_string()),
            ("radius_km", query.radius.as_kilometers().to_string()),
        ];
        if let Some(status) = query.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(vehicle_type) = query.vehicle_type {
            params.push(("vehicle_type", vehicle_type.as_str().to_string()));
        }
        if let Some(text) = query.text.as_deref().filter(|text| !text.trim().is_empty()) {
            params.push(("q", text.to_string()));
        }
        if let Some(date) = booking_date {
            params.push(("booking_date", date.to_string()));
        }
        for tag in &query.tags {
            params.push(("tags", tag.id().to_string()));
        }
        let request = self.request(Method::GET, "/api/driver/search", &params, false)?;
        self.send(request).await
    }

    /// Validates the draft against `station`, then `POST /api/driver/bookings`.
    /// Returns the station as updated by the backend.
    pub async fn create_booking(
        &self,
        station: &Station,
        draft: &BookingDraft,
    ) -> Result<Station, self::Error> {
        let booking = validate_booking(station, draft)?;
        let request = self
            .request(Method::POST, "/api/driver/bookings", &[], true)?
            .json(&booking);
        self.send(request).await
    }

    /// `GET /api/driver/bookings`, newest first.
    pub async fn driver_bookings(&self) -> Result<Vec<DriverBooking>, self::Error> {
        let request = self.request(Method::GET, "/api/driver/bookings", &[], true)?;
        self.send(request).await
    }

    /// `POST /api/driver/bookings/complete`
    pub async fn complete_booking(
        &self,
        request: &CompleteBookingRequest,
    ) -> Result<DriverBooking, self::Error> {
        let builder = self
            .request(Method::POST, "/api/driver/bookings/complete", &[], true)?
            .json(request);
        self.send(builder).await
    }

    /// `GET /api/driver/stations/{id}/reviews`
    pub async fn station_reviews(
        &self,
        station_id: &str,
    ) -> Result<Vec<StationReview>, self::Error> {
        let mut url = self.url("/api/driver/stations", &[])?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(self.base_url.clone()))?
            .push(station_id)
            .push("reviews");
        self.send(self.http.get(url)).await
    }
}

#[async_trait]
impl TripService for ApiClient {
    async fn search_locations(
        &self,
        query: &str,
        radius: Distance,
    ) -> Result<Vec<LocationSearchResult>, service::Error> {
        Ok(ApiClient::search_locations(self, query, radius).await?)
    }

    async fn plan_trip(&self, request: &TripPlanRequest) -> Result<TripPlanResponse, service::Error> {
        Ok(ApiClient::plan_trip(self, request).await?)
    }
}
