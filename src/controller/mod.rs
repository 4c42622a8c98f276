//! The trip panel: owns the stop list, the location search and the current
//! plan, and keeps them in step as the driver edits the trip.
//!
//! Search and planning are debounced and run on spawned tasks. Each run
//! carries a [`Ticket`] from its [`RequestGate`]; a result is applied only
//! while its ticket is still current, so a slow response can never replace
//! a newer one.

mod gate;
mod state;

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle, time};
use tracing::{debug, warn};

pub use gate::*;
pub use state::*;

use crate::{
    config::Config,
    repository::VehicleType,
    service::{self, TripService},
    shared::geo::Distance,
    trip::{
        Direction, DriverLocation, LocationSearchResult, StopList, TripPlanRequest,
        TripPlanResponse, TripStop,
    },
};

pub const TIMEOUT_MESSAGE: &str = "Request timed out.";
pub const SEARCH_FAILED_MESSAGE: &str = "Unable to search locations.";
pub const PLAN_FAILED_MESSAGE: &str = "Unable to plan trip.";

/// Called with the new plan (None when cleared) and the stops it belongs to.
pub type PlanListener = Arc<dyn Fn(Option<&TripPlanResponse>, &[TripStop]) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub debounce: Duration,
    pub request_timeout: Duration,
    pub search_radius: Distance,
    /// Corridor sent with plan requests. None lets the service decide.
    pub corridor: Option<Distance>,
    /// Errors clear themselves after this long. None keeps them until
    /// dismissed.
    pub error_display: Option<Duration>,
    pub vehicle_type: VehicleType,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        (&Config::default()).into()
    }
}

impl From<&Config> for ControllerConfig {
    fn from(config: &Config) -> Self {
        Self {
            debounce: config.debounce,
            request_timeout: config.request_timeout,
            search_radius: config.search_radius,
            corridor: Some(config.corridor),
            error_display: Some(Duration::from_secs(6)),
            vehicle_type: config.default_vehicle_type,
        }
    }
}

fn user_message(error: &service::Error, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

type TaskSlot = Mutex<Option<JoinHandle<()>>>;

struct Inner {
    service: Arc<dyn TripService>,
    config: ControllerConfig,
    default_location: DriverLocation,
    state: watch::Sender<PanelState>,
    search_gate: RequestGate,
    plan_gate: RequestGate,
    search_task: TaskSlot,
    plan_task: TaskSlot,
    listener: Mutex<Option<PlanListener>>,
}

/// Must be used from within a tokio runtime: edits spawn the debounced
/// search and plan tasks. Dropping the controller aborts both.
pub struct TripPanelController {
    inner: Arc<Inner>,
}

impl TripPanelController {
    /// Creates the panel with the stop list seeded from `default_location`.
    pub fn new(
        service: Arc<dyn TripService>,
        default_location: DriverLocation,
        config: ControllerConfig,
    ) -> Self {
        let state = PanelState {
            stops: StopList::seeded(&default_location),
            vehicle_type: config.vehicle_type,
            ..Default::default()
        };
        let (state, _) = watch::channel(state);
        Self {
            inner: Arc::new(Inner {
                service,
                config,
                default_location,
                state,
                search_gate: RequestGate::new(),
                plan_gate: RequestGate::new(),
                search_task: Mutex::new(None),
                plan_task: Mutex::new(None),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Registers the callback told about every plan change. Notifications
    /// are serialized, so the callback must not edit the trip or replace
    /// the listener itself; hand such work to another task.
    pub fn set_plan_listener<F>(&self, listener: F)
    where
        F: Fn(Option<&TripPlanResponse>, &[TripStop]) + Send + Sync + 'static,
    {
        *self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(listener));
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> PanelState {
        self.inner.state.borrow().clone()
    }

    pub fn default_location(&self) -> &DriverLocation {
        &self.inner.default_location
    }

    /// Updates the search text. A blank query clears the results right
    /// away, anything else is searched once typing pauses.
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        let trimmed = query.trim().to_string();
        if trimmed.is_empty() {
            self.inner.cancel_search();
            self.inner.state.send_modify(|state| {
                state.query = query;
                state.results.clear();
                state.is_searching = false;
                state.search_error = None;
            });
            return;
        }
        Inner::schedule_search(&self.inner, query, trimmed);
    }

    pub fn set_vehicle_type(&self, vehicle_type: VehicleType) {
        let changed = self.inner.state.send_if_modified(|state| {
            if state.vehicle_type == vehicle_type {
                return false;
            }
            state.vehicle_type = vehicle_type;
            true
        });
        if changed {
            Inner::schedule_plan(&self.inner);
        }
    }

    /// Appends a search result as the new last stop and clears the search.
    pub fn add_stop(&self, location: &LocationSearchResult) {
        self.edit_stops(|stops| stops.add_stop(location));
        self.set_query("");
    }

    /// Makes a search result the start of the trip and clears the search.
    pub fn set_start(&self, location: &LocationSearchResult) {
        self.edit_stops(|stops| stops.set_start(location));
        self.set_query("");
    }

    pub fn reset_start(&self) {
        let default_location = self.inner.default_location.clone();
        self.edit_stops(|stops| stops.reset_start(&default_location));
    }

    pub fn move_stop(&self, index: usize, direction: Direction) {
        self.edit_stops(|stops| stops.move_stop(index, direction));
    }

    pub fn remove_stop(&self, index: usize) {
        self.edit_stops(|stops| stops.remove_stop(index));
    }

    pub fn dismiss_search_error(&self) {
        self.inner
            .state
            .send_if_modified(|state| state.search_error.take().is_some());
    }

    pub fn dismiss_plan_error(&self) {
        self.inner
            .state
            .send_if_modified(|state| state.plan_error.take().is_some());
    }

    /// Applies a stop edit and replans when the list actually changed.
    fn edit_stops<F>(&self, edit: F)
    where
        F: FnOnce(&StopList) -> StopList,
    {
        let changed = self.inner.state.send_if_modified(|state| {
            let next = edit(&state.stops);
            if next == state.stops {
                return false;
            }
            state.stops = next;
            true
        });
        if changed {
            Inner::schedule_plan(&self.inner);
        }
    }
}

impl Drop for TripPanelController {
    fn drop(&mut self) {
        self.inner.cancel_search();
        self.inner.cancel_plan();
    }
}

impl Inner {
    fn replace_task(slot: &TaskSlot, task: Option<JoinHandle<()>>) {
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = std::mem::replace(&mut *slot, task) {
            previous.abort();
        }
    }

    fn cancel_search(&self) {
        self.search_gate.invalidate();
        Self::replace_task(&self.search_task, None);
    }

    fn cancel_plan(&self) {
        self.plan_gate.invalidate();
        Self::replace_task(&self.plan_task, None);
    }

    /// Calls the plan listener. The listener lock orders notifications, and
    /// a plan from a run whose ticket is no longer current is dropped.
    fn notify(
        &self,
        ticket: Option<Ticket>,
        plan: Option<&TripPlanResponse>,
        stops: &[TripStop],
    ) {
        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if ticket.is_some_and(|ticket| !self.plan_gate.is_current(ticket)) {
            debug!("Skipped notification for a superseded plan");
            return;
        }
        if let Some(listener) = listener.as_ref() {
            listener(plan, stops);
        }
    }

    fn schedule_search(this: &Arc<Self>, input: String, query: String) {
        // Issue and spawn under the slot lock so a racing edit cannot
        // replace the newer task with an older one.
        let mut slot = this.search_task.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = this.search_gate.issue();
        this.state.send_modify(|state| {
            state.query = input;
            state.is_searching = true;
            state.search_error = None;
        });
        let inner = this.clone();
        let task = tokio::spawn(async move { inner.run_search(ticket, query).await });
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    fn schedule_plan(this: &Arc<Self>) {
        let mut slot = this.plan_task.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = this.plan_gate.issue();
        let (stops, vehicle_type) = {
            let state = this.state.borrow();
            (state.stops.clone(), state.vehicle_type)
        };

        if !stops.is_plannable() {
            if let Some(previous) = slot.take() {
                previous.abort();
            }
            drop(slot);
            this.state.send_modify(|state| {
                state.plan = None;
                state.plan_error = None;
                state.is_planning = false;
            });
            this.notify(None, None, stops.as_slice());
            return;
        }

        this.state.send_modify(|state| {
            state.is_planning = true;
            state.plan_error = None;
        });
        let request = TripPlanRequest {
            stops: stops.to_vec(),
            vehicle_type: Some(vehicle_type),
            corridor_km: this.config.corridor.map(|corridor| corridor.as_kilometers()),
        };
        let inner = this.clone();
        let task = tokio::spawn(async move { inner.run_plan(ticket, request, stops).await });
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    async fn run_search(self: Arc<Self>, ticket: Ticket, query: String) {
        time::sleep(self.config.debounce).await;
        if !self.search_gate.is_current(ticket) {
            return;
        }
        debug!("Searching locations for {query:?}");
        let outcome = time::timeout(
            self.config.request_timeout,
            self.service
                .search_locations(&query, self.config.search_radius),
        )
        .await;

        let mut failed = false;
        let applied = self.state.send_if_modified(|state| {
            if !self.search_gate.is_current(ticket) {
                return false;
            }
            state.is_searching = false;
            match outcome {
                Ok(Ok(results)) => {
                    state.results = results;
                    state.search_error = None;
                }
                Ok(Err(err)) => {
                    warn!("Location search for {query:?} failed: {err}");
                    state.search_error = Some(user_message(&err, SEARCH_FAILED_MESSAGE));
                    failed = true;
                }
                Err(_) => {
                    warn!("Location search for {query:?} timed out");
                    state.search_error = Some(TIMEOUT_MESSAGE.to_string());
                    failed = true;
                }
            }
            true
        });
        if !applied {
            debug!("Dropped stale search results for {query:?}");
            return;
        }
        if failed && let Some(display) = self.config.error_display {
            time::sleep(display).await;
            self.state.send_if_modified(|state| {
                self.search_gate.is_current(ticket) && state.search_error.take().is_some()
            });
        }
    }

    async fn run_plan(self: Arc<Self>, ticket: Ticket, request: TripPlanRequest, stops: StopList) {
        time::sleep(self.config.debounce).await;
        if !self.plan_gate.is_current(ticket) {
            return;
        }
        debug!("Planning trip through {} stops", request.stops.len());
        let outcome =
            time::timeout(self.config.request_timeout, self.service.plan_trip(&request)).await;

        let mut published: Option<Option<TripPlanResponse>> = None;
        self.state.send_if_modified(|state| {
            if !self.plan_gate.is_current(ticket) {
                return false;
            }
            state.is_planning = false;
            match outcome {
                Ok(Ok(mut plan)) => {
                    plan.sort_stations();
                    state.plan = Some(plan.clone());
                    state.plan_error = None;
                    published = Some(Some(plan));
                }
                Ok(Err(err)) => {
                    warn!("Trip planning failed: {err}");
                    state.plan = None;
                    state.plan_error = Some(user_message(&err, PLAN_FAILED_MESSAGE));
                    published = Some(None);
                }
                Err(_) => {
                    warn!("Trip planning timed out");
                    state.plan = None;
                    state.plan_error = Some(TIMEOUT_MESSAGE.to_string());
                    published = Some(None);
                }
            }
            true
        });

        let Some(plan) = published else {
            debug!("Dropped stale plan");
            return;
        };
        self.notify(Some(ticket), plan.as_ref(), stops.as_slice());
        if plan.is_none()
            && let Some(display) = self.config.error_display
        {
            time::sleep(display).await;
            self.state.send_if_modified(|state| {
                self.plan_gate.is_current(ticket) && state.plan_error.take().is_some()
            });
        }
    }
}
