use snapcharge::{prelude::*, trip::AvailabilitySummary};
use std::{
    process,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{error, info};

const USAGE: &str = "usage: snapcharge [--local <stations.csv>] search <query>
       snapcharge [--local <stations.csv>] plan <stop> <stop> [<stop>...]

A stop is a place name or \"lat, lng\". Without --local the marketplace
backend at $SNAPCHARGE_API_BASE_URL is used.";

fn take_option(args: &mut Vec<String>, name: &str) -> Option<String> {
    let index = args.iter().position(|arg| arg == name)?;
    args.remove(index);
    (index < args.len()).then(|| args.remove(index))
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    error!("{message}");
    process::exit(1);
}

fn local_planner(config: &Config, path: &str) -> LocalPlanner {
    info!("Loading stations...");
    let now = Instant::now();
    let repository = StationRepository::new()
        .load_csv_path(path)
        .unwrap_or_else(|err| exit_with(format!("Failed to load {path}: {err}")));
    info!(
        "Loading {} stations took {:?}",
        repository.len(),
        now.elapsed()
    );
    LocalPlanner::from_config(config, Arc::new(RwLock::new(repository)))
        .unwrap_or_else(|err| exit_with(err))
}

async fn resolve_stop(
    service: &dyn TripService,
    config: &Config,
    text: &str,
) -> LocationSearchResult {
    if let Some(coordinate) = Coordinate::parse_pair(text) {
        return LocationSearchResult {
            label: coordinate.to_string(),
            coordinate,
            availability: AvailabilitySummary::default(),
        };
    }
    let results = service
        .search_locations(text, config.search_radius)
        .await
        .unwrap_or_else(|err| exit_with(format!("Search for {text:?} failed: {err}")));
    results
        .into_iter()
        .next()
        .unwrap_or_else(|| exit_with(format!("No place found for {text:?}")))
}

async fn search(service: Arc<dyn TripService>, config: &Config, query: &str) {
    let controller =
        TripPanelController::new(service, config.default_location.clone(), config.into());
    let mut state = controller.subscribe();
    controller.set_query(query);
    let state = state
        .wait_for(|state| !state.is_searching)
        .await
        .map(|state| state.clone())
        .unwrap_or_else(|err| exit_with(err));
    if let Some(message) = state.search_error {
        exit_with(message);
    }
    if state.results.is_empty() {
        println!("No places found for {query:?}");
    }
    for result in state.results {
        let summary = result.availability;
        println!(
            "{} ({})  {} available, {} busy, {} offline",
            result.label, result.coordinate, summary.available, summary.busy, summary.offline
        );
    }
}

async fn plan(service: Arc<dyn TripService>, config: &Config, stops: &[String]) {
    if stops.len() < 2 {
        exit_with(USAGE);
    }
    let mut locations = Vec::with_capacity(stops.len());
    for stop in stops {
        locations.push(resolve_stop(service.as_ref(), config, stop).await);
    }

    let controller_config = ControllerConfig {
        debounce: Duration::ZERO,
        error_display: None,
        ..config.into()
    };
    let controller =
        TripPanelController::new(service, config.default_location.clone(), controller_config);
    let mut state = controller.subscribe();
    for (i, location) in locations.iter().enumerate() {
        if i == 0 {
            controller.set_start(location);
        } else {
            controller.add_stop(location);
        }
    }
    let state = state
        .wait_for(|state| !state.is_planning)
        .await
        .map(|state| state.clone())
        .unwrap_or_else(|err| exit_with(err));
    if let Some(message) = state.plan_error {
        exit_with(message);
    }
    let Some(plan) = state.plan else {
        exit_with("No plan was produced");
    };

    println!(
        "{:.2} km, {:.1} min",
        plan.route.distance_km, plan.route.duration_min
    );
    for leg in &plan.route.legs {
        println!(
            "  {} -> {}: {:.2} km, {:.1} min",
            leg.from_label, leg.to_label, leg.distance_km, leg.duration_min
        );
    }
    println!("{} stations along the route", plan.stations.len());
    for info in &plan.stations {
        println!(
            "  {:>7.2} km  +{:>5.1} min  {} ({})  {}/{} ports free, ~{} min charge",
            info.distance_from_start_km,
            info.eta_from_start_min,
            info.station.title,
            info.station.status,
            info.available_ports,
            info.capacity_ports,
            info.estimated_charge_min
        );
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let local = take_option(&mut args, "--local");
    let config = Config::from_env();

    let service: Arc<dyn TripService> = match local {
        Some(path) => Arc::new(local_planner(&config, &path)),
        None => {
            info!("Using backend at {}", config.api_base_url);
            Arc::new(ApiClient::new(&config).unwrap_or_else(|err| exit_with(err)))
        }
    };

    match args.split_first() {
        Some((command, rest)) if command == "search" && !rest.is_empty() => {
            search(service, &config, &rest.join(" ")).await
        }
        Some((command, rest)) if command == "plan" => plan(service, &config, rest).await,
        _ => exit_with(USAGE),
    }
}
