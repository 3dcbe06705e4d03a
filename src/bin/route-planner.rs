use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use route_planner::nominatim::{NominatimClient, NominatimConfig};
use route_planner::planner::{PlanOutcome, plan};
use route_planner::problem::Fleet;
use route_planner::report::PlanReport;
use route_planner::solver::SolveOptions;
use route_planner::stops::{Stop, StopList};

/// Plans delivery routes from a depot. The first stop is always the depot.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(group(ArgGroup::new("input").required(true).args(["stops", "addresses"])))]
struct Args {
    /// JSON array of {"name", "lat", "lon"} objects.
    #[arg(long)]
    stops: Option<PathBuf>,

    /// Text file with one address per line, resolved through Nominatim.
    #[arg(long)]
    addresses: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    vehicles: usize,

    /// Maximum deliveries per vehicle.
    #[arg(long, default_value_t = 10)]
    capacity: u32,

    /// Search time budget in seconds.
    #[arg(long, default_value_t = 5.0)]
    time_budget: f64,

    /// Penalty per meter between the longest and shortest route.
    #[arg(long, default_value_t = 100)]
    span_coefficient: u64,

    #[arg(long, default_value_t = 10_000)]
    max_iterations: usize,

    /// Restrict address lookup to these country codes ("" for worldwide).
    #[arg(long, default_value = "br")]
    country_codes: String,

    #[arg(long, default_value = "https://nominatim.openstreetmap.org")]
    nominatim_url: String,

    /// Print the plan as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let stops = load_stops(&args)?;
    let fleet = Fleet::uniform(args.vehicles, args.capacity)?;
    let options = SolveOptions {
        time_budget: Duration::try_from_secs_f64(args.time_budget)?,
        span_coefficient: args.span_coefficient,
        max_iterations: args.max_iterations,
        cancel: None,
    };

    let outcome = plan(stops.as_slice(), &fleet, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        PlanOutcome::Planned(report) => print_report(report),
        PlanOutcome::Infeasible {
            infeasibility,
            baseline_distance,
        } => {
            println!("No plan: {}", infeasibility);
            println!("Original distance (sequential): {}", km(*baseline_distance));
        }
    }

    Ok(())
}

fn load_stops(args: &Args) -> Result<StopList, Box<dyn Error>> {
    if let Some(path) = &args.stops {
        let stops: Vec<Stop> = serde_json::from_str(&fs::read_to_string(path)?)?;
        info!(count = stops.len(), path = %path.display(), "stops loaded");
        return Ok(stops.into());
    }

    let path = args.addresses.as_ref().ok_or("either --stops or --addresses is required")?;
    let geocoder = NominatimClient::new(NominatimConfig {
        base_url: args.nominatim_url.clone(),
        country_codes: Some(args.country_codes.clone()).filter(|codes| !codes.is_empty()),
        ..NominatimConfig::default()
    })?;

    let mut stops = StopList::new();
    for address in fs::read_to_string(path)?.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if stops.push_address(address, &geocoder).is_none() {
            if stops.is_empty() {
                return Err(format!("depot address could not be resolved: {}", address).into());
            }
            warn!(address, "skipping unresolved address");
        }
    }
    Ok(stops)
}

fn km(meters: u64) -> String {
    format!("{:.1} km", meters as f64 / 1000.0)
}

fn print_report(report: &PlanReport) {
    println!("Original distance (sequential): {}", km(report.baseline_distance));
    println!("Optimized distance:             {}", km(report.optimized_distance));
    println!(
        "Estimated savings:              {:.1} km",
        report.savings() as f64 / 1000.0
    );
    if !report.termination.converged() {
        println!("(search stopped early: {:?})", report.termination);
    }

    for route in &report.routes {
        println!();
        println!(
            "Vehicle {} ({}, {} deliveries)",
            route.vehicle,
            km(route.distance),
            route.load
        );
        let last = route.steps.len() - 1;
        for (i, step) in route.steps.iter().enumerate() {
            let marker = if i == 0 || i == last {
                "depot".to_string()
            } else {
                format!("{}.", i)
            };
            println!(
                "  {:>5} {}  ({:.5}, {:.5})  +{}",
                marker,
                step.name,
                step.lat,
                step.lon,
                km(step.leg_distance)
            );
        }
    }
}
