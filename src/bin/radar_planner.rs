use clap::{Parser, Subcommand};
use radar_pathfinder::config::{PlanOptions, ScenarioReport, default_cache_dir, load_scenario, plan_scenario};
use radar_pathfinder::detection::FieldCache;
use radar_pathfinder::errors::RadarResult;
use radar_pathfinder::graph::Tolerance;
use radar_pathfinder::planner::Heuristic;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod radar_planner {
    pub mod cli_utils;
}

use radar_planner::cli_utils::*;

#[derive(Parser)]
#[command(name = "radar_planner")]
#[command(about = "Plan low-detection routes through a radar network")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan a route for a named scenario
    Plan(PlanArgs),

    /// Inspect or prune the detection field cache
    Cache {
        /// Cache directory (defaults to the per-user cache directory)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(clap::Args)]
struct PlanArgs {
    /// Scenario name in the scenario file
    scenario: String,

    /// Maximum admissible detection probability, in (1e-4, 1]
    tolerance: String,

    /// Scenario file
    #[arg(long, default_value = "scenarios.toml")]
    scenarios: PathBuf,

    /// Search heuristic (overrides the scenario's)
    #[arg(long, value_enum)]
    heuristic: Option<Heuristic>,

    /// Waypoints to use instead of the scenario's (format: LAT,LON;LAT,LON;...)
    #[arg(long)]
    waypoints: Option<String>,

    /// Recompute the detection field even if a cached copy exists
    #[arg(long)]
    no_cache: bool,

    /// Cache directory (defaults to the per-user cache directory)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Index of the first waypoint to visit
    #[arg(long, default_value = "0")]
    start_index: usize,

    /// Write the full report as a bincode file
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print the total size of cached detection fields
    Size,

    /// Delete cached detection fields
    Clear {
        /// Only delete entries last written more than this many days ago
        #[arg(long)]
        older_than_days: Option<u64>,
    },
}

fn open_cache(cache_dir: Option<PathBuf>) -> RadarResult<FieldCache> {
    FieldCache::open(cache_dir.unwrap_or_else(default_cache_dir))
}

fn run_plan(args: PlanArgs) -> RadarResult<()> {
    // Parse and validate all CLI arguments before any work
    let tolerance: Tolerance = args.tolerance.parse()?;
    let mut scenario = load_scenario(&args.scenarios, &args.scenario)?;

    if let Some(waypoints) = &args.waypoints {
        scenario.waypoints = parse_waypoints(waypoints)?
            .into_iter()
            .map(|location| location.to_array())
            .collect();
    }

    if let Some(path) = &args.export {
        validate_export_path(path)?;
    }

    let options = PlanOptions {
        tolerance,
        heuristic: args.heuristic.unwrap_or(scenario.heuristic),
        start_index: args.start_index,
        cache: Some(open_cache(args.cache_dir)?),
        use_cache: !args.no_cache,
    };

    let report = plan_scenario(&scenario, options)?;

    if let Some(path) = &args.export {
        report.export(path)?;
    }

    print_report_summary(&report);
    Ok(())
}

fn run_cache(cache_dir: Option<PathBuf>, action: CacheAction) -> RadarResult<()> {
    let cache = open_cache(cache_dir)?;

    match action {
        CacheAction::Size => {
            let entries = cache.entries()?.len();
            println!(
                "{} in {entries} cached detection fields at {}",
                format_bytes(cache.size()),
                cache.dir().display()
            );
        }
        CacheAction::Clear { older_than_days } => {
            let removed = cache.clear(older_than_days);
            println!(
                "Removed {removed} cached detection fields from {}",
                cache.dir().display()
            );
        }
    }

    Ok(())
}

fn print_report_summary(report: &ScenarioReport) {
    println!("Scenario: {}", report.scenario);
    println!(
        "  Tolerance: {}, heuristic: {}",
        report.tolerance, report.heuristic
    );
    println!("  Sensors: {}", report.sensors.len());
    for segment in &report.plan.segments {
        let (first, last) = match (segment.steps.first(), segment.steps.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => continue,
        };
        println!(
            "    Leg {}: {} -> {} in {} steps, {} nodes expanded",
            segment.leg,
            first.location,
            last.location,
            segment.steps.len(),
            segment.nodes_expanded
        );
    }
    println!("Total path cost: {}", report.cost);
    println!("Number of expanded nodes: {}", report.nodes_expanded);
}

fn main() -> RadarResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Cache { cache_dir, action } => run_cache(cache_dir, action),
    }
}
