use crate::constants::{CACHE_DIR_NAME, CACHE_SUBDIR_NAME, DEFAULT_SEED};
use crate::detection::{DetectionFieldBuilder, FieldCache};
use crate::errors::{RadarError, RadarResult, describe_validation_errors};
use crate::geo::{Boundaries, Location};
use crate::graph::{Tolerance, build_graph_with};
use crate::planner::{Heuristic, SolutionPlan, compute_path_cost, path_finding};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use validator::Validate;

/// Per-user directory holding cached detection fields
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(CACHE_DIR_NAME)
        .join(CACHE_SUBDIR_NAME)
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// A named planning problem as written in a scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ScenarioConfig {
    #[validate(length(min = 1))]
    pub name: String,
    pub max_lat: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub min_lon: f64,
    #[validate(range(min = 1, max = 2048))]
    pub height: usize,
    #[validate(range(min = 1, max = 2048))]
    pub width: usize,
    pub n_radars: usize,
    /// `[lat, lon]` pairs visited in order
    #[validate(length(min = 2))]
    pub waypoints: Vec<[f64; 2]>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub heuristic: Heuristic,
}

impl ScenarioConfig {
    /// Check field ranges, boundaries and that the sensors fit on the grid
    pub fn check(&self) -> RadarResult<()> {
        self.validate()
            .map_err(|validation_errors| RadarError::InvalidScenario {
                name: self.name.clone(),
                reason: describe_validation_errors(&validation_errors),
            })?;

        self.boundaries()?;

        if self.n_radars > self.height || self.n_radars > self.width {
            return Err(RadarError::InvalidScenario {
                name: self.name.clone(),
                reason: format!(
                    "{} radars do not fit on distinct rows and columns of a {}x{} grid",
                    self.n_radars, self.height, self.width
                ),
            });
        }

        if let Some(bad) = self
            .waypoints
            .iter()
            .find(|pair| !pair.iter().all(|v| v.is_finite()))
        {
            return Err(RadarError::InvalidScenario {
                name: self.name.clone(),
                reason: format!("waypoint {bad:?} is not finite"),
            });
        }

        Ok(())
    }

    pub fn boundaries(&self) -> RadarResult<Boundaries> {
        Boundaries::new(self.max_lat, self.min_lat, self.max_lon, self.min_lon)
    }

    pub fn waypoints(&self) -> Vec<Location> {
        self.waypoints.iter().copied().map(Location::from).collect()
    }

    /// Field builder with sensors drawn from the scenario's seed
    pub fn builder(&self, cache: Option<FieldCache>) -> RadarResult<DetectionFieldBuilder> {
        self.check()?;

        let mut builder = DetectionFieldBuilder::new(self.boundaries()?, self.height, self.width)?;
        if let Some(cache) = cache {
            builder = builder.with_cache(cache);
        }

        let mut rng = Pcg64::seed_from_u64(self.seed);
        builder.generate_sensors(self.n_radars, &mut rng)?;
        Ok(builder)
    }
}

/// Contents of a scenario file: a list of `[[scenario]]` tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub scenario: Vec<ScenarioConfig>,
}

impl ScenarioFile {
    pub fn load<P: AsRef<Path>>(path: P) -> RadarResult<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn find(&self, name: &str) -> Option<&ScenarioConfig> {
        self.scenario.iter().find(|scenario| scenario.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenario.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Load and check the scenario called `name` from the file at `path`
pub fn load_scenario<P: AsRef<Path>>(path: P, name: &str) -> RadarResult<ScenarioConfig> {
    let path = path.as_ref();
    let file = ScenarioFile::load(path)?;

    let scenario = file
        .find(name)
        .cloned()
        .ok_or_else(|| RadarError::ScenarioNotFound {
            name: name.to_string(),
            path: path.to_path_buf(),
        })?;

    scenario.check()?;
    Ok(scenario)
}

/// Everything a planning run produces, in a form a visualizer can read back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub tolerance: f64,
    pub heuristic: Heuristic,
    pub boundaries: [f64; 4],
    pub detection_field: Vec<Vec<f64>>,
    pub sensors: Vec<Location>,
    pub plan: SolutionPlan,
    pub cost: f64,
    pub nodes_expanded: usize,
}

impl ScenarioReport {
    pub fn export<P: AsRef<Path>>(&self, path: P) -> RadarResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| RadarError::ExportFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            }
        }

        let data = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
            |e| RadarError::ExportFailed {
                path: path.to_path_buf(),
                reason: format!("failed to serialize report: {e}"),
            },
        )?;

        fs::write(path, data).map_err(|e| RadarError::ExportFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!("Exported report to {}", path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> RadarResult<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let (report, _): (ScenarioReport, usize) =
            bincode::serde::decode_from_slice(&data, bincode::config::standard()).map_err(
                |e| RadarError::ExportFailed {
                    path: path.to_path_buf(),
                    reason: format!("failed to deserialize report: {e}"),
                },
            )?;
        Ok(report)
    }
}

/// Options for a single planning run
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub tolerance: Tolerance,
    pub heuristic: Heuristic,
    pub start_index: usize,
    pub cache: Option<FieldCache>,
    pub use_cache: bool,
}

/// Build the field, the graph and the plan for `scenario`
pub fn plan_scenario(scenario: &ScenarioConfig, options: PlanOptions) -> RadarResult<ScenarioReport> {
    let builder = scenario.builder(options.cache)?;
    let field = builder.compute_detection_map(options.use_cache)?;
    let graph = build_graph_with(&field, options.tolerance)?;

    let plan = path_finding(
        &graph,
        options.heuristic,
        &scenario.waypoints(),
        options.start_index,
        builder.boundaries(),
        builder.width(),
        builder.height(),
    )?;
    let cost = compute_path_cost(&graph, &plan)?;

    let boundaries = builder.boundaries();
    Ok(ScenarioReport {
        scenario: scenario.name.clone(),
        tolerance: options.tolerance.get(),
        heuristic: options.heuristic,
        boundaries: [
            boundaries.max_lat(),
            boundaries.min_lat(),
            boundaries.max_lon(),
            boundaries.min_lon(),
        ],
        detection_field: field.to_rows(),
        sensors: builder.sensor_locations(),
        nodes_expanded: plan.nodes_expanded,
        plan,
        cost,
    })
}
