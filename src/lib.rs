pub mod config;
pub mod constants;
pub mod coordinates;
pub mod detection;
pub mod errors;
pub mod geo;
pub mod graph;
pub mod planner;
pub mod radar;

// Selective re-exports for external consumers

// Errors - every fallible operation returns these
pub use errors::{RadarError, RadarResult};

// Geometry and sensors
pub use geo::{Boundaries, Location};
pub use radar::{RadarParams, RadarSensor};

// Field construction and caching
pub use detection::{DetectionField, DetectionFieldBuilder, FieldCache};

// Grid, graph and planning
pub use coordinates::{GridCell, cell_to_location, discretize, location_to_cell};
pub use graph::{DetectionGraph, Tolerance, build_graph};
pub use planner::{Heuristic, SolutionPlan, compute_path_cost, path_finding};

// Scenario files and reports
pub use config::{PlanOptions, ScenarioConfig, ScenarioReport, load_scenario, plan_scenario};
