use crate::coordinates::GridCell;
use crate::geo::Location;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadarError {
    // Validation errors
    #[error("Invalid tolerance {value}: {reason}")]
    InvalidTolerance { value: String, reason: String },

    #[error("Missing required input: {field}")]
    MissingInput { field: String },

    #[error("Invalid boundaries: {reason}")]
    InvalidBoundaries { reason: String },

    #[error("Invalid radar sensor: {reason}")]
    InvalidSensor { reason: String },

    #[error("Invalid grid {height}x{width}: {reason}")]
    InvalidGrid {
        height: usize,
        width: usize,
        reason: String,
    },

    #[error("Invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },

    // Computation errors
    #[error("Covariance matrix is singular (determinant {determinant:e})")]
    SingularCovariance { determinant: f64 },

    // Planning errors
    #[error("Empty graph: {reason}")]
    EmptyGraph { reason: String },

    #[error("Insufficient waypoints: {available} available from start index {start_index}, need at least 2")]
    InsufficientWaypoints { available: usize, start_index: usize },

    #[error("Pathfinding aborted due to invalid path segment {leg}: waypoint {waypoint} maps to non-traversable cell {cell}")]
    PathAborted {
        leg: usize,
        waypoint: Location,
        cell: GridCell,
    },

    #[error("No path found for segment {leg} from {from} to {to}")]
    NoPath {
        leg: usize,
        from: GridCell,
        to: GridCell,
    },

    #[error("Plan references missing edge {from} -> {to}")]
    MissingEdge { from: GridCell, to: GridCell },

    // Cache errors, never surfaced from field computation
    #[error("Detection field cache unavailable at {path}: {reason}")]
    CacheUnavailable { path: PathBuf, reason: String },

    #[error("Corrupted cache entry {fingerprint}: {reason}")]
    CorruptedCacheEntry { fingerprint: String, reason: String },

    // Config and IO errors
    #[error("Scenario '{name}' not found in {path}")]
    ScenarioNotFound { name: String, path: PathBuf },

    #[error("Failed to parse scenario file: {0}")]
    ScenarioParse(#[from] toml::de::Error),

    #[error("Failed to export report to {path}: {reason}")]
    ExportFailed { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RadarError {
    /// True for errors caused by malformed or missing caller input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RadarError::InvalidTolerance { .. }
                | RadarError::MissingInput { .. }
                | RadarError::InvalidBoundaries { .. }
                | RadarError::InvalidSensor { .. }
                | RadarError::InvalidGrid { .. }
                | RadarError::InvalidScenario { .. }
        )
    }
}

/// Result type alias for all operations
pub type RadarResult<T> = Result<T, RadarError>;

/// Flatten validator field errors into "field: msg, msg; field: msg"
pub(crate) fn describe_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut details = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            format!("{field}: {}", error_msgs.join(", "))
        })
        .collect::<Vec<String>>();
    details.sort();
    details.join("; ")
}
