//! Constants for the detection model and planner

/// Floor of every normalized detection value, keeps cell costs above zero
pub const EPSILON: f64 = 1e-4;

/// Meters per degree used by the flat-earth distance approximation
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Range of the independent variances of a generated covariance matrix
pub const COVARIANCE_VARIANCE_MIN: f64 = 2e-5;
pub const COVARIANCE_VARIANCE_MAX: f64 = 2e-4;

/// Random sensor generation ranges (upper bounds exclusive)
pub const TRANSMISSION_POWER_RANGE: (f64, f64) = (1.0, 1_000_000.0);
pub const ANTENNA_GAIN_RANGE: (f64, f64) = (10.0, 50.0);
pub const WAVELENGTH_RANGE: (f64, f64) = (0.001, 10.0);
pub const CROSS_SECTION_RANGE: (f64, f64) = (0.1, 10.0);
pub const MINIMUM_SIGNAL_RANGE: (f64, f64) = (1e-15, 1e-10);
pub const TOTAL_LOSS_RANGE: (u32, u32) = (1, 10);

/// Seed used when a scenario does not provide one
pub const DEFAULT_SEED: u64 = 42;

/// Snapping margin applied before flooring a scaled grid coordinate
pub const GRID_SNAP_TOLERANCE: f64 = 1e-9;

/// Cache layout
pub const CACHE_DIR_NAME: &str = "radar-pathfinder";
pub const CACHE_SUBDIR_NAME: &str = "detection-fields";
pub const CACHE_FILE_EXTENSION: &str = "bin";
pub const FINGERPRINT_VERSION: &str = "detection-field-v1";

pub const SECONDS_PER_DAY: u64 = 86_400;
