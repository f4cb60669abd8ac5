//! Single radar sensor model.
//!
//! The detection range comes from the monostatic radar equation
//! `R = [(P·G²·λ²·σ) / ((4π)³·S_min·L)]^(1/4)`; inside that range the
//! detection level is a bivariate Gaussian centred on the sensor whose
//! covariance shapes the footprint.

use crate::constants::*;
use crate::errors::{RadarError, RadarResult, describe_validation_errors};
use crate::geo::Location;
use nalgebra::{Matrix2, Vector2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use validator::Validate;

/// Physical configuration of a radar sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct RadarParams {
    /// Transmission power (W)
    #[validate(range(exclusive_min = 0.0))]
    pub transmission_power: f64,
    /// Antenna gain (no units)
    #[validate(range(exclusive_min = 0.0))]
    pub antenna_gain: f64,
    /// Wavelength (m)
    #[validate(range(exclusive_min = 0.0))]
    pub wavelength: f64,
    /// Radar cross-section of the target (m²)
    #[validate(range(exclusive_min = 0.0))]
    pub cross_section: f64,
    /// Minimum detectable signal (W)
    #[validate(range(exclusive_min = 0.0))]
    pub minimum_signal: f64,
    /// Total system loss (no units, discrete)
    #[validate(range(min = 1))]
    pub total_loss: u32,
}

impl RadarParams {
    /// Draw a parameter set from the generation ranges
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            transmission_power: rng
                .gen_range(TRANSMISSION_POWER_RANGE.0..TRANSMISSION_POWER_RANGE.1),
            antenna_gain: rng.gen_range(ANTENNA_GAIN_RANGE.0..ANTENNA_GAIN_RANGE.1),
            wavelength: rng.gen_range(WAVELENGTH_RANGE.0..WAVELENGTH_RANGE.1),
            cross_section: rng.gen_range(CROSS_SECTION_RANGE.0..CROSS_SECTION_RANGE.1),
            minimum_signal: rng.gen_range(MINIMUM_SIGNAL_RANGE.0..MINIMUM_SIGNAL_RANGE.1),
            total_loss: rng.gen_range(TOTAL_LOSS_RANGE.0..TOTAL_LOSS_RANGE.1),
        }
    }

    fn check(&self) -> RadarResult<()> {
        let floats = [
            self.transmission_power,
            self.antenna_gain,
            self.wavelength,
            self.cross_section,
            self.minimum_signal,
        ];
        if !floats.iter().all(|value| value.is_finite()) {
            return Err(RadarError::InvalidSensor {
                reason: format!("parameters must be finite: {self:?}"),
            });
        }

        self.validate()
            .map_err(|validation_errors| RadarError::InvalidSensor {
                reason: describe_validation_errors(&validation_errors),
            })
    }
}

/// A fixed radar sensor, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct RadarSensor {
    location: Location,
    params: RadarParams,
    covariance: Matrix2<f64>,
}

impl RadarSensor {
    /// Create a sensor with an explicit covariance matrix
    ///
    /// The covariance must be symmetric positive-definite.
    pub fn new(
        location: Location,
        params: RadarParams,
        covariance: Matrix2<f64>,
    ) -> RadarResult<Self> {
        if !location.latitude.is_finite() || !location.longitude.is_finite() {
            return Err(RadarError::InvalidSensor {
                reason: format!("location {location} is not finite"),
            });
        }

        params.check()?;
        check_covariance(&covariance)?;

        Ok(Self {
            location,
            params,
            covariance,
        })
    }

    /// Create a sensor whose covariance is a random diagonal matrix
    pub fn with_random_covariance<R: Rng>(
        location: Location,
        params: RadarParams,
        rng: &mut R,
    ) -> RadarResult<Self> {
        let covariance = random_covariance(rng);
        Self::new(location, params, covariance)
    }

    /// Create a sensor with random parameters and covariance at `location`
    pub fn random<R: Rng>(location: Location, rng: &mut R) -> RadarResult<Self> {
        let params = RadarParams::random(rng);
        Self::with_random_covariance(location, params, rng)
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn params(&self) -> &RadarParams {
        &self.params
    }

    pub fn covariance(&self) -> &Matrix2<f64> {
        &self.covariance
    }

    /// Maximum detection range in meters
    pub fn max_range(&self) -> f64 {
        let p = &self.params;
        let numerator = p.transmission_power
            * p.antenna_gain.powi(2)
            * p.wavelength.powi(2)
            * p.cross_section;
        let denominator = (4.0 * PI).powi(3) * p.minimum_signal * p.total_loss as f64;
        (numerator / denominator).powf(0.25)
    }

    /// Detection level of this sensor at a geodetic point
    ///
    /// Zero beyond `max_range()`, otherwise the unnormalized Gaussian density
    /// of the sensor footprint.
    pub fn detection_level(&self, latitude: f64, longitude: f64) -> RadarResult<f64> {
        let d_lat = latitude - self.location.latitude;
        let d_lon = longitude - self.location.longitude;
        let distance = (d_lat * d_lat + d_lon * d_lon).sqrt() * METERS_PER_DEGREE;

        if distance > self.max_range() {
            return Ok(0.0);
        }

        let determinant = self.covariance.determinant();
        let inverse = self
            .covariance
            .try_inverse()
            .filter(|_| determinant > 0.0)
            .ok_or(RadarError::SingularCovariance { determinant })?;

        let discrepancy = Vector2::new(d_lat, d_lon);
        let mahalanobis = discrepancy.dot(&(inverse * discrepancy));
        let scale = 1.0 / (2.0 * PI * determinant.sqrt());

        Ok(scale * (-0.5 * mahalanobis).exp())
    }
}

/// Random diagonal covariance, positive-definite by construction
pub fn random_covariance<R: Rng>(rng: &mut R) -> Matrix2<f64> {
    let var_lat = rng.gen_range(COVARIANCE_VARIANCE_MIN..COVARIANCE_VARIANCE_MAX);
    let var_lon = rng.gen_range(COVARIANCE_VARIANCE_MIN..COVARIANCE_VARIANCE_MAX);
    Matrix2::new(var_lat, 0.0, 0.0, var_lon)
}

fn check_covariance(covariance: &Matrix2<f64>) -> RadarResult<()> {
    if !covariance.iter().all(|value| value.is_finite()) {
        return Err(RadarError::InvalidSensor {
            reason: "covariance entries must be finite".to_string(),
        });
    }

    let off_diagonal_gap = (covariance[(0, 1)] - covariance[(1, 0)]).abs();
    let magnitude = covariance.amax().max(f64::MIN_POSITIVE);
    if off_diagonal_gap > 1e-12 * magnitude {
        return Err(RadarError::InvalidSensor {
            reason: format!(
                "covariance must be symmetric, got off-diagonal {} and {}",
                covariance[(0, 1)],
                covariance[(1, 0)]
            ),
        });
    }

    // Sylvester's criterion for a 2x2 symmetric matrix
    let determinant = covariance.determinant();
    if covariance[(0, 0)] <= 0.0 || determinant <= 0.0 {
        return Err(RadarError::InvalidSensor {
            reason: format!(
                "covariance must be positive-definite (a00 = {:e}, det = {determinant:e})",
                covariance[(0, 0)]
            ),
        });
    }

    Ok(())
}
