use crate::errors::{RadarError, RadarResult};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A bidimensional geodetic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Display, Serialize, Deserialize)]
#[display("[{latitude}, {longitude}]")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

impl From<[f64; 2]> for Location {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

/// Rectangular geodetic limits of the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    max_lat: f64,
    min_lat: f64,
    max_lon: f64,
    min_lon: f64,
}

impl Boundaries {
    /// Create boundaries, rejecting empty or inverted ranges
    pub fn new(max_lat: f64, min_lat: f64, max_lon: f64, min_lon: f64) -> RadarResult<Self> {
        if ![max_lat, min_lat, max_lon, min_lon]
            .iter()
            .all(|value| value.is_finite())
        {
            return Err(RadarError::InvalidBoundaries {
                reason: format!(
                    "all limits must be finite, got lat [{min_lat}, {max_lat}] lon [{min_lon}, {max_lon}]"
                ),
            });
        }

        if max_lat <= min_lat {
            return Err(RadarError::InvalidBoundaries {
                reason: format!("max_lat {max_lat} must be greater than min_lat {min_lat}"),
            });
        }

        if max_lon <= min_lon {
            return Err(RadarError::InvalidBoundaries {
                reason: format!("max_lon {max_lon} must be greater than min_lon {min_lon}"),
            });
        }

        Ok(Self {
            max_lat,
            min_lat,
            max_lon,
            min_lon,
        })
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Check if a location lies inside (or on the edge of) the boundaries
    pub fn contains(&self, location: Location) -> bool {
        (self.min_lat..=self.max_lat).contains(&location.latitude)
            && (self.min_lon..=self.max_lon).contains(&location.longitude)
    }

    /// Pull a location onto the nearest point inside the boundaries
    pub fn clamp(&self, location: Location) -> Location {
        Location::new(
            location.latitude.clamp(self.min_lat, self.max_lat),
            location.longitude.clamp(self.min_lon, self.max_lon),
        )
    }

    /// Latitudes of the `height` grid rows, from min_lat to max_lat
    pub fn sample_latitudes(&self, height: usize) -> Vec<f64> {
        linspace(self.min_lat, self.max_lat, height)
    }

    /// Longitudes of the `width` grid columns, from min_lon to max_lon
    pub fn sample_longitudes(&self, width: usize) -> Vec<f64> {
        linspace(self.min_lon, self.max_lon, width)
    }
}

/// Value of sample `index` out of `count` evenly spaced samples over [start, stop]
///
/// A single sample sits on `start`. Both the field sampling and the inverse
/// grid mapping go through this function so they agree bit for bit.
pub fn interpolate(start: f64, stop: f64, index: usize, count: usize) -> f64 {
    if count <= 1 {
        return start;
    }
    if index + 1 == count {
        return stop;
    }
    start + (index as f64 / (count - 1) as f64) * (stop - start)
}

/// Evenly spaced samples over [start, stop], endpoints included
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|index| interpolate(start, stop, index, count))
        .collect()
}
