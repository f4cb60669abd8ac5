use crate::constants::EPSILON;
use crate::coordinates::GridCell;
use crate::errors::{RadarError, RadarResult};
use crate::geo::{Boundaries, Location};
use crate::radar::RadarSensor;
use rand::Rng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub mod cache;
pub mod fingerprint;

pub use cache::FieldCache;

/// Per-cell detection probabilities over the sampled grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionField {
    height: usize,
    width: usize,
    values: Vec<f64>, // Flattened 2D array (row-major)
}

impl DetectionField {
    /// Create a field from row-major values
    pub fn new(height: usize, width: usize, values: Vec<f64>) -> RadarResult<Self> {
        check_dimensions(height, width)?;

        let expected_size = height * width;
        if values.len() != expected_size {
            return Err(RadarError::InvalidGrid {
                height,
                width,
                reason: format!(
                    "values array size {} does not match {expected_size} cells",
                    values.len()
                ),
            });
        }

        Ok(Self {
            height,
            width,
            values,
        })
    }

    /// Create a field where every cell holds `value`
    pub fn filled(height: usize, width: usize, value: f64) -> RadarResult<Self> {
        Self::new(height, width, vec![value; height * width])
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at `(row, col)`, `None` outside the grid
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.values.get(row * self.width + col).copied()
    }

    pub fn value(&self, cell: GridCell) -> Option<f64> {
        self.get(cell.row, cell.col)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Rows of the field, from min latitude to max latitude
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.width)
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(<[f64]>::to_vec).collect()
    }

    /// Shape and value-range invariants (deserialized fields skip `new`)
    pub(crate) fn is_well_formed(&self) -> bool {
        self.height > 0
            && self.width > 0
            && self.values.len() == self.height * self.width
            && self
                .values
                .iter()
                .all(|value| (EPSILON..=1.0).contains(value))
    }
}

fn check_dimensions(height: usize, width: usize) -> RadarResult<()> {
    if height == 0 || width == 0 {
        return Err(RadarError::InvalidGrid {
            height,
            width,
            reason: "height and width must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Min-max rescale raw detection levels into [EPSILON, 1]
///
/// A flat input (max == min, including all zeros) maps every value to EPSILON.
pub fn normalize(raw: &[f64]) -> Vec<f64> {
    let min_val = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let max_val = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max_val > min_val {
        let range = max_val - min_val;
        raw.iter()
            .map(|&value| {
                let scaled = ((value - min_val) / range) * (1.0 - EPSILON) + EPSILON;
                scaled.clamp(EPSILON, 1.0)
            })
            .collect()
    } else {
        vec![EPSILON; raw.len()]
    }
}

/// Samples the map on a grid and turns the sensors into a detection field
#[derive(Debug, Clone)]
pub struct DetectionFieldBuilder {
    boundaries: Boundaries,
    height: usize,
    width: usize,
    sensors: Vec<RadarSensor>,
    cache: Option<FieldCache>,
}

impl DetectionFieldBuilder {
    /// Create a builder with no sensors and no cache
    pub fn new(boundaries: Boundaries, height: usize, width: usize) -> RadarResult<Self> {
        check_dimensions(height, width)?;
        Ok(Self {
            boundaries,
            height,
            width,
            sensors: Vec::new(),
            cache: None,
        })
    }

    pub fn with_sensors(mut self, sensors: Vec<RadarSensor>) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn with_cache(mut self, cache: FieldCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn boundaries(&self) -> &Boundaries {
        &self.boundaries
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn sensors(&self) -> &[RadarSensor] {
        &self.sensors
    }

    pub fn cache(&self) -> Option<&FieldCache> {
        self.cache.as_ref()
    }

    /// Replace the sensor list with `n_sensors` randomly generated sensors
    ///
    /// Latitudes and longitudes are each drawn without replacement from the
    /// grid's sample points, so every sensor sits on a grid point.
    pub fn generate_sensors<R: Rng>(&mut self, n_sensors: usize, rng: &mut R) -> RadarResult<()> {
        if n_sensors > self.height || n_sensors > self.width {
            return Err(RadarError::InvalidGrid {
                height: self.height,
                width: self.width,
                reason: format!(
                    "cannot place {n_sensors} sensors on distinct rows and columns"
                ),
            });
        }

        let latitudes = self.boundaries.sample_latitudes(self.height);
        let longitudes = self.boundaries.sample_longitudes(self.width);
        let lat_indices = sample(rng, self.height, n_sensors).into_vec();
        let lon_indices = sample(rng, self.width, n_sensors).into_vec();

        let mut sensors = Vec::with_capacity(n_sensors);
        for (lat_index, lon_index) in lat_indices.into_iter().zip(lon_indices) {
            let location = Location::new(latitudes[lat_index], longitudes[lon_index]);
            sensors.push(RadarSensor::random(location, rng)?);
        }

        info!("Generated {n_sensors} radar sensors");
        self.sensors = sensors;
        Ok(())
    }

    /// Coordinates of every sensor, in list order
    pub fn sensor_locations(&self) -> Vec<Location> {
        self.sensors.iter().map(RadarSensor::location).collect()
    }

    /// Cache key of the current configuration
    pub fn fingerprint(&self) -> String {
        fingerprint::fingerprint(&self.boundaries, self.height, self.width, &self.sensors)
    }

    /// Compute the normalized detection field, reusing a cached copy when allowed
    ///
    /// Cache failures never propagate: unreadable entries fall back to a fresh
    /// computation and write failures only log.
    pub fn compute_detection_map(&self, use_cache: bool) -> RadarResult<DetectionField> {
        let fingerprint = self.fingerprint();

        if use_cache {
            if let Some(cache) = &self.cache {
                match cache.load(&fingerprint, self.height, self.width) {
                    Ok(Some(field)) => {
                        info!("Loaded detection field {fingerprint} from cache");
                        return Ok(field);
                    }
                    Ok(None) => debug!("No cached detection field for {fingerprint}"),
                    Err(e) => warn!("{e}; recomputing detection field"),
                }
            }
        }

        let field = self.compute_fresh()?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&fingerprint, &field) {
                warn!("Failed to cache detection field {fingerprint}: {e}");
            }
        }

        Ok(field)
    }

    fn compute_fresh(&self) -> RadarResult<DetectionField> {
        let lat_points = self.boundaries.sample_latitudes(self.height);
        let lon_points = self.boundaries.sample_longitudes(self.width);

        debug!(
            "Computing detection field: {}x{} cells, {} sensors",
            self.height,
            self.width,
            self.sensors.len()
        );

        // Worst-case exposure: a cell is as detected as its most sensitive sensor
        let mut raw = Vec::with_capacity(self.height * self.width);
        for &lat in &lat_points {
            for &lon in &lon_points {
                let mut max_level = 0.0_f64;
                for sensor in &self.sensors {
                    max_level = max_level.max(sensor.detection_level(lat, lon)?);
                }
                raw.push(max_level);
            }
        }

        let field = DetectionField::new(self.height, self.width, normalize(&raw))?;
        info!(
            "Computed detection field {}x{} (min {:.4e}, max {:.4e})",
            field.height(),
            field.width(),
            field.min(),
            field.max()
        );
        Ok(field)
    }

    /// Delete cached fields, optionally only those older than `older_than_days`
    pub fn clear_cache(&self, older_than_days: Option<u64>) -> usize {
        self.cache
            .as_ref()
            .map_or(0, |cache| cache.clear(older_than_days))
    }

    /// Bytes used by cached fields
    pub fn cache_size(&self) -> u64 {
        self.cache.as_ref().map_or(0, FieldCache::size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radar::RadarParams;
    use nalgebra::Matrix2;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use std::fs;
    use tempfile::TempDir;

    fn test_bounds() -> Boundaries {
        Boundaries::new(37.0, 36.0, -115.0, -116.0).unwrap()
    }

    fn seeded_builder(n_sensors: usize) -> DetectionFieldBuilder {
        let mut builder = DetectionFieldBuilder::new(test_bounds(), 10, 10).unwrap();
        let mut rng = Pcg64::seed_from_u64(42);
        builder.generate_sensors(n_sensors, &mut rng).unwrap();
        builder
    }

    fn wide_sensor(location: Location) -> RadarSensor {
        RadarSensor::new(
            location,
            RadarParams {
                transmission_power: 1_000_000.0,
                antenna_gain: 40.0,
                wavelength: 5.0,
                cross_section: 5.0,
                minimum_signal: 1e-13,
                total_loss: 1,
            },
            Matrix2::new(0.05, 0.0, 0.0, 0.08),
        )
        .unwrap()
    }

    #[test]
    fn test_detection_field_creation() {
        let field = DetectionField::new(2, 2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(field.get(0, 1), Some(0.2));
        assert_eq!(field.get(1, 0), Some(0.3));
        assert_eq!(field.value(GridCell::new(1, 1)), Some(0.4));
        assert_eq!(field.get(2, 0), None);
        assert_eq!(field.min(), 0.1);
        assert_eq!(field.max(), 0.4);
        assert_eq!(field.to_rows(), vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_detection_field_invalid_size() {
        assert!(DetectionField::new(2, 2, vec![0.1, 0.2, 0.3]).is_err());
        assert!(DetectionField::new(0, 2, vec![]).is_err());
        assert!(DetectionFieldBuilder::new(test_bounds(), 10, 0).is_err());
    }

    #[test]
    fn test_normalize_range_and_extrema() {
        let normalized = normalize(&[0.0, 2.0, 5.0, 10.0]);
        assert_eq!(normalized[0], EPSILON);
        assert_eq!(normalized[3], 1.0);
        assert!(normalized.iter().all(|v| (EPSILON..=1.0).contains(v)));
    }

    #[test]
    fn test_normalize_degenerate() {
        assert_eq!(normalize(&[0.0; 4]), vec![EPSILON; 4]);
        assert_eq!(normalize(&[3.5; 3]), vec![EPSILON; 3]);
    }

    #[test]
    fn test_normalize_is_monotonic() {
        let mut rng = Pcg64::seed_from_u64(3);
        let raw: Vec<f64> = (0..200).map(|_| rng.gen_range(0.0..1000.0)).collect();
        let normalized = normalize(&raw);

        for a in 0..raw.len() {
            for b in 0..raw.len() {
                if raw[a] < raw[b] {
                    assert!(normalized[a] <= normalized[b]);
                }
            }
        }
    }

    #[test]
    fn test_zero_sensors_field_is_epsilon() {
        let builder = DetectionFieldBuilder::new(test_bounds(), 6, 4).unwrap();
        let field = builder.compute_detection_map(false).unwrap();

        assert_eq!(field.height(), 6);
        assert_eq!(field.width(), 4);
        assert!(field.values().iter().all(|&v| v == EPSILON));
    }

    #[test]
    fn test_field_values_in_range() {
        let builder = seeded_builder(5);
        let field = builder.compute_detection_map(false).unwrap();

        assert_eq!(field.values().len(), 100);
        assert!(field.values().iter().all(|v| (EPSILON..=1.0).contains(v)));
        assert_eq!(field.max(), 1.0);
        assert_eq!(field.min(), EPSILON);
    }

    #[test]
    fn test_epsilon_only_at_true_minimum() {
        let bounds = test_bounds();
        let builder = DetectionFieldBuilder::new(bounds, 8, 8)
            .unwrap()
            .with_sensors(vec![wide_sensor(Location::new(36.3, -115.7))]);
        let field = builder.compute_detection_map(false).unwrap();

        // Recompute the raw levels independently
        let sensor = &builder.sensors()[0];
        let mut raw = Vec::new();
        for lat in bounds.sample_latitudes(8) {
            for lon in bounds.sample_longitudes(8) {
                raw.push(sensor.detection_level(lat, lon).unwrap());
            }
        }
        let raw_min = raw.iter().copied().fold(f64::INFINITY, f64::min);

        for (value, raw_value) in field.values().iter().zip(&raw) {
            if *value == EPSILON {
                assert_eq!(*raw_value, raw_min);
            }
        }
    }

    #[test]
    fn test_sensor_is_hottest_cell() {
        let bounds = test_bounds();
        let lats = bounds.sample_latitudes(10);
        let lons = bounds.sample_longitudes(10);
        let builder = DetectionFieldBuilder::new(bounds, 10, 10)
            .unwrap()
            .with_sensors(vec![wide_sensor(Location::new(lats[3], lons[6]))]);

        let field = builder.compute_detection_map(false).unwrap();
        assert_eq!(field.get(3, 6), Some(1.0));
    }

    #[test]
    fn test_max_aggregation_across_sensors() {
        let bounds = test_bounds();
        let lats = bounds.sample_latitudes(10);
        let lons = bounds.sample_longitudes(10);
        let first = wide_sensor(Location::new(lats[1], lons[1]));
        let second = wide_sensor(Location::new(lats[8], lons[8]));

        let both = DetectionFieldBuilder::new(bounds, 10, 10)
            .unwrap()
            .with_sensors(vec![first, second])
            .compute_detection_map(false)
            .unwrap();

        // Identical sensors peak identically at their own cells
        assert_eq!(both.get(1, 1), Some(1.0));
        assert_eq!(both.get(8, 8), Some(1.0));
    }

    #[test]
    fn test_generate_sensors_on_grid_points() {
        let builder = seeded_builder(5);
        let bounds = test_bounds();
        let lats = bounds.sample_latitudes(10);
        let lons = bounds.sample_longitudes(10);

        let locations = builder.sensor_locations();
        assert_eq!(locations.len(), 5);
        for location in &locations {
            assert!(lats.contains(&location.latitude));
            assert!(lons.contains(&location.longitude));
        }

        // Drawn without replacement on each axis
        for (i, a) in locations.iter().enumerate() {
            for b in &locations[i + 1..] {
                assert_ne!(a.latitude, b.latitude);
                assert_ne!(a.longitude, b.longitude);
            }
        }
    }

    #[test]
    fn test_generate_sensors_is_reproducible() {
        let first = seeded_builder(5);
        let second = seeded_builder(5);
        assert_eq!(first.sensors(), second.sensors());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_generate_too_many_sensors() {
        let mut builder = DetectionFieldBuilder::new(test_bounds(), 4, 10).unwrap();
        let mut rng = Pcg64::seed_from_u64(42);
        let err = builder.generate_sensors(5, &mut rng).unwrap_err();
        assert!(err.is_validation());
        assert!(builder.sensors().is_empty());
    }

    #[test]
    fn test_cache_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FieldCache::open(temp_dir.path()).unwrap();
        let builder = seeded_builder(5).with_cache(cache);

        assert_eq!(builder.cache_size(), 0);
        let computed = builder.compute_detection_map(true).unwrap();
        assert!(builder.cache_size() > 0);

        let entry = builder.cache().unwrap().entry_path(&builder.fingerprint());
        assert!(entry.exists());

        let cached = builder.compute_detection_map(true).unwrap();
        assert_eq!(cached, computed);
    }

    #[test]
    fn test_cache_hit_skips_recomputation() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FieldCache::open(temp_dir.path()).unwrap();
        let builder = seeded_builder(5).with_cache(cache.clone());

        // Plant a different (well-formed) field under the builder's key
        let planted = DetectionField::filled(10, 10, 0.5).unwrap();
        cache.store(&builder.fingerprint(), &planted).unwrap();

        assert_eq!(builder.compute_detection_map(true).unwrap(), planted);
        // Bypassing the cache recomputes and refreshes the entry
        let fresh = builder.compute_detection_map(false).unwrap();
        assert_ne!(fresh, planted);
        assert_eq!(builder.compute_detection_map(true).unwrap(), fresh);
    }

    #[test]
    fn test_corrupted_cache_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FieldCache::open(temp_dir.path()).unwrap();
        let builder = seeded_builder(5).with_cache(cache);

        let expected = builder.compute_detection_map(false).unwrap();
        let entry = builder.cache().unwrap().entry_path(&builder.fingerprint());
        fs::write(&entry, b"\x01\x02 truncated").unwrap();

        let recovered = builder.compute_detection_map(true).unwrap();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn test_changed_configuration_misses_cache() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FieldCache::open(temp_dir.path()).unwrap();

        let first = seeded_builder(5).with_cache(cache.clone());
        first.compute_detection_map(true).unwrap();

        let second = seeded_builder(4).with_cache(cache);
        assert_ne!(first.fingerprint(), second.fingerprint());
        second.compute_detection_map(true).unwrap();

        assert_eq!(second.cache().unwrap().entries().unwrap().len(), 2);
        assert_eq!(second.clear_cache(None), 2);
        assert_eq!(second.cache_size(), 0);
    }

    #[test]
    fn test_builder_without_cache() {
        let builder = seeded_builder(2);
        assert_eq!(builder.cache_size(), 0);
        assert_eq!(builder.clear_cache(None), 0);
    }
}
