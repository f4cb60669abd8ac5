//! Cache key derivation for detection fields.
//!
//! The key is a SHA-256 digest over an explicit text serialization with a
//! fixed field order and `{:e}` float formatting, so the same configuration
//! always produces the same key regardless of platform or process.

use crate::constants::FINGERPRINT_VERSION;
use crate::geo::Boundaries;
use crate::radar::RadarSensor;
use sha2::{Digest, Sha256};

/// Canonical text form of a detection field configuration, one line per record
pub fn canonical_form(
    boundaries: &Boundaries,
    height: usize,
    width: usize,
    sensors: &[RadarSensor],
) -> String {
    let mut lines = vec![
        FINGERPRINT_VERSION.to_string(),
        format!(
            "boundaries:{:e},{:e},{:e},{:e}",
            boundaries.max_lat(),
            boundaries.min_lat(),
            boundaries.max_lon(),
            boundaries.min_lon()
        ),
        format!("dimensions:{height}x{width}"),
        format!("sensors:{}", sensors.len()),
    ];

    lines.extend(sensors.iter().enumerate().map(|(index, sensor)| {
        let location = sensor.location();
        let params = sensor.params();
        let covariance = sensor.covariance();
        format!(
            "sensor[{index}]:{:e},{:e}|{:e},{:e},{:e},{:e},{:e},{}|{:e},{:e},{:e},{:e}",
            location.latitude,
            location.longitude,
            params.transmission_power,
            params.antenna_gain,
            params.wavelength,
            params.cross_section,
            params.minimum_signal,
            params.total_loss,
            covariance[(0, 0)],
            covariance[(0, 1)],
            covariance[(1, 0)],
            covariance[(1, 1)],
        )
    }));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Hex-encoded SHA-256 fingerprint of a detection field configuration
pub fn fingerprint(
    boundaries: &Boundaries,
    height: usize,
    width: usize,
    sensors: &[RadarSensor],
) -> String {
    let canonical = canonical_form(boundaries, height, width, sensors);
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Location;
    use crate::radar::RadarParams;
    use nalgebra::Matrix2;

    fn sensor(lat: f64, lon: f64, power: f64) -> RadarSensor {
        RadarSensor::new(
            Location::new(lat, lon),
            RadarParams {
                transmission_power: power,
                antenna_gain: 20.0,
                wavelength: 0.5,
                cross_section: 2.0,
                minimum_signal: 1e-12,
                total_loss: 3,
            },
            Matrix2::new(1e-4, 0.0, 0.0, 2e-4),
        )
        .unwrap()
    }

    fn bounds() -> Boundaries {
        Boundaries::new(37.0, 36.0, -115.0, -116.0).unwrap()
    }

    #[test]
    fn test_canonical_form_layout() {
        let canonical = canonical_form(&bounds(), 10, 12, &[sensor(36.5, -115.5, 1000.0)]);
        let lines: Vec<&str> = canonical.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(canonical.ends_with('\n'));

        assert_eq!(lines[0], FINGERPRINT_VERSION);
        assert_eq!(lines[1], "boundaries:3.7e1,3.6e1,-1.15e2,-1.16e2");
        assert_eq!(lines[2], "dimensions:10x12");
        assert_eq!(lines[3], "sensors:1");
        assert_eq!(
            lines[4],
            "sensor[0]:3.65e1,-1.155e2|1e3,2e1,5e-1,2e0,1e-12,3|1e-4,0e0,0e0,2e-4"
        );
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let sensors = vec![sensor(36.5, -115.5, 1000.0), sensor(36.2, -115.9, 50.0)];
        let first = fingerprint(&bounds(), 10, 10, &sensors);
        let second = fingerprint(&bounds(), 10, 10, &sensors.clone());

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let sensors = vec![sensor(36.5, -115.5, 1000.0), sensor(36.2, -115.9, 50.0)];
        let base = fingerprint(&bounds(), 10, 10, &sensors);

        // Dimensions
        assert_ne!(base, fingerprint(&bounds(), 10, 11, &sensors));
        assert_ne!(base, fingerprint(&bounds(), 11, 10, &sensors));

        // Boundaries
        let shifted = Boundaries::new(37.0, 36.0, -115.0, -116.5).unwrap();
        assert_ne!(base, fingerprint(&shifted, 10, 10, &sensors));

        // Sensor parameters
        let changed = vec![sensor(36.5, -115.5, 1000.5), sensor(36.2, -115.9, 50.0)];
        assert_ne!(base, fingerprint(&bounds(), 10, 10, &changed));

        // Sensor order
        let swapped = vec![sensors[1].clone(), sensors[0].clone()];
        assert_ne!(base, fingerprint(&bounds(), 10, 10, &swapped));

        // Sensor count
        assert_ne!(base, fingerprint(&bounds(), 10, 10, &sensors[..1]));
        assert_ne!(base, fingerprint(&bounds(), 10, 10, &[]));
    }
}
