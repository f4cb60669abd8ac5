use radar_pathfinder::errors::{RadarError, RadarResult};
use radar_pathfinder::geo::Location;
use std::path::Path;

/// Generic parser for delimited strings that return fixed-size arrays
pub fn parse_delimited<T, const N: usize>(
    input: &str,
    delimiter: char,
    type_name: &str,
    parser: impl Fn(&str) -> Result<T, std::num::ParseFloatError>,
) -> RadarResult<[T; N]>
where
    T: Copy + Default,
{
    let parts: Vec<&str> = input.split(delimiter).collect();
    if parts.len() != N {
        return Err(RadarError::InvalidScenario {
            name: type_name.to_string(),
            reason: format!("'{input}' must have {N} {delimiter}-separated values"),
        });
    }

    let mut result = [T::default(); N];
    for (i, part) in parts.iter().enumerate() {
        result[i] = parser(part.trim()).map_err(|_| RadarError::InvalidScenario {
            name: type_name.to_string(),
            reason: format!("invalid value '{part}'"),
        })?;
    }

    Ok(result)
}

/// Parse a location string "LAT,LON"
pub fn parse_location(location_str: &str) -> RadarResult<Location> {
    let [latitude, longitude] =
        parse_delimited::<f64, 2>(location_str, ',', "location", |s| s.parse())?;

    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(RadarError::InvalidScenario {
            name: "location".to_string(),
            reason: format!("'{location_str}' is not finite"),
        });
    }

    Ok(Location::new(latitude, longitude))
}

/// Parse a waypoint list "LAT,LON;LAT,LON;..."
pub fn parse_waypoints(waypoints_str: &str) -> RadarResult<Vec<Location>> {
    let waypoints = waypoints_str
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_location)
        .collect::<RadarResult<Vec<Location>>>()?;

    if waypoints.len() < 2 {
        return Err(RadarError::InsufficientWaypoints {
            available: waypoints.len(),
            start_index: 0,
        });
    }

    Ok(waypoints)
}

/// Reject export targets that are directories
pub fn validate_export_path(path: &Path) -> RadarResult<()> {
    if path.is_dir() {
        return Err(RadarError::ExportFailed {
            path: path.to_path_buf(),
            reason: "export target is a directory".to_string(),
        });
    }
    Ok(())
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
