use crate::constants::GRID_SNAP_TOLERANCE;
use crate::geo::{Boundaries, Location, interpolate};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Grid coordinates (row = latitude index, col = longitude index)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[display("({row}, {col})")]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Check if this cell lies inside a grid of the given dimensions
    pub fn is_valid_for(&self, height: usize, width: usize) -> bool {
        self.row < height && self.col < width
    }

    /// 4-adjacent neighbors inside the grid, in up/down/left/right order
    pub fn neighbors(&self, height: usize, width: usize) -> Vec<GridCell> {
        let mut neighbors = Vec::with_capacity(4);

        // Up
        if self.row > 0 {
            neighbors.push(GridCell::new(self.row - 1, self.col));
        }

        // Down
        if self.row + 1 < height {
            neighbors.push(GridCell::new(self.row + 1, self.col));
        }

        // Left
        if self.col > 0 {
            neighbors.push(GridCell::new(self.row, self.col - 1));
        }

        // Right
        if self.col + 1 < width {
            neighbors.push(GridCell::new(self.row, self.col + 1));
        }

        neighbors
    }

    /// Manhattan distance to another cell in grid units
    pub fn manhattan_distance(&self, other: &GridCell) -> f64 {
        (self.row.abs_diff(other.row) + self.col.abs_diff(other.col)) as f64
    }

    /// Euclidean distance to another cell in grid units
    pub fn euclidean_distance(&self, other: &GridCell) -> f64 {
        let d_row = self.row.abs_diff(other.row) as f64;
        let d_col = self.col.abs_diff(other.col) as f64;
        (d_row * d_row + d_col * d_col).sqrt()
    }
}

/// Map a coordinate on one axis to its grid index
///
/// The scaled value is floored after adding `GRID_SNAP_TOLERANCE`: a point up
/// to 1e-9 grid units below a sample point maps to that sample's index rather
/// than the one below. Everything else is a plain `floor(norm * (n - 1))`.
fn axis_to_index(value: f64, min: f64, span: f64, count: usize) -> usize {
    let last = count.saturating_sub(1);
    let normalized = (value - min) / span;
    let scaled = normalized * last as f64 + GRID_SNAP_TOLERANCE;
    let index = scaled.floor().max(0.0) as usize;
    index.min(last)
}

/// Convert one geodetic location into a grid cell
///
/// Out-of-range locations are clamped onto the boundaries first.
pub fn location_to_cell(
    location: Location,
    boundaries: &Boundaries,
    width: usize,
    height: usize,
) -> GridCell {
    let clamped = boundaries.clamp(location);
    let col = axis_to_index(
        clamped.longitude,
        boundaries.min_lon(),
        boundaries.lon_span(),
        width,
    );
    let row = axis_to_index(
        clamped.latitude,
        boundaries.min_lat(),
        boundaries.lat_span(),
        height,
    );
    GridCell::new(row, col)
}

/// Convert an ordered list of waypoints into grid cells, preserving order
pub fn discretize(
    waypoints: &[Location],
    boundaries: &Boundaries,
    width: usize,
    height: usize,
) -> Vec<GridCell> {
    waypoints
        .iter()
        .map(|&location| location_to_cell(location, boundaries, width, height))
        .collect()
}

/// Convert a grid cell back into the geodetic point it was sampled at
pub fn cell_to_location(
    cell: GridCell,
    boundaries: &Boundaries,
    width: usize,
    height: usize,
) -> Location {
    let latitude = interpolate(boundaries.min_lat(), boundaries.max_lat(), cell.row, height);
    let longitude = interpolate(boundaries.min_lon(), boundaries.max_lon(), cell.col, width);
    Location::new(latitude, longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bounds() -> Boundaries {
        Boundaries::new(37.0, 36.0, -115.0, -116.0).unwrap()
    }

    #[test]
    fn test_grid_cell_neighbors() {
        let cell = GridCell::new(1, 1);
        let neighbors = cell.neighbors(3, 3);

        assert_eq!(
            neighbors,
            vec![
                GridCell::new(0, 1),
                GridCell::new(2, 1),
                GridCell::new(1, 0),
                GridCell::new(1, 2),
            ]
        );
    }

    #[test]
    fn test_grid_cell_corner_neighbors() {
        let neighbors = GridCell::new(0, 0).neighbors(3, 3);
        assert_eq!(neighbors, vec![GridCell::new(1, 0), GridCell::new(0, 1)]);

        let neighbors = GridCell::new(2, 2).neighbors(3, 3);
        assert_eq!(neighbors, vec![GridCell::new(1, 2), GridCell::new(2, 1)]);

        assert!(GridCell::new(0, 0).neighbors(1, 1).is_empty());
    }

    #[test]
    fn test_distances() {
        let a = GridCell::new(0, 0);
        let b = GridCell::new(3, 4);

        assert_eq!(a.manhattan_distance(&b), 7.0);
        assert_eq!(b.manhattan_distance(&a), 7.0);
        assert_eq!(a.euclidean_distance(&b), 5.0);
        assert_eq!(b.euclidean_distance(&a), 5.0);
    }

    #[test]
    fn test_discretize_corners() {
        let bounds = test_bounds();
        let cells = discretize(
            &[
                Location::new(36.0, -116.0),
                Location::new(37.0, -115.0),
                Location::new(36.0, -115.0),
            ],
            &bounds,
            10,
            8,
        );

        assert_eq!(
            cells,
            vec![GridCell::new(0, 0), GridCell::new(7, 9), GridCell::new(0, 9)]
        );
    }

    #[test]
    fn test_discretize_floors_between_samples() {
        let bounds = test_bounds();
        // Samples every 1/9 degree on a 10-point axis; 36.5 sits between rows 4 and 5
        let cell = location_to_cell(Location::new(36.5, -115.5), &bounds, 10, 10);
        assert_eq!(cell, GridCell::new(4, 4));
    }

    #[test]
    fn test_discretize_snaps_just_below_sample() {
        let bounds = test_bounds();
        // 11 rows, one every 0.1 degrees; row 5 sits on 36.5
        let just_below = Location::new(36.5 - 0.1 * 5e-10, -116.0);
        assert_eq!(location_to_cell(just_below, &bounds, 11, 11).row, 5);

        let clearly_below = Location::new(36.5 - 0.1 * 1e-6, -116.0);
        assert_eq!(location_to_cell(clearly_below, &bounds, 11, 11).row, 4);
    }

    #[test]
    fn test_discretize_clamps_out_of_range() {
        let bounds = test_bounds();
        let cells = discretize(
            &[
                Location::new(37.21979775, -115.88858433),
                Location::new(35.0, -114.0),
            ],
            &bounds,
            10,
            10,
        );

        assert_eq!(cells[0].row, 9);
        assert_eq!(cells[1], GridCell::new(0, 9));
        assert!(cells.iter().all(|cell| cell.is_valid_for(10, 10)));
    }

    #[test]
    fn test_round_trip() {
        let bounds = Boundaries::new(37.3, 35.9, -114.7, -116.2).unwrap();
        for (height, width) in [(10, 10), (7, 13), (1, 5), (64, 3)] {
            for row in 0..height {
                for col in 0..width {
                    let cell = GridCell::new(row, col);
                    let location = cell_to_location(cell, &bounds, width, height);
                    assert!(bounds.contains(location));
                    assert_eq!(location_to_cell(location, &bounds, width, height), cell);
                }
            }
        }
    }

    #[test]
    fn test_cell_to_location_matches_sampling() {
        let bounds = test_bounds();
        let lats = bounds.sample_latitudes(10);
        let lons = bounds.sample_longitudes(12);
        for (row, &lat) in lats.iter().enumerate() {
            for (col, &lon) in lons.iter().enumerate() {
                let location = cell_to_location(GridCell::new(row, col), &bounds, 12, 10);
                assert_eq!(location, Location::new(lat, lon));
            }
        }
    }
}
