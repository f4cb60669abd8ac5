use crate::constants::EPSILON;
use crate::coordinates::GridCell;
use crate::detection::DetectionField;
use crate::errors::{RadarError, RadarResult};
use derive_more::Display;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

/// Maximum admissible detection probability, validated into (EPSILON, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display)]
pub struct Tolerance(f64);

impl Tolerance {
    pub fn new(value: f64) -> RadarResult<Self> {
        if !value.is_finite() {
            return Err(RadarError::InvalidTolerance {
                value: value.to_string(),
                reason: "tolerance must be a finite number".to_string(),
            });
        }

        if value <= EPSILON || value > 1.0 {
            return Err(RadarError::InvalidTolerance {
                value: value.to_string(),
                reason: format!("tolerance must lie in ({EPSILON}, 1]"),
            });
        }

        Ok(Self(value))
    }

    /// Validate an optional tolerance, treating `None` as missing input
    pub fn from_option(value: Option<f64>) -> RadarResult<Self> {
        let value = value.ok_or_else(|| RadarError::MissingInput {
            field: "tolerance".to_string(),
        })?;
        Self::new(value)
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl FromStr for Tolerance {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RadarError::MissingInput {
                field: "tolerance".to_string(),
            });
        }

        let value = trimmed
            .parse::<f64>()
            .map_err(|_| RadarError::InvalidTolerance {
                value: trimmed.to_string(),
                reason: "tolerance must be numeric".to_string(),
            })?;
        Self::new(value)
    }
}

/// Directed traversability graph over the admitted cells of a detection field
#[derive(Debug, Clone)]
pub struct DetectionGraph {
    height: usize,
    width: usize,
    tolerance: Tolerance,
    /// Outgoing edges per admitted cell, weighted by the destination's value
    adjacency: HashMap<GridCell, Vec<(GridCell, f64)>>,
}

impl DetectionGraph {
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        self.adjacency.contains_key(&cell)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Admitted cells in row-major order
    pub fn nodes(&self) -> Vec<GridCell> {
        let mut nodes: Vec<GridCell> = self.adjacency.keys().copied().collect();
        nodes.sort();
        nodes
    }

    /// Outgoing `(neighbor, weight)` pairs of `cell`, empty if not admitted
    pub fn successors(&self, cell: GridCell) -> &[(GridCell, f64)] {
        self.adjacency
            .get(&cell)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Weight of the edge `from -> to`, `None` if the edge does not exist
    pub fn edge_weight(&self, from: GridCell, to: GridCell) -> Option<f64> {
        self.successors(from)
            .iter()
            .find(|(neighbor, _)| *neighbor == to)
            .map(|&(_, weight)| weight)
    }
}

/// Build the traversability graph of `field` for a tolerance
///
/// Cells with a value at or below the tolerance become nodes; each node links
/// to its admitted up/down/left/right neighbors.
pub fn build_graph(field: &DetectionField, tolerance: Option<f64>) -> RadarResult<DetectionGraph> {
    let tolerance = Tolerance::from_option(tolerance)?;
    build_graph_with(field, tolerance)
}

/// Build the traversability graph of `field` for an already validated tolerance
pub fn build_graph_with(
    field: &DetectionField,
    tolerance: Tolerance,
) -> RadarResult<DetectionGraph> {
    let height = field.height();
    let width = field.width();
    let is_admitted = |cell: GridCell| {
        field
            .value(cell)
            .is_some_and(|value| value <= tolerance.get())
    };

    // First pass: admit nodes
    let mut adjacency: HashMap<GridCell, Vec<(GridCell, f64)>> = HashMap::new();
    for row in 0..height {
        for col in 0..width {
            let cell = GridCell::new(row, col);
            if is_admitted(cell) {
                adjacency.insert(cell, Vec::new());
            }
        }
    }

    if adjacency.is_empty() {
        return Err(RadarError::EmptyGraph {
            reason: format!(
                "tolerance {tolerance} admits none of the {} cells (field minimum {:.4e})",
                height * width,
                field.min()
            ),
        });
    }

    // Second pass: connect admitted 4-neighbors
    for (cell, edges) in adjacency.iter_mut() {
        for neighbor in cell.neighbors(height, width) {
            if let Some(weight) = field.value(neighbor).filter(|&v| v <= tolerance.get()) {
                edges.push((neighbor, weight));
            }
        }
    }

    let graph = DetectionGraph {
        height,
        width,
        tolerance,
        adjacency,
    };

    info!(
        "Built graph with tolerance {tolerance}: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    Ok(graph)
}
