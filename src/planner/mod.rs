use crate::coordinates::{GridCell, cell_to_location, discretize};
use crate::errors::{RadarError, RadarResult};
use crate::geo::{Boundaries, Location};
use crate::graph::DetectionGraph;
use derive_more::Display;
use ordered_float::OrderedFloat;
use pathfinding::prelude::astar;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Distance estimate used to guide the search, in grid-index units
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Heuristic {
    #[display("euclidean")]
    Euclidean,
    #[default]
    #[display("manhattan")]
    Manhattan,
}

impl Heuristic {
    pub fn estimate(self, from: &GridCell, to: &GridCell) -> f64 {
        match self {
            Heuristic::Euclidean => from.euclidean_distance(to),
            Heuristic::Manhattan => from.manhattan_distance(to),
        }
    }
}

impl FromStr for Heuristic {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Heuristic::Euclidean),
            "manhattan" => Ok(Heuristic::Manhattan),
            other => Err(RadarError::InvalidScenario {
                name: "heuristic".to_string(),
                reason: format!("unknown heuristic '{other}', expected euclidean or manhattan"),
            }),
        }
    }
}

/// One cell of a planned route with its geodetic position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub cell: GridCell,
    pub location: Location,
}

/// Route between two consecutive waypoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Index of the leg's first waypoint in the caller's waypoint list
    pub leg: usize,
    pub steps: Vec<PathStep>,
    pub nodes_expanded: usize,
}

impl PathSegment {
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.steps.iter().map(|step| step.cell)
    }
}

/// Complete route through every waypoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionPlan {
    pub segments: Vec<PathSegment>,
    pub nodes_expanded: usize,
}

impl SolutionPlan {
    pub fn step_count(&self) -> usize {
        self.segments.iter().map(|segment| segment.steps.len()).sum()
    }
}

/// Plan a route visiting `waypoints[start_index..]` in order
///
/// Every leg is checked against the graph before any search runs, and a
/// failing leg aborts the whole plan.
pub fn path_finding(
    graph: &DetectionGraph,
    heuristic: Heuristic,
    waypoints: &[Location],
    start_index: usize,
    boundaries: &Boundaries,
    width: usize,
    height: usize,
) -> RadarResult<SolutionPlan> {
    let cells = discretize(waypoints, boundaries, width, height);

    let available = cells.len().saturating_sub(start_index);
    if available < 2 {
        return Err(RadarError::InsufficientWaypoints {
            available,
            start_index,
        });
    }

    if graph.is_empty() {
        return Err(RadarError::EmptyGraph {
            reason: format!("tolerance {} admits no cells", graph.tolerance()),
        });
    }

    for leg in start_index..cells.len() - 1 {
        for index in [leg, leg + 1] {
            if !graph.contains(cells[index]) {
                warn!(
                    "Waypoint {} at {} is outside the traversable graph",
                    index, waypoints[index]
                );
                return Err(RadarError::PathAborted {
                    leg,
                    waypoint: waypoints[index],
                    cell: cells[index],
                });
            }
        }
    }

    let mut segments = Vec::with_capacity(cells.len() - 1 - start_index);
    let mut total_expanded = 0;

    for leg in start_index..cells.len() - 1 {
        let start = cells[leg];
        let goal = cells[leg + 1];

        let (path, nodes_expanded) =
            search_leg(graph, heuristic, start, goal).ok_or(RadarError::NoPath {
                leg,
                from: start,
                to: goal,
            })?;

        debug!(
            "Leg {leg}: {start} -> {goal} in {} steps, {nodes_expanded} expansions",
            path.len()
        );

        let steps = path
            .into_iter()
            .map(|cell| PathStep {
                cell,
                location: cell_to_location(cell, boundaries, width, height),
            })
            .collect();

        total_expanded += nodes_expanded;
        segments.push(PathSegment {
            leg,
            steps,
            nodes_expanded,
        });
    }

    if total_expanded == 0 {
        return Err(RadarError::EmptyGraph {
            reason: format!(
                "no nodes expanded across {} segments, every leg starts on its destination",
                segments.len()
            ),
        });
    }

    info!(
        "Planned {} segments with {heuristic} heuristic, {total_expanded} nodes expanded",
        segments.len()
    );

    Ok(SolutionPlan {
        segments,
        nodes_expanded: total_expanded,
    })
}

/// A* over the graph; returns the cell path and the number of expanded nodes
fn search_leg(
    graph: &DetectionGraph,
    heuristic: Heuristic,
    start: GridCell,
    goal: GridCell,
) -> Option<(Vec<GridCell>, usize)> {
    let mut expanded = 0;

    let result = astar(
        &start,
        |cell| {
            expanded += 1;
            graph
                .successors(*cell)
                .iter()
                .map(|&(neighbor, weight)| (neighbor, OrderedFloat(weight)))
                .collect::<Vec<_>>()
        },
        |cell| OrderedFloat(heuristic.estimate(cell, &goal)),
        |cell| *cell == goal,
    );

    result.map(|(path, _cost)| (path, expanded))
}

/// Total edge weight along every segment of `plan`
pub fn compute_path_cost(graph: &DetectionGraph, plan: &SolutionPlan) -> RadarResult<f64> {
    let mut cost = 0.0;
    for segment in &plan.segments {
        for pair in segment.steps.windows(2) {
            let (from, to) = (pair[0].cell, pair[1].cell);
            cost += graph
                .edge_weight(from, to)
                .ok_or(RadarError::MissingEdge { from, to })?;
        }
    }
    Ok(cost)
}
