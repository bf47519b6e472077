// src/routing/graph.rs
//! In-memory road graph and A* router

use super::route::Route;
use super::router::{Router, RouterError};
use crate::error::{NavError, Result};
use crate::geo::{haversine_distance, Coordinate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Node expansions between cancellation checks
const YIELD_EVERY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub to: usize,
    pub length_m: f64,
    pub speed_mps: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadGraph {
    nodes: Vec<Coordinate>,
    edges: Vec<Vec<Edge>>,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, at: Coordinate) -> usize {
        self.nodes.push(at);
        self.edges.push(Vec::new());
        self.nodes.len() - 1
    }

    /// One-way edge from `from` to `to`
    pub fn add_one_way(&mut self, from: usize, to: usize, speed_mps: f64) -> Result<()> {
        if from >= self.nodes.len() || to >= self.nodes.len() {
            return Err(NavError::InvalidInput(format!(
                "edge {} -> {} references a missing node",
                from, to
            )));
        }
        if !speed_mps.is_finite() || speed_mps <= 0.0 {
            return Err(NavError::InvalidInput(format!(
                "edge speed must be > 0, got {}",
                speed_mps
            )));
        }

        let length_m = haversine_distance(self.nodes[from], self.nodes[to]);
        self.edges[from].push(Edge { to, length_m, speed_mps });
        Ok(())
    }

    pub fn add_road(&mut self, a: usize, b: usize, speed_mps: f64) -> Result<()> {
        self.add_one_way(a, b, speed_mps)?;
        self.add_one_way(b, a, speed_mps)
    }

    pub fn node(&self, index: usize) -> Option<Coordinate> {
        self.nodes.get(index).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Closest node within `radius_m`
    pub fn nearest_node(&self, at: Coordinate, radius_m: f64) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i, haversine_distance(at, *n)))
            .filter(|(_, d)| *d <= radius_m)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Open {
    estimate: f64,
    node: usize,
}

impl Eq for Open {}

impl Ord for Open {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on the estimate
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Open {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest-distance router over a [`RoadGraph`]
#[derive(Debug, Clone)]
pub struct GraphRouter {
    graph: Arc<RoadGraph>,
    snap_radius_m: f64,
}

impl GraphRouter {
    pub fn new(graph: Arc<RoadGraph>, snap_radius_m: f64) -> Self {
        Self { graph, snap_radius_m }
    }

    /// Node path and per-leg speeds from `from` to `to`
    async fn search(
        &self,
        from: usize,
        to: usize,
        cancel: &CancellationToken,
    ) -> std::result::Result<(Vec<usize>, Vec<f64>), RouterError> {
        let graph = &self.graph;
        let goal = graph.nodes[to];
        let n = graph.node_count();

        let mut cost = vec![f64::INFINITY; n];
        let mut came_from: Vec<Option<(usize, f64)>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut open = BinaryHeap::new();

        cost[from] = 0.0;
        open.push(Open {
            estimate: haversine_distance(graph.nodes[from], goal),
            node: from,
        });

        let mut expanded = 0usize;
        while let Some(Open { node, .. }) = open.pop() {
            if closed[node] {
                continue;
            }
            if node == to {
                break;
            }
            closed[node] = true;

            expanded += 1;
            if expanded % YIELD_EVERY == 0 {
                if cancel.is_cancelled() {
                    return Err(RouterError::Cancelled);
                }
                tokio::task::yield_now().await;
            }

            for edge in &graph.edges[node] {
                let candidate = cost[node] + edge.length_m;
                if candidate < cost[edge.to] {
                    cost[edge.to] = candidate;
                    came_from[edge.to] = Some((node, edge.speed_mps));
                    open.push(Open {
                        estimate: candidate + haversine_distance(graph.nodes[edge.to], goal),
                        node: edge.to,
                    });
                }
            }
        }

        if from != to && came_from[to].is_none() {
            return Err(RouterError::NoRoute);
        }

        let mut path = vec![to];
        let mut speeds = Vec::new();
        let mut current = to;
        while let Some((prev, speed)) = came_from[current] {
            path.push(prev);
            speeds.push(speed);
            current = prev;
        }
        path.reverse();
        speeds.reverse();
        debug!(expanded, nodes = path.len(), "graph search finished");
        Ok((path, speeds))
    }
}

#[async_trait]
impl Router for GraphRouter {
    fn name(&self) -> &str {
        "graph"
    }

    async fn calculate(
        &self,
        start: Coordinate,
        target: Coordinate,
        cancel: &CancellationToken,
    ) -> std::result::Result<Route, RouterError> {
        if cancel.is_cancelled() {
            return Err(RouterError::Cancelled);
        }

        let from = self
            .graph
            .nearest_node(start, self.snap_radius_m)
            .ok_or(RouterError::StartNotFound)?;
        let to = self
            .graph
            .nearest_node(target, self.snap_radius_m)
            .ok_or(RouterError::EndNotFound)?;

        let (path, speeds) = self.search(from, to, cancel).await?;
        let mut points: Vec<Coordinate> = path.iter().map(|&i| self.graph.nodes[i]).collect();
        let mut speeds = speeds;
        if from == to {
            // Single node: keep a two-point route so the target is reachable geometry
            points.push(points[0]);
            speeds.push(1.0);
        }

        Route::new(points, &speeds).map_err(|e| RouterError::Internal(e.to_string()))
    }
}
