// src/routing/route.rs
//! Route geometry, turn instructions and progress along the route

use crate::error::{NavError, Result};
use crate::geo::{haversine_distance, initial_bearing, Coordinate, EARTH_RADIUS_M};
use crate::region::RegionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const SLIGHT_TURN_DEG: f64 = 15.0;
const TURN_DEG: f64 = 45.0;
const SHARP_TURN_DEG: f64 = 120.0;
const U_TURN_DEG: f64 = 170.0;

/// Legs shorter than this have no usable bearing
const MIN_LEG_M: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    GoStraight,
    SlightRight,
    Right,
    SharpRight,
    SlightLeft,
    Left,
    SharpLeft,
    UTurn,
    ReachedDestination,
}

impl TurnDirection {
    /// Classify a signed heading change; positive turns right
    pub fn from_heading_change(delta_deg: f64) -> Self {
        let right = delta_deg > 0.0;
        match delta_deg.abs() {
            m if m > U_TURN_DEG => TurnDirection::UTurn,
            m if m > SHARP_TURN_DEG && right => TurnDirection::SharpRight,
            m if m > SHARP_TURN_DEG => TurnDirection::SharpLeft,
            m if m > TURN_DEG && right => TurnDirection::Right,
            m if m > TURN_DEG => TurnDirection::Left,
            m if m > SLIGHT_TURN_DEG && right => TurnDirection::SlightRight,
            m if m > SLIGHT_TURN_DEG => TurnDirection::SlightLeft,
            _ => TurnDirection::GoStraight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Index of the route vertex where the turn happens
    pub point_index: usize,
    pub direction: TurnDirection,
    /// Distance from the route start to the turn
    pub distance_m: f64,
}

/// Where a position falls relative to the route polyline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub segment: usize,
    pub along_m: f64,
    pub off_route_m: f64,
    pub time_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteFollowingInfo {
    pub distance_to_target_m: f64,
    pub time_to_target_s: f64,
    pub distance_to_turn_m: f64,
    pub turn: TurnDirection,
    /// Fraction of the route already covered, in [0, 1]
    pub progress: f64,
    pub off_route_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    points: Vec<Coordinate>,
    cumulative_m: Vec<f64>,
    cumulative_s: Vec<f64>,
    turns: Vec<Turn>,
    target: Coordinate,
    regions: BTreeSet<RegionId>,
}

impl Route {
    /// Build a route from its vertices and the speed of each leg
    pub fn new(points: Vec<Coordinate>, leg_speeds_mps: &[f64]) -> Result<Self> {
        let Some(&target) = points.last() else {
            return Err(NavError::InvalidInput("route needs at least one point".to_string()));
        };
        if leg_speeds_mps.len() + 1 != points.len() {
            return Err(NavError::InvalidInput(format!(
                "{} points need {} leg speeds, got {}",
                points.len(),
                points.len() - 1,
                leg_speeds_mps.len()
            )));
        }
        if let Some(bad) = leg_speeds_mps.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(NavError::InvalidInput(format!("leg speed must be > 0, got {}", bad)));
        }

        let mut cumulative_m = Vec::with_capacity(points.len());
        let mut cumulative_s = Vec::with_capacity(points.len());
        cumulative_m.push(0.0);
        cumulative_s.push(0.0);
        for (i, pair) in points.windows(2).enumerate() {
            let leg = haversine_distance(pair[0], pair[1]);
            cumulative_m.push(cumulative_m[i] + leg);
            cumulative_s.push(cumulative_s[i] + leg / leg_speeds_mps[i]);
        }

        let turns = detect_turns(&points, &cumulative_m);

        Ok(Self {
            points,
            cumulative_m,
            cumulative_s,
            turns,
            target,
            regions: BTreeSet::new(),
        })
    }

    pub fn with_uniform_speed(points: Vec<Coordinate>, speed_mps: f64) -> Result<Self> {
        let legs = vec![speed_mps; points.len().saturating_sub(1)];
        Self::new(points, &legs)
    }

    /// Record the regions the route passes through
    pub fn with_regions(mut self, regions: BTreeSet<RegionId>) -> Self {
        self.regions = regions;
        self
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn start(&self) -> Coordinate {
        self.points[0]
    }

    pub fn target(&self) -> Coordinate {
        self.target
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn regions(&self) -> &BTreeSet<RegionId> {
        &self.regions
    }

    pub fn total_distance_m(&self) -> f64 {
        self.cumulative_m.last().copied().unwrap_or(0.0)
    }

    pub fn total_time_s(&self) -> f64 {
        self.cumulative_s.last().copied().unwrap_or(0.0)
    }

    /// Closest point of the polyline to `position`
    pub fn project(&self, position: Coordinate) -> Projection {
        if self.points.len() == 1 {
            return Projection {
                segment: 0,
                along_m: 0.0,
                off_route_m: haversine_distance(position, self.points[0]),
                time_s: 0.0,
            };
        }

        let mut best = Projection {
            segment: 0,
            along_m: 0.0,
            off_route_m: f64::INFINITY,
            time_s: 0.0,
        };
        for (i, pair) in self.points.windows(2).enumerate() {
            let (t, off) = closest_on_segment(position, pair[0], pair[1]);
            if off < best.off_route_m {
                let leg_m = self.cumulative_m[i + 1] - self.cumulative_m[i];
                let leg_s = self.cumulative_s[i + 1] - self.cumulative_s[i];
                best = Projection {
                    segment: i,
                    along_m: self.cumulative_m[i] + t * leg_m,
                    off_route_m: off,
                    time_s: self.cumulative_s[i] + t * leg_s,
                };
            }
        }
        best
    }

    /// Progress of an observer at `position`
    pub fn following_info(&self, position: Coordinate) -> RouteFollowingInfo {
        let projection = self.project(position);
        let total = self.total_distance_m();
        let remaining = (total - projection.along_m).max(0.0);

        let next_turn = self
            .turns
            .iter()
            .find(|t| t.distance_m > projection.along_m + f64::EPSILON);
        let (turn, distance_to_turn_m) = match next_turn {
            Some(t) => (t.direction, t.distance_m - projection.along_m),
            None => (TurnDirection::ReachedDestination, remaining),
        };

        RouteFollowingInfo {
            distance_to_target_m: remaining,
            time_to_target_s: (self.total_time_s() - projection.time_s).max(0.0),
            distance_to_turn_m,
            turn,
            progress: if total > 0.0 {
                (projection.along_m / total).clamp(0.0, 1.0)
            } else {
                1.0
            },
            off_route_m: projection.off_route_m,
        }
    }
}

fn detect_turns(points: &[Coordinate], cumulative_m: &[f64]) -> Vec<Turn> {
    let mut turns = Vec::new();
    for i in 1..points.len().saturating_sub(1) {
        let incoming = cumulative_m[i] - cumulative_m[i - 1];
        let outgoing = cumulative_m[i + 1] - cumulative_m[i];
        if incoming < MIN_LEG_M || outgoing < MIN_LEG_M {
            continue;
        }

        // Arrival heading at the vertex is the reverse of the departure bearing back along the leg
        let arrive = initial_bearing(points[i], points[i - 1]) + 180.0;
        let depart = initial_bearing(points[i], points[i + 1]);
        let delta = (depart - arrive + 540.0).rem_euclid(360.0) - 180.0;

        let direction = TurnDirection::from_heading_change(delta);
        if direction != TurnDirection::GoStraight {
            turns.push(Turn {
                point_index: i,
                direction,
                distance_m: cumulative_m[i],
            });
        }
    }
    turns
}

/// Fraction along `a`..`b` of the point closest to `p`, and the distance to it.
/// Uses a local tangent plane centred on `p`.
fn closest_on_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> (f64, f64) {
    let scale = p.lat().to_radians().cos();
    let local = |c: Coordinate| {
        let mut dlon = c.lon() - p.lon();
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon < -180.0 {
            dlon += 360.0;
        }
        (
            dlon.to_radians() * scale * EARTH_RADIUS_M,
            (c.lat() - p.lat()).to_radians() * EARTH_RADIUS_M,
        )
    };

    let (ax, ay) = local(a);
    let (bx, by) = local(b);
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (t, (cx * cx + cy * cy).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::destination;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    /// Start, 1 km north, then 1 km east
    fn l_route() -> Route {
        let a = c(45.0, 7.0);
        let b = destination(a, 0.0, 1_000.0);
        let d = destination(b, 90.0, 1_000.0);
        Route::with_uniform_speed(vec![a, b, d], 10.0).unwrap()
    }

    #[test]
    fn test_cumulative_distance_and_time() {
        let route = l_route();
        assert!((route.total_distance_m() - 2_000.0).abs() < 0.5);
        assert!((route.total_time_s() - 200.0).abs() < 0.1);
    }

    #[test]
    fn test_right_turn_detected() {
        let route = l_route();
        assert_eq!(route.turns().len(), 1);
        assert_eq!(route.turns()[0].direction, TurnDirection::Right);
        assert_eq!(route.turns()[0].point_index, 1);
    }

    #[test]
    fn test_turn_classification() {
        assert_eq!(TurnDirection::from_heading_change(5.0), TurnDirection::GoStraight);
        assert_eq!(TurnDirection::from_heading_change(-30.0), TurnDirection::SlightLeft);
        assert_eq!(TurnDirection::from_heading_change(90.0), TurnDirection::Right);
        assert_eq!(TurnDirection::from_heading_change(-150.0), TurnDirection::SharpLeft);
        assert_eq!(TurnDirection::from_heading_change(179.0), TurnDirection::UTurn);
    }

    #[test]
    fn test_following_info_midway() {
        let route = l_route();
        let half = destination(route.start(), 0.0, 500.0);
        let info = route.following_info(half);

        assert!((info.distance_to_target_m - 1_500.0).abs() < 1.0);
        assert!((info.distance_to_turn_m - 500.0).abs() < 1.0);
        assert_eq!(info.turn, TurnDirection::Right);
        assert!((info.progress - 0.25).abs() < 1e-3);
        assert!(info.off_route_m < 0.5);
        assert!((info.time_to_target_s - 150.0).abs() < 0.5);
    }

    #[test]
    fn test_off_route_distance() {
        let route = l_route();
        let half = destination(route.start(), 0.0, 500.0);
        let beside = destination(half, 270.0, 80.0);
        let info = route.following_info(beside);
        assert!((info.off_route_m - 80.0).abs() < 1.0, "off {}", info.off_route_m);
    }

    #[test]
    fn test_after_last_turn() {
        let route = l_route();
        let info = route.following_info(route.target());
        assert_eq!(info.turn, TurnDirection::ReachedDestination);
        assert!(info.distance_to_target_m < 1.0);
        assert!((info.progress - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_length_route() {
        let p = c(10.0, 10.0);
        let route = Route::with_uniform_speed(vec![p, p], 10.0).unwrap();
        assert_eq!(route.total_distance_m(), 0.0);
        let info = route.following_info(p);
        assert_eq!(info.progress, 1.0);
        assert_eq!(info.turn, TurnDirection::ReachedDestination);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Route::new(vec![], &[]).is_err());
        assert!(Route::new(vec![c(0.0, 0.0), c(0.0, 1.0)], &[]).is_err());
        assert!(Route::new(vec![c(0.0, 0.0), c(0.0, 1.0)], &[0.0]).is_err());
    }
}
