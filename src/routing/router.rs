// src/routing/router.rs
//! Route calculation backends

use super::route::Route;
use super::state::RoutingError;
use crate::geo::{destination, haversine_distance, initial_bearing, Coordinate};
use async_trait::async_trait;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Why a router produced no route
#[derive(Debug, Clone, PartialEq)]
pub enum RouterError {
    StartNotFound,
    EndNotFound,
    NoRoute,
    Cancelled,
    Internal(String),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::StartNotFound => write!(f, "no road near the start point"),
            RouterError::EndNotFound => write!(f, "no road near the end point"),
            RouterError::NoRoute => write!(f, "target unreachable"),
            RouterError::Cancelled => write!(f, "calculation cancelled"),
            RouterError::Internal(msg) => write!(f, "router failure: {}", msg),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<RouterError> for RoutingError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::StartNotFound => RoutingError::StartPointNotFound,
            RouterError::EndNotFound => RoutingError::EndPointNotFound,
            RouterError::NoRoute => RoutingError::RouteNotFound,
            RouterError::Cancelled => RoutingError::Cancelled,
            RouterError::Internal(_) => RoutingError::InternalEngineError,
        }
    }
}

/// A route calculation backend.
///
/// Implementations should check `cancel` between units of work and return
/// [`RouterError::Cancelled`] once it fires.
#[async_trait]
pub trait Router: Send + Sync {
    fn name(&self) -> &str;

    async fn calculate(
        &self,
        start: Coordinate,
        target: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<Route, RouterError>;
}

/// Great-circle path at a fixed speed; used when no road data is loaded
#[derive(Debug, Clone)]
pub struct StraightLineRouter {
    speed_mps: f64,
    step_m: f64,
}

impl StraightLineRouter {
    pub const DEFAULT_STEP_M: f64 = 1_000.0;

    pub fn new(speed_mps: f64) -> Self {
        Self {
            speed_mps,
            step_m: Self::DEFAULT_STEP_M,
        }
    }

    /// Spacing of intermediate vertices
    pub fn with_step(mut self, step_m: f64) -> Self {
        self.step_m = step_m;
        self
    }
}

#[async_trait]
impl Router for StraightLineRouter {
    fn name(&self) -> &str {
        "straight-line"
    }

    async fn calculate(
        &self,
        start: Coordinate,
        target: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<Route, RouterError> {
        if cancel.is_cancelled() {
            return Err(RouterError::Cancelled);
        }

        let distance = haversine_distance(start, target);
        let bearing = initial_bearing(start, target);
        let segments = if self.step_m > 0.0 {
            (distance / self.step_m).ceil().max(1.0) as usize
        } else {
            1
        };

        let mut points = Vec::with_capacity(segments + 1);
        points.push(start);
        for i in 1..segments {
            points.push(destination(start, bearing, distance * i as f64 / segments as f64));
        }
        points.push(target);

        Route::with_uniform_speed(points, self.speed_mps)
            .map_err(|e| RouterError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            RoutingError::from(RouterError::StartNotFound),
            RoutingError::StartPointNotFound
        );
        assert_eq!(RoutingError::from(RouterError::EndNotFound), RoutingError::EndPointNotFound);
        assert_eq!(RoutingError::from(RouterError::NoRoute), RoutingError::RouteNotFound);
        assert_eq!(
            RoutingError::from(RouterError::Internal("x".into())),
            RoutingError::InternalEngineError
        );
    }

    #[tokio::test]
    async fn test_straight_line_route() {
        let router = StraightLineRouter::new(10.0).with_step(500.0);
        let start = c(45.0, 7.0);
        let target = destination(start, 90.0, 2_200.0);

        let route = router.calculate(start, target, &CancellationToken::new()).await.unwrap();
        assert_eq!(route.points().len(), 6);
        assert_eq!(route.target(), target);
        assert!((route.total_distance_m() - 2_200.0).abs() < 0.5);
        assert!((route.total_time_s() - 220.0).abs() < 0.1);
        assert!(route.turns().is_empty());
    }

    #[tokio::test]
    async fn test_zero_length_is_valid() {
        let router = StraightLineRouter::new(10.0);
        let p = c(1.0, 1.0);
        let route = router.calculate(p, p, &CancellationToken::new()).await.unwrap();
        assert_eq!(route.total_distance_m(), 0.0);
    }

    #[tokio::test]
    async fn test_cancelled() {
        let router = StraightLineRouter::new(10.0);
        let token = CancellationToken::new();
        token.cancel();
        let result = router.calculate(c(0.0, 0.0), c(0.0, 1.0), &token).await;
        assert_eq!(result.unwrap_err(), RouterError::Cancelled);
    }
}
