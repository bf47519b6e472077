// src/routing/mod.rs
//! Route building and following

mod graph;
mod route;
mod router;
mod session;
mod state;

pub use graph::{Edge, GraphRouter, RoadGraph};
pub use route::{Projection, Route, RouteFollowingInfo, Turn, TurnDirection};
pub use router::{Router, RouterError, StraightLineRouter};
pub use session::{BuildHandle, RoutingSession, SessionConfig};
pub use state::{RoutingError, RoutingEvent, RoutingListener, SessionState};
