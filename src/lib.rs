// src/lib.rs
//! Navigation Engine Library
//!
//! Core of a map and navigation engine: resolves points to map objects,
//! runs a routing session, predicts the observer's position between fixes
//! and maps coordinates to downloadable regions.

pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod listener;
pub mod object;
pub mod predict;
pub mod region;
pub mod routing;

// Re-export main types for convenience
pub use config::{EngineConfig, Units};
pub use engine::Engine;
pub use error::{NavError, Result};
pub use geo::{Coordinate, Fix};
pub use object::{ActivationEvent, ActivationListener, MapObject};
pub use region::{RegionId, RegionIndex};
pub use routing::{BuildHandle, RoutingError, RoutingEvent, RoutingListener, SessionState};
