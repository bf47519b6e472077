// src/routing/state.rs
//! Session states, routing result codes and the event sink

use crate::region::RegionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result code carried by every routing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingError {
    NoError,
    NeedMoreMaps,
    RouteNotFound,
    StartPointNotFound,
    EndPointNotFound,
    Cancelled,
    InternalEngineError,
}

impl RoutingError {
    /// Stable integer code for bindings
    pub fn code(&self) -> i32 {
        match self {
            RoutingError::NoError => 0,
            RoutingError::NeedMoreMaps => 1,
            RoutingError::RouteNotFound => 2,
            RoutingError::StartPointNotFound => 3,
            RoutingError::EndPointNotFound => 4,
            RoutingError::Cancelled => 5,
            RoutingError::InternalEngineError => 6,
        }
    }

    pub fn is_error(&self) -> bool {
        *self != RoutingError::NoError
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RoutingError::NoError => "no error",
            RoutingError::NeedMoreMaps => "need more maps",
            RoutingError::RouteNotFound => "route not found",
            RoutingError::StartPointNotFound => "start point not found",
            RoutingError::EndPointNotFound => "end point not found",
            RoutingError::Cancelled => "cancelled",
            RoutingError::InternalEngineError => "internal engine error",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Building,
    Built,
    Following,
    ClosedWithError(RoutingError),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Building | SessionState::Built | SessionState::Following)
    }

    pub fn is_built(&self) -> bool {
        matches!(self, SessionState::Built | SessionState::Following)
    }
}

/// Terminal outcome of one build request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEvent {
    pub request_id: u64,
    pub error: RoutingError,
    /// Regions to download before retrying; only set with `NeedMoreMaps`
    pub missing_regions: Vec<RegionId>,
}

impl RoutingEvent {
    pub fn new(request_id: u64, error: RoutingError) -> Self {
        Self {
            request_id,
            error,
            missing_regions: Vec::new(),
        }
    }

    pub fn need_more_maps(request_id: u64, missing_regions: Vec<RegionId>) -> Self {
        Self {
            request_id,
            error: RoutingError::NeedMoreMaps,
            missing_regions,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error == RoutingError::NoError
    }
}

pub trait RoutingListener: Send + Sync {
    fn on_routing_event(&self, event: &RoutingEvent);
}

impl<F> RoutingListener for F
where
    F: Fn(&RoutingEvent) + Send + Sync,
{
    fn on_routing_event(&self, event: &RoutingEvent) {
        self(event)
    }
}
