// src/routing/session.rs
//! Routing session: build, follow and close a single route
//!
//! State, route and target live behind one lock so readers never see a
//! half-applied transition. Builds run as tasks on the engine runtime; each
//! build bumps a generation counter and a task whose generation is no longer
//! current discards its result instead of publishing it.

use super::route::{Route, RouteFollowingInfo};
use super::router::Router;
use super::state::{RoutingError, RoutingEvent, RoutingListener, SessionState};
use crate::config::EngineConfig;
use crate::error::{NavError, Result};
use crate::geo::{destination, haversine_distance, initial_bearing, Coordinate, Fix};
use crate::listener::ListenerSlot;
use crate::region::{RegionId, RegionIndex, RegionLookup};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Off-route distance that starts a silent rebuild
    pub corridor_tolerance_m: f64,
    /// Spacing of region samples between start and target
    pub corridor_sample_step_m: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for SessionConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            corridor_tolerance_m: config.corridor_tolerance_m,
            corridor_sample_step_m: config.corridor_sample_step_m,
        }
    }
}

/// Awaitable result of one build request
#[derive(Debug)]
pub struct BuildHandle {
    request_id: u64,
    task: JoinHandle<RoutingEvent>,
}

impl BuildHandle {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Wait for the request's terminal event
    pub async fn wait(self) -> RoutingEvent {
        match self.task.await {
            Ok(event) => event,
            Err(e) if e.is_cancelled() => {
                RoutingEvent::new(self.request_id, RoutingError::Cancelled)
            }
            Err(e) => {
                warn!(request_id = self.request_id, error = %e, "build task failed");
                RoutingEvent::new(self.request_id, RoutingError::InternalEngineError)
            }
        }
    }
}

#[derive(Debug)]
struct InFlight {
    request_id: u64,
    cancel: CancellationToken,
    silent: bool,
}

#[derive(Debug)]
struct SessionData {
    state: SessionState,
    route: Option<Arc<Route>>,
    target: Option<Coordinate>,
    position: Option<Fix>,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl SessionData {
    /// Cancel the running build; user builds get a Cancelled event
    fn cancel_in_flight(&mut self) -> Option<RoutingEvent> {
        let job = self.in_flight.take()?;
        job.cancel.cancel();
        debug!(request_id = job.request_id, silent = job.silent, "build cancelled");
        (!job.silent).then(|| RoutingEvent::new(job.request_id, RoutingError::Cancelled))
    }
}

#[derive(Clone)]
struct BuildJob {
    request_id: u64,
    generation: u64,
    start: Option<Coordinate>,
    target: Coordinate,
    cancel: CancellationToken,
    silent: bool,
}

/// Why a build produced no route
enum Failure {
    Error(RoutingError),
    MissingMaps(Vec<RegionId>),
}

impl Failure {
    fn error(&self) -> RoutingError {
        match self {
            Failure::Error(error) => *error,
            Failure::MissingMaps(_) => RoutingError::NeedMoreMaps,
        }
    }

    fn into_event(self, request_id: u64) -> RoutingEvent {
        match self {
            Failure::Error(error) => RoutingEvent::new(request_id, error),
            Failure::MissingMaps(missing) => RoutingEvent::need_more_maps(request_id, missing),
        }
    }
}

impl From<RoutingError> for Failure {
    fn from(error: RoutingError) -> Self {
        Failure::Error(error)
    }
}

struct Shared {
    runtime: Handle,
    regions: Arc<RegionIndex>,
    router: RwLock<Arc<dyn Router>>,
    listener: ListenerSlot<dyn RoutingListener>,
    config: SessionConfig,
    data: RwLock<SessionData>,
    next_request: AtomicU64,
}

impl Shared {
    fn begin(
        &self,
        data: &mut SessionData,
        start: Option<Coordinate>,
        target: Coordinate,
        silent: bool,
    ) -> BuildJob {
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();

        data.generation += 1;
        data.target = Some(target);
        data.in_flight = Some(InFlight {
            request_id,
            cancel: cancel.clone(),
            silent,
        });

        BuildJob {
            request_id,
            generation: data.generation,
            start,
            target,
            cancel,
            silent,
        }
    }

    fn notify(&self, event: &RoutingEvent) {
        match self.listener.current() {
            Some(listener) => listener.on_routing_event(event),
            None => debug!(request_id = event.request_id, "no routing listener, event dropped"),
        }
    }

    /// Drive one build to its terminal event. The work runs as its own task
    /// so a panic in a router or a lookup still closes the session.
    async fn run(self: Arc<Self>, job: BuildJob) -> RoutingEvent {
        let mut worker = self.runtime.spawn(Arc::clone(&self).compute(job.clone()));

        let outcome = tokio::select! {
            biased;
            _ = job.cancel.cancelled() => {
                worker.abort();
                Err(Failure::from(RoutingError::Cancelled))
            }
            joined = &mut worker => match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(Failure::from(RoutingError::Cancelled)),
                Err(e) => {
                    warn!(request_id = job.request_id, error = %e, "route build panicked");
                    Err(Failure::from(RoutingError::InternalEngineError))
                }
            },
        };
        self.publish(&job, outcome)
    }

    async fn compute(self: Arc<Self>, job: BuildJob) -> std::result::Result<Route, Failure> {
        let start = job.start.ok_or(Failure::from(RoutingError::StartPointNotFound))?;
        let regions = self.corridor_regions(start, job.target)?;

        let router = self.router.read().clone();
        let route = router.calculate(start, job.target, &job.cancel).await.map_err(|e| {
            debug!(
                request_id = job.request_id,
                router = router.name(),
                error = %e,
                "router failed"
            );
            Failure::from(RoutingError::from(e))
        })?;

        Ok(route.with_regions(regions))
    }

    /// Regions along the start-target line; fails when any of them is missing
    fn corridor_regions(
        &self,
        start: Coordinate,
        target: Coordinate,
    ) -> std::result::Result<BTreeSet<RegionId>, Failure> {
        let samples = corridor_samples(start, target, self.config.corridor_sample_step_m);
        let last = samples.len() - 1;

        let mut present = BTreeSet::new();
        let mut missing = BTreeSet::new();
        let mut start_unknown = false;
        let mut end_unknown = false;

        for (i, point) in samples.into_iter().enumerate() {
            match self.regions.region_for(point) {
                Ok(RegionLookup::Region(id)) if self.regions.is_present(id) => {
                    present.insert(id);
                }
                Ok(RegionLookup::Region(id)) => {
                    missing.insert(id);
                }
                Ok(RegionLookup::Unknown) if i == 0 => start_unknown = true,
                Ok(RegionLookup::Unknown) if i == last => end_unknown = true,
                Ok(RegionLookup::Unknown) => {}
                Err(e) => {
                    warn!(error = %e, "region lookup failed during build");
                    return Err(RoutingError::InternalEngineError.into());
                }
            }
        }

        if !missing.is_empty() {
            return Err(Failure::MissingMaps(missing.into_iter().collect()));
        }
        if start_unknown {
            return Err(RoutingError::StartPointNotFound.into());
        }
        if end_unknown {
            return Err(RoutingError::EndPointNotFound.into());
        }
        Ok(present)
    }

    fn publish(
        &self,
        job: &BuildJob,
        outcome: std::result::Result<Route, Failure>,
    ) -> RoutingEvent {
        let (event, deliver) = {
            let mut data = self.data.write();
            if data.generation != job.generation {
                debug!(request_id = job.request_id, "superseded build discarded");
                return RoutingEvent::new(job.request_id, RoutingError::Cancelled);
            }
            data.in_flight = None;

            match outcome {
                Ok(route) => {
                    info!(
                        request_id = job.request_id,
                        distance_m = route.total_distance_m(),
                        silent = job.silent,
                        "route built"
                    );
                    data.route = Some(Arc::new(route));
                    if !job.silent {
                        data.state = SessionState::Built;
                    }
                    (RoutingEvent::new(job.request_id, RoutingError::NoError), !job.silent)
                }
                Err(failure) => {
                    let error = failure.error();
                    warn!(request_id = job.request_id, %error, "route build failed");
                    data.route = None;
                    data.state = SessionState::ClosedWithError(error);
                    (failure.into_event(job.request_id), true)
                }
            }
        };

        if deliver {
            self.notify(&event);
        }
        event
    }
}

/// Points every `step_m` from start to target, both ends included
fn corridor_samples(start: Coordinate, target: Coordinate, step_m: f64) -> Vec<Coordinate> {
    let distance = haversine_distance(start, target);
    let bearing = initial_bearing(start, target);
    let segments = if step_m > 0.0 {
        (distance / step_m).ceil().max(1.0) as usize
    } else {
        1
    };

    let mut samples = Vec::with_capacity(segments + 1);
    samples.push(start);
    for i in 1..segments {
        samples.push(destination(start, bearing, distance * i as f64 / segments as f64));
    }
    samples.push(target);
    samples
}

/// The engine's single routing session.
///
/// `build`, `follow` and `close` are expected from one control path at a
/// time; every query may run concurrently with them.
pub struct RoutingSession {
    inner: Arc<Shared>,
}

impl RoutingSession {
    pub fn new(
        runtime: Handle,
        regions: Arc<RegionIndex>,
        router: Arc<dyn Router>,
        config: SessionConfig,
    ) -> Self {
        let data = SessionData {
            state: SessionState::Idle,
            route: None,
            target: None,
            position: None,
            generation: 0,
            in_flight: None,
        };

        Self {
            inner: Arc::new(Shared {
                runtime,
                regions,
                router: RwLock::new(router),
                listener: ListenerSlot::new(),
                config,
                data: RwLock::new(data),
                next_request: AtomicU64::new(0),
            }),
        }
    }

    /// Swap the routing backend; builds already running keep the old one
    pub fn set_router(&self, router: Arc<dyn Router>) {
        info!(router = router.name(), "router changed");
        *self.inner.router.write() = router;
    }

    pub fn set_listener(&self, listener: Arc<dyn RoutingListener>) {
        if self.inner.listener.attach(listener) {
            debug!("routing listener replaced");
        }
    }

    pub fn clear_listener(&self) {
        self.inner.listener.detach();
    }

    fn spawn(&self, job: BuildJob) -> BuildHandle {
        let request_id = job.request_id;
        let inner = Arc::clone(&self.inner);
        let task = self.inner.runtime.spawn(inner.run(job));
        BuildHandle { request_id, task }
    }

    /// Start building a route from the current position to `target`.
    ///
    /// A build already in flight is cancelled first and its Cancelled event
    /// is delivered before this call returns.
    pub fn build(&self, target: Coordinate) -> BuildHandle {
        let (job, superseded) = {
            let mut data = self.inner.data.write();
            let superseded = data.cancel_in_flight();
            let start = data.position.as_ref().map(|f| f.coordinate);
            let job = self.inner.begin(&mut data, start, target, false);
            data.route = None;
            data.state = SessionState::Building;
            (job, superseded)
        };

        if let Some(event) = superseded {
            self.inner.notify(&event);
        }
        info!(
            request_id = job.request_id,
            lat = target.lat(),
            lon = target.lon(),
            "route build requested"
        );
        self.spawn(job)
    }

    pub fn follow(&self) -> Result<()> {
        let mut data = self.inner.data.write();
        match data.state {
            SessionState::Built | SessionState::Following => {
                if data.state == SessionState::Built {
                    info!("following route");
                }
                data.state = SessionState::Following;
                Ok(())
            }
            other => Err(NavError::InvalidState(format!(
                "cannot follow a route in state {:?}",
                other
            ))),
        }
    }

    /// Drop the route and return to Idle; closing an idle session does nothing
    pub fn close(&self) {
        let cancelled = {
            let mut data = self.inner.data.write();
            if data.state == SessionState::Idle && data.in_flight.is_none() {
                return;
            }
            let cancelled = data.cancel_in_flight();
            data.generation += 1;
            data.route = None;
            data.target = None;
            data.state = SessionState::Idle;
            info!("routing session closed");
            cancelled
        };

        if let Some(event) = cancelled {
            self.inner.notify(&event);
        }
    }

    /// Record a new position. While following, straying beyond the corridor
    /// tolerance starts one silent rebuild; its handle is returned.
    pub fn on_location_update(&self, fix: &Fix) -> Option<BuildHandle> {
        let job = {
            let mut data = self.inner.data.write();
            data.position = Some(fix.clone());

            if data.state != SessionState::Following || data.in_flight.is_some() {
                return None;
            }
            let route = data.route.clone()?;
            let target = data.target?;

            let off_route_m = route.project(fix.coordinate).off_route_m;
            if off_route_m <= self.inner.config.corridor_tolerance_m {
                return None;
            }
            info!(off_route_m, "off route, rebuilding");
            self.inner.begin(&mut data, Some(fix.coordinate), target, true)
        };
        Some(self.spawn(job))
    }

    /// Rebuild when the route crosses a region whose data is now outdated
    pub fn check_data_version(&self) -> Option<BuildHandle> {
        let target = {
            let data = self.inner.data.read();
            if !data.state.is_built() {
                return None;
            }
            let route = data.route.as_ref()?;
            let outdated = self.inner.regions.outdated_regions();
            if route.regions().is_disjoint(&outdated) {
                return None;
            }
            data.target?
        };

        info!("route crosses outdated regions, rebuilding");
        Some(self.build(target))
    }

    pub fn state(&self) -> SessionState {
        self.inner.data.read().state
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn is_built(&self) -> bool {
        self.state().is_built()
    }

    pub fn route(&self) -> Option<Arc<Route>> {
        self.inner.data.read().route.clone()
    }

    pub fn target(&self) -> Option<Coordinate> {
        self.inner.data.read().target
    }

    pub fn position(&self) -> Option<Fix> {
        self.inner.data.read().position.clone()
    }

    /// Progress from the last position; None unless a route is built
    pub fn route_following_info(&self) -> Option<RouteFollowingInfo> {
        let data = self.inner.data.read();
        if !data.state.is_built() {
            return None;
        }
        let route = data.route.as_ref()?;
        let fix = data.position.as_ref()?;
        Some(route.following_info(fix.coordinate))
    }
}

impl Drop for RoutingSession {
    fn drop(&mut self) {
        if let Some(job) = self.inner.data.write().in_flight.take() {
            job.cancel.cancel();
        }
    }
}
