// src/engine.rs v3
//! Engine context: the surface application shells bind to
//!
//! One `Engine` owns a region index, the map objects used for point queries,
//! a location predictor and a single routing session. Engines are independent
//! of each other, so tests and multi-window shells can run several side by side.

use crate::{
    config::EngineConfig,
    error::{NavError, Result},
    geo::{self, Coordinate, DistanceAndAzimuth, Fix, MercatorPoint},
    listener::ListenerSlot,
    object::{ActivationEvent, ActivationListener, MapObject, ObjectDetails, ObjectResolver},
    predict::{LocationPredictor, Prediction, PredictorConfig},
    region::{RegionId, RegionIndex, RegionLookup},
    routing::{
        BuildHandle, RouteFollowingInfo, Router, RoutingListener, RoutingSession, SessionConfig,
        StraightLineRouter,
    },
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

pub struct Engine {
    config: EngineConfig,
    regions: Arc<RegionIndex>,
    objects: RwLock<ObjectResolver>,
    predictor: LocationPredictor,
    routing: RoutingSession,
    balloon: ListenerSlot<dyn ActivationListener>,
    last_fix: RwLock<Option<Fix>>,
}

impl Engine {
    /// Create an engine on the current tokio runtime with a straight-line router
    pub fn new(config: EngineConfig, regions: Arc<RegionIndex>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| NavError::InvalidState(format!("Engine needs a tokio runtime: {}", e)))?;
        let router = Arc::new(StraightLineRouter::new(config.default_speed_mps));
        Self::with_runtime(config, regions, runtime, router)
    }

    /// Create an engine with an explicit runtime and routing backend
    pub fn with_runtime(
        config: EngineConfig,
        regions: Arc<RegionIndex>,
        runtime: Handle,
        router: Arc<dyn Router>,
    ) -> Result<Self> {
        config.validate()?;
        if regions.level() != config.region_cell_level {
            debug!(
                index_level = regions.level(),
                config_level = config.region_cell_level,
                "region index level differs from configuration"
            );
        }

        let routing = RoutingSession::new(
            runtime,
            Arc::clone(&regions),
            router,
            SessionConfig::from(&config),
        );
        info!(regions = regions.region_count(), "engine created");

        Ok(Self {
            objects: RwLock::new(ObjectResolver::from_config(&config)),
            predictor: LocationPredictor::new(PredictorConfig::from(&config))?,
            routing,
            regions,
            balloon: ListenerSlot::new(),
            last_fix: RwLock::new(None),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn regions(&self) -> &Arc<RegionIndex> {
        &self.regions
    }

    pub fn routing(&self) -> &RoutingSession {
        &self.routing
    }

    pub fn set_router(&self, router: Arc<dyn Router>) {
        self.routing.set_router(router);
    }

    /// Mutate the loaded map objects (bookmark categories, POIs, layers)
    pub fn update_objects<R>(&self, f: impl FnOnce(&mut ObjectResolver) -> R) -> R {
        let mut objects = self.objects.write();
        f(&mut objects)
    }

    pub fn add_api_point(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        lat: f64,
        lon: f64,
    ) -> Result<()> {
        let details = ObjectDetails::new(name, Coordinate::new(lat, lon)?);
        self.objects.write().add_api_point(id, details);
        Ok(())
    }

    pub fn clear_api_points(&self) {
        self.objects.write().clear_api_points();
    }

    // --- geometry and formatting ---

    /// Distance and azimuth of (`lat`, `lon`) seen from the center point
    pub fn distance_and_azimuth(
        &self,
        lat: f64,
        lon: f64,
        center_lat: f64,
        center_lon: f64,
        north_offset_deg: f64,
    ) -> Result<DistanceAndAzimuth> {
        let point = Coordinate::new(lat, lon)?;
        let center = Coordinate::new(center_lat, center_lon)?;
        Ok(geo::distance_and_azimuth(point, center, north_offset_deg))
    }

    /// Same as [`Engine::distance_and_azimuth`] with the point in Mercator space
    pub fn distance_and_azimuth_mercator(
        &self,
        mercator_x: f64,
        mercator_y: f64,
        center_lat: f64,
        center_lon: f64,
        north_offset_deg: f64,
    ) -> Result<DistanceAndAzimuth> {
        let center = Coordinate::new(center_lat, center_lon)?;
        let point = MercatorPoint {
            x: mercator_x,
            y: mercator_y,
        };
        geo::distance_and_azimuth_from_mercator(point, center, north_offset_deg)
    }

    pub fn format_lat_lon(&self, lat: f64, lon: f64, dms: bool) -> Result<String> {
        let c = Coordinate::new(lat, lon)?;
        Ok(geo::format_lat_lon(c.lat(), c.lon(), dms))
    }

    pub fn format_lat_lon_to_arr(&self, lat: f64, lon: f64, dms: bool) -> Result<[String; 2]> {
        let c = Coordinate::new(lat, lon)?;
        Ok(geo::format_lat_lon_to_arr(c.lat(), c.lon(), dms))
    }

    pub fn format_altitude(&self, meters: f64) -> String {
        geo::format_altitude(meters, self.config.units)
    }

    pub fn format_speed(&self, meters_per_second: f64) -> String {
        geo::format_speed(meters_per_second, self.config.units)
    }

    pub fn format_distance(&self, meters: f64) -> String {
        geo::format_distance(meters, self.config.units)
    }

    pub fn ge0_url(&self, lat: f64, lon: f64, zoom: f64, name: &str) -> Result<String> {
        let c = Coordinate::new(lat, lon)?;
        Ok(geo::generate_ge0_url(c.lat(), c.lon(), zoom, name))
    }

    pub fn http_ge0_url(&self, lat: f64, lon: f64, zoom: f64, name: &str) -> Result<String> {
        let c = Coordinate::new(lat, lon)?;
        Ok(geo::http_ge0_url(c.lat(), c.lon(), zoom, name))
    }

    // --- point queries and balloons ---

    pub fn get_map_object_for_point(&self, lat: f64, lon: f64) -> Result<MapObject> {
        let point = Coordinate::new(lat, lon)?;
        Ok(self.objects.read().resolve(point))
    }

    pub fn name_and_address(&self, lat: f64, lon: f64) -> Result<String> {
        let point = Coordinate::new(lat, lon)?;
        Ok(self.objects.read().name_and_address(point))
    }

    pub fn connect_balloon_listener(&self, listener: Arc<dyn ActivationListener>) {
        if self.balloon.attach(listener) {
            debug!("balloon listener replaced");
        }
    }

    pub fn clear_balloon_listeners(&self) {
        self.balloon.detach();
    }

    fn notify_balloon(&self, event: &ActivationEvent) {
        if let Some(listener) = self.balloon.current() {
            listener.on_activation(event);
        }
    }

    /// Tap at a point: resolve it and notify the balloon listener once.
    /// An empty tap is reported as a dismissal.
    pub fn activate_point(&self, lat: f64, lon: f64) -> Result<MapObject> {
        let object = self.get_map_object_for_point(lat, lon)?;
        self.notify_balloon(&ActivationEvent::from_object(&object));
        Ok(object)
    }

    pub fn activate_bookmark(&self, category: usize, index: usize) -> Result<MapObject> {
        let object = self.objects.read().bookmark(category, index).ok_or_else(|| {
            NavError::InvalidInput(format!("No bookmark {} in category {}", index, category))
        })?;
        self.notify_balloon(&ActivationEvent::Bookmark { category, index });
        Ok(object)
    }

    pub fn deactivate_popup(&self) {
        self.notify_balloon(&ActivationEvent::Dismiss);
    }

    // --- regions ---

    /// Region covering the point, or None outside every known region
    pub fn country_index(&self, lat: f64, lon: f64) -> Result<Option<RegionId>> {
        match self.regions.region_for(Coordinate::new(lat, lon)?)? {
            RegionLookup::Region(id) => Ok(Some(id)),
            RegionLookup::Unknown => Ok(None),
        }
    }

    pub fn country_name_if_absent(&self, lat: f64, lon: f64) -> Result<Option<String>> {
        self.regions.country_name_if_absent(Coordinate::new(lat, lon)?)
    }

    pub fn outdated_countries_string(&self) -> String {
        self.regions.outdated_regions_string()
    }

    pub fn is_data_version_changed(&self) -> bool {
        self.regions.data_version_changed()
    }

    pub fn update_saved_data_version(&self) {
        self.regions.update_saved_data_version();
    }

    /// Rebuild the current route if it crosses outdated regions
    pub fn check_data_version(&self) -> Option<BuildHandle> {
        self.routing.check_data_version()
    }

    // --- routing ---

    pub fn build_route(&self, lat: f64, lon: f64) -> Result<BuildHandle> {
        let target = Coordinate::new(lat, lon)?;
        Ok(self.routing.build(target))
    }

    pub fn follow_route(&self) -> Result<()> {
        self.routing.follow()
    }

    pub fn close_routing(&self) {
        self.routing.close();
    }

    pub fn is_routing_active(&self) -> bool {
        self.routing.is_active()
    }

    pub fn is_route_built(&self) -> bool {
        self.routing.is_built()
    }

    pub fn route_following_info(&self) -> Option<RouteFollowingInfo> {
        self.routing.route_following_info()
    }

    pub fn set_routing_listener(&self, listener: Arc<dyn RoutingListener>) {
        self.routing.set_listener(listener);
    }

    pub fn clear_routing_listener(&self) {
        self.routing.clear_listener();
    }

    // --- location ---

    /// Feed a position fix. Fixes older than the last accepted one are
    /// ignored. Returns the handle of a silent route rebuild if one started.
    pub fn on_location_update(&self, fix: Fix) -> Option<BuildHandle> {
        {
            let mut last = self.last_fix.write();
            if let Some(prev) = last.as_ref() {
                if fix.timestamp < prev.timestamp {
                    debug!(
                        fix_time = %fix.timestamp,
                        last_time = %prev.timestamp,
                        "out-of-order fix ignored"
                    );
                    return None;
                }
            }
            *last = Some(fix.clone());
        }

        self.objects.write().set_my_position(Some(fix.coordinate));
        self.routing.on_location_update(&fix)
    }

    pub fn last_fix(&self) -> Option<Fix> {
        self.last_fix.read().clone()
    }

    /// Where the last fix is expected to be at `now`
    pub fn predicted_position(&self, now: DateTime<Utc>) -> Option<Prediction> {
        let fix = self.last_fix.read().clone()?;
        Some(self.predictor.predict(&fix, fix.age_seconds(now)))
    }

    /// Dead-reckon a raw position; returns `[lat, lon]`
    pub fn predict_location(
        &self,
        lat: f64,
        lon: f64,
        accuracy_m: f64,
        bearing_deg: Option<f64>,
        speed_mps: f64,
        elapsed_s: f64,
    ) -> Result<[f64; 2]> {
        let at = Coordinate::new(lat, lon)?;
        let fix = Fix::new(at, accuracy_m, bearing_deg, speed_mps, Utc::now())?;
        let p = self.predictor.predict(&fix, elapsed_s);
        Ok([p.coordinate.lat(), p.coordinate.lon()])
    }
}
