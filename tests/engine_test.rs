//! End-to-end behaviour of an engine instance

use nav_engine::{
    object::{Bookmark, BookmarkCategory, ObjectDetails, ObjectKind},
    region::parse_countries,
    routing::{GraphRouter, RoadGraph, RoutingError, SessionState},
    Coordinate, Engine, EngineConfig, Fix, MapObject, RegionIndex, RoutingEvent,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn c(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).unwrap()
}

/// Two neighbouring countries, neither downloaded
fn benelux() -> Arc<RegionIndex> {
    let index = RegionIndex::new(8).unwrap();
    let belgium = index.add_region("Belgium", Some("Europe"), 200);
    let netherlands = index.add_region("Netherlands", Some("Europe"), 300);
    // Rectangles chosen so the two countries share no level-8 cell
    index.cover_rect(netherlands, 52.0, 3.3, 53.5, 7.2).unwrap();
    index.cover_rect(belgium, 49.5, 2.5, 51.2, 6.4).unwrap();
    Arc::new(index)
}

fn recorder(engine: &Engine) -> Arc<Mutex<Vec<RoutingEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    engine.set_routing_listener(Arc::new(move |e: &RoutingEvent| sink.lock().push(e.clone())));
    events
}

#[tokio::test]
async fn download_then_retry_builds_route() {
    let regions = benelux();
    let engine = Engine::new(EngineConfig::default(), Arc::clone(&regions)).unwrap();
    let events = recorder(&engine);

    // Start and target inside Belgium
    engine.on_location_update(Fix::stationary(c(50.85, 4.35), 5.0));
    let first = engine.build_route(50.63, 5.57).unwrap().wait().await;
    assert_eq!(first.error, RoutingError::NeedMoreMaps);
    let belgium = regions.find_by_name("Belgium").unwrap();
    assert!(first.missing_regions.contains(&belgium));
    assert!(!engine.is_routing_active());

    regions.mark_downloaded(belgium, 1).unwrap();
    let second = engine.build_route(50.63, 5.57).unwrap().wait().await;
    assert_eq!(second.error, RoutingError::NoError);
    assert!(engine.is_route_built());

    // The earlier outcome is not rewritten by the download
    let recorded = events.lock().clone();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].error, RoutingError::NeedMoreMaps);
}

#[tokio::test]
async fn listener_replacement_and_detach() {
    let regions = benelux();
    for id in 0..regions.region_count() as u32 {
        regions.mark_downloaded(nav_engine::RegionId(id), 1).unwrap();
    }
    let engine = Engine::new(EngineConfig::default(), regions).unwrap();
    engine.on_location_update(Fix::stationary(c(52.37, 4.9), 5.0));

    let old = recorder(&engine);
    let new = recorder(&engine);
    engine.build_route(52.09, 5.12).unwrap().wait().await;
    assert!(old.lock().is_empty());
    assert_eq!(new.lock().len(), 1);

    engine.clear_routing_listener();
    let event = engine.build_route(52.09, 5.12).unwrap().wait().await;
    assert!(event.is_success());
    assert_eq!(new.lock().len(), 1);
}

#[tokio::test]
async fn graph_router_through_engine() {
    let regions = benelux();
    regions.mark_downloaded(regions.find_by_name("Netherlands").unwrap(), 1).unwrap();

    let mut graph = RoadGraph::new();
    let amsterdam = graph.add_node(c(52.37, 4.90));
    let utrecht = graph.add_node(c(52.09, 5.12));
    graph.add_node(c(53.40, 5.20));
    graph.add_road(amsterdam, utrecht, 25.0).unwrap();

    let engine = Engine::new(EngineConfig::default(), regions).unwrap();
    engine.set_router(Arc::new(GraphRouter::new(Arc::new(graph), 200.0)));
    engine.on_location_update(Fix::stationary(c(52.3705, 4.9005), 5.0));

    let event = engine.build_route(52.09, 5.12).unwrap().wait().await;
    assert_eq!(event.error, RoutingError::NoError);
    let route = engine.routing().route().unwrap();
    assert_eq!(route.points().len(), 2);

    let island_at = c(53.40, 5.20);
    let event = engine.build_route(island_at.lat(), island_at.lon()).unwrap().wait().await;
    assert_eq!(event.error, RoutingError::RouteNotFound);
    assert_eq!(
        engine.routing().state(),
        SessionState::ClosedWithError(RoutingError::RouteNotFound)
    );

    // Nothing within the snap radius
    let event = engine.build_route(52.7, 4.7).unwrap().wait().await;
    assert_eq!(event.error, RoutingError::EndPointNotFound);
}

#[tokio::test]
async fn point_queries_prefer_bookmarks() {
    let engine = Engine::new(EngineConfig::default(), benelux()).unwrap();
    let dam = c(52.3731, 4.8926);
    engine.update_objects(|objects| {
        let mut cat = BookmarkCategory::new("City");
        cat.add_bookmark(Bookmark::new("Dam Square", dam));
        objects.add_bookmark_category(cat);
        objects.add_poi(
            ObjectDetails::new("Royal Palace", nav_engine::geo::destination(dam, 0.0, 1.0))
                .with_address("Nieuwezijds Voorburgwal 147"),
        );
    });

    let obj = engine.get_map_object_for_point(dam.lat(), dam.lon()).unwrap();
    assert_eq!(obj.kind(), ObjectKind::Bookmark);
    assert!(matches!(engine.get_map_object_for_point(0.0, 0.0).unwrap(), MapObject::None));
    assert_eq!(engine.name_and_address(10.0, 20.0).unwrap(), "10.000000, 20.000000");
}

#[tokio::test]
async fn engines_are_independent() {
    let a = Engine::new(EngineConfig::default(), benelux()).unwrap();
    let b = Engine::new(EngineConfig::default(), benelux()).unwrap();
    a.on_location_update(Fix::stationary(c(50.85, 4.35), 5.0));
    a.build_route(50.63, 5.57).unwrap().wait().await;
    assert!(b.last_fix().is_none());
    assert_eq!(b.routing().state(), SessionState::Idle);
}

#[tokio::test]
async fn country_list_drives_region_queries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("countries.txt");

    let cell = nav_engine::region::CellId::from_coordinate(c(46.8, 8.2), 5);
    std::fs::write(&path, format!(" Europe\n  Switzerland;41000000\n{}\n", cell)).unwrap();

    let index = nav_engine::region::load_countries(&path, 5).unwrap();
    let engine = Engine::new(EngineConfig::default(), Arc::new(index)).unwrap();

    assert_eq!(
        engine.country_name_if_absent(46.8, 8.2).unwrap().as_deref(),
        Some("Switzerland")
    );
    let id = engine.country_index(46.8, 8.2).unwrap().unwrap();
    assert_eq!(engine.regions().size(id), Some((0, 41_000_000)));

    assert!(parse_countries("Switzerland\n", 5).is_err());
}
