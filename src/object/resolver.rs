// src/object/resolver.rs
//! Point-to-object resolution over loaded map entities

use super::bookmark::BookmarkCategory;
use super::types::{MapObject, ObjectDetails, ObjectKind};
use crate::config::EngineConfig;
use crate::geo::{format_lat_lon, haversine_distance, Coordinate};
use tracing::debug;

const MY_POSITION_NAME: &str = "My Position";

/// Where a candidate came from, resolved into a [`MapObject`] only for the winner
#[derive(Debug, Clone, Copy)]
enum Source {
    MyPosition,
    ApiPoint(usize),
    Bookmark { category: usize, index: usize },
    Poi(usize),
    Layer(usize),
}

impl Source {
    fn kind(&self) -> ObjectKind {
        match self {
            Source::MyPosition => ObjectKind::MyPosition,
            Source::ApiPoint(_) => ObjectKind::ApiPoint,
            Source::Bookmark { .. } => ObjectKind::Bookmark,
            Source::Poi(_) => ObjectKind::Poi,
            Source::Layer(_) => ObjectKind::AdditionalLayer,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    source: Source,
    distance_m: f64,
    order: usize,
}

/// Finds the map object under a tapped point.
///
/// Every candidate within the search radius competes: the nearest wins, and
/// candidates within the tie tolerance of the nearest are ranked by kind
/// (my position, API point, bookmark, POI, additional layer), then by
/// distance, then by insertion order.
#[derive(Debug, Clone)]
pub struct ObjectResolver {
    search_radius_m: f64,
    tie_tolerance_m: f64,
    categories: Vec<BookmarkCategory>,
    pois: Vec<ObjectDetails>,
    layer_entities: Vec<ObjectDetails>,
    api_points: Vec<(String, ObjectDetails)>,
    my_position: Option<Coordinate>,
}

impl ObjectResolver {
    pub fn new(search_radius_m: f64, tie_tolerance_m: f64) -> Self {
        Self {
            search_radius_m,
            tie_tolerance_m,
            categories: Vec::new(),
            pois: Vec::new(),
            layer_entities: Vec::new(),
            api_points: Vec::new(),
            my_position: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.search_radius_m, config.tie_tolerance_m)
    }

    /// Add a category; returns its index
    pub fn add_bookmark_category(&mut self, category: BookmarkCategory) -> usize {
        self.categories.push(category);
        self.categories.len() - 1
    }

    pub fn category(&self, index: usize) -> Option<&BookmarkCategory> {
        self.categories.get(index)
    }

    pub fn add_poi(&mut self, poi: ObjectDetails) {
        self.pois.push(poi);
    }

    pub fn add_layer_entity(&mut self, entity: ObjectDetails) {
        self.layer_entities.push(entity);
    }

    pub fn add_api_point(&mut self, id: impl Into<String>, details: ObjectDetails) {
        self.api_points.push((id.into(), details));
    }

    pub fn clear_api_points(&mut self) {
        self.api_points.clear();
    }

    pub fn set_my_position(&mut self, position: Option<Coordinate>) {
        self.my_position = position;
    }

    /// Bookmark `index` in `category` as a map object
    pub fn bookmark(&self, category: usize, index: usize) -> Option<MapObject> {
        let cat = self.categories.get(category)?;
        let bm = cat.get(index)?;
        Some(MapObject::Bookmark {
            category,
            index,
            details: bm.to_details(&cat.name),
        })
    }

    fn candidates(&self, point: Coordinate) -> Vec<Candidate> {
        let mut out = Vec::new();
        let mut push = |source: Source, at: Coordinate| {
            let distance_m = haversine_distance(point, at);
            if distance_m <= self.search_radius_m {
                let order = out.len();
                out.push(Candidate {
                    source,
                    distance_m,
                    order,
                });
            }
        };

        if let Some(pos) = self.my_position {
            push(Source::MyPosition, pos);
        }
        for (i, (_, details)) in self.api_points.iter().enumerate() {
            push(Source::ApiPoint(i), details.coordinate);
        }
        for (c, cat) in self.categories.iter().enumerate().filter(|(_, c)| c.visible) {
            for (i, bm) in cat.bookmarks().iter().enumerate() {
                push(Source::Bookmark { category: c, index: i }, bm.coordinate);
            }
        }
        for (i, poi) in self.pois.iter().enumerate() {
            push(Source::Poi(i), poi.coordinate);
        }
        for (i, entity) in self.layer_entities.iter().enumerate() {
            push(Source::Layer(i), entity.coordinate);
        }
        out
    }

    fn materialize(&self, source: Source) -> MapObject {
        match source {
            Source::MyPosition => match self.my_position {
                Some(pos) => MapObject::MyPosition(ObjectDetails::new(MY_POSITION_NAME, pos)),
                None => MapObject::None,
            },
            Source::ApiPoint(i) => match self.api_points.get(i) {
                Some((id, details)) => MapObject::ApiPoint {
                    id: id.clone(),
                    details: details.clone(),
                },
                None => MapObject::None,
            },
            Source::Bookmark { category, index } => {
                self.bookmark(category, index).unwrap_or(MapObject::None)
            }
            Source::Poi(i) => self.pois.get(i).cloned().map_or(MapObject::None, MapObject::Poi),
            Source::Layer(i) => self
                .layer_entities
                .get(i)
                .cloned()
                .map_or(MapObject::None, MapObject::AdditionalLayer),
        }
    }

    /// Best object at `point`; `MapObject::None` when nothing is in range
    pub fn resolve(&self, point: Coordinate) -> MapObject {
        let candidates = self.candidates(point);
        let Some(nearest) = candidates.iter().map(|c| c.distance_m).reduce(f64::min) else {
            return MapObject::None;
        };

        let winner = candidates
            .iter()
            .filter(|c| c.distance_m <= nearest + self.tie_tolerance_m)
            .min_by(|a, b| {
                a.source
                    .kind()
                    .priority_rank()
                    .cmp(&b.source.kind().priority_rank())
                    .then(a.distance_m.total_cmp(&b.distance_m))
                    .then(a.order.cmp(&b.order))
            });

        match winner {
            Some(c) => {
                debug!(kind = ?c.source.kind(), distance_m = c.distance_m, "point resolved");
                self.materialize(c.source)
            }
            None => MapObject::None,
        }
    }

    /// Human-readable label for `point` without building a full object
    pub fn name_and_address(&self, point: Coordinate) -> String {
        let in_range = |at: Coordinate| {
            let d = haversine_distance(point, at);
            (d <= self.search_radius_m).then_some(d)
        };

        let bookmark = self
            .categories
            .iter()
            .filter(|c| c.visible)
            .flat_map(|c| c.bookmarks())
            .filter_map(|b| in_range(b.coordinate).map(|d| (d, b)))
            .min_by(|a, b| a.0.total_cmp(&b.0));
        let poi = self
            .pois
            .iter()
            .filter_map(|p| in_range(p.coordinate).map(|d| (d, p)))
            .min_by(|a, b| a.0.total_cmp(&b.0));

        let label = match (bookmark, poi) {
            (Some((db, b)), Some((dp, _))) if db <= dp => b.name.clone(),
            (_, Some((_, p))) => p.label(),
            (Some((_, b)), None) => b.name.clone(),
            (None, None) => String::new(),
        };

        if label.is_empty() {
            format_lat_lon(point.lat(), point.lon(), false)
        } else {
            label
        }
    }
}

impl Default for ObjectResolver {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
