// src/object/bookmark.rs v2
//! Bookmarks as seen by point queries
//!
//! Storage lives outside the engine; callers hand in categories they have
//! loaded and the resolver only reads them.

use super::types::{MetadataType, ObjectDetails};
use crate::geo::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    pub coordinate: Coordinate,
    pub elevation: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

impl Bookmark {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinate,
            elevation: None,
            timestamp: Utc::now(),
            description: None,
        }
    }

    /// Details exposed when the bookmark is resolved; the category name is the type
    pub fn to_details(&self, category: &str) -> ObjectDetails {
        let mut details = ObjectDetails::new(self.name.clone(), self.coordinate)
            .with_type(category)
            .with_address(self.description.clone().unwrap_or_default());

        if let Some(ele) = self.elevation {
            let meters = format!("{}", ele.round() as i64);
            details = details.with_metadata(MetadataType::Elevation, meters);
        }
        details
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkCategory {
    pub name: String,
    pub visible: bool,
    bookmarks: Vec<Bookmark>,
}

impl BookmarkCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            bookmarks: Vec::new(),
        }
    }

    pub fn add_bookmark(&mut self, bookmark: Bookmark) {
        self.bookmarks.push(bookmark);
    }

    pub fn bookmark_count(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn get(&self, index: usize) -> Option<&Bookmark> {
        self.bookmarks.get(index)
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }
}
