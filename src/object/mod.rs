// src/object/mod.rs
//! Map objects under a point: bookmarks, POIs, layer entities and markers

mod activation;
mod bookmark;
mod resolver;
mod types;

pub use activation::{ActivationEvent, ActivationListener};
pub use bookmark::{Bookmark, BookmarkCategory};
pub use resolver::ObjectResolver;
pub use types::{MapObject, MetadataType, ObjectDetails, ObjectKind};
