// src/object/activation.rs
//! Balloon activation notifications

use super::types::{MapObject, ObjectDetails};
use crate::geo::Coordinate;

/// What the user tapped, or a dismissal of the current balloon
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationEvent {
    Poi(ObjectDetails),
    Bookmark { category: usize, index: usize },
    AdditionalLayer(ObjectDetails),
    MyPosition(Coordinate),
    ApiPoint {
        id: String,
        name: String,
        coordinate: Coordinate,
    },
    Dismiss,
}

impl ActivationEvent {
    /// Event for a resolved object; an empty result dismisses
    pub fn from_object(object: &MapObject) -> Self {
        match object {
            MapObject::Poi(d) => ActivationEvent::Poi(d.clone()),
            MapObject::Bookmark { category, index, .. } => ActivationEvent::Bookmark {
                category: *category,
                index: *index,
            },
            MapObject::AdditionalLayer(d) => ActivationEvent::AdditionalLayer(d.clone()),
            MapObject::MyPosition(d) => ActivationEvent::MyPosition(d.coordinate),
            MapObject::ApiPoint { id, details } => ActivationEvent::ApiPoint {
                id: id.clone(),
                name: details.name.clone(),
                coordinate: details.coordinate,
            },
            MapObject::None => ActivationEvent::Dismiss,
        }
    }
}

pub trait ActivationListener: Send + Sync {
    fn on_activation(&self, event: &ActivationEvent);
}

impl<F> ActivationListener for F
where
    F: Fn(&ActivationEvent) + Send + Sync,
{
    fn on_activation(&self, event: &ActivationEvent) {
        self(event)
    }
}
