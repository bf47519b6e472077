// src/object/types.rs
//! Map object variants returned by point queries

use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata keys attached to map objects, with stable integer codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetadataType {
    Cuisine,
    OpenHours,
    Phone,
    Fax,
    Stars,
    Operator,
    Url,
    Website,
    Internet,
    Elevation,
    Postcode,
    Wikipedia,
    Email,
}

impl MetadataType {
    pub const ALL: [MetadataType; 13] = [
        MetadataType::Cuisine,
        MetadataType::OpenHours,
        MetadataType::Phone,
        MetadataType::Fax,
        MetadataType::Stars,
        MetadataType::Operator,
        MetadataType::Url,
        MetadataType::Website,
        MetadataType::Internet,
        MetadataType::Elevation,
        MetadataType::Postcode,
        MetadataType::Wikipedia,
        MetadataType::Email,
    ];

    pub fn code(&self) -> u8 {
        match self {
            MetadataType::Cuisine => 1,
            MetadataType::OpenHours => 2,
            MetadataType::Phone => 3,
            MetadataType::Fax => 4,
            MetadataType::Stars => 5,
            MetadataType::Operator => 6,
            MetadataType::Url => 7,
            MetadataType::Website => 8,
            MetadataType::Internet => 9,
            MetadataType::Elevation => 10,
            MetadataType::Postcode => 11,
            MetadataType::Wikipedia => 12,
            MetadataType::Email => 13,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }
}

/// Fields shared by every non-empty map object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetails {
    pub name: String,
    pub object_type: Option<String>,
    pub address: String,
    pub coordinate: Coordinate,
    pub metadata: BTreeMap<MetadataType, String>,
}

impl ObjectDetails {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            object_type: None,
            address: String::new(),
            coordinate,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set a metadata value, replacing any previous value for the key
    pub fn with_metadata(mut self, key: MetadataType, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value.into());
        self
    }

    /// Metadata as parallel code/value arrays
    pub fn metadata_arrays(&self) -> (Vec<u8>, Vec<String>) {
        self.metadata.iter().map(|(k, v)| (k.code(), v.clone())).unzip()
    }

    /// "name, address" with empty parts left out
    pub fn label(&self) -> String {
        match (self.name.is_empty(), self.address.is_empty()) {
            (false, false) => format!("{}, {}", self.name, self.address),
            (false, true) => self.name.clone(),
            (true, false) => self.address.clone(),
            (true, true) => String::new(),
        }
    }
}

/// Variant tag of a [`MapObject`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Bookmark,
    ApiPoint,
    Poi,
    AdditionalLayer,
    MyPosition,
    None,
}

impl ObjectKind {
    /// Lower ranks win ties between equally near candidates. My-position
    /// follows every fix, so it ranks below anything the user can tap.
    pub fn priority_rank(&self) -> u8 {
        match self {
            ObjectKind::Bookmark => 0,
            ObjectKind::ApiPoint => 1,
            ObjectKind::Poi => 2,
            ObjectKind::AdditionalLayer => 3,
            ObjectKind::MyPosition => 4,
            ObjectKind::None => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapObject {
    Poi(ObjectDetails),
    Bookmark {
        category: usize,
        index: usize,
        details: ObjectDetails,
    },
    AdditionalLayer(ObjectDetails),
    MyPosition(ObjectDetails),
    ApiPoint {
        id: String,
        details: ObjectDetails,
    },
    None,
}

impl MapObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            MapObject::Poi(_) => ObjectKind::Poi,
            MapObject::Bookmark { .. } => ObjectKind::Bookmark,
            MapObject::AdditionalLayer(_) => ObjectKind::AdditionalLayer,
            MapObject::MyPosition(_) => ObjectKind::MyPosition,
            MapObject::ApiPoint { .. } => ObjectKind::ApiPoint,
            MapObject::None => ObjectKind::None,
        }
    }

    pub fn details(&self) -> Option<&ObjectDetails> {
        match self {
            MapObject::Poi(d)
            | MapObject::AdditionalLayer(d)
            | MapObject::MyPosition(d)
            | MapObject::Bookmark { details: d, .. }
            | MapObject::ApiPoint { details: d, .. } => Some(d),
            MapObject::None => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, MapObject::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_codes_roundtrip() {
        for t in MetadataType::ALL {
            assert_eq!(MetadataType::from_code(t.code()), Some(t));
        }
        assert_eq!(MetadataType::from_code(0), None);
    }

    #[test]
    fn test_metadata_keys_unique() {
        let c = Coordinate::new(1.0, 2.0).unwrap();
        let details = ObjectDetails::new("Cafe", c)
            .with_metadata(MetadataType::Phone, "+1 555")
            .with_metadata(MetadataType::Phone, "+1 666")
            .with_metadata(MetadataType::Cuisine, "french");
        let (codes, values) = details.metadata_arrays();
        assert_eq!(codes, vec![1, 3]);
        assert_eq!(values, vec!["french".to_string(), "+1 666".to_string()]);
    }

    #[test]
    fn test_label() {
        let c = Coordinate::new(1.0, 2.0).unwrap();
        let cafe = ObjectDetails::new("Cafe", c).with_address("1 Main St");
        assert_eq!(cafe.label(), "Cafe, 1 Main St");
        assert_eq!(ObjectDetails::new("Cafe", c).label(), "Cafe");
        assert_eq!(ObjectDetails::new("", c).with_address("1 Main St").label(), "1 Main St");
    }

    #[test]
    fn test_kind_and_details() {
        let c = Coordinate::new(1.0, 2.0).unwrap();
        let obj = MapObject::Bookmark {
            category: 0,
            index: 3,
            details: ObjectDetails::new("Home", c),
        };
        assert_eq!(obj.kind(), ObjectKind::Bookmark);
        assert_eq!(obj.details().unwrap().name, "Home");
        assert!(MapObject::None.details().is_none());
        assert!(ObjectKind::Bookmark.priority_rank() < ObjectKind::Poi.priority_rank());
        assert!(ObjectKind::Poi.priority_rank() < ObjectKind::AdditionalLayer.priority_rank());
        assert!(ObjectKind::Bookmark.priority_rank() < ObjectKind::MyPosition.priority_rank());
    }
}
