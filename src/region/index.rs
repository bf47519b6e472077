// src/region/index.rs
//! Coordinate to region lookup and per-region data presence

use super::cell::{cells_in_rect, check_level, CellId};
use crate::error::{NavError, Result};
use crate::geo::Coordinate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, info, warn};

/// Opaque handle of a packaged region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u32);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegionStatus {
    Present { version: u32 },
    KnownAbsent,
}

/// Result of resolving a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLookup {
    Region(RegionId),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub remote_size: u64,
    #[serde(flatten)]
    pub status: RegionStatus,
}

/// Serializable form of a whole index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub level: u8,
    pub data_version: u32,
    pub regions: Vec<Region>,
    pub cells: BTreeMap<CellId, RegionId>,
}

#[derive(Debug, Default)]
struct IndexState {
    regions: Vec<Region>,
    cells: HashMap<CellId, RegionId>,
    data_version: u32,
    saved_data_version: u32,
}

impl IndexState {
    fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.0 as usize)
    }

    fn region_mut(&mut self, id: RegionId) -> Result<&mut Region> {
        self.regions
            .get_mut(id.0 as usize)
            .ok_or_else(|| NavError::InvalidInput(format!("Unknown {}", id)))
    }

    fn is_outdated(&self, region: &Region) -> bool {
        matches!(region.status, RegionStatus::Present { version } if version < self.data_version)
    }
}

/// Maps coordinates to packaged regions.
///
/// All methods take `&self`; the index can be shared between the routing
/// session, point queries and the download service that marks regions present.
#[derive(Debug)]
pub struct RegionIndex {
    level: u8,
    state: RwLock<IndexState>,
}

impl RegionIndex {
    /// Empty index over cells at `level` (1..=24)
    pub fn new(level: u8) -> Result<Self> {
        check_level(level)?;
        Ok(Self {
            level,
            state: RwLock::new(IndexState::default()),
        })
    }

    /// Build from a snapshot without checking cell targets; a dangling cell
    /// surfaces as [`NavError::CorruptIndex`] when it is looked up.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self> {
        check_level(snapshot.level).map_err(|e| NavError::Parse(e.to_string()))?;
        if let Some(cell) = snapshot.cells.keys().find(|c| c.level() != snapshot.level) {
            return Err(NavError::Parse(format!(
                "Cell {} does not match index level {}",
                cell, snapshot.level
            )));
        }

        let state = IndexState {
            regions: snapshot.regions,
            cells: snapshot.cells.into_iter().collect(),
            data_version: snapshot.data_version,
            saved_data_version: snapshot.data_version,
        };
        Ok(Self {
            level: snapshot.level,
            state: RwLock::new(state),
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        let state = self.state.read();
        IndexSnapshot {
            level: self.level,
            data_version: state.data_version,
            regions: state.regions.clone(),
            cells: state.cells.iter().map(|(c, id)| (c.clone(), *id)).collect(),
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Register a region; it starts known-absent
    pub fn add_region(&self, name: &str, parent: Option<&str>, remote_size: u64) -> RegionId {
        let mut state = self.state.write();
        let id = RegionId(state.regions.len() as u32);
        state.regions.push(Region {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            remote_size,
            status: RegionStatus::KnownAbsent,
        });
        debug!(%id, region_name = name, "region registered");
        id
    }

    /// Give a cell to a region. The first region to claim a cell keeps it;
    /// returns false when the cell was already taken.
    pub fn assign_cell(&self, id: RegionId, cell: CellId) -> Result<bool> {
        if cell.level() != self.level {
            return Err(NavError::InvalidInput(format!(
                "Cell {} is level {}, index uses level {}",
                cell,
                cell.level(),
                self.level
            )));
        }

        let mut state = self.state.write();
        state.region_mut(id)?;
        if state.cells.contains_key(&cell) {
            return Ok(false);
        }
        state.cells.insert(cell, id);
        Ok(true)
    }

    /// Assign every free cell overlapping the rectangle; returns how many were taken
    pub fn cover_rect(
        &self,
        id: RegionId,
        south: f64,
        west: f64,
        north: f64,
        east: f64,
    ) -> Result<usize> {
        let mut taken = 0;
        for cell in cells_in_rect(south, west, north, east, self.level) {
            if self.assign_cell(id, cell)? {
                taken += 1;
            }
        }
        Ok(taken)
    }

    pub fn region_for(&self, coordinate: Coordinate) -> Result<RegionLookup> {
        let cell = CellId::from_coordinate(coordinate, self.level);
        let state = self.state.read();

        match state.cells.get(&cell) {
            None => Ok(RegionLookup::Unknown),
            Some(&id) if state.region(id).is_some() => Ok(RegionLookup::Region(id)),
            Some(&id) => {
                warn!(%cell, %id, "cell points at a missing region");
                Err(NavError::CorruptIndex(format!("cell {} refers to unknown {}", cell, id)))
            }
        }
    }

    pub fn region(&self, id: RegionId) -> Option<Region> {
        self.state.read().region(id).cloned()
    }

    pub fn status(&self, id: RegionId) -> Option<RegionStatus> {
        self.state.read().region(id).map(|r| r.status)
    }

    pub fn name(&self, id: RegionId) -> Option<String> {
        self.state.read().region(id).map(|r| r.name.clone())
    }

    pub fn find_by_name(&self, name: &str) -> Option<RegionId> {
        self.state
            .read()
            .regions
            .iter()
            .position(|r| r.name == name)
            .map(|i| RegionId(i as u32))
    }

    pub fn is_present(&self, id: RegionId) -> bool {
        matches!(self.status(id), Some(RegionStatus::Present { .. }))
    }

    pub fn is_known_absent(&self, id: RegionId) -> bool {
        matches!(self.status(id), Some(RegionStatus::KnownAbsent))
    }

    /// Download-completion signal: the region's data is now local
    pub fn mark_downloaded(&self, id: RegionId, version: u32) -> Result<()> {
        let mut state = self.state.write();
        let region = state.region_mut(id)?;
        region.status = RegionStatus::Present { version };
        info!(%id, region_name = %region.name, version, "region present");
        Ok(())
    }

    /// The region's local data was deleted
    pub fn mark_removed(&self, id: RegionId) -> Result<()> {
        let mut state = self.state.write();
        let region = state.region_mut(id)?;
        region.status = RegionStatus::KnownAbsent;
        info!(%id, region_name = %region.name, "region removed");
        Ok(())
    }

    /// (local, remote) byte sizes of a region
    pub fn size(&self, id: RegionId) -> Option<(u64, u64)> {
        self.state.read().region(id).map(|r| match r.status {
            RegionStatus::Present { .. } => (r.remote_size, r.remote_size),
            RegionStatus::KnownAbsent => (0, r.remote_size),
        })
    }

    /// Name of the region covering `coordinate` when its data is missing
    pub fn country_name_if_absent(&self, coordinate: Coordinate) -> Result<Option<String>> {
        match self.region_for(coordinate)? {
            RegionLookup::Region(id) if self.is_known_absent(id) => Ok(self.name(id)),
            _ => Ok(None),
        }
    }

    pub fn data_version(&self) -> u32 {
        self.state.read().data_version
    }

    /// Publish a new data version; present regions below it become outdated
    pub fn set_data_version(&self, version: u32) {
        let mut state = self.state.write();
        if version != state.data_version {
            info!(from = state.data_version, to = version, "data version changed");
        }
        state.data_version = version;
    }

    pub fn data_version_changed(&self) -> bool {
        let state = self.state.read();
        state.data_version != state.saved_data_version
    }

    pub fn update_saved_data_version(&self) {
        let mut state = self.state.write();
        state.saved_data_version = state.data_version;
    }

    pub fn outdated_regions(&self) -> BTreeSet<RegionId> {
        let state = self.state.read();
        state
            .regions
            .iter()
            .enumerate()
            .filter(|(_, r)| state.is_outdated(r))
            .map(|(i, _)| RegionId(i as u32))
            .collect()
    }

    /// Outdated region names joined for display
    pub fn outdated_regions_string(&self) -> String {
        let state = self.state.read();
        state
            .regions
            .iter()
            .filter(|r| state.is_outdated(r))
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn region_count(&self) -> usize {
        self.state.read().regions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn sample_index() -> (RegionIndex, RegionId, RegionId) {
        let index = RegionIndex::new(6).unwrap();
        let france = index.add_region("France", Some("Europe"), 4_000);
        let spain = index.add_region("Spain", Some("Europe"), 3_000);
        index.cover_rect(france, 43.0, -4.0, 51.0, 7.0).unwrap();
        index.cover_rect(spain, 36.0, -9.0, 43.5, 3.0).unwrap();
        (index, france, spain)
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let (index, france, _) = sample_index();
        let paris = c(48.8566, 2.3522);
        assert_eq!(index.region_for(paris).unwrap(), RegionLookup::Region(france));
        assert_eq!(index.region_for(paris).unwrap(), index.region_for(paris).unwrap());
        assert_eq!(index.region_for(c(-40.0, -120.0)).unwrap(), RegionLookup::Unknown);
    }

    #[test]
    fn test_first_claim_wins() {
        let (index, france, spain) = sample_index();
        // The overlap band belongs to France, which was covered first
        let border = c(43.2, 0.0);
        assert_eq!(index.region_for(border).unwrap(), RegionLookup::Region(france));
        assert_eq!(index.region_for(c(40.4, -3.7)).unwrap(), RegionLookup::Region(spain));
    }

    #[test]
    fn test_presence_transitions() {
        let (index, france, _) = sample_index();
        assert!(index.is_known_absent(france));
        assert_eq!(index.size(france), Some((0, 4_000)));
        assert_eq!(index.country_name_if_absent(c(48.8, 2.3)).unwrap(), Some("France".to_string()));

        index.mark_downloaded(france, 1).unwrap();
        assert!(index.is_present(france));
        assert!(!index.is_known_absent(france));
        assert_eq!(index.size(france), Some((4_000, 4_000)));
        assert_eq!(index.country_name_if_absent(c(48.8, 2.3)).unwrap(), None);

        index.mark_removed(france).unwrap();
        assert!(index.is_known_absent(france));
    }

    #[test]
    fn test_unknown_region_id() {
        let (index, _, _) = sample_index();
        assert!(index.mark_downloaded(RegionId(99), 1).is_err());
        assert!(!index.is_present(RegionId(99)));
        assert!(!index.is_known_absent(RegionId(99)));
    }

    #[test]
    fn test_outdated_regions() {
        let (index, france, spain) = sample_index();
        index.set_data_version(150_101);
        index.update_saved_data_version();
        index.mark_downloaded(france, 150_101).unwrap();
        index.mark_downloaded(spain, 150_101).unwrap();
        assert!(index.outdated_regions().is_empty());
        assert!(!index.data_version_changed());

        index.set_data_version(150_201);
        assert!(index.data_version_changed());
        index.mark_downloaded(spain, 150_201).unwrap();
        assert_eq!(index.outdated_regions(), BTreeSet::from([france]));
        assert_eq!(index.outdated_regions_string(), "France");

        index.update_saved_data_version();
        assert!(!index.data_version_changed());
    }

    #[test]
    fn test_wrong_level_cell() {
        let (index, france, _) = sample_index();
        assert!(index.assign_cell(france, CellId::parse("01").unwrap()).is_err());
    }

    #[test]
    fn test_snapshot_roundtrip_and_corruption() {
        let (index, france, _) = sample_index();
        let json = serde_json::to_string(&index.snapshot()).unwrap();
        let restored = RegionIndex::from_json(&json).unwrap();
        assert_eq!(restored.region_for(c(48.8, 2.3)).unwrap(), RegionLookup::Region(france));

        let mut snapshot = index.snapshot();
        let paris_cell = CellId::from_coordinate(c(48.8, 2.3), 6);
        snapshot.cells.insert(paris_cell, RegionId(42));
        let corrupt = RegionIndex::from_snapshot(snapshot).unwrap();
        assert!(matches!(corrupt.region_for(c(48.8, 2.3)), Err(NavError::CorruptIndex(_))));
        // Other cells still resolve
        assert!(corrupt.region_for(c(40.4, -3.7)).is_ok());
    }

    #[test]
    fn test_level_out_of_range_is_rejected() {
        assert!(matches!(RegionIndex::new(0), Err(NavError::InvalidInput(_))));
        assert!(matches!(RegionIndex::new(40), Err(NavError::InvalidInput(_))));

        let snapshot = IndexSnapshot {
            level: 40,
            data_version: 0,
            regions: Vec::new(),
            cells: BTreeMap::new(),
        };
        assert!(matches!(RegionIndex::from_snapshot(snapshot), Err(NavError::Parse(_))));
        let json = r#"{"level":40,"data_version":0,"regions":[],"cells":{}}"#;
        assert!(RegionIndex::from_json(json).is_err());
    }

    #[test]
    fn test_lookups_during_download() {
        let (index, france, _) = sample_index();
        let index = std::sync::Arc::new(index);
        let paris = c(48.8566, 2.3522);

        let reader = {
            let index = std::sync::Arc::clone(&index);
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    assert_eq!(index.region_for(paris).unwrap(), RegionLookup::Region(france));
                }
            })
        };
        let writer = {
            let index = std::sync::Arc::clone(&index);
            std::thread::spawn(move || index.mark_downloaded(france, 1).unwrap())
        };

        writer.join().unwrap();
        // A completed download is visible to the next lookup
        assert!(index.is_present(france));
        assert_eq!(index.country_name_if_absent(paris).unwrap(), None);
        reader.join().unwrap();
    }
}
