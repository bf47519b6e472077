// src/config.rs v3
//! Engine configuration: policy constants with file-backed storage

use crate::error::{NavError, Result};
use crate::region::cell::check_level;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unit system used by the human-readable formatters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub units: Units,
    /// Quadtree level used to map coordinates to region cells
    pub region_cell_level: u8,
    /// Object lookup radius around a tapped point
    pub search_radius_m: f64,
    /// Candidates this close to the nearest one are ranked by priority
    pub tie_tolerance_m: f64,
    /// Off-route distance that triggers a silent rebuild while following
    pub corridor_tolerance_m: f64,
    /// Spacing of region samples along the start-target line
    pub corridor_sample_step_m: f64,
    /// Speed used by the straight-line router for ETA
    pub default_speed_mps: f64,
    /// Maximum distance between a route endpoint and the road graph
    pub snap_radius_m: f64,
    /// Below this speed a fix is treated as stationary
    pub min_speed_mps: f64,
    /// Prediction horizon = stale_factor * accuracy / speed, clamped
    pub stale_factor: f64,
    pub min_prediction_horizon_s: f64,
    pub max_prediction_horizon_s: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            units: Units::Metric,
            region_cell_level: 8,
            search_radius_m: 30.0,
            tie_tolerance_m: 3.0,
            corridor_tolerance_m: 50.0,
            corridor_sample_step_m: 5_000.0,
            default_speed_mps: 13.9,
            snap_radius_m: 200.0,
            min_speed_mps: 0.5,
            stale_factor: 10.0,
            min_prediction_horizon_s: 2.0,
            max_prediction_horizon_s: 60.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Load configuration from an explicit JSON file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| NavError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::get_config_path()?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| {
                    NavError::Config(format!("Failed to create config directory: {}", e))
                })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| NavError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| NavError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| NavError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("nav-engine").join("config.json"))
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        check_level(self.region_cell_level)
            .map_err(|e| NavError::Config(format!("region_cell_level: {}", e)))?;

        let positive = [
            ("search_radius_m", self.search_radius_m),
            ("corridor_tolerance_m", self.corridor_tolerance_m),
            ("corridor_sample_step_m", self.corridor_sample_step_m),
            ("default_speed_mps", self.default_speed_mps),
            ("snap_radius_m", self.snap_radius_m),
            ("stale_factor", self.stale_factor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(NavError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }

        if self.tie_tolerance_m < 0.0 || self.min_speed_mps < 0.0 {
            return Err(NavError::Config("tolerances must not be negative".to_string()));
        }

        if self.min_prediction_horizon_s > self.max_prediction_horizon_s {
            return Err(NavError::Config(
                "min_prediction_horizon_s exceeds max_prediction_horizon_s".to_string(),
            ));
        }

        Ok(())
    }

    /// Switch unit system
    pub fn update_units(&mut self, units: Units) {
        self.units = units;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.units, Units::Metric);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"units":"imperial","search_radius_m":12.5}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.units, Units::Imperial);
        assert_eq!(config.search_radius_m, 12.5);
        assert_eq!(config.corridor_tolerance_m, 50.0);
    }

    #[test]
    fn test_validate_rejects_bad_level() {
        let mut config = EngineConfig::default();
        config.region_cell_level = 0;
        assert!(matches!(config.validate(), Err(NavError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_horizon() {
        let mut config = EngineConfig::default();
        config.min_prediction_horizon_s = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_units() {
        let mut config = EngineConfig::default();
        config.update_units(Units::Imperial);
        assert_eq!(config.units, Units::Imperial);
    }
}
