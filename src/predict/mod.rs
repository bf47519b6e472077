// src/predict/mod.rs
//! Dead reckoning between position fixes

use crate::config::EngineConfig;
use crate::error::{NavError, Result};
use crate::geo::{destination, Coordinate, Fix};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    pub min_speed_mps: f64,
    pub stale_factor: f64,
    pub min_horizon_s: f64,
    pub max_horizon_s: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for PredictorConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            min_speed_mps: config.min_speed_mps,
            stale_factor: config.stale_factor,
            min_horizon_s: config.min_prediction_horizon_s,
            max_horizon_s: config.max_prediction_horizon_s,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.min_speed_mps,
            self.stale_factor,
            self.min_horizon_s,
            self.max_horizon_s,
        ];
        if finite.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(NavError::InvalidInput(format!(
                "predictor settings must be finite and non-negative: {:?}",
                self
            )));
        }
        if self.min_horizon_s > self.max_horizon_s {
            return Err(NavError::InvalidInput(format!(
                "min_horizon_s {} exceeds max_horizon_s {}",
                self.min_horizon_s, self.max_horizon_s
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub coordinate: Coordinate,
    /// Advisory; grows with the distance travelled since the fix
    pub accuracy_m: f64,
    /// False when the fix position was returned as-is
    pub extrapolated: bool,
}

/// Linear extrapolation along the fix bearing at the fix speed.
///
/// A fix is held in place when it is too slow to have a meaningful heading,
/// when it has no bearing, or when `elapsed` is beyond the staleness horizon
/// `stale_factor * accuracy / speed` (clamped to the configured bounds).
#[derive(Debug, Clone, Default)]
pub struct LocationPredictor {
    config: PredictorConfig,
}

impl LocationPredictor {
    pub fn new(config: PredictorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Seconds after which a fix moving at `speed_mps` is no longer extrapolated
    pub fn horizon_s(&self, accuracy_m: f64, speed_mps: f64) -> f64 {
        let raw = if speed_mps > 0.0 {
            self.config.stale_factor * accuracy_m / speed_mps
        } else {
            self.config.max_horizon_s
        };
        raw.clamp(self.config.min_horizon_s, self.config.max_horizon_s)
    }

    pub fn predict(&self, fix: &Fix, elapsed_s: f64) -> Prediction {
        let inflated = if elapsed_s > 0.0 {
            fix.accuracy_m + fix.speed_mps * elapsed_s
        } else {
            fix.accuracy_m
        };
        let hold = Prediction {
            coordinate: fix.coordinate,
            accuracy_m: inflated,
            extrapolated: false,
        };

        let Some(bearing) = fix.bearing_deg else {
            return hold;
        };
        if fix.speed_mps < self.config.min_speed_mps || !(elapsed_s > 0.0) {
            return hold;
        }
        if elapsed_s > self.horizon_s(fix.accuracy_m, fix.speed_mps) {
            return hold;
        }

        Prediction {
            coordinate: destination(fix.coordinate, bearing, fix.speed_mps * elapsed_s),
            accuracy_m: inflated,
            extrapolated: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{haversine_distance, initial_bearing};
    use chrono::Utc;

    fn fix(speed: f64, bearing: Option<f64>, accuracy: f64) -> Fix {
        let c = Coordinate::new(47.0, 8.0).unwrap();
        Fix::new(c, accuracy, bearing, speed, Utc::now()).unwrap()
    }

    #[test]
    fn test_stationary_fix_is_held() {
        let predictor = LocationPredictor::default();
        let f = fix(0.0, Some(90.0), 10.0);
        for t in [0.0, 1.0, 30.0, 1_000.0] {
            let p = predictor.predict(&f, t);
            assert_eq!(p.coordinate, f.coordinate);
            assert!(!p.extrapolated);
        }
    }

    #[test]
    fn test_moves_along_bearing() {
        let predictor = LocationPredictor::default();
        let f = fix(10.0, Some(45.0), 20.0);
        let p = predictor.predict(&f, 3.0);
        assert!(p.extrapolated);

        let travelled = haversine_distance(f.coordinate, p.coordinate);
        assert!((travelled - 30.0).abs() < 1e-3, "travelled {}", travelled);
        let bearing = initial_bearing(f.coordinate, p.coordinate);
        assert!((bearing - 45.0).abs() < 1e-3);
        assert!((p.accuracy_m - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_stale_fix_is_held() {
        let predictor = LocationPredictor::default();
        // horizon = 10 * 5 / 10 = 5 s
        let f = fix(10.0, Some(0.0), 5.0);
        assert!(predictor.predict(&f, 4.0).extrapolated);
        let p = predictor.predict(&f, 6.0);
        assert!(!p.extrapolated);
        assert_eq!(p.coordinate, f.coordinate);
        assert!(p.accuracy_m > f.accuracy_m);
    }

    #[test]
    fn test_no_bearing_or_negative_elapsed() {
        let predictor = LocationPredictor::default();
        let f = fix(10.0, None, 20.0);
        assert!(!predictor.predict(&f, 1.0).extrapolated);

        let f = fix(10.0, Some(90.0), 20.0);
        let p = predictor.predict(&f, -1.0);
        assert!(!p.extrapolated);
        assert_eq!(p.accuracy_m, 20.0);
    }

    #[test]
    fn test_horizon_clamp() {
        let predictor = LocationPredictor::default();
        assert_eq!(predictor.horizon_s(0.0, 10.0), 2.0);
        assert_eq!(predictor.horizon_s(1_000.0, 1.0), 60.0);
        assert_eq!(predictor.horizon_s(30.0, 10.0), 30.0);
    }

    #[test]
    fn test_rejects_inverted_horizon() {
        let config = PredictorConfig {
            min_horizon_s: 30.0,
            max_horizon_s: 5.0,
            ..PredictorConfig::default()
        };
        assert!(matches!(LocationPredictor::new(config), Err(NavError::InvalidInput(_))));

        let config = PredictorConfig {
            stale_factor: f64::NAN,
            ..PredictorConfig::default()
        };
        assert!(LocationPredictor::new(config).is_err());
        assert!(LocationPredictor::new(PredictorConfig::default()).is_ok());
    }
}
