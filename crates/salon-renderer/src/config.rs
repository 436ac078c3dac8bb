use serde::{Deserialize, Serialize};

use salon_core::spatial::{QuadTreeConfig, MAX_DEPTH, MAX_OBJECTS_PER_NODE};

use crate::error::ConfigError;

/// Object count above which indexed culling pays for itself.
pub const DEFAULT_CULL_THRESHOLD: usize = 50;
/// Margin around an object's footprint covered when it is marked dirty,
/// wide enough for selection handles.
pub const DEFAULT_DIRTY_PADDING: f64 = 10.0;
/// Frames kept in each timing window.
pub const DEFAULT_SAMPLE_WINDOW: usize = 60;

/// Tuning knobs for the render-optimization layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub max_objects_per_node: usize,
    pub max_depth: usize,
    pub cull_threshold: usize,
    pub dirty_padding: f64,
    pub sample_window: usize,
    /// Average FPS at or above which performance counts as good.
    pub good_fps: f64,
    /// Average FPS at or above which performance counts as acceptable.
    pub acceptable_fps: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_objects_per_node: MAX_OBJECTS_PER_NODE,
            max_depth: MAX_DEPTH,
            cull_threshold: DEFAULT_CULL_THRESHOLD,
            dirty_padding: DEFAULT_DIRTY_PADDING,
            sample_window: DEFAULT_SAMPLE_WINDOW,
            good_fps: 55.0,
            acceptable_fps: 25.0,
        }
    }
}

impl OptimizerConfig {
    /// Parse settings from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_objects_per_node == 0 {
            return Err(ConfigError::Invalid {
                field: "max_objects_per_node",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sample_window == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_window",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.dirty_padding.is_finite() || self.dirty_padding < 0.0 {
            return Err(ConfigError::Invalid {
                field: "dirty_padding",
                reason: format!("expected a non-negative number, got {}", self.dirty_padding),
            });
        }
        if self.acceptable_fps > self.good_fps {
            return Err(ConfigError::Invalid {
                field: "acceptable_fps",
                reason: format!(
                    "{} is above good_fps ({})",
                    self.acceptable_fps, self.good_fps
                ),
            });
        }
        Ok(())
    }

    pub fn quadtree(&self) -> QuadTreeConfig {
        QuadTreeConfig {
            max_objects_per_node: self.max_objects_per_node,
            max_depth: self.max_depth,
        }
    }
}
