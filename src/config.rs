use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::ribbon::RibbonConfig;
use crate::shape::ShapeRecognizerConfig;
use crate::viewport::ViewportConfig;

/// Tunables of the painting engine. Every field falls back to its default
/// when missing from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Strokes that can be undone
    pub history_capacity: usize,
    pub shape: ShapeRecognizerConfig,
    pub viewport: ViewportConfig,
    pub ribbon: RibbonConfig,
    /// A stroke ending closer than this to its last midpoint is a tap
    pub tap_threshold: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            shape: ShapeRecognizerConfig::default(),
            viewport: ViewportConfig::default(),
            ribbon: RibbonConfig::default(),
            tap_threshold: 1.0,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        info!("⚙ Loaded editor config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be at least 1".into()));
        }
        let vp = &self.viewport;
        if vp.min_scale.is_nan() || vp.min_scale <= 0.0 || vp.min_scale > vp.max_scale {
            return Err(ConfigError::Invalid(format!(
                "viewport scale range {}..{} is empty",
                vp.min_scale, vp.max_scale
            )));
        }
        if self.ribbon.tick_secs.is_nan() || self.ribbon.tick_secs <= 0.0 {
            return Err(ConfigError::Invalid("ribbon tick_secs must be positive".into()));
        }
        if self.ribbon.ease_min > self.ribbon.ease_max {
            return Err(ConfigError::Invalid("ribbon ease_min exceeds ease_max".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "history_capacity": 5, "ribbon": { "particle_count": 8 } }"#).unwrap();
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.ribbon.particle_count, 8);
        assert_eq!(config.ribbon.trail_alpha, 0.05);
        assert_eq!(config.shape, ShapeRecognizerConfig::default());
    }

    #[test]
    fn test_defaults_round_trip() {
        let json = EditorConfig::default().to_json_string().unwrap();
        assert_eq!(EditorConfig::from_json_str(&json).unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            EditorConfig::from_json_str(r#"{ "history_capacity": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EditorConfig::from_json_str(r#"{ "viewport": { "min_scale": 2.0, "max_scale": 1.0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(EditorConfig::from_json_str("not json"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        assert!(matches!(
            EditorConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
