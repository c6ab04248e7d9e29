//! Surface configuration and capability toggles.

use crate::element::Category;
use crate::error::{SurfaceError, SurfaceResult};
use serde::{Deserialize, Serialize};

/// Inclusive bounds for a scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp a value into the bounds.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn validate(&self, name: &str) -> SurfaceResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min <= 0.0 || self.min > self.max {
            return Err(SurfaceError::Config(format!(
                "{name}: expected 0 < min <= max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Gesture tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Displacement on either axis that promotes a pending pointer to moved.
    pub move_threshold: f64,
    /// Minimum interval between live commit batches.
    pub commit_interval: f64,
    /// Ratio bounds for background (group) zoom.
    pub group_zoom: Bounds,
    /// Size bounds for a pinched free-floating text element.
    pub text_size: Bounds,
    /// Size bounds for pinched media elements, unclamped when absent.
    pub media_size: Option<Bounds>,
    /// Floor applied to every pinch result.
    pub minimum_size: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            move_threshold: 10.0,
            commit_interval: 100.0,
            group_zoom: Bounds::new(0.5, 2.0),
            text_size: Bounds::new(30.0, 2000.0),
            media_size: None,
            minimum_size: 1.0,
        }
    }
}

/// Ink recording, width model and replay tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InkConfig {
    /// Pen width; the width model never exceeds `min_width + max_width`.
    pub max_width: f64,
    pub min_width: f64,
    /// Diffuseness constant `k` of the width model.
    pub diffuseness: f64,
    /// Speed exponent `p` of the width model.
    pub speed_sensitivity: f64,
    /// Weight of the previous width in the moving average.
    pub smoothing: f64,
    /// Eraser disc diameter; falls back to `max_width`.
    pub eraser_width: Option<f64>,
    /// Cap on the pause inserted between consecutive strokes.
    pub max_pause: f64,
    /// Refresh period of the live tail while a pen rests.
    pub diffuse_interval: f64,
    /// Pause between playback loops.
    pub replay_pause: f64,
    /// Style for ink beyond the scrub position.
    pub future_style: String,
    /// Style for eraser cursor discs.
    pub eraser_cursor_style: String,
}

impl Default for InkConfig {
    fn default() -> Self {
        Self {
            max_width: 6.0,
            min_width: 1.0,
            diffuseness: 0.3,
            speed_sensitivity: 0.5,
            smoothing: 0.7,
            eraser_width: None,
            max_pause: 1000.0,
            diffuse_interval: 30.0,
            replay_pause: 1000.0,
            future_style: "oklch(70.7% 0.022 261.325)".to_string(),
            eraser_cursor_style: "#ffffff".to_string(),
        }
    }
}

impl InkConfig {
    /// Effective eraser diameter.
    pub fn eraser_width(&self) -> f64 {
        self.eraser_width.unwrap_or(self.max_width)
    }
}

/// Media clip tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Delay before a finished segment restarts.
    pub restart_delay: f64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self { restart_delay: 1000.0 }
    }
}

/// Complete surface configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub gesture: GestureConfig,
    pub ink: InkConfig,
    pub media: MediaConfig,
    /// Inactivity period after which the session is told to disconnect.
    pub idle_timeout: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            ink: InkConfig::default(),
            media: MediaConfig::default(),
            idle_timeout: 20.0 * 60.0 * 1000.0,
        }
    }
}

impl SurfaceConfig {
    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> SurfaceResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SurfaceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> SurfaceResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SurfaceError::Encode(e.to_string()))
    }

    /// Reject configurations that would feed non-finite or non-positive
    /// values into element geometry or the width model.
    pub fn validate(&self) -> SurfaceResult<()> {
        let g = &self.gesture;
        if g.move_threshold < 0.0 || g.commit_interval <= 0.0 {
            return Err(SurfaceError::Config(
                "gesture: move_threshold must be >= 0 and commit_interval > 0".to_string(),
            ));
        }
        if g.minimum_size <= 0.0 {
            return Err(SurfaceError::Config("gesture: minimum_size must be > 0".to_string()));
        }
        g.group_zoom.validate("gesture.group_zoom")?;
        g.text_size.validate("gesture.text_size")?;
        if let Some(media) = &g.media_size {
            media.validate("gesture.media_size")?;
        }

        let ink = &self.ink;
        if ink.max_width <= 0.0 || ink.min_width < 0.0 || ink.eraser_width() <= 0.0 {
            return Err(SurfaceError::Config("ink: widths must be positive".to_string()));
        }
        if ink.diffuseness <= 0.0 || ink.speed_sensitivity < 0.0 {
            return Err(SurfaceError::Config(
                "ink: diffuseness must be > 0 and speed_sensitivity >= 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&ink.smoothing) {
            return Err(SurfaceError::Config("ink: smoothing must be in [0, 1)".to_string()));
        }
        if ink.max_pause < 0.0 || ink.diffuse_interval <= 0.0 || ink.replay_pause < 0.0 {
            return Err(SurfaceError::Config("ink: intervals must be positive".to_string()));
        }
        if self.media.restart_delay < 0.0 || self.idle_timeout <= 0.0 {
            return Err(SurfaceError::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }
}

/// Which interactions the host currently allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub pan: bool,
    pub zoom: bool,
    pub rotate: bool,
    /// Background gestures move every free-floating text element.
    pub group_text: bool,
    /// Background gestures move every image, avatar and media element.
    pub group_visual: bool,
}

impl Capabilities {
    /// Pan and zoom on, group moves off.
    pub fn interactive() -> Self {
        Self {
            pan: true,
            zoom: true,
            ..Self::default()
        }
    }

    /// Whether a second pointer may join a pan.
    pub fn allows_secondary(&self) -> bool {
        self.zoom || self.rotate
    }

    /// Whether any category follows background gestures.
    pub fn any_group_move(&self) -> bool {
        self.group_text || self.group_visual
    }

    /// Whether a category follows background gestures.
    pub fn moves(&self, category: Category) -> bool {
        match category {
            Category::Text => self.group_text,
            Category::Visual => self.group_visual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SurfaceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = SurfaceConfig::from_json(r#"{"ink": {"max_width": 12}}"#).unwrap();
        assert!((config.ink.max_width - 12.0).abs() < f64::EPSILON);
        assert!((config.ink.eraser_width() - 12.0).abs() < f64::EPSILON);
        assert!((config.gesture.move_threshold - 10.0).abs() < f64::EPSILON);
        assert!(config.gesture.media_size.is_none());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = SurfaceConfig::from_json(
            r#"{"gesture": {"text_size": {"min": 500, "max": 30}}}"#,
        );
        assert!(matches!(result, Err(SurfaceError::Config(_))));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(SurfaceConfig::from_json("{"), Err(SurfaceError::Config(_))));
    }

    #[test]
    fn test_json_roundtrip_keeps_media_bounds() {
        let mut config = SurfaceConfig::default();
        config.gesture.media_size = Some(Bounds::new(40.0, 4000.0));
        let parsed = SurfaceConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_capabilities() {
        let caps = Capabilities::interactive();
        assert!(caps.allows_secondary());
        assert!(!caps.any_group_move());
        let caps = Capabilities { group_visual: true, ..Capabilities::default() };
        assert!(caps.any_group_move());
        assert!(caps.moves(Category::Visual));
        assert!(!caps.moves(Category::Text));
        assert!(!caps.allows_secondary());
    }
}
