//! # Minimap Settings
//!
//! One TOML document configures a whole session. Every table is optional;
//! missing tables and fields take their defaults.
//!
//! ```toml
//! [view]
//! extent = { x = 2048.0, y = 2048.0 }
//! zoom = 1.5
//! rotation = { mode = "inherit_yaw", offset = 90.0 }
//!
//! [fog]
//! resolution = 512
//! combine = { mode = "accumulate" }
//!
//! [compositor]
//! circular = false
//!
//! [session]
//! frame_budget_ms = 2.0
//! auto_locate = "on_map_background"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use minimap_core::{
    BackgroundConfig, CacheConfig, FogConfig, MinimapError, MinimapResult, TrackerConfig, ViewConfig,
    ViewSearch,
};
use minimap_render::CompositorConfig;

/// Default time budget of one session tick, in milliseconds.
pub const DEFAULT_FRAME_BUDGET_MS: f64 = 4.0;

/// Frame driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Tick time above which a warning is logged. Zero disables the check.
    pub frame_budget_ms: f64,
    /// View picked by [`crate::MinimapSession::compose`] when none is given.
    pub auto_locate: ViewSearch,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
            auto_locate: ViewSearch::Any,
        }
    }
}

/// Every engine setting of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimapSettings {
    /// Player view defaults.
    pub view: ViewConfig,
    /// Cache lifetimes.
    pub cache: CacheConfig,
    /// Fog area defaults.
    pub fog: FogConfig,
    /// Background area defaults.
    pub background: BackgroundConfig,
    /// Registry capacities.
    pub tracker: TrackerConfig,
    /// Widget shape, placement and colors.
    pub compositor: CompositorConfig,
    /// Frame driver.
    pub session: SessionConfig,
}

impl MinimapSettings {
    /// Parses and validates settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::InvalidConfig`] if the document does not
    /// parse or a value is out of range.
    pub fn from_toml_str(source: &str) -> MinimapResult<Self> {
        let settings: Self = toml::from_str(source).map_err(|err| MinimapError::InvalidConfig(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::ConfigIo`] if the file cannot be read, or
    /// [`MinimapError::InvalidConfig`] if its content is rejected.
    pub fn load(path: impl AsRef<Path>) -> MinimapResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|err| MinimapError::ConfigIo(format!("{}: {err}", path.display())))?;
        let settings = Self::from_toml_str(&source)?;
        tracing::info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Serializes the settings back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::InvalidConfig`] if a value cannot be encoded.
    pub fn to_toml_string(&self) -> MinimapResult<String> {
        toml::to_string(self).map_err(|err| MinimapError::InvalidConfig(err.to_string()))
    }

    /// Checks every table.
    ///
    /// # Errors
    ///
    /// Returns [`MinimapError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> MinimapResult<()> {
        self.view.validate()?;
        self.cache.validate()?;
        self.fog.validate()?;

        if !(self.session.frame_budget_ms.is_finite() && self.session.frame_budget_ms >= 0.0) {
            return Err(MinimapError::InvalidConfig(format!(
                "session frame_budget_ms must be a non-negative number, got {}",
                self.session.frame_budget_ms
            )));
        }

        let placement = &self.compositor.placement;
        if placement.dpi_scale.is_nan() || placement.dpi_scale <= 0.0 {
            return Err(MinimapError::InvalidConfig(format!(
                "compositor dpi_scale must be positive, got {}",
                placement.dpi_scale
            )));
        }
        if placement.size.x < 0.0 || placement.size.y < 0.0 || placement.margin < 0.0 {
            return Err(MinimapError::InvalidConfig(
                "compositor size and margin must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
