// Engine Configuration
// Root node identity, layout geometry and overlay timing, loaded from YAML

use crate::error::{EngineError, EngineResult};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV_VAR: &str = "FLOWVIEW_CONFIG";

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Node id of the synthetic root
    pub root_id: String,

    /// Fixed label shown on the root node
    pub root_label: String,

    /// Free-text name that events use to address the root
    pub root_alias: String,

    /// Layout geometry
    pub layout: LayoutConfig,

    /// Ephemeral edge timing
    pub overlay: OverlayConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_id: "root".to_string(),
            root_label: "CEO".to_string(),
            root_alias: "ceo".to_string(),
            layout: LayoutConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

/// Fixed geometry used by the layered layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between neighbouring nodes of the same rank
    pub node_spacing: f64,
    /// Gap between consecutive ranks
    pub rank_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 140.0,
            node_height: 140.0,
            node_spacing: 50.0,
            rank_spacing: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Lifetime of a communication edge in milliseconds
    pub ttl_ms: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { ttl_ms: 3000 }
    }
}

impl OverlayConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl EngineConfig {
    /// Parse a YAML document. Missing keys fall back to defaults.
    pub fn from_yaml(content: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| EngineError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Locate the config file: `$FLOWVIEW_CONFIG`, then the user config
    /// directory, otherwise defaults.
    pub fn discover() -> EngineResult<Self> {
        match Self::discover_path() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn discover_path() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
            if !explicit.is_empty() {
                return Some(PathBuf::from(explicit));
            }
        }

        let candidate = dirs::config_dir()?.join("flowview").join("config.yaml");
        candidate.exists().then_some(candidate)
    }

    /// Reject geometry and timing values the layout cannot work with
    pub fn validate(&self) -> EngineResult<()> {
        if self.root_id.trim().is_empty() {
            return Err(EngineError::InvalidConfig("root_id must not be empty".into()));
        }
        if self.root_alias.is_empty() {
            return Err(EngineError::InvalidConfig(
                "root_alias must not be empty".into(),
            ));
        }

        let layout = &self.layout;
        let size_ok = |side: f64| side.is_finite() && side > 0.0;
        if !(size_ok(layout.node_width) && size_ok(layout.node_height)) {
            return Err(EngineError::InvalidConfig(format!(
                "node size must be positive, got {}x{}",
                layout.node_width, layout.node_height
            )));
        }
        let spacing_ok = |gap: f64| gap.is_finite() && gap >= 0.0;
        if !(spacing_ok(layout.node_spacing) && spacing_ok(layout.rank_spacing)) {
            return Err(EngineError::InvalidConfig(format!(
                "node_spacing and rank_spacing must be finite and not negative, got {} and {}",
                layout.node_spacing, layout.rank_spacing
            )));
        }

        if self.overlay.ttl_ms == 0 {
            return Err(EngineError::InvalidConfig("overlay.ttl_ms must be > 0".into()));
        }

        Ok(())
    }
}
