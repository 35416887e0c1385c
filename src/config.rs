use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skia_safe::Color;

use crate::color::{deserialize_opt_color, serialize_opt_color};
use crate::compositor::{Compositor, DEFAULT_MAX_DIMENSION};
use crate::geometry::EdgeInsets;
use crate::loader::Bundle;
use crate::params::{RenderParams, Shadow};
use crate::sizing::FitMode;

/// Defaults for rendering, stored in the platform config directory
/// (`$XDG_CONFIG_HOME/vectorimage/` or `%APPDATA%\vectorimage\`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extra directories searched for named resources, in order.
    pub resource_dirs: Vec<PathBuf>,
    /// Largest bitmap edge, in pixels, the compositor will allocate.
    pub max_dimension: u32,
    pub fit_mode: FitMode,
    #[serde(
        serialize_with = "serialize_opt_color",
        deserialize_with = "deserialize_opt_color"
    )]
    pub tint_color: Option<Color>,
    #[serde(
        serialize_with = "serialize_opt_color",
        deserialize_with = "deserialize_opt_color"
    )]
    pub background_color: Option<Color>,
    pub shadow: Option<Shadow>,
    pub insets: EdgeInsets,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resource_dirs: Vec::new(),
            max_dimension: DEFAULT_MAX_DIMENSION,
            fit_mode: FitMode::PixelAligned,
            tint_color: None,
            background_color: None,
            shadow: None,
            insets: EdgeInsets::ZERO,
        }
    }
}

impl Config {
    /// Load config from the platform config directory, or return defaults.
    pub fn load() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "No config file at {}, using defaults. Creating default config.",
                    path.display()
                );
                let config = Self::default();
                config.save();
                config
            }
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&contents)?)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Save current config to the platform config directory.
    pub fn save(&self) {
        let path = config_path();
        if let Err(e) = self.save_to(&path) {
            log::warn!("Failed to write config to {}: {}", path.display(), e);
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Render params seeded from the configured defaults.
    pub fn render_params(&self) -> RenderParams {
        RenderParams {
            tint_color: self.tint_color,
            background_color: self.background_color,
            shadow: self.shadow,
            insets: self.insets,
            prepare_hook: None,
        }
    }

    pub fn compositor(&self) -> Compositor {
        Compositor::new(self.max_dimension)
    }

    /// Bundles to search: the configured directories, then the main bundle.
    pub fn bundles(&self) -> Vec<Bundle> {
        self.resource_dirs
            .iter()
            .cloned()
            .map(Bundle::new)
            .chain(std::iter::once(Bundle::main()))
            .collect()
    }
}

fn config_path() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vectorimage");
    if !dir.exists() {
        std::fs::create_dir_all(&dir).ok();
    }
    dir.join("config.json")
}
