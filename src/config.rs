use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use egui::{Color32, Pos2, Rect, vec2};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::APP_NAME;

/// User settings, read from `<config dir>/snapink/settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Working area of a fresh document.
    pub scene_width: f32,
    pub scene_height: f32,
    /// Colour of the first annotation, RGBA.
    pub default_color: [u8; 4],
    /// Opacity of the selection overlay mask.
    pub overlay_alpha: u8,
    /// How long the window stays hidden before the screen is frozen.
    pub freeze_delay_ms: u64,
    pub text_size: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scene_width: 820.0,
            scene_height: 560.0,
            default_color: [255, 0, 0, 255],
            overlay_alpha: 80,
            freeze_delay_ms: 350,
            text_size: 24.0,
        }
    }
}

impl Settings {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("settings.json"))
    }

    pub fn load() -> Self {
        Self::path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                debug!("reading settings from {}", path.display());
                Self::from_json(&json)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!("cannot read {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn from_json(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_else(|e| {
            warn!("ignoring malformed settings: {e}");
            Self::default()
        })
    }

    pub fn scene_area(&self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(self.scene_width, self.scene_height))
    }

    pub fn default_color(&self) -> Color32 {
        let [r, g, b, a] = self.default_color;
        Color32::from_rgba_unmultiplied(r, g, b, a)
    }

    pub fn freeze_delay(&self) -> Duration {
        Duration::from_millis(self.freeze_delay_ms)
    }
}
