/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Runtime preferences: `canvasshell.toml` in the data directory, then
//! `CANVASSHELL_*` environment overrides.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::camera::Camera;
use crate::persistence::RedbStore;

pub const PREFS_FILE: &str = "canvasshell.toml";
pub const ENV_DATA_DIR: &str = "CANVASSHELL_DATA_DIR";
pub const ENV_NODES_DEBOUNCE_MS: &str = "CANVASSHELL_NODES_DEBOUNCE_MS";
pub const ENV_PANZOOM_DEBOUNCE_MS: &str = "CANVASSHELL_PANZOOM_DEBOUNCE_MS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasPrefs {
    pub nodes_debounce_ms: u64,
    pub panzoom_debounce_ms: u64,
    pub metadata_debounce_ms: u64,
    /// How long pan gestures are ignored after a centering jump.
    pub centering_lock_ms: u64,
    pub margin_factor: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
}

impl Default for CanvasPrefs {
    fn default() -> Self {
        let camera = Camera::new();
        Self {
            nodes_debounce_ms: 300,
            panzoom_debounce_ms: 300,
            metadata_debounce_ms: 0,
            centering_lock_ms: 250,
            margin_factor: camera.margin_factor,
            zoom_min: camera.zoom_min,
            zoom_max: camera.zoom_max,
        }
    }
}

impl CanvasPrefs {
    pub fn nodes_debounce(&self) -> Duration {
        Duration::from_millis(self.nodes_debounce_ms)
    }

    pub fn panzoom_debounce(&self) -> Duration {
        Duration::from_millis(self.panzoom_debounce_ms)
    }

    pub fn metadata_debounce(&self) -> Duration {
        Duration::from_millis(self.metadata_debounce_ms)
    }

    pub fn centering_lock(&self) -> Duration {
        Duration::from_millis(self.centering_lock_ms)
    }

    /// Camera bounds from these prefs. Nonsensical bounds fall back to the
    /// defaults.
    pub fn camera(&self) -> Camera {
        let defaults = Camera::new();
        let bounds_ok = self.zoom_min.is_finite()
            && self.zoom_max.is_finite()
            && self.zoom_min > 0.0
            && self.zoom_min <= self.zoom_max;
        let margin_ok = self.margin_factor.is_finite() && self.margin_factor > 0.0;
        if !bounds_ok {
            warn!(
                "Ignoring zoom bounds {}..{}; using {}..{}",
                self.zoom_min, self.zoom_max, defaults.zoom_min, defaults.zoom_max
            );
        }
        Camera {
            zoom_min: if bounds_ok { self.zoom_min } else { defaults.zoom_min },
            zoom_max: if bounds_ok { self.zoom_max } else { defaults.zoom_max },
            margin_factor: if margin_ok { self.margin_factor } else { defaults.margin_factor },
        }
    }

    /// Read `canvasshell.toml` from `data_dir` (if any) and apply environment
    /// overrides.
    pub fn load(data_dir: &Path) -> Self {
        let mut prefs = Self::from_file(&data_dir.join(PREFS_FILE)).unwrap_or_default();
        prefs.apply_env_overrides();
        prefs
    }

    fn from_file(path: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(path).ok()?;
        match Self::from_toml(&raw) {
            Ok(prefs) => Some(prefs),
            Err(e) => {
                warn!("Ignoring invalid {}: {e}", path.display());
                None
            },
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(ms) = env_millis(ENV_NODES_DEBOUNCE_MS) {
            self.nodes_debounce_ms = ms;
        }
        if let Some(ms) = env_millis(ENV_PANZOOM_DEBOUNCE_MS) {
            self.panzoom_debounce_ms = ms;
        }
    }
}

/// Data directory: `CANVASSHELL_DATA_DIR` if set, else the platform default.
pub fn data_dir() -> PathBuf {
    match env::var_os(ENV_DATA_DIR) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => RedbStore::default_data_dir(),
    }
}

fn env_millis(key: &str) -> Option<u64> {
    let value = env::var(key).ok()?;
    match value.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(_) => {
            warn!("{key} invalid ('{value}'); keeping configured value");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let prefs = CanvasPrefs::from_toml("nodes_debounce_ms = 50\nmargin_factor = 0.9\n").unwrap();
        assert_eq!(prefs.nodes_debounce_ms, 50);
        assert_eq!(prefs.margin_factor, 0.9);
        assert_eq!(prefs.panzoom_debounce_ms, 300);
        assert_eq!(prefs.metadata_debounce_ms, 0);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PREFS_FILE), "nodes_debounce_ms = \"soon\"").unwrap();
        assert!(CanvasPrefs::from_file(&dir.path().join(PREFS_FILE)).is_none());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(CanvasPrefs::from_file(&dir.path().join(PREFS_FILE)).is_none());
    }

    #[test]
    fn test_bad_camera_bounds_fall_back() {
        let prefs = CanvasPrefs {
            zoom_min: 5.0,
            zoom_max: 1.0,
            ..CanvasPrefs::default()
        };
        assert_eq!(prefs.camera(), Camera::new());
    }
}
