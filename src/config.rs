//! Application-level configuration loading, including the player color palette.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::game::PlayerColor;

/// Default location on disk where the core looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TALLYBOARD_CONFIG_PATH";
/// Fallback color returned when the palette is empty.
const DEFAULT_COLOR: PlayerColor = PlayerColor {
    h: 0.0,
    s: 0.0,
    v: 1.0,
};

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    palette: Vec<PlayerColor>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the baked-in palette.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        count = app_config.palette.len(),
                        "loaded player palette from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Color assigned to the player occupying registry slot `slot`.
    ///
    /// Assignment is round-robin over the palette, so slots past the palette
    /// length wrap around instead of running out.
    pub fn color_for_slot(&self, slot: usize) -> PlayerColor {
        if self.palette.is_empty() {
            return DEFAULT_COLOR;
        }
        self.palette[slot % self.palette.len()].clone()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    colors: Vec<RawColor>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let palette = value.colors.into_iter().map(Into::into).collect::<Vec<_>>();
        Self { palette }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single HSV entry inside the configuration file.
struct RawColor {
    hue: f32,
    saturation: f32,
    value: f32,
}

impl From<RawColor> for PlayerColor {
    fn from(value: RawColor) -> Self {
        Self {
            h: value.hue,
            s: value.saturation,
            v: value.value,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in palette shipped with the crate, one entry per registry slot.
fn default_palette() -> Vec<PlayerColor> {
    vec![
        PlayerColor {
            h: -64.69388,
            s: 1.0,
            v: 1.0,
        },
        PlayerColor {
            h: 119.331474,
            s: 1.0,
            v: 1.0,
        },
        PlayerColor {
            h: -113.57562,
            s: 1.0,
            v: 1.0,
        },
        PlayerColor {
            h: 34.365788,
            s: 1.0,
            v: 1.0,
        },
        PlayerColor {
            h: -169.41148,
            s: 1.0,
            v: 1.0,
        },
        PlayerColor {
            h: -19.08323,
            s: 1.0,
            v: 1.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_assignment_wraps_around() {
        let config = AppConfig::default();
        let len = config.palette.len();
        assert_eq!(config.color_for_slot(0), config.color_for_slot(len));
        assert_eq!(config.color_for_slot(2), config.color_for_slot(len + 2));
    }

    #[test]
    fn empty_palette_falls_back_to_default_color() {
        let config = AppConfig { palette: vec![] };
        assert_eq!(config.color_for_slot(3), DEFAULT_COLOR);
    }
}
