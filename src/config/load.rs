use std::{env, path::PathBuf};

use super::schema::Settings;
use crate::error::ConfigError;

const APP_DIR: &str = "encore";

/// Configuration loading helpers.
///
/// `Settings::load` layers an optional config file under environment
/// variables (prefix `ENCORE__`) and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("ENCORE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Reject values the player cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let volume = self.audio.initial_volume;
        if !(0.0..=1.0).contains(&volume) {
            return Err(ConfigError::Invalid(format!(
                "audio.initial_volume must be within 0.0..=1.0, got {volume}"
            )));
        }
        if self.audio.tick_ms == 0 {
            return Err(ConfigError::Invalid("audio.tick_ms must be >= 1".to_string()));
        }
        let threshold = self.playback.restart_threshold_secs;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "playback.restart_threshold_secs must be >= 0, got {threshold}"
            )));
        }
        if self.playback.persist_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "playback.persist_interval_secs must be >= 1".to_string(),
            ));
        }
        let history = self.playback.history_min_secs;
        if !history.is_finite() || history < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "playback.history_min_secs must be >= 0, got {history}"
            )));
        }
        let step = self.controls.volume_step;
        if !(step > 0.0 && step <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "controls.volume_step must be within (0.0, 1.0], got {step}"
            )));
        }
        Ok(())
    }

    /// Where likes, playlists, history and the last-played position are kept.
    pub fn state_path(&self) -> Option<PathBuf> {
        self.state
            .path
            .clone()
            .or_else(|| state_home().map(|d| d.join(APP_DIR).join("state.toml")))
    }

    /// Where rolling log files go.
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging
            .directory
            .clone()
            .or_else(|| state_home().map(|d| d.join(APP_DIR).join("logs")))
    }
}

/// Resolve the config path from `ENCORE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("ENCORE_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// `$XDG_CONFIG_HOME/encore/config.toml`, or `~/.config/encore/config.toml`
/// when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join(APP_DIR).join("config.toml"))
}

/// `$XDG_STATE_HOME`, or `~/.local/state`.
pub fn state_home() -> Option<PathBuf> {
    xdg_dir("XDG_STATE_HOME", ".local/state")
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    if let Some(xdg) = env::var_os(var).filter(|v| !v.is_empty()) {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback))
    }
}
