use super::load::{default_config_path, resolve_config_path};
use crate::engine::RepeatMode;
use std::path::PathBuf;
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_encore_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", "/tmp/encore-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        PathBuf::from("/tmp/encore-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    assert_eq!(
        default_config_path().unwrap(),
        PathBuf::from("/tmp/xdg-config-home/encore/config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_config_path().unwrap(),
        PathBuf::from("/tmp/home-dir/.config/encore/config.toml")
    );
}

#[test]
fn state_and_log_paths_default_under_xdg_state_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_STATE_HOME", "/tmp/xdg-state");

    let s = Settings::default();
    assert_eq!(s.state_path().unwrap(), PathBuf::from("/tmp/xdg-state/encore/state.toml"));
    assert_eq!(s.log_dir().unwrap(), PathBuf::from("/tmp/xdg-state/encore/logs"));
}

#[test]
fn explicit_state_path_wins() {
    let s = Settings {
        state: StateSettings {
            path: Some(PathBuf::from("/srv/encore.toml")),
        },
        ..Settings::default()
    };
    assert_eq!(s.state_path().unwrap(), PathBuf::from("/srv/encore.toml"));
}

#[test]
fn defaults_validate() {
    let s = Settings::default();
    assert!(s.validate().is_ok());
    assert_eq!(s.audio.initial_volume, 0.5);
    assert_eq!(s.playback.restart_threshold_secs, 3.0);
    assert_eq!(s.playback.history_min_secs, 30.0);
    assert_eq!(s.playback.repeat, RepeatSetting::Off);
    assert_eq!(s.logging.filter, "info,encore=debug");
}

#[test]
fn validate_rejects_out_of_range_values() {
    let mut s = Settings::default();
    s.audio.initial_volume = 1.5;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.audio.tick_ms = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.playback.restart_threshold_secs = -1.0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.playback.history_min_secs = f64::NAN;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.controls.volume_step = 0.0;
    assert!(s.validate().is_err());
}

#[test]
fn config_file_overrides_defaults_section_by_section() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[playback]
shuffle = true
repeat = "repeat-one"
restart_threshold_secs = 5.0
resume_last_played = false

[audio]
initial_volume = 0.8

[controls]
volume_step = 0.1

[ui]
follow_playback = false
now_playing_track_fields = ["album", "title"]
now_playing_time_fields = ["remaining"]

[library]
display_fields = ["path"]
max_depth = 2

[logging]
filter = "warn"
directory = "/var/log/encore"

[state]
path = "/srv/encore/state.toml"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("ENCORE__AUDIO__INITIAL_VOLUME");

    let s = Settings::load().unwrap();
    assert!(s.playback.shuffle);
    assert_eq!(RepeatMode::from(s.playback.repeat), RepeatMode::One);
    assert_eq!(s.playback.restart_threshold_secs, 5.0);
    assert!(!s.playback.resume_last_played);
    assert_eq!(s.audio.initial_volume, 0.8);
    // Untouched keys keep their defaults.
    assert_eq!(s.audio.tick_ms, 200);
    assert_eq!(s.controls.volume_step, 0.1);
    assert_eq!(s.controls.scrub_seconds, 5);
    assert!(!s.ui.follow_playback);
    assert!(matches!(
        s.ui.now_playing_track_fields.as_slice(),
        [TrackDisplayField::Album, TrackDisplayField::Title]
    ));
    assert!(matches!(s.ui.now_playing_time_fields.as_slice(), [TimeField::Remaining]));
    assert!(matches!(s.library.display_fields.as_slice(), [TrackDisplayField::Path]));
    assert_eq!(s.library.max_depth, Some(2));
    assert_eq!(s.logging.filter, "warn");
    assert_eq!(s.log_dir().unwrap(), PathBuf::from("/var/log/encore"));
    assert_eq!(s.state_path().unwrap(), PathBuf::from("/srv/encore/state.toml"));
    assert!(s.validate().is_ok());
}

#[test]
fn repeat_setting_accepts_legacy_names() {
    for (raw, expected) in [
        ("off", RepeatSetting::Off),
        ("no-loop", RepeatSetting::Off),
        ("playlist", RepeatSetting::All),
        ("loop-all", RepeatSetting::All),
        ("track", RepeatSetting::One),
    ] {
        let parsed: PlaybackSettings = toml::from_str(&format!("repeat = \"{raw}\"")).unwrap();
        assert_eq!(parsed.repeat, expected, "{raw}");
    }
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[playback]
persist_interval_secs = 30
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("ENCORE__PLAYBACK__PERSIST_INTERVAL_SECS", "7");
    let _g3 = EnvGuard::set("ENCORE__PLAYBACK__SHUFFLE", "true");

    let s = Settings::load().unwrap();
    assert_eq!(s.playback.persist_interval_secs, 7);
    assert!(s.playback.shuffle);
}
