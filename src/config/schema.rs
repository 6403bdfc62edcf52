use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::RepeatMode;

/// Everything `encore` reads from `config.toml` and the environment.
///
/// Lookup order, later entries overridden by earlier ones:
/// `ENCORE__SECTION__KEY` variables, then the TOML file at
/// `$XDG_CONFIG_HOME/encore/config.toml` (or `~/.config/encore/config.toml`),
/// then the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub ui: UiSettings,
    pub controls: ControlsSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub logging: LoggingSettings,
    pub state: StateSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Volume applied at startup, `0.0..=1.0`.
    pub initial_volume: f32,
    /// Milliseconds of fade before the output closes on quit; 0 cuts at once.
    pub quit_fade_out_ms: u64,
    /// How often the player thread polls the media backend (milliseconds).
    pub tick_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            initial_volume: 0.5,
            quit_fade_out_ms: 300,
            tick_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Start with the cursor tracking the playing song.
    pub follow_playback: bool,

    /// Header banner text.
    pub header_text: String,

    /// Fields of the now-playing song, e.g. `["artist", "title", "album"]`.
    pub now_playing_track_fields: Vec<TrackDisplayField>,

    /// Joins `now_playing_track_fields`.
    pub now_playing_track_separator: String,

    /// Clock fields next to the song, e.g. `["elapsed", "remaining"]`.
    pub now_playing_time_fields: Vec<TimeField>,

    /// Joins `now_playing_time_fields`.
    pub now_playing_time_separator: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            follow_playback: true,
            header_text: " ~ encore ~ ".to_string(),
            now_playing_track_fields: vec![TrackDisplayField::Display],
            now_playing_track_separator: " - ".to_string(),
            now_playing_time_fields: vec![TimeField::Elapsed, TimeField::Total, TimeField::Remaining],
            now_playing_time_separator: " / ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Seconds jumped by `H` / `L`.
    pub scrub_seconds: u64,
    /// Volume change per `+` / `-` press.
    pub volume_step: f32,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            scrub_seconds: 5,
            volume_step: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Shuffle at startup.
    pub shuffle: bool,
    /// Repeat mode at startup.
    pub repeat: RepeatSetting,
    /// "Previous" restarts the current track once it has played this long (seconds).
    pub restart_threshold_secs: f64,
    /// Reload the last track, paused at its saved position, on startup.
    pub resume_last_played: bool,
    /// How often the playhead is saved while a track is loaded (seconds).
    pub persist_interval_secs: u64,
    /// A track enters the listening history once it has played this long
    /// (seconds). Stopping records it regardless.
    pub history_min_secs: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: RepeatSetting::Off,
            restart_threshold_secs: 3.0,
            resume_last_played: true,
            persist_interval_secs: 5,
            history_min_secs: 30.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatSetting {
    #[serde(alias = "none", alias = "no-loop", alias = "no_loop")]
    Off,
    #[serde(alias = "loop-all", alias = "loop_all", alias = "playlist")]
    All,
    #[serde(alias = "loop-one", alias = "loop_one", alias = "repeat-one", alias = "track")]
    One,
}

impl From<RepeatSetting> for RepeatMode {
    fn from(setting: RepeatSetting) -> Self {
        match setting {
            RepeatSetting::Off => RepeatMode::Off,
            RepeatSetting::All => RepeatMode::All,
            RepeatSetting::One => RepeatMode::One,
        }
    }
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeField {
    Elapsed,
    Total,
    Remaining,
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    /// "artist - title".
    Display,
    Title,
    Artist,
    Album,
    Filename,
    Path,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Audio extensions, matched without the dot and ignoring case.
    pub extensions: Vec<String>,
    pub follow_links: bool,
    /// Scan dotfiles and dot-directories too.
    pub include_hidden: bool,
    pub recursive: bool,
    pub max_depth: Option<usize>,

    /// Fields of the list label, which is also the sort key.
    /// `["artist", "title"]` renders as `Artist - Title`.
    pub display_fields: Vec<TrackDisplayField>,
    /// Joins `display_fields`.
    pub display_separator: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
            display_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            display_separator: " - ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Directory for rolling log files. Defaults to `$XDG_STATE_HOME/encore/logs`.
    pub directory: Option<PathBuf>,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            filter: "info,encore=debug".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StateSettings {
    /// State file (last played, likes, playlists, history).
    /// Defaults to `$XDG_STATE_HOME/encore/state.toml`.
    pub path: Option<PathBuf>,
}
