//! Observable playback state.

use std::sync::Arc;

use crate::track::{Track, TrackId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Idle,
    Loading,
    Buffering,
    Playing,
    Paused,
    Error,
}

impl PlayerState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Buffering => "Buffering",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Error => "Error",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// Stop at the end of the queue.
    #[default]
    Off,
    /// Wrap around to the start of the queue.
    All,
    /// Restart the current track when it ends.
    One,
}

impl RepeatMode {
    /// `Off -> All -> One -> Off`.
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

/// Everything the presentation layer reads about playback.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub current_track: Option<Arc<Track>>,
    pub player_state: PlayerState,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f32,
    pub repeat_mode: RepeatMode,
    pub is_shuffle: bool,
    /// Active playback order; shuffled when `is_shuffle` is on.
    pub queue: Vec<Arc<Track>>,
    /// The order the caller supplied.
    pub original_queue: Vec<Arc<Track>>,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            current_track: None,
            player_state: PlayerState::Idle,
            current_time: 0.0,
            duration: 0.0,
            volume: 0.5,
            repeat_mode: RepeatMode::Off,
            is_shuffle: false,
            queue: Vec::new(),
            original_queue: Vec::new(),
        }
    }
}

impl PlaybackSession {
    pub fn current_id(&self) -> Option<&TrackId> {
        self.current_track.as_ref().map(|t| &t.id)
    }

    /// Index of the current track in `queue`, looked up by id.
    pub fn current_index(&self) -> Option<usize> {
        let id = self.current_id()?;
        self.queue.iter().position(|t| &t.id == id)
    }

    pub fn has_track(&self) -> bool {
        self.current_track.is_some()
    }
}
