//! Threaded handle around the playback engine.
//!
//! One dedicated thread owns the media backend and the `PlaybackEngine`.
//! Callers talk to it through `PlayerCmd`s and read a `PlaybackSnapshot`
//! that the thread refreshes after every command and tick.

mod history;
mod thread;

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::Settings;
use crate::engine::{EngineOptions, PlaybackSession, PlayerState, RepeatMode};
use crate::error::MediaError;
use crate::events::{EventBus, PlayerEvent};
use crate::media::MediaBackend;
use crate::provider::TrackProvider;
use crate::track::Track;

use self::thread::spawn_player_thread;

#[derive(Debug)]
pub enum PlayerCmd {
    /// Play `track`; a non-empty `context` becomes the queue.
    Play {
        track: Arc<Track>,
        context: Option<Vec<Arc<Track>>>,
    },
    Pause,
    Resume,
    TogglePause,
    /// Stop and forget the persisted position.
    Stop,
    /// Seek to an absolute position in seconds.
    Seek(f64),
    /// Seek by the specified number of seconds (positive or negative).
    SeekBy(f64),
    SetVolume(f32),
    AdjustVolume(f32),
    SetRepeat(RepeatMode),
    ToggleRepeat,
    ToggleShuffle,
    Next,
    Prev,
    /// Save the position, fade out over `fade_out_ms` and end the thread.
    Quit { fade_out_ms: u64 },
}

/// Playback state shared with the UI and MPRIS.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSnapshot {
    pub track: Option<Arc<Track>>,
    pub state: PlayerState,
    /// Seconds.
    pub position: f64,
    /// Seconds; 0 when unknown.
    pub duration: f64,
    pub volume: f32,
    pub repeat: RepeatMode,
    pub shuffle: bool,
    pub queue_len: usize,
}

impl PlaybackSnapshot {
    pub fn from_session(session: &PlaybackSession) -> Self {
        Self {
            track: session.current_track.clone(),
            state: session.player_state,
            position: session.current_time,
            duration: session.duration,
            volume: session.volume,
            repeat: session.repeat_mode,
            shuffle: session.is_shuffle,
            queue_len: session.queue.len(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackSnapshot>>;

#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub engine: EngineOptions,
    /// Media poll interval.
    pub tick: Duration,
    pub persist_interval: Duration,
    pub resume_last_played: bool,
    /// Seconds a track must play to enter the listening history.
    pub history_min_secs: f64,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            engine: EngineOptions::default(),
            tick: Duration::from_millis(200),
            persist_interval: Duration::from_secs(5),
            resume_last_played: true,
            history_min_secs: 30.0,
        }
    }
}

impl PlayerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            engine: EngineOptions {
                volume: settings.audio.initial_volume,
                repeat_mode: settings.playback.repeat.into(),
                shuffle: settings.playback.shuffle,
                restart_threshold: settings.playback.restart_threshold_secs,
            },
            tick: Duration::from_millis(settings.audio.tick_ms.max(1)),
            persist_interval: Duration::from_secs(settings.playback.persist_interval_secs.max(1)),
            resume_last_played: settings.playback.resume_last_played,
            history_min_secs: settings.playback.history_min_secs,
        }
    }
}

pub struct Player {
    tx: Sender<PlayerCmd>,
    playback: PlaybackHandle,
    events: EventBus<PlayerEvent>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Start the player thread. `factory` runs on that thread because audio
    /// output streams are not `Send`; its error is returned here.
    pub fn spawn<M, F>(
        factory: F,
        provider: Arc<dyn TrackProvider>,
        options: PlayerOptions,
    ) -> Result<Self, MediaError>
    where
        M: MediaBackend + 'static,
        F: FnOnce() -> Result<M, MediaError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<PlayerCmd>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), MediaError>>(1);
        let playback: PlaybackHandle = Arc::new(Mutex::new(PlaybackSnapshot::default()));
        let events = EventBus::new();

        let join = spawn_player_thread(
            factory,
            provider,
            rx,
            ready_tx,
            playback.clone(),
            events.clone(),
            options,
        );

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = join.join();
                return Err(e);
            }
            Err(_) => {
                let _ = join.join();
                return Err(MediaError::Output("player thread exited during startup".to_string()));
            }
        }

        Ok(Self {
            tx,
            playback,
            events,
            join: Mutex::new(Some(join)),
        })
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        self.playback.clone()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.playback
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn events(&self) -> &EventBus<PlayerEvent> {
        &self.events
    }

    pub fn send(&self, cmd: PlayerCmd) -> Result<(), mpsc::SendError<PlayerCmd>> {
        self.tx.send(cmd)
    }

    /// Persist, fade out and wait for the thread to finish. Later calls
    /// return at once.
    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(PlayerCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for Player {
    /// Early exits still persist the playhead and release the output.
    fn drop(&mut self) {
        self.quit_softly(Duration::ZERO);
    }
}
