//! Playback state machine.
//!
//! `PlaybackEngine` owns one `MediaBackend` and the `PlaybackSession`. It is
//! single-threaded: callers invoke transport operations and feed media
//! events back through [`PlaybackEngine::handle_media_event`] (or
//! [`PlaybackEngine::pump`]), both on the same `&mut self`, so event
//! handling always sees the live session.
//!
//! ```text
//! idle --play--> loading --canplay--> playing <--> paused
//!                   |                   |  ^
//!                 error              waiting |
//!                                       v  |
//!                                    buffering
//! ```
//!
//! No operation returns an error. Failures are logged and reflected in
//! `PlayerState`.

mod session;
pub mod shuffle;

pub use session::{PlaybackSession, PlayerState, RepeatMode};

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use crate::events::{EventBus, PlayerEvent};
use crate::media::{LoadId, MediaBackend, MediaEvent, MediaEventKind};
use crate::track::Track;

use self::shuffle::shuffled_with_anchor;

/// Seconds into a track after which "previous" restarts it instead.
pub const DEFAULT_RESTART_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub volume: f32,
    pub repeat_mode: RepeatMode,
    pub shuffle: bool,
    pub restart_threshold: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            volume: 0.5,
            repeat_mode: RepeatMode::Off,
            shuffle: false,
            restart_threshold: DEFAULT_RESTART_THRESHOLD,
        }
    }
}

pub struct PlaybackEngine<M: MediaBackend> {
    media: M,
    session: PlaybackSession,
    events: EventBus<PlayerEvent>,
    rng: StdRng,
    restart_threshold: f64,
    last_load: LoadId,
    // `None` after `stop()`; every event is stale then.
    active_load: Option<LoadId>,
    autoplay: bool,
    pending_seek: Option<f64>,
}

impl<M: MediaBackend> PlaybackEngine<M> {
    pub fn new(mut media: M, events: EventBus<PlayerEvent>, options: EngineOptions) -> Self {
        let volume = clamp_volume(options.volume).unwrap_or(0.5);
        media.set_volume(volume);

        let session = PlaybackSession {
            volume,
            repeat_mode: options.repeat_mode,
            is_shuffle: options.shuffle,
            ..PlaybackSession::default()
        };

        Self {
            media,
            session,
            events,
            rng: StdRng::from_entropy(),
            restart_threshold: options.restart_threshold,
            last_load: LoadId::default(),
            active_load: None,
            autoplay: false,
            pending_seek: None,
        }
    }

    /// Make shuffles reproducible.
    pub fn seed_shuffle(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn events(&self) -> &EventBus<PlayerEvent> {
        &self.events
    }

    /// Live playhead from the media backend, in seconds.
    pub fn position(&self) -> f64 {
        self.media.position()
    }

    /// Start `track`. A non-empty `context` becomes the new queue.
    ///
    /// Requesting the track that is already current resumes it in place.
    pub fn play(&mut self, track: Arc<Track>, context: Option<Vec<Arc<Track>>>) {
        let same = self.session.current_id() == Some(&track.id);
        if same && self.session.player_state != PlayerState::Error {
            debug!(track = %track.id, "already current, resuming in place");
            self.resume();
            return;
        }

        match context {
            Some(context) if !context.is_empty() => {
                self.session.queue = if self.session.is_shuffle {
                    shuffled_with_anchor(&track, &context, &mut self.rng)
                } else {
                    context.clone()
                };
                self.session.original_queue = context;
                self.publish(PlayerEvent::QueueChanged(self.session.queue.len()));
            }
            _ => {
                if !self.session.queue.iter().any(|t| t.id == track.id) {
                    self.session.queue = vec![Arc::clone(&track)];
                    self.session.original_queue = vec![Arc::clone(&track)];
                    self.publish(PlayerEvent::QueueChanged(1));
                }
            }
        }

        self.internal_play(track, true);
    }

    /// Load `track` without starting it and park at `position` once it is ready.
    pub fn restore(&mut self, track: Arc<Track>, position: f64) {
        if !self.session.queue.iter().any(|t| t.id == track.id) {
            self.session.queue = vec![Arc::clone(&track)];
            self.session.original_queue = vec![Arc::clone(&track)];
            self.publish(PlayerEvent::QueueChanged(1));
        }
        self.internal_play(track, false);
        if position.is_finite() && position > 0.0 {
            self.pending_seek = Some(position);
        }
    }

    pub fn pause(&mut self) {
        if !self.session.has_track() {
            return;
        }
        // A pause during loading must win over the pending autoplay.
        self.autoplay = false;
        self.media.pause();
    }

    pub fn resume(&mut self) {
        if !self.session.has_track() {
            return;
        }
        if let Err(e) = self.media.play() {
            warn!(error = %e, "playback start rejected");
            if self.session.player_state != PlayerState::Error {
                self.set_state(PlayerState::Paused);
            }
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.session.player_state {
            PlayerState::Playing | PlayerState::Buffering | PlayerState::Loading => self.pause(),
            _ => self.resume(),
        }
    }

    pub fn stop(&mut self) {
        self.media.pause();
        self.media.set_position(0.0);
        self.active_load = None;
        self.autoplay = false;
        self.pending_seek = None;

        let had_track = self.session.current_track.take().is_some();
        self.session.current_time = 0.0;
        self.set_state(PlayerState::Idle);
        if had_track {
            self.publish(PlayerEvent::TrackChanged(None));
        }
        self.publish(PlayerEvent::TimeUpdate(0.0));
    }

    pub fn seek(&mut self, time: f64) {
        if !self.session.has_track() || !time.is_finite() {
            return;
        }
        let mut target = time.max(0.0);
        if self.session.duration > 0.0 {
            target = target.min(self.session.duration);
        }
        self.media.set_position(target);
        self.session.current_time = target;
        self.publish(PlayerEvent::TimeUpdate(target));
    }

    /// Seek relative to the live playhead.
    pub fn seek_by(&mut self, delta: f64) {
        let now = self.media.position();
        self.seek(now + delta);
    }

    pub fn set_volume(&mut self, volume: f32) {
        let Some(volume) = clamp_volume(volume) else {
            warn!("ignoring non-numeric volume");
            return;
        };
        self.session.volume = volume;
        self.media.set_volume(volume);
        self.publish(PlayerEvent::VolumeChanged(volume));
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        if self.session.repeat_mode != mode {
            self.session.repeat_mode = mode;
            self.publish(PlayerEvent::RepeatChanged(mode));
        }
    }

    pub fn toggle_repeat(&mut self) {
        self.set_repeat(self.session.repeat_mode.cycle());
    }

    /// On: the current track followed by a shuffle of the rest of
    /// `original_queue`. Off: `original_queue` verbatim.
    pub fn toggle_shuffle(&mut self) {
        let on = !self.session.is_shuffle;
        self.session.is_shuffle = on;

        if on {
            if let Some(current) = self.session.current_track.clone() {
                if !self.session.original_queue.is_empty() {
                    self.session.queue =
                        shuffled_with_anchor(&current, &self.session.original_queue, &mut self.rng);
                }
            }
        } else {
            self.session.queue = self.session.original_queue.clone();
        }

        self.publish(PlayerEvent::ShuffleChanged(on));
        self.publish(PlayerEvent::QueueChanged(self.session.queue.len()));
    }

    pub fn play_next(&mut self) {
        if !self.session.has_track() || self.session.queue.is_empty() {
            return;
        }

        let len = self.session.queue.len();
        let mut next = self.session.current_index().map_or(0, |i| i + 1);
        if next >= len {
            if self.session.repeat_mode != RepeatMode::All {
                debug!("end of queue");
                return;
            }
            next = 0;
        }

        let track = Arc::clone(&self.session.queue[next]);
        self.internal_play(track, true);
    }

    pub fn play_prev(&mut self) {
        if !self.session.has_track() || self.session.queue.is_empty() {
            return;
        }

        if self.media.position() > self.restart_threshold {
            self.media.set_position(0.0);
            self.session.current_time = 0.0;
            self.publish(PlayerEvent::TimeUpdate(0.0));
            return;
        }

        let len = self.session.queue.len();
        let prev = match self.session.current_index() {
            Some(i) if i > 0 => i - 1,
            _ if self.session.repeat_mode == RepeatMode::All => len - 1,
            _ => 0,
        };

        let track = Arc::clone(&self.session.queue[prev]);
        self.internal_play(track, true);
    }

    /// Drain and apply pending media events.
    pub fn pump(&mut self) {
        for event in self.media.poll_events() {
            self.handle_media_event(event);
        }
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if self.active_load != Some(event.load) {
            debug!(load = event.load.0, kind = ?event.kind, "ignoring event from superseded load");
            return;
        }

        match event.kind {
            MediaEventKind::LoadStart => self.set_state(PlayerState::Loading),
            MediaEventKind::CanPlay => self.on_can_play(),
            MediaEventKind::Waiting => self.set_state(PlayerState::Buffering),
            MediaEventKind::Playing => self.set_state(PlayerState::Playing),
            MediaEventKind::Pause => {
                if !matches!(
                    self.session.player_state,
                    PlayerState::Idle | PlayerState::Error
                ) {
                    self.set_state(PlayerState::Paused);
                }
            }
            MediaEventKind::TimeUpdate(t) => {
                self.session.current_time = t;
                self.publish(PlayerEvent::TimeUpdate(t));
            }
            MediaEventKind::DurationChange(d) => {
                self.session.duration = if d.is_finite() && d > 0.0 { d } else { 0.0 };
                self.publish(PlayerEvent::DurationChanged(self.session.duration));
            }
            MediaEventKind::Ended => self.on_ended(),
            MediaEventKind::Error(reason) => {
                error!(
                    track = ?self.session.current_id(),
                    %reason,
                    "media failed to load"
                );
                self.autoplay = false;
                self.pending_seek = None;
                self.set_state(PlayerState::Error);
            }
        }
    }

    fn internal_play(&mut self, track: Arc<Track>, autoplay: bool) {
        self.last_load = self.last_load.next();
        let load = self.last_load;
        self.active_load = Some(load);
        self.autoplay = autoplay;
        self.pending_seek = None;

        info!(track = %track.id, title = %track.title, load = load.0, "loading track");
        self.session.current_time = 0.0;
        self.session.duration = track.duration.as_secs_f64();
        self.session.current_track = Some(Arc::clone(&track));
        self.set_state(PlayerState::Loading);
        self.publish(PlayerEvent::TrackChanged(Some(Arc::clone(&track))));

        self.media.load(load, &track.audio_url);
    }

    fn on_can_play(&mut self) {
        if let Some(pos) = self.pending_seek.take() {
            self.seek(pos);
        }

        if !self.autoplay {
            match self.session.player_state {
                PlayerState::Loading => self.set_state(PlayerState::Paused),
                PlayerState::Buffering => self.set_state(PlayerState::Playing),
                _ => {}
            }
            return;
        }

        self.autoplay = false;
        match self.media.play() {
            Ok(()) => self.set_state(PlayerState::Playing),
            Err(e) => {
                warn!(error = %e, "autoplay rejected");
                self.set_state(PlayerState::Paused);
            }
        }
    }

    fn on_ended(&mut self) {
        if self.session.repeat_mode == RepeatMode::One {
            self.media.set_position(0.0);
            self.session.current_time = 0.0;
            self.publish(PlayerEvent::TimeUpdate(0.0));
            if let Err(e) = self.media.play() {
                warn!(error = %e, "failed to restart track");
                self.set_state(PlayerState::Paused);
            }
            return;
        }

        if !self.session.has_track() || self.session.queue.is_empty() {
            self.go_idle();
            return;
        }

        let len = self.session.queue.len();
        let next = self.session.current_index().map_or(0, |i| i + 1);
        if next < len {
            let track = Arc::clone(&self.session.queue[next]);
            self.internal_play(track, true);
        } else if self.session.repeat_mode == RepeatMode::All {
            let track = Arc::clone(&self.session.queue[0]);
            self.internal_play(track, true);
        } else {
            debug!("queue exhausted");
            self.go_idle();
        }
    }

    fn go_idle(&mut self) {
        self.session.current_time = 0.0;
        self.set_state(PlayerState::Idle);
        self.publish(PlayerEvent::TimeUpdate(0.0));
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.session.player_state == state {
            return;
        }
        debug!(from = ?self.session.player_state, to = ?state, "player state");
        self.session.player_state = state;
        self.publish(PlayerEvent::StateChanged(state));
    }

    fn publish(&self, event: PlayerEvent) {
        self.events.publish(event);
    }
}

fn clamp_volume(volume: f32) -> Option<f32> {
    if volume.is_nan() {
        None
    } else {
        Some(volume.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests;
