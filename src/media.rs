//! The media resource seam.
//!
//! A `MediaBackend` owns exactly one playable source at a time. Commands
//! return immediately; readiness and progress are reported later as
//! `MediaEvent`s drained through `poll_events`. Each event carries the
//! `LoadId` of the load that produced it so the engine can discard events
//! from a superseded source.

mod rodio_backend;

#[cfg(test)]
pub(crate) mod fake;

pub use rodio_backend::RodioBackend;

use std::time::Duration;

use crate::error::MediaError;

/// Identifies one `load` call. Monotonic per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LoadId(pub u64);

impl LoadId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    LoadStart,
    CanPlay,
    /// Playback stalled waiting for data.
    Waiting,
    Playing,
    Pause,
    /// Current position in seconds.
    TimeUpdate(f64),
    /// Real duration in seconds, once known.
    DurationChange(f64),
    Ended,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub load: LoadId,
    pub kind: MediaEventKind,
}

impl MediaEvent {
    pub fn new(load: LoadId, kind: MediaEventKind) -> Self {
        Self { load, kind }
    }
}

pub trait MediaBackend {
    /// Replace the current source. Does not start playback.
    fn load(&mut self, load: LoadId, url: &str);

    /// Start or resume playback of the loaded source.
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    /// Move the playhead, in seconds.
    fn set_position(&mut self, secs: f64);

    /// Current playhead, in seconds.
    fn position(&self) -> f64;

    /// Linear gain in `[0, 1]`.
    fn set_volume(&mut self, volume: f32);

    /// Drain the events produced since the last call.
    fn poll_events(&mut self) -> Vec<MediaEvent>;

    /// Ramp output to silence over `duration` before shutdown. Blocks.
    fn fade_out(&mut self, _duration: Duration) {
        self.pause();
    }
}
