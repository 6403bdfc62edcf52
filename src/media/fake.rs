//! Scripted backend for tests.
//!
//! Records every command and only emits the events a test pushes.

use std::collections::VecDeque;

use super::{LoadId, MediaBackend, MediaEvent, MediaEventKind};
use crate::error::MediaError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Load(LoadId, String),
    Play,
    Pause,
    SetPosition(f64),
    SetVolume(f32),
}

#[derive(Debug, Default)]
pub(crate) struct FakeMedia {
    pub calls: Vec<Call>,
    pub position: f64,
    pub volume: f32,
    pub current: Option<(LoadId, String)>,
    pub reject_play: bool,
    /// Answer commands with the events a real backend would emit.
    pub auto_events: bool,
    pending: VecDeque<MediaEvent>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responsive() -> Self {
        Self {
            auto_events: true,
            ..Self::default()
        }
    }

    pub fn current_load(&self) -> LoadId {
        self.current.as_ref().map(|(id, _)| *id).unwrap_or_default()
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|(_, url)| url.as_str())
    }

    /// Queue an event tagged with the active load.
    pub fn emit(&mut self, kind: MediaEventKind) {
        let load = self.current_load();
        self.pending.push_back(MediaEvent::new(load, kind));
    }

    pub fn emit_for(&mut self, load: LoadId, kind: MediaEventKind) {
        self.pending.push_back(MediaEvent::new(load, kind));
    }

    pub fn loads(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Load(..)))
            .count()
    }
}

impl MediaBackend for FakeMedia {
    fn load(&mut self, load: LoadId, url: &str) {
        self.calls.push(Call::Load(load, url.to_string()));
        self.current = Some((load, url.to_string()));
        self.position = 0.0;
        if self.auto_events {
            self.emit(MediaEventKind::LoadStart);
            self.emit(MediaEventKind::CanPlay);
        }
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.calls.push(Call::Play);
        if self.reject_play {
            return Err(MediaError::PlaybackRejected("scripted".to_string()));
        }
        if self.auto_events {
            self.emit(MediaEventKind::Playing);
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.calls.push(Call::Pause);
        if self.auto_events {
            self.emit(MediaEventKind::Pause);
        }
    }

    fn set_position(&mut self, secs: f64) {
        self.calls.push(Call::SetPosition(secs));
        self.position = secs;
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_volume(&mut self, volume: f32) {
        self.calls.push(Call::SetVolume(volume));
        self.volume = volume;
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        self.pending.drain(..).collect()
    }
}
