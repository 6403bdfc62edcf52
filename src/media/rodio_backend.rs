//! `rodio`-backed media resource.
//!
//! One `Sink` per loaded source. Decoding happens on `load`, so readiness
//! events are queued immediately and delivered on the next poll.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::debug;

use super::{LoadId, MediaBackend, MediaEvent, MediaEventKind};
use crate::error::MediaError;

const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(250);
const FADE_STEPS: u64 = 20;

pub struct RodioBackend {
    stream: OutputStream,
    sink: Option<Sink>,
    load: LoadId,
    url: Option<String>,
    volume: f32,
    playing: bool,
    ended: bool,
    // Added to `Sink::get_pos` when a seek had to rebuild the sink with `skip_duration`.
    offset: Duration,
    last_time_update: Option<Instant>,
    pending: Vec<MediaEvent>,
}

impl RodioBackend {
    pub fn open_default() -> Result<Self, MediaError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| MediaError::Output(e.to_string()))?;
        // rodio logs to stderr when the stream is dropped, which tears the TUI.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            load: LoadId::default(),
            url: None,
            volume: 1.0,
            playing: false,
            ended: false,
            offset: Duration::ZERO,
            last_time_update: None,
            pending: Vec::new(),
        })
    }

    fn emit(&mut self, kind: MediaEventKind) {
        self.pending.push(MediaEvent::new(self.load, kind));
    }

    /// Open `url` into a paused sink positioned at `start_at`.
    fn open_sink(&self, url: &str, start_at: Duration) -> Result<(Sink, Option<Duration>), MediaError> {
        let path = path_from_url(url);
        let file = File::open(&path).map_err(|source| MediaError::Open {
            url: url.to_string(),
            source,
        })?;

        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| MediaError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let total = decoder.total_duration();

        let sink = Sink::connect_new(self.stream.mixer());
        sink.append(decoder.skip_duration(start_at));
        sink.pause();
        sink.set_volume(self.volume);
        Ok((sink, total))
    }

    fn replace_sink(&mut self, start_at: Duration) -> Result<(), MediaError> {
        let url = self.url.clone().ok_or(MediaError::NoSource)?;
        let (sink, _) = self.open_sink(&url, start_at)?;
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        if self.playing {
            sink.play();
        }
        self.sink = Some(sink);
        self.offset = start_at;
        self.ended = false;
        Ok(())
    }
}

fn path_from_url(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

impl MediaBackend for RodioBackend {
    fn load(&mut self, load: LoadId, url: &str) {
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        self.load = load;
        self.url = Some(url.to_string());
        self.playing = false;
        self.ended = false;
        self.offset = Duration::ZERO;
        self.last_time_update = None;

        self.emit(MediaEventKind::LoadStart);
        match self.open_sink(url, Duration::ZERO) {
            Ok((sink, total)) => {
                self.sink = Some(sink);
                if let Some(total) = total {
                    self.emit(MediaEventKind::DurationChange(total.as_secs_f64()));
                }
                self.emit(MediaEventKind::CanPlay);
            }
            Err(e) => self.emit(MediaEventKind::Error(e.to_string())),
        }
    }

    fn play(&mut self) -> Result<(), MediaError> {
        let drained = match self.sink.as_ref() {
            Some(sink) => self.ended || sink.empty(),
            None => return Err(MediaError::NoSource),
        };
        if drained {
            // Replaying a finished source starts it over.
            self.replace_sink(Duration::ZERO)?;
        }

        if let Some(sink) = self.sink.as_ref() {
            sink.play();
        }
        self.playing = true;
        self.emit(MediaEventKind::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            if self.playing {
                sink.pause();
                self.playing = false;
                self.emit(MediaEventKind::Pause);
            }
        }
    }

    fn set_position(&mut self, secs: f64) {
        if !secs.is_finite() || self.sink.is_none() {
            return;
        }
        let target = Duration::from_secs_f64(secs.max(0.0));

        let seeked = match self.sink.as_ref() {
            Some(sink) if !self.ended => sink
                .try_seek(target)
                .map_err(|e| MediaError::Seek(e.to_string())),
            _ => Err(MediaError::Seek("source already drained".to_string())),
        };
        match seeked {
            Ok(()) => self.offset = Duration::ZERO,
            Err(e) => {
                debug!(error = %e, "rebuilding sink to seek");
                if let Err(e) = self.replace_sink(target) {
                    self.emit(MediaEventKind::Error(e.to_string()));
                    return;
                }
            }
        }
        self.emit(MediaEventKind::TimeUpdate(target.as_secs_f64()));
    }

    fn position(&self) -> f64 {
        self.sink
            .as_ref()
            .map(|s| (s.get_pos() + self.offset).as_secs_f64())
            .unwrap_or(0.0)
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(volume);
        }
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        let finished = self.playing
            && !self.ended
            && self.sink.as_ref().map(|s| s.empty()).unwrap_or(false);

        if finished {
            self.ended = true;
            self.playing = false;
            self.emit(MediaEventKind::Ended);
        } else if self.playing {
            let due = self
                .last_time_update
                .map_or(true, |at| at.elapsed() >= TIME_UPDATE_INTERVAL);
            if due {
                self.last_time_update = Some(Instant::now());
                let pos = self.position();
                self.emit(MediaEventKind::TimeUpdate(pos));
            }
        }

        std::mem::take(&mut self.pending)
    }

    fn fade_out(&mut self, fade_out: Duration) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if !self.playing || fade_out.is_zero() {
            sink.set_volume(0.0);
            return;
        }

        let step = (fade_out / FADE_STEPS as u32).max(Duration::from_millis(1));
        for i in 1..=FADE_STEPS {
            let t = i as f32 / FADE_STEPS as f32;
            sink.set_volume(self.volume * (1.0 - t));
            thread::sleep(step);
        }
        sink.set_volume(0.0);
    }
}
