use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::{PlaybackEngine, PlayerState};
use crate::error::MediaError;
use crate::events::{EventBus, PlayerEvent};
use crate::media::MediaBackend;
use crate::provider::{HistoryEntry, LastPlayed, TrackProvider};

use super::history::ListenTracker;
use super::{PlaybackHandle, PlaybackSnapshot, PlayerCmd, PlayerOptions};

pub(super) fn spawn_player_thread<M, F>(
    factory: F,
    provider: Arc<dyn TrackProvider>,
    rx: Receiver<PlayerCmd>,
    ready: SyncSender<Result<(), MediaError>>,
    playback: PlaybackHandle,
    events: EventBus<PlayerEvent>,
    options: PlayerOptions,
) -> JoinHandle<()>
where
    M: MediaBackend + 'static,
    F: FnOnce() -> Result<M, MediaError> + Send + 'static,
{
    thread::spawn(move || {
        let media = match factory() {
            Ok(media) => {
                let _ = ready.send(Ok(()));
                media
            }
            Err(e) => {
                warn!(error = %e, "media backend failed to start");
                let _ = ready.send(Err(e));
                return;
            }
        };

        let mut engine = PlaybackEngine::new(media, events, options.engine.clone());
        let mut persister = Persister::new(provider.as_ref(), options.history_min_secs);

        if options.resume_last_played {
            restore_last_played(&mut engine, provider.as_ref());
            engine.pump();
        }
        publish(&engine, &playback);

        let mut last_persist = Instant::now();
        loop {
            match rx.recv_timeout(options.tick) {
                Ok(PlayerCmd::Quit { fade_out_ms }) => {
                    persister.observe(&engine);
                    persister.end_listen(false);
                    persister.save_position(&engine);
                    engine.media_mut().fade_out(Duration::from_millis(fade_out_ms));
                    engine.pause();
                    engine.pump();
                    publish(&engine, &playback);
                    info!("player thread exiting");
                    break;
                }
                Ok(PlayerCmd::Stop) => {
                    persister.observe(&engine);
                    persister.end_listen(true);
                    engine.stop();
                    persister.clear();
                }
                Ok(cmd) => apply(&mut engine, cmd),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    persister.observe(&engine);
                    persister.end_listen(false);
                    persister.save_position(&engine);
                    break;
                }
            }

            engine.pump();
            persister.observe(&engine);

            if last_persist.elapsed() >= options.persist_interval {
                persister.save_position(&engine);
                last_persist = Instant::now();
            }

            publish(&engine, &playback);
        }
    })
}

fn apply<M: MediaBackend>(engine: &mut PlaybackEngine<M>, cmd: PlayerCmd) {
    debug!(?cmd, "player command");
    match cmd {
        PlayerCmd::Play { track, context } => engine.play(track, context),
        PlayerCmd::Pause => engine.pause(),
        PlayerCmd::Resume => engine.resume(),
        PlayerCmd::TogglePause => engine.toggle_pause(),
        PlayerCmd::Seek(secs) => engine.seek(secs),
        PlayerCmd::SeekBy(delta) => engine.seek_by(delta),
        PlayerCmd::SetVolume(v) => engine.set_volume(v),
        PlayerCmd::AdjustVolume(delta) => {
            let v = engine.session().volume + delta;
            engine.set_volume(v);
        }
        PlayerCmd::SetRepeat(mode) => engine.set_repeat(mode),
        PlayerCmd::ToggleRepeat => engine.toggle_repeat(),
        PlayerCmd::ToggleShuffle => engine.toggle_shuffle(),
        PlayerCmd::Next => engine.play_next(),
        PlayerCmd::Prev => engine.play_prev(),
        // Both also touch persistence; the loop handles them.
        PlayerCmd::Stop | PlayerCmd::Quit { .. } => {}
    }
}

fn restore_last_played<M: MediaBackend>(
    engine: &mut PlaybackEngine<M>,
    provider: &dyn TrackProvider,
) {
    let last = match provider.last_played() {
        Ok(Some(last)) if !last.is_cleared() => last,
        Ok(_) => return,
        Err(e) => {
            warn!(error = %e, "could not read last played track");
            return;
        }
    };

    match provider.track(&last.track_id) {
        Some(track) => {
            info!(track = %last.track_id, position = last.position, "restoring last played track");
            engine.restore(track, last.position);
        }
        None => warn!(track = %last.track_id, "last played track is no longer available"),
    }
}

fn publish<M: MediaBackend>(engine: &PlaybackEngine<M>, playback: &PlaybackHandle) {
    if let Ok(mut snapshot) = playback.lock() {
        *snapshot = PlaybackSnapshot::from_session(engine.session());
    }
}

/// Best-effort position saving and history recording. Failures are
/// logged and never reach playback.
pub(super) struct Persister<'a> {
    provider: &'a dyn TrackProvider,
    last_saved: Option<LastPlayed>,
    listens: ListenTracker,
}

impl<'a> Persister<'a> {
    pub(super) fn new(provider: &'a dyn TrackProvider, history_min_secs: f64) -> Self {
        Self {
            provider,
            last_saved: None,
            listens: ListenTracker::new(history_min_secs),
        }
    }

    pub(super) fn save_position<M: MediaBackend>(&mut self, engine: &PlaybackEngine<M>) {
        let session = engine.session();
        let Some(id) = session.current_id() else {
            return;
        };
        // A finished queue resumes from the top of its last track.
        let position = if session.player_state == PlayerState::Idle {
            0.0
        } else {
            engine.position()
        };
        let last = LastPlayed::new(id.clone(), position);
        if self.last_saved.as_ref() == Some(&last) {
            return;
        }
        self.save(last);
    }

    pub(super) fn clear(&mut self) {
        self.save(LastPlayed::cleared());
    }

    fn save(&mut self, last: LastPlayed) {
        match self.provider.save_last_played(&last) {
            Ok(()) => self.last_saved = Some(last),
            Err(e) => warn!(error = %e, "failed to persist playback position"),
        }
    }

    pub(super) fn observe<M: MediaBackend>(&mut self, engine: &PlaybackEngine<M>) {
        let session = engine.session();
        let current = match session.player_state {
            PlayerState::Idle => None,
            _ => session.current_id(),
        };
        let playing = session.player_state == PlayerState::Playing;
        if let Some(entry) = self.listens.observe(current, engine.position(), playing) {
            self.record(entry);
        }
    }

    /// Close the listen in progress; `stopped` records it whatever its length.
    pub(super) fn end_listen(&mut self, stopped: bool) {
        if let Some(entry) = self.listens.finish(stopped) {
            self.record(entry);
        }
    }

    fn record(&self, entry: HistoryEntry) {
        debug!(track = %entry.track_id, played = entry.played_secs, "listen recorded");
        if let Err(e) = self.provider.record_play(&entry) {
            warn!(track = %entry.track_id, error = %e, "failed to record listen");
        }
    }
}
