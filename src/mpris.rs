//! MPRIS D-Bus control surface.
//!
//! Incoming method calls become `ControlCmd`s for the runtime. The runtime
//! pushes state through `MprisHandle::sync`; a change wakes the bus task,
//! which emits `PropertiesChanged` for the player interface.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{info, warn};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::engine::{PlayerState, RepeatMode};
use crate::player::PlaybackSnapshot;
use crate::track::Track;

const BUS_NAME: &str = "org.mpris.MediaPlayer2.encore";
const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const NOTIFY_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug, PartialEq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative seek in microseconds.
    Seek(i64),
    SetRepeat(RepeatMode),
    SetShuffle(bool),
    SetVolume(f64),
}

#[derive(Debug, Default, PartialEq)]
struct SharedState {
    playback: PlayerState,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    url: Option<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    track_id: Option<OwnedObjectPath>,
    repeat: RepeatMode,
    shuffle: bool,
    volume: f64,
    position_micros: i64,
}

fn status_str(state: PlayerState) -> &'static str {
    match state {
        PlayerState::Playing | PlayerState::Buffering => "Playing",
        PlayerState::Paused | PlayerState::Loading => "Paused",
        PlayerState::Idle | PlayerState::Error => "Stopped",
    }
}

fn loop_status_str(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::Off => "None",
        RepeatMode::All => "Playlist",
        RepeatMode::One => "Track",
    }
}

fn repeat_from_loop_status(s: &str) -> Option<RepeatMode> {
    match s {
        "None" => Some(RepeatMode::Off),
        "Playlist" => Some(RepeatMode::All),
        "Track" => Some(RepeatMode::One),
        _ => None,
    }
}

fn file_url(locator: &str) -> String {
    if locator.contains("://") {
        locator.to_string()
    } else {
        format!("file://{locator}")
    }
}

fn secs_to_micros(secs: f64) -> i64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1_000_000.0) as i64
    } else {
        0
    }
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisHandle {
    /// Replace the metadata; `index` becomes the `mpris:trackid` suffix.
    pub fn set_track_metadata(&self, index: Option<usize>, track: Option<&Track>) {
        let Ok(mut s) = self.state.lock() else {
            return;
        };
        match track {
            Some(t) => {
                s.title = Some(t.title.clone());
                s.artist = if t.artist.is_empty() {
                    Vec::new()
                } else {
                    vec![t.artist.clone()]
                };
                s.album = t.album.clone();
                s.url = Some(file_url(&t.audio_url));
                s.art_url = t.cover_url.as_deref().map(file_url);
                s.length_micros = Some(t.duration.as_micros().min(i64::MAX as u128) as i64);
                s.track_id = index.and_then(|i| {
                    ObjectPath::try_from(format!("{OBJECT_PATH}/track/{i}"))
                        .ok()
                        .map(OwnedObjectPath::from)
                });
            }
            None => {
                s.title = None;
                s.artist.clear();
                s.album = None;
                s.url = None;
                s.art_url = None;
                s.length_micros = None;
                s.track_id = None;
            }
        }
    }

    /// Mirror `snapshot` and wake the bus task when anything observable changed.
    pub fn sync(&self, index: Option<usize>, snapshot: &PlaybackSnapshot) {
        let before = self.state.lock().ok().map(|s| {
            (
                s.playback,
                s.track_id.clone(),
                s.title.clone(),
                s.repeat,
                s.shuffle,
                s.volume,
                s.length_micros,
            )
        });

        self.set_track_metadata(index, snapshot.track.as_deref());
        let after = {
            let Ok(mut s) = self.state.lock() else {
                return;
            };
            s.playback = snapshot.state;
            s.repeat = snapshot.repeat;
            s.shuffle = snapshot.shuffle;
            s.volume = f64::from(snapshot.volume);
            s.position_micros = secs_to_micros(snapshot.position);
            if snapshot.duration > 0.0 && s.track_id.is_some() {
                s.length_micros = Some(secs_to_micros(snapshot.duration));
            }
            (
                s.playback,
                s.track_id.clone(),
                s.title.clone(),
                s.repeat,
                s.shuffle,
                s.volume,
                s.length_micros,
            )
        };

        if before.as_ref() != Some(&after) {
            let _ = self.notify.send(());
        }
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "encore"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

impl PlayerIface {
    fn read<T>(&self, f: impl FnOnce(&SharedState) -> T, fallback: T) -> T {
        self.state.lock().map(|s| f(&s)).unwrap_or(fallback)
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::Seek(offset));
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        self.read(|s| status_str(s.playback), "Stopped")
    }

    #[zbus(property)]
    fn loop_status(&self) -> &str {
        self.read(|s| loop_status_str(s.repeat), "None")
    }

    #[zbus(property)]
    fn set_loop_status(&mut self, value: String) {
        match repeat_from_loop_status(&value) {
            Some(mode) => {
                let _ = self.tx.send(ControlCmd::SetRepeat(mode));
            }
            None => warn!(%value, "ignoring unknown MPRIS loop status"),
        }
    }

    #[zbus(property)]
    fn shuffle(&self) -> bool {
        self.read(|s| s.shuffle, false)
    }

    #[zbus(property)]
    fn set_shuffle(&mut self, value: bool) {
        let _ = self.tx.send(ControlCmd::SetShuffle(value));
    }

    #[zbus(property)]
    fn volume(&self) -> f64 {
        self.read(|s| s.volume, 0.0)
    }

    #[zbus(property)]
    fn set_volume(&mut self, value: f64) {
        let _ = self.tx.send(ControlCmd::SetVolume(value));
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.read(|s| s.position_micros, 0)
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        self.read(|s| s.track_id.is_some(), false)
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let Ok(s) = self.state.lock() else {
            return HashMap::new();
        };

        let mut map = HashMap::new();
        let mut put = |key: &str, value: Value<'_>| {
            if let Ok(v) = OwnedValue::try_from(value) {
                map.insert(key.to_string(), v);
            }
        };

        if let Some(id) = &s.track_id {
            put("mpris:trackid", Value::from(id.clone().into_inner()));
        }
        if let Some(len) = s.length_micros {
            put("mpris:length", Value::from(len));
        }
        if let Some(title) = &s.title {
            put("xesam:title", Value::from(title.as_str()));
        }
        if !s.artist.is_empty() {
            put("xesam:artist", Value::from(s.artist.clone()));
        }
        if let Some(album) = &s.album {
            put("xesam:album", Value::from(album.as_str()));
        }
        if let Some(url) = &s.url {
            put("xesam:url", Value::from(url.as_str()));
        }
        if let Some(art) = &s.art_url {
            put("mpris:artUrl", Value::from(art.as_str()));
        }
        map
    }
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify: Receiver<()>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server.at(OBJECT_PATH, RootIface { tx: tx.clone() }).await?;
    object_server.at(OBJECT_PATH, PlayerIface { tx, state }).await?;
    let iface_ref = object_server
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    info!(name = BUS_NAME, "MPRIS service registered");

    loop {
        Timer::after(NOTIFY_POLL).await;

        let mut dirty = false;
        loop {
            match notify.try_recv() {
                Ok(()) => dirty = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
        if !dirty {
            continue;
        }

        let iface = iface_ref.get().await;
        let emitter = iface_ref.signal_emitter();
        iface.playback_status_changed(emitter).await?;
        iface.metadata_changed(emitter).await?;
        iface.loop_status_changed(emitter).await?;
        iface.shuffle_changed(emitter).await?;
        iface.volume_changed(emitter).await?;
    }
}

/// Register on the session bus from a background thread. Failure to reach
/// the bus is logged; the returned handle still accepts updates.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<()>();

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        block_on(async move {
            if let Err(e) = serve(tx, state_for_thread, notify_rx).await {
                warn!(error = %e, "MPRIS unavailable");
            }
        });
    });

    MprisHandle {
        state,
        notify: notify_tx,
    }
}
