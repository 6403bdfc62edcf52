//! Where tracks and persisted playback state come from.

mod library;
mod state;

pub use library::LibraryProvider;
pub use state::{HISTORY_CAP, PersistedState, StateStore};

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::playlist::{Playlist, PlaylistId};
use crate::track::{Track, TrackId};

/// Track id that means "nothing was playing".
pub const CLEARED_ID: &str = "-1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastPlayed {
    pub track_id: TrackId,
    /// Seconds into the track.
    pub position: f64,
}

impl LastPlayed {
    pub fn new(track_id: TrackId, position: f64) -> Self {
        Self { track_id, position }
    }

    /// The sentinel that clears persisted state when saved.
    pub fn cleared() -> Self {
        Self::new(TrackId::from(CLEARED_ID), 0.0)
    }

    pub fn is_cleared(&self) -> bool {
        self.track_id.as_str() == CLEARED_ID
    }
}

/// One finished listen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub track_id: TrackId,
    /// Furthest playhead reached while playing, in seconds.
    pub played_secs: f64,
    /// Unix seconds when the listen ended.
    pub finished_at: u64,
}

impl HistoryEntry {
    pub fn now(track_id: TrackId, played_secs: f64) -> Self {
        let finished_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            track_id,
            played_secs,
            finished_at,
        }
    }
}

pub trait TrackProvider: Send + Sync {
    fn track(&self, id: &TrackId) -> Option<Arc<Track>>;

    fn last_played(&self) -> Result<Option<LastPlayed>, ProviderError>;

    /// Persist the playhead. Saving [`LastPlayed::cleared`] forgets it.
    fn save_last_played(&self, last: &LastPlayed) -> Result<(), ProviderError>;

    /// Case-insensitive substring match over title and artist. An empty
    /// query returns every track.
    fn search(&self, query: &str) -> Vec<Arc<Track>>;

    fn playlists(&self) -> Vec<Playlist> {
        Vec::new()
    }

    fn playlist(&self, id: &PlaylistId) -> Option<Playlist> {
        self.playlists().into_iter().find(|p| &p.id == id)
    }

    /// The playlist's tracks in play order, skipping ids this provider
    /// cannot resolve.
    fn playlist_tracks(&self, id: &PlaylistId) -> Vec<Arc<Track>> {
        self.playlist(id)
            .map(|p| p.tracks.iter().filter_map(|t| self.track(t)).collect())
            .unwrap_or_default()
    }

    fn record_play(&self, _entry: &HistoryEntry) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Newest first.
    fn history(&self, _limit: usize, _offset: usize) -> Vec<HistoryEntry> {
        Vec::new()
    }
}
