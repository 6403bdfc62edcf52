use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{HistoryEntry, LastPlayed};
use crate::error::ProviderError;
use crate::playlist::{Playlist, PlaylistId, PlaylistKind};
use crate::track::TrackId;

/// Oldest history entries are dropped past this many.
pub const HISTORY_CAP: usize = 500;

const USER_PLAYLIST_PREFIX: &str = "user-";

/// On-disk shape of the state file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    // Arrays before tables in the TOML output.
    pub liked: BTreeSet<TrackId>,
    pub last_played: Option<LastPlayed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub playlists: Vec<Playlist>,
    /// Oldest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
}

/// TOML-backed store for the last-played position, liked tracks, user
/// playlists and listening history.
///
/// The file is read once on open and rewritten on every mutation.
pub struct StateStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl StateStore {
    /// Open `path`. A missing file reads as empty state.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// A store that starts empty regardless of what is on disk.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(PersistedState::default()),
        }
    }

    pub fn last_played(&self) -> Option<LastPlayed> {
        self.lock().last_played.clone()
    }

    pub fn save_last_played(&self, last: &LastPlayed) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.last_played = if last.is_cleared() {
            None
        } else {
            Some(last.clone())
        };
        self.write(&state)
    }

    /// Flip the liked flag for `id` and return the new value.
    pub fn toggle_like(&self, id: &TrackId) -> Result<bool, ProviderError> {
        let mut state = self.lock();
        let liked = if state.liked.remove(id) {
            false
        } else {
            state.liked.insert(id.clone());
            true
        };
        self.write(&state)?;
        Ok(liked)
    }

    pub fn liked_ids(&self) -> BTreeSet<TrackId> {
        self.lock().liked.clone()
    }

    /// User playlists in creation order.
    pub fn playlists(&self) -> Vec<Playlist> {
        self.lock().playlists.clone()
    }

    /// Create an empty playlist with the next free `user-N` id.
    pub fn create_playlist(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Playlist, ProviderError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProviderError::EmptyPlaylistName);
        }
        let mut state = self.lock();
        let next = state
            .playlists
            .iter()
            .filter_map(|p| {
                p.id.as_str()
                    .strip_prefix(USER_PLAYLIST_PREFIX)?
                    .parse::<u64>()
                    .ok()
            })
            .max()
            .map_or(1, |n| n + 1);
        let mut playlist = Playlist::new(
            PlaylistId::new(format!("{USER_PLAYLIST_PREFIX}{next}")),
            name,
            PlaylistKind::User,
        );
        playlist.description = description.filter(|d| !d.trim().is_empty());
        state.playlists.push(playlist.clone());
        self.write(&state)?;
        Ok(playlist)
    }

    pub fn delete_playlist(&self, id: &PlaylistId) -> Result<(), ProviderError> {
        let mut state = self.lock();
        let before = state.playlists.len();
        state.playlists.retain(|p| &p.id != id);
        if state.playlists.len() == before {
            return Err(ProviderError::UnknownPlaylist(id.clone()));
        }
        self.write(&state)
    }

    /// Append `track` unless the playlist already has it. Returns whether
    /// it was added.
    pub fn add_to_playlist(&self, id: &PlaylistId, track: &TrackId) -> Result<bool, ProviderError> {
        let mut state = self.lock();
        let playlist = Self::find_mut(&mut state, id)?;
        if playlist.contains(track) {
            return Ok(false);
        }
        playlist.tracks.push(track.clone());
        self.write(&state)?;
        Ok(true)
    }

    /// Returns whether `track` was in the playlist.
    pub fn remove_from_playlist(
        &self,
        id: &PlaylistId,
        track: &TrackId,
    ) -> Result<bool, ProviderError> {
        let mut state = self.lock();
        let playlist = Self::find_mut(&mut state, id)?;
        let before = playlist.tracks.len();
        playlist.tracks.retain(|t| t != track);
        if playlist.tracks.len() == before {
            return Ok(false);
        }
        self.write(&state)?;
        Ok(true)
    }

    pub fn record_history(&self, entry: &HistoryEntry) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.history.push(entry.clone());
        if state.history.len() > HISTORY_CAP {
            let excess = state.history.len() - HISTORY_CAP;
            state.history.drain(..excess);
        }
        self.write(&state)
    }

    /// Newest first, skipping `offset` entries.
    pub fn history(&self, limit: usize, offset: usize) -> Vec<HistoryEntry> {
        self.lock()
            .history
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    fn find_mut<'s>(
        state: &'s mut PersistedState,
        id: &PlaylistId,
    ) -> Result<&'s mut Playlist, ProviderError> {
        state
            .playlists
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| ProviderError::UnknownPlaylist(id.clone()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PersistedState> {
        // Poison is ignored; the state is plain data.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self, state: &PersistedState) -> Result<(), ProviderError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = toml::to_string(state)?;

        // Replace atomically.
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}
