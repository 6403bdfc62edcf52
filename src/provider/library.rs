use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{HistoryEntry, LastPlayed, StateStore, TrackProvider};
use crate::error::ProviderError;
use crate::library::LibraryEntry;
use crate::playlist::{Playlist, PlaylistId, PlaylistKind};
use crate::track::{Track, TrackId};

const ALBUM_PLAYLIST_PREFIX: &str = "album:";

/// Serves tracks from a scanned music directory.
pub struct LibraryProvider {
    tracks: Vec<Arc<Track>>,
    by_id: HashMap<TrackId, Arc<Track>>,
    albums: Vec<Playlist>,
    state: StateStore,
}

impl LibraryProvider {
    pub fn new(entries: &[LibraryEntry], state: StateStore) -> Self {
        let tracks: Vec<Arc<Track>> = entries.iter().map(|e| Arc::clone(&e.track)).collect();
        let by_id = tracks
            .iter()
            .map(|t| (t.id.clone(), Arc::clone(t)))
            .collect();
        let albums = album_playlists(&tracks);
        Self {
            tracks,
            by_id,
            albums,
            state,
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }
}

/// One read-only playlist per album tag, in scan order within an album.
fn album_playlists(tracks: &[Arc<Track>]) -> Vec<Playlist> {
    let mut grouped: BTreeMap<&str, Vec<&Arc<Track>>> = BTreeMap::new();
    for track in tracks {
        if let Some(album) = track.album.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            grouped.entry(album).or_default().push(track);
        }
    }

    grouped
        .into_iter()
        .map(|(album, members)| {
            let mut playlist = Playlist::new(
                PlaylistId::new(format!("{ALBUM_PLAYLIST_PREFIX}{album}")),
                album,
                PlaylistKind::Album,
            );
            playlist.description = members
                .first()
                .map(|t| t.artist.clone())
                .filter(|a| !a.is_empty());
            playlist.tracks = members.iter().map(|t| t.id.clone()).collect();
            playlist
        })
        .collect()
}

impl TrackProvider for LibraryProvider {
    fn track(&self, id: &TrackId) -> Option<Arc<Track>> {
        self.by_id.get(id).cloned()
    }

    fn last_played(&self) -> Result<Option<LastPlayed>, ProviderError> {
        Ok(self.state.last_played())
    }

    fn save_last_played(&self, last: &LastPlayed) -> Result<(), ProviderError> {
        self.state.save_last_played(last)
    }

    fn search(&self, query: &str) -> Vec<Arc<Track>> {
        let query = query.trim().to_lowercase();
        self.tracks
            .iter()
            .filter(|t| t.matches(&query))
            .cloned()
            .collect()
    }

    /// User playlists first, then albums by name.
    fn playlists(&self) -> Vec<Playlist> {
        let mut all = self.state.playlists();
        all.extend(self.albums.iter().cloned());
        all
    }

    fn record_play(&self, entry: &HistoryEntry) -> Result<(), ProviderError> {
        self.state.record_history(entry)
    }

    fn history(&self, limit: usize, offset: usize) -> Vec<HistoryEntry> {
        self.state.history(limit, offset)
    }
}
