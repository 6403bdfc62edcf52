//! Application model: the library view, selection, filter, likes and
//! playlists.
//!
//! `App` never drives playback directly. Selecting a track yields the
//! `PlayerCmd` the runtime should send.

mod playlists;

pub use playlists::PlaylistPicker;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use crate::events::{EventBus, LibraryEvent};
use crate::library::LibraryEntry;
use crate::player::{PlaybackHandle, PlaybackSnapshot, PlayerCmd};
use crate::playlist::{Playlist, PlaylistId};
use crate::provider::{LibraryProvider, TrackProvider};
use crate::track::{Track, TrackId};

pub struct App {
    pub entries: Vec<LibraryEntry>,
    pub selected: usize,
    /// Latest copy of the player's shared state.
    pub playback: PlaybackSnapshot,
    pub playback_handle: Option<PlaybackHandle>,

    provider: Arc<LibraryProvider>,
    library_events: EventBus<LibraryEvent>,
    liked: BTreeSet<TrackId>,
    playlists: Vec<Playlist>,
    index_by_id: HashMap<TrackId, usize>,
    open_playlist_id: Option<PlaylistId>,

    pub playlist_picker: Option<PlaylistPicker>,
    pub follow_playback: bool,
    pub filter_mode: bool,
    pub filter_query: String,
    pub liked_only: bool,
    pub current_dir: Option<String>,
    pub metadata_window: bool,
}

impl App {
    pub fn new(
        entries: Vec<LibraryEntry>,
        provider: Arc<LibraryProvider>,
        library_events: EventBus<LibraryEvent>,
    ) -> Self {
        let liked = provider.state().liked_ids();
        let playlists = provider.playlists();
        let index_by_id = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.track.id.clone(), i))
            .collect();
        Self {
            entries,
            selected: 0,
            playback: PlaybackSnapshot::default(),
            playback_handle: None,
            provider,
            library_events,
            liked,
            playlists,
            index_by_id,
            open_playlist_id: None,
            playlist_picker: None,
            follow_playback: true,
            filter_mode: false,
            filter_query: String::new(),
            liked_only: false,
            current_dir: None,
            metadata_window: false,
        }
    }

    pub fn set_playback_handle(&mut self, h: PlaybackHandle) {
        self.playback_handle = Some(h);
    }

    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    /// Copy the player's shared state and, when following, move the cursor
    /// onto the playing track.
    pub fn refresh_playback(&mut self) {
        if let Some(snapshot) = self
            .playback_handle
            .as_ref()
            .and_then(|h| h.lock().ok().map(|s| s.clone()))
        {
            self.playback = snapshot;
        }
        if self.follow_playback {
            if let Some(i) = self.now_playing_index() {
                if self.display_indices().contains(&i) {
                    self.selected = i;
                }
            }
        }
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    /// Entry index of the track the player holds, if it is in the library.
    pub fn now_playing_index(&self) -> Option<usize> {
        let id = &self.playback.track.as_ref()?.id;
        self.index_by_id.get(id).copied()
    }

    pub fn selected_entry(&self) -> Option<&LibraryEntry> {
        self.entries.get(self.selected)
    }

    /// Entry indices in display order: the open playlist (or the whole
    /// library), then the filter and liked-only view.
    pub fn display_indices(&self) -> Vec<usize> {
        let query = self.filter_query.trim();
        let matches: Option<HashSet<TrackId>> = if query.is_empty() {
            None
        } else {
            Some(
                self.provider
                    .search(query)
                    .into_iter()
                    .map(|t| t.id.clone())
                    .collect(),
            )
        };

        let base = self
            .playlist_order()
            .unwrap_or_else(|| (0..self.entries.len()).collect());
        base.into_iter()
            .filter(|&i| {
                let id = &self.entries[i].track.id;
                matches.as_ref().is_none_or(|m| m.contains(id))
                    && (!self.liked_only || self.liked.contains(id))
            })
            .collect()
    }

    /// The visible tracks, in order. This is the context handed to the
    /// player when a track is chosen from the list.
    pub fn visible_tracks(&self) -> Vec<Arc<Track>> {
        self.display_indices()
            .into_iter()
            .map(|i| Arc::clone(&self.entries[i].track))
            .collect()
    }

    /// Command for choosing the selected track: toggle pause when it is
    /// already current, else play it with the visible list as the queue.
    pub fn activate_selected(&self) -> Option<PlayerCmd> {
        if !self.display_indices().contains(&self.selected) {
            return None;
        }
        let entry = self.entries.get(self.selected)?;
        let is_current = self
            .playback
            .track
            .as_ref()
            .is_some_and(|t| t.id == entry.track.id);
        if is_current {
            return Some(PlayerCmd::TogglePause);
        }
        Some(PlayerCmd::Play {
            track: Arc::clone(&entry.track),
            context: Some(self.visible_tracks()),
        })
    }

    pub fn is_liked(&self, index: usize) -> bool {
        self.entries
            .get(index)
            .is_some_and(|e| self.liked.contains(&e.track.id))
    }

    /// Flip the like on the selected track, persist it and broadcast the change.
    pub fn toggle_like_selected(&mut self) {
        let Some(id) = self.selected_entry().map(|e| e.track.id.clone()) else {
            return;
        };
        match self.provider.state().toggle_like(&id) {
            Ok(liked) => self
                .library_events
                .publish(LibraryEvent::LikeToggled { track_id: id, liked }),
            Err(e) => warn!(track = %id, error = %e, "failed to save like"),
        }
    }

    /// Keep the liked cache in step with the bus.
    pub fn apply_library_event(&mut self, event: &LibraryEvent) {
        match event {
            LibraryEvent::LikeToggled { track_id, liked } => {
                if *liked {
                    self.liked.insert(track_id.clone());
                } else {
                    self.liked.remove(track_id);
                }
            }
            LibraryEvent::PlaylistsChanged => self.reload_playlists(),
        }
        self.ensure_selected_visible();
    }

    pub fn toggle_liked_only(&mut self) {
        self.liked_only = !self.liked_only;
        self.follow_playback_off();
        self.ensure_selected_visible();
    }

    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    /// Char positions of the first case-insensitive occurrence of the
    /// filter query in `label`, for highlighting.
    pub fn highlight_positions(label: &str, query: &str) -> Vec<usize> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let label_lower: Vec<char> = label.chars().flat_map(char::to_lowercase).collect();
        let needle: Vec<char> = query.chars().collect();
        // Lowercasing can change char counts; only highlight when it did not.
        if label_lower.len() != label.chars().count() || needle.len() > label_lower.len() {
            return Vec::new();
        }
        label_lower
            .windows(needle.len())
            .position(|w| w == needle.as_slice())
            .map(|start| (start..start + needle.len()).collect())
            .unwrap_or_default()
    }

    pub fn enter_filter_mode(&mut self) {
        self.filter_mode = true;
        self.follow_playback_off();
        self.ensure_selected_visible();
    }

    pub fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
    }

    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.filter_mode = false;
        self.ensure_selected_visible();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.ensure_selected_visible();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.ensure_selected_visible();
    }

    /// Move selection to the first visible track when it left the view.
    fn ensure_selected_visible(&mut self) {
        let display = self.display_indices();
        match display.first() {
            None => self.selected = 0,
            Some(&first) if !display.contains(&self.selected) => self.selected = first,
            Some(_) => {}
        }
    }

    /// Move selection to the next visible track, wrapping.
    pub fn next(&mut self) {
        let display = self.display_indices();
        if display.is_empty() {
            return;
        }
        self.selected = match display.iter().position(|&i| i == self.selected) {
            Some(p) => display[(p + 1) % display.len()],
            None => display[0],
        };
    }

    /// Move selection to the previous visible track, wrapping.
    pub fn prev(&mut self) {
        let display = self.display_indices();
        let Some(&last) = display.last() else {
            return;
        };
        self.selected = match display.iter().position(|&i| i == self.selected) {
            Some(0) | None => last,
            Some(p) => display[p - 1],
        };
    }
}
