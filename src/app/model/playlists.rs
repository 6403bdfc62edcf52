//! Playlist picker and the playlist view.
//!
//! Opening a playlist swaps the library list for the playlist's tracks in
//! playlist order, so activating a track plays the playlist as the queue.

use tracing::{info, warn};

use super::App;
use crate::events::LibraryEvent;
use crate::playlist::Playlist;
use crate::provider::TrackProvider;

/// Popup listing every playlist.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlaylistPicker {
    pub selected: usize,
    /// Name being typed for a new playlist.
    pub new_name: Option<String>,
}

impl App {
    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    /// The playlist shown instead of the library, if any.
    pub fn open_playlist(&self) -> Option<&Playlist> {
        let id = self.open_playlist_id.as_ref()?;
        self.playlists.iter().find(|p| &p.id == id)
    }

    /// Entry indices of the open playlist, in playlist order.
    pub(super) fn playlist_order(&self) -> Option<Vec<usize>> {
        let playlist = self.open_playlist()?;
        Some(
            playlist
                .tracks
                .iter()
                .filter_map(|id| self.index_by_id.get(id).copied())
                .collect(),
        )
    }

    pub fn toggle_playlist_picker(&mut self) {
        self.playlist_picker = match self.playlist_picker {
            Some(_) => None,
            None => Some(PlaylistPicker::default()),
        };
    }

    pub fn picker_next(&mut self) {
        let len = self.playlists.len();
        if let Some(picker) = self.playlist_picker.as_mut() {
            if len > 0 {
                picker.selected = (picker.selected + 1) % len;
            }
        }
    }

    pub fn picker_prev(&mut self) {
        let len = self.playlists.len();
        if let Some(picker) = self.playlist_picker.as_mut() {
            if len > 0 {
                picker.selected = picker.selected.checked_sub(1).unwrap_or(len - 1);
            }
        }
    }

    pub fn highlighted_playlist(&self) -> Option<&Playlist> {
        let picker = self.playlist_picker.as_ref()?;
        self.playlists.get(picker.selected)
    }

    /// Show the highlighted playlist and close the picker.
    pub fn open_highlighted_playlist(&mut self) {
        let Some(id) = self.highlighted_playlist().map(|p| p.id.clone()) else {
            return;
        };
        self.open_playlist_id = Some(id);
        self.playlist_picker = None;
        self.follow_playback_off();
        self.selected = self.display_indices().first().copied().unwrap_or(0);
    }

    /// Back to the whole library.
    pub fn close_playlist(&mut self) {
        if self.open_playlist_id.take().is_some() {
            self.ensure_selected_visible();
        }
    }

    /// Append the track under the list cursor to the highlighted playlist.
    pub fn add_selected_to_highlighted(&mut self) {
        let Some(track) = self.selected_entry().map(|e| e.track.id.clone()) else {
            return;
        };
        let Some(playlist) = self.highlighted_playlist().filter(|p| p.is_editable()) else {
            return;
        };
        let id = playlist.id.clone();
        match self.provider.state().add_to_playlist(&id, &track) {
            Ok(true) => self.library_events.publish(LibraryEvent::PlaylistsChanged),
            Ok(false) => {}
            Err(e) => warn!(playlist = %id, track = %track, error = %e, "failed to add to playlist"),
        }
    }

    /// Drop the selected track from the open playlist, when it is editable.
    pub fn remove_selected_from_open(&mut self) {
        let Some(track) = self.selected_entry().map(|e| e.track.id.clone()) else {
            return;
        };
        let Some(playlist) = self.open_playlist().filter(|p| p.is_editable()) else {
            return;
        };
        let id = playlist.id.clone();
        match self.provider.state().remove_from_playlist(&id, &track) {
            Ok(true) => self.library_events.publish(LibraryEvent::PlaylistsChanged),
            Ok(false) => {}
            Err(e) => warn!(playlist = %id, track = %track, error = %e, "failed to remove from playlist"),
        }
    }

    pub fn delete_highlighted_playlist(&mut self) {
        let Some(playlist) = self.highlighted_playlist().filter(|p| p.is_editable()) else {
            return;
        };
        let id = playlist.id.clone();
        match self.provider.state().delete_playlist(&id) {
            Ok(()) => {
                info!(playlist = %id, "playlist deleted");
                self.library_events.publish(LibraryEvent::PlaylistsChanged);
            }
            Err(e) => warn!(playlist = %id, error = %e, "failed to delete playlist"),
        }
    }

    pub fn is_naming_playlist(&self) -> bool {
        self.playlist_picker
            .as_ref()
            .is_some_and(|p| p.new_name.is_some())
    }

    pub fn start_naming_playlist(&mut self) {
        if let Some(picker) = self.playlist_picker.as_mut() {
            picker.new_name = Some(String::new());
        }
    }

    pub fn push_name_char(&mut self, c: char) {
        if let Some(name) = self.playlist_picker.as_mut().and_then(|p| p.new_name.as_mut()) {
            name.push(c);
        }
    }

    pub fn pop_name_char(&mut self) {
        if let Some(name) = self.playlist_picker.as_mut().and_then(|p| p.new_name.as_mut()) {
            name.pop();
        }
    }

    pub fn cancel_naming_playlist(&mut self) {
        if let Some(picker) = self.playlist_picker.as_mut() {
            picker.new_name = None;
        }
    }

    /// Create a playlist from the typed name. A blank name is rejected and
    /// keeps the prompt open.
    pub fn create_named_playlist(&mut self) {
        let Some(name) = self
            .playlist_picker
            .as_ref()
            .and_then(|p| p.new_name.clone())
        else {
            return;
        };
        match self.provider.state().create_playlist(&name, None) {
            Ok(playlist) => {
                info!(playlist = %playlist.id, name = %playlist.name, "playlist created");
                self.cancel_naming_playlist();
                self.library_events.publish(LibraryEvent::PlaylistsChanged);
            }
            Err(e) => warn!(error = %e, "failed to create playlist"),
        }
    }

    /// Re-read playlists after an edit; an open playlist that is gone closes.
    pub(super) fn reload_playlists(&mut self) {
        self.playlists = self.provider.playlists();
        if self.open_playlist_id.is_some() && self.open_playlist().is_none() {
            self.open_playlist_id = None;
        }
        let len = self.playlists.len();
        if let Some(picker) = self.playlist_picker.as_mut() {
            picker.selected = picker.selected.min(len.saturating_sub(1));
        }
    }
}
