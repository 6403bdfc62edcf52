//! Named, ordered track lists.
//!
//! User playlists live in the state file and can be edited. Album
//! playlists are derived from library tags on every scan and are
//! read-only.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::track::TrackId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaylistId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlaylistKind {
    /// Created by the listener; stored in the state file.
    #[default]
    User,
    /// One per album tag found in the library.
    Album,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Play order. Ids the library no longer has are skipped on resolve.
    #[serde(default)]
    pub tracks: Vec<TrackId>,
    #[serde(skip)]
    pub kind: PlaylistKind,
}

impl Playlist {
    pub fn new(id: PlaylistId, name: impl Into<String>, kind: PlaylistKind) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            tracks: Vec::new(),
            kind,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.kind == PlaylistKind::User
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.contains(id)
    }
}
