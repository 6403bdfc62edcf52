//! Track identity and metadata.
//!
//! A `Track` is immutable once produced by a provider. The engine holds
//! tracks behind `Arc` so queue entries reference the provider's data
//! rather than copying it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque track identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Advisory length from tags. The media backend reports the real one once loaded.
    pub duration: Duration,
    /// Playable resource locator: a filesystem path or a `file://` URL.
    pub audio_url: String,
    pub cover_url: Option<String>,
}

impl Track {
    /// Case-insensitive substring match over title and artist.
    pub fn matches(&self, query_lower: &str) -> bool {
        query_lower.is_empty()
            || self.title.to_lowercase().contains(query_lower)
            || self.artist.to_lowercase().contains(query_lower)
    }
}
