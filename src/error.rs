//! Error types shared across the crate.
//!
//! None of these escape the engine's transport operations: the engine logs
//! them and reflects failures in `PlayerState` instead.

use std::io;

use thiserror::Error;

use crate::playlist::PlaylistId;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("no media source is loaded")]
    NoSource,

    #[error("failed to open {url}")]
    Open {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("seek failed: {0}")]
    Seek(String),

    /// The backend refused to start playback (the autoplay-policy analogue).
    #[error("playback start rejected: {0}")]
    PlaybackRejected(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("state file I/O failed")]
    Io(#[from] io::Error),

    #[error("state file is malformed")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize state")]
    Serialize(#[from] toml::ser::Error),

    #[error("no editable playlist with id {0}")]
    UnknownPlaylist(PlaylistId),

    #[error("playlist name is empty")]
    EmptyPlaylistName,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] ::config::ConfigError),

    #[error("invalid setting: {0}")]
    Invalid(String),
}
