//! Typed publish/subscribe for playback and library changes.
//!
//! Subscribers receive every event published after they subscribed. A
//! subscriber that drops its receiver is pruned on the next publish.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::engine::{PlayerState, RepeatMode};
use crate::track::{Track, TrackId};

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StateChanged(PlayerState),
    TrackChanged(Option<Arc<Track>>),
    TimeUpdate(f64),
    DurationChanged(f64),
    VolumeChanged(f32),
    RepeatChanged(RepeatMode),
    ShuffleChanged(bool),
    /// The active queue was replaced or reordered; carries its length.
    QueueChanged(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    LikeToggled { track_id: TrackId, liked: bool },
    /// A user playlist was created, edited or deleted.
    PlaylistsChanged,
}

/// Cloneable handle to a set of subscribers.
pub struct EventBus<E> {
    subscribers: Arc<Mutex<Vec<Sender<E>>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    pub fn publish(&self, event: E) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}
