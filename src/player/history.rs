//! Turns the engine's playhead into listening-history entries.

use crate::provider::HistoryEntry;
use crate::track::TrackId;

#[derive(Debug)]
struct Listen {
    track_id: TrackId,
    played: f64,
}

/// Follows one listen at a time. A listen ends when the track changes,
/// the queue runs out, or playback stops.
#[derive(Debug)]
pub(super) struct ListenTracker {
    min_secs: f64,
    current: Option<Listen>,
}

impl ListenTracker {
    pub(super) fn new(min_secs: f64) -> Self {
        Self {
            min_secs,
            current: None,
        }
    }

    /// Feed the current track (`None` once idle) and playhead. Returns the
    /// entry for a listen this observation ended, when it counts.
    pub(super) fn observe(
        &mut self,
        current: Option<&TrackId>,
        position: f64,
        playing: bool,
    ) -> Option<HistoryEntry> {
        if let (Some(listen), Some(id)) = (self.current.as_mut(), current) {
            if &listen.track_id == id {
                if playing && position.is_finite() {
                    listen.played = listen.played.max(position);
                }
                return None;
            }
        }

        let finished = self.finish(false);
        self.current = current.map(|id| Listen {
            track_id: id.clone(),
            played: if playing && position.is_finite() {
                position.max(0.0)
            } else {
                0.0
            },
        });
        finished
    }

    /// End the current listen. A stopped listen is recorded whatever its
    /// length.
    pub(super) fn finish(&mut self, stopped: bool) -> Option<HistoryEntry> {
        let listen = self.current.take()?;
        (stopped || listen.played >= self.min_secs)
            .then(|| HistoryEntry::now(listen.track_id, listen.played))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TrackId {
        TrackId::from(s)
    }

    #[test]
    fn long_listen_is_recorded_on_track_change() {
        let mut t = ListenTracker::new(30.0);
        assert!(t.observe(Some(&id("a")), 0.0, true).is_none());
        assert!(t.observe(Some(&id("a")), 42.0, true).is_none());

        let entry = t.observe(Some(&id("b")), 0.0, true).unwrap();
        assert_eq!(entry.track_id, id("a"));
        assert_eq!(entry.played_secs, 42.0);
    }

    #[test]
    fn skipped_track_is_not_recorded() {
        let mut t = ListenTracker::new(30.0);
        t.observe(Some(&id("a")), 5.0, true);
        assert!(t.observe(Some(&id("b")), 0.0, true).is_none());
        assert!(t.finish(false).is_none());
    }

    #[test]
    fn stop_records_short_listens() {
        let mut t = ListenTracker::new(30.0);
        t.observe(Some(&id("a")), 4.0, true);
        let entry = t.finish(true).unwrap();
        assert_eq!(entry.track_id, id("a"));
        assert_eq!(entry.played_secs, 4.0);
        assert!(t.finish(true).is_none());
    }

    #[test]
    fn paused_playhead_does_not_count_as_listening() {
        let mut t = ListenTracker::new(30.0);
        // Restored paused deep into a track.
        t.observe(Some(&id("a")), 95.0, false);
        t.observe(Some(&id("a")), 95.0, false);
        assert!(t.finish(false).is_none());
    }

    #[test]
    fn going_idle_ends_the_listen() {
        let mut t = ListenTracker::new(30.0);
        t.observe(Some(&id("a")), 118.0, true);
        let entry = t.observe(None, 0.0, false).unwrap();
        assert_eq!(entry.played_secs, 118.0);
        assert!(t.finish(false).is_none());
    }
}
