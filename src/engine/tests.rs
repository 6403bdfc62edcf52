use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::{EngineOptions, PlaybackEngine, PlayerState, RepeatMode};
use crate::events::{EventBus, PlayerEvent};
use crate::media::fake::{Call, FakeMedia};
use crate::media::{LoadId, MediaEventKind};
use crate::track::{Track, TrackId};

fn track(id: &str) -> Arc<Track> {
    Arc::new(Track {
        id: TrackId::from(id),
        title: format!("Title {id}"),
        artist: "Artist".to_string(),
        album: None,
        duration: Duration::from_secs(180),
        audio_url: format!("/music/{id}.mp3"),
        cover_url: None,
    })
}

fn engine() -> PlaybackEngine<FakeMedia> {
    let mut engine = PlaybackEngine::new(FakeMedia::new(), EventBus::new(), EngineOptions::default());
    engine.seed_shuffle(11);
    engine
}

/// Deliver `kind` for the active load and apply it.
fn fire(engine: &mut PlaybackEngine<FakeMedia>, kind: MediaEventKind) {
    engine.media_mut().emit(kind);
    engine.pump();
}

/// Walk the active load through to `Playing`.
fn ready(engine: &mut PlaybackEngine<FakeMedia>) {
    fire(engine, MediaEventKind::LoadStart);
    fire(engine, MediaEventKind::CanPlay);
}

fn ids(queue: &[Arc<Track>]) -> Vec<&str> {
    queue.iter().map(|t| t.id.as_str()).collect()
}

fn current(engine: &PlaybackEngine<FakeMedia>) -> Option<&str> {
    engine.session().current_id().map(TrackId::as_str)
}

fn abc() -> Vec<Arc<Track>> {
    vec![track("a"), track("b"), track("c")]
}

#[test]
fn starts_idle_with_default_volume() {
    let engine = engine();
    let s = engine.session();
    assert_eq!(s.player_state, PlayerState::Idle);
    assert!(s.current_track.is_none());
    assert_eq!(s.volume, 0.5);
    assert_eq!(engine.media().volume, 0.5);
}

#[test]
fn play_loads_then_plays_when_ready() {
    let mut engine = engine();
    engine.play(track("a"), None);

    assert_eq!(engine.session().player_state, PlayerState::Loading);
    assert_eq!(engine.media().current_url(), Some("/music/a.mp3"));

    ready(&mut engine);
    assert_eq!(engine.session().player_state, PlayerState::Playing);
    assert_eq!(engine.media().calls.last(), Some(&Call::Play));
}

#[test]
fn play_with_context_replaces_queue() {
    let (a, b) = (track("a"), track("b"));
    let mut engine = engine();
    engine.play(Arc::clone(&a), None);
    engine.play(Arc::clone(&b), Some(vec![a, b]));

    assert_eq!(current(&engine), Some("b"));
    assert_eq!(ids(&engine.session().queue), vec!["a", "b"]);
    assert_eq!(ids(&engine.session().original_queue), vec!["a", "b"]);
}

#[test]
fn play_without_context_outside_queue_plays_alone() {
    let mut engine = engine();
    engine.play(track("a"), Some(abc()));
    engine.play(track("z"), None);

    assert_eq!(current(&engine), Some("z"));
    assert_eq!(ids(&engine.session().queue), vec!["z"]);
}

#[test]
fn play_without_context_inside_queue_keeps_queue() {
    let mut engine = engine();
    engine.play(track("a"), Some(abc()));
    engine.play(track("c"), None);

    assert_eq!(current(&engine), Some("c"));
    assert_eq!(ids(&engine.session().queue), vec!["a", "b", "c"]);
}

#[test]
fn replaying_current_track_resumes_in_place() {
    let mut engine = engine();
    engine.play(track("a"), None);
    ready(&mut engine);
    fire(&mut engine, MediaEventKind::TimeUpdate(42.0));
    engine.pause();
    fire(&mut engine, MediaEventKind::Pause);

    engine.play(track("a"), None);

    assert_eq!(engine.media().loads(), 1);
    assert_eq!(engine.session().current_time, 42.0);
    assert_eq!(engine.media().calls.last(), Some(&Call::Play));
}

#[test]
fn replaying_a_failed_track_reloads_it() {
    let mut engine = engine();
    engine.play(track("a"), None);
    fire(&mut engine, MediaEventKind::Error("bad header".to_string()));
    assert_eq!(engine.session().player_state, PlayerState::Error);

    engine.play(track("a"), None);
    assert_eq!(engine.media().loads(), 2);
    assert_eq!(engine.session().player_state, PlayerState::Loading);
}

#[test]
fn stale_events_from_superseded_load_are_ignored() {
    let mut engine = engine();
    engine.play(track("a"), None);
    let first = engine.media().current_load();
    engine.play(track("b"), None);

    engine.media_mut().emit_for(first, MediaEventKind::Error("late".to_string()));
    engine.media_mut().emit_for(first, MediaEventKind::CanPlay);
    engine.pump();

    assert_eq!(engine.session().player_state, PlayerState::Loading);
    assert_eq!(current(&engine), Some("b"));
    assert!(!engine.media().calls.contains(&Call::Play));
}

#[test]
fn load_error_enters_error_state() {
    let mut engine = engine();
    engine.play(track("a"), None);
    fire(&mut engine, MediaEventKind::LoadStart);
    fire(&mut engine, MediaEventKind::Error("decode failed".to_string()));

    assert_eq!(engine.session().player_state, PlayerState::Error);
    assert_eq!(current(&engine), Some("a"));
}

#[test]
fn rejected_autoplay_rests_in_paused() {
    let mut engine = engine();
    engine.media_mut().reject_play = true;
    engine.play(track("a"), None);
    ready(&mut engine);

    assert_eq!(engine.session().player_state, PlayerState::Paused);
}

#[test]
fn rejected_resume_is_absorbed() {
    let mut engine = engine();
    engine.play(track("a"), None);
    ready(&mut engine);
    engine.pause();
    fire(&mut engine, MediaEventKind::Pause);

    engine.media_mut().reject_play = true;
    engine.resume();
    assert_eq!(engine.session().player_state, PlayerState::Paused);
}

#[test]
fn pause_and_resume_pass_through() {
    let mut engine = engine();
    engine.pause();
    engine.resume();
    assert!(engine.media().calls.iter().all(|c| matches!(c, Call::SetVolume(_))));

    engine.play(track("a"), None);
    ready(&mut engine);
    engine.pause();
    assert_eq!(engine.media().calls.last(), Some(&Call::Pause));
    fire(&mut engine, MediaEventKind::Pause);
    assert_eq!(engine.session().player_state, PlayerState::Paused);

    engine.resume();
    assert_eq!(engine.media().calls.last(), Some(&Call::Play));
    fire(&mut engine, MediaEventKind::Playing);
    assert_eq!(engine.session().player_state, PlayerState::Playing);
}

#[test]
fn pause_while_loading_cancels_autoplay() {
    let mut engine = engine();
    engine.play(track("a"), None);
    engine.pause();
    ready(&mut engine);

    assert_eq!(engine.session().player_state, PlayerState::Paused);
    assert!(!engine.media().calls.contains(&Call::Play));
}

#[test]
fn waiting_buffers_until_playing_again() {
    let mut engine = engine();
    engine.play(track("a"), None);
    ready(&mut engine);

    fire(&mut engine, MediaEventKind::Waiting);
    assert_eq!(engine.session().player_state, PlayerState::Buffering);
    fire(&mut engine, MediaEventKind::Playing);
    assert_eq!(engine.session().player_state, PlayerState::Playing);
}

#[test]
fn stop_clears_track_and_ignores_later_events() {
    let mut engine = engine();
    engine.play(track("a"), None);
    ready(&mut engine);
    fire(&mut engine, MediaEventKind::TimeUpdate(12.0));

    engine.stop();
    let s = engine.session();
    assert_eq!(s.player_state, PlayerState::Idle);
    assert!(s.current_track.is_none());
    assert_eq!(s.current_time, 0.0);
    assert_eq!(engine.media().position, 0.0);

    fire(&mut engine, MediaEventKind::Playing);
    assert_eq!(engine.session().player_state, PlayerState::Idle);
}

#[test]
fn seek_without_track_is_a_no_op() {
    let mut engine = engine();
    engine.seek(10.0);
    assert!(!engine.media().calls.iter().any(|c| matches!(c, Call::SetPosition(_))));
}

#[test]
fn seek_clamps_to_known_duration() {
    let mut engine = engine();
    engine.play(track("a"), None);
    fire(&mut engine, MediaEventKind::DurationChange(100.0));

    engine.seek(250.0);
    assert_eq!(engine.session().current_time, 100.0);
    engine.seek(-5.0);
    assert_eq!(engine.session().current_time, 0.0);
    engine.seek(30.0);
    assert_eq!(engine.media().position, 30.0);
}

#[test]
fn non_finite_duration_reads_as_unknown() {
    let mut engine = engine();
    engine.play(track("a"), None);
    fire(&mut engine, MediaEventKind::DurationChange(f64::INFINITY));
    assert_eq!(engine.session().duration, 0.0);
}

#[test]
fn volume_is_clamped() {
    let mut engine = engine();
    engine.set_volume(-1.0);
    assert_eq!(engine.session().volume, 0.0);
    engine.set_volume(2.0);
    assert_eq!(engine.session().volume, 1.0);
    assert_eq!(engine.media().volume, 1.0);
}

#[test]
fn nan_volume_is_ignored() {
    let mut engine = engine();
    engine.set_volume(0.3);
    engine.set_volume(f32::NAN);
    assert_eq!(engine.session().volume, 0.3);
}

#[test]
fn repeat_cycles_off_all_one() {
    let mut engine = engine();
    engine.toggle_repeat();
    assert_eq!(engine.session().repeat_mode, RepeatMode::All);
    engine.toggle_repeat();
    assert_eq!(engine.session().repeat_mode, RepeatMode::One);
    engine.toggle_repeat();
    assert_eq!(engine.session().repeat_mode, RepeatMode::Off);
}

#[test]
fn shuffle_on_anchors_current_and_keeps_the_set() {
    let pool: Vec<_> = ["a", "b", "c", "d", "e", "f"].into_iter().map(track).collect();
    let mut engine = engine();
    engine.play(Arc::clone(&pool[3]), Some(pool.clone()));

    engine.toggle_shuffle();
    let s = engine.session();
    assert!(s.is_shuffle);
    assert_eq!(s.queue[0].id, TrackId::from("d"));

    let queued: HashSet<_> = s.queue.iter().map(|t| t.id.clone()).collect();
    let original: HashSet<_> = s.original_queue.iter().map(|t| t.id.clone()).collect();
    assert_eq!(queued, original);
    assert_eq!(s.queue.len(), s.original_queue.len());
}

#[test]
fn shuffle_off_restores_original_order() {
    let mut engine = engine();
    engine.play(track("b"), Some(abc()));
    engine.toggle_shuffle();
    engine.toggle_shuffle();

    assert!(!engine.session().is_shuffle);
    assert_eq!(ids(&engine.session().queue), vec!["a", "b", "c"]);
}

#[test]
fn play_with_shuffle_on_anchors_selected_track() {
    let mut engine = engine();
    engine.toggle_shuffle();
    engine.play(track("c"), Some(abc()));

    let s = engine.session();
    assert_eq!(s.queue[0].id, TrackId::from("c"));
    assert_eq!(s.queue.len(), 3);
    assert_eq!(ids(&s.original_queue), vec!["a", "b", "c"]);
}

#[test]
fn next_advances_by_id_lookup() {
    let mut engine = engine();
    engine.play(track("a"), Some(abc()));
    engine.play_next();
    assert_eq!(current(&engine), Some("b"));
    assert_eq!(engine.session().player_state, PlayerState::Loading);
}

#[test]
fn next_at_end_wraps_with_repeat_all() {
    let mut engine = engine();
    engine.set_repeat(RepeatMode::All);
    engine.play(track("c"), Some(abc()));
    engine.play_next();

    assert_eq!(engine.session().current_id(), Some(&engine.session().queue[0].id));
}

#[test]
fn next_at_end_holds_with_repeat_off() {
    let mut engine = engine();
    engine.play(track("c"), Some(abc()));
    engine.play_next();

    assert_eq!(current(&engine), Some("c"));
    assert_eq!(engine.media().loads(), 1);
}

#[test]
fn next_without_track_is_a_no_op() {
    let mut engine = engine();
    engine.play_next();
    engine.play_prev();
    assert_eq!(engine.media().loads(), 0);
}

#[test]
fn prev_past_threshold_restarts_current() {
    let mut engine = engine();
    engine.play(track("b"), Some(abc()));
    ready(&mut engine);
    engine.media_mut().position = 4.5;

    engine.play_prev();
    assert_eq!(current(&engine), Some("b"));
    assert_eq!(engine.session().current_time, 0.0);
    assert_eq!(engine.media().position, 0.0);
    assert_eq!(engine.media().loads(), 1);
}

#[test]
fn prev_within_threshold_moves_back() {
    let mut engine = engine();
    engine.play(track("b"), Some(abc()));
    ready(&mut engine);
    engine.media_mut().position = 3.0;

    engine.play_prev();
    assert_eq!(current(&engine), Some("a"));
}

#[test]
fn prev_at_start_clamps_or_wraps() {
    let mut engine = engine();
    engine.play(track("a"), Some(abc()));
    engine.play_prev();
    assert_eq!(current(&engine), Some("a"));
    assert_eq!(engine.media().loads(), 2);

    engine.set_repeat(RepeatMode::All);
    engine.play_prev();
    assert_eq!(current(&engine), Some("c"));
}

#[test]
fn ended_with_repeat_one_restarts_same_track() {
    let mut engine = engine();
    engine.set_repeat(RepeatMode::One);
    engine.play(track("b"), Some(abc()));
    ready(&mut engine);
    fire(&mut engine, MediaEventKind::TimeUpdate(179.0));

    fire(&mut engine, MediaEventKind::Ended);
    assert_eq!(current(&engine), Some("b"));
    assert_eq!(engine.session().current_time, 0.0);
    assert_eq!(engine.media().position, 0.0);
    assert_eq!(engine.media().loads(), 1);
    assert_eq!(engine.media().calls.last(), Some(&Call::Play));
}

#[test]
fn ended_advances_to_next() {
    let mut engine = engine();
    engine.play(track("a"), Some(abc()));
    ready(&mut engine);
    fire(&mut engine, MediaEventKind::Ended);

    assert_eq!(current(&engine), Some("b"));
    ready(&mut engine);
    assert_eq!(engine.session().player_state, PlayerState::Playing);
}

#[test]
fn ended_on_last_goes_idle_with_repeat_off() {
    let mut engine = engine();
    engine.play(track("c"), Some(abc()));
    ready(&mut engine);
    fire(&mut engine, MediaEventKind::Ended);

    let s = engine.session();
    assert_eq!(s.player_state, PlayerState::Idle);
    assert_eq!(s.current_time, 0.0);
    assert_eq!(engine.media().loads(), 1);
}

#[test]
fn ended_on_last_wraps_with_repeat_all() {
    let mut engine = engine();
    engine.set_repeat(RepeatMode::All);
    engine.play(track("c"), Some(abc()));
    ready(&mut engine);
    fire(&mut engine, MediaEventKind::Ended);

    assert_eq!(current(&engine), Some("a"));
}

#[test]
fn restore_parks_paused_at_saved_position() {
    let mut engine = engine();
    engine.restore(track("a"), 37.5);
    assert_eq!(engine.session().player_state, PlayerState::Loading);

    ready(&mut engine);
    let s = engine.session();
    assert_eq!(s.player_state, PlayerState::Paused);
    assert_eq!(s.current_time, 37.5);
    assert_eq!(engine.media().position, 37.5);
    assert!(!engine.media().calls.contains(&Call::Play));
}

#[test]
fn events_are_published_for_observers() {
    let mut engine = engine();
    let rx = engine.events().subscribe();
    engine.play(track("a"), None);
    ready(&mut engine);
    engine.set_volume(0.8);

    let events: Vec<_> = rx.try_iter().collect();
    assert!(events.contains(&PlayerEvent::StateChanged(PlayerState::Loading)));
    assert!(events.contains(&PlayerEvent::StateChanged(PlayerState::Playing)));
    assert!(events.contains(&PlayerEvent::VolumeChanged(0.8)));
    assert!(events.iter().any(|e| matches!(e, PlayerEvent::TrackChanged(Some(t)) if t.id.as_str() == "a")));
}

#[test]
fn load_ids_are_monotonic() {
    let mut engine = engine();
    engine.play(track("a"), None);
    let first = engine.media().current_load();
    engine.play(track("b"), None);
    let second = engine.media().current_load();

    assert!(second > first);
    assert_ne!(first, LoadId::default());
}

#[test]
fn backends_without_a_fade_just_pause_on_fade_out() {
    use crate::media::MediaBackend;

    let mut engine = engine();
    engine.play(track("a"), None);
    ready(&mut engine);
    engine.media_mut().calls.clear();

    engine.media_mut().fade_out(Duration::from_millis(300));
    assert_eq!(engine.media().calls, vec![Call::Pause]);
}
