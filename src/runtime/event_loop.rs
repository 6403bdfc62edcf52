use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, info, warn};

use crate::app::App;
use crate::config::Settings;
use crate::events::{LibraryEvent, PlayerEvent};
use crate::mpris::{ControlCmd, MprisHandle};
use crate::player::{Player, PlayerCmd};
use crate::runtime::mpris_sync::update_mpris;
use crate::ui;

const INPUT_POLL: Duration = Duration::from_millis(50);

/// Channels and handles the loop reads from or writes to.
pub struct Wiring<'a> {
    pub player: &'a Player,
    pub mpris: &'a MprisHandle,
    pub control_tx: &'a Sender<ControlCmd>,
    pub control_rx: &'a Receiver<ControlCmd>,
    pub player_events: &'a Receiver<PlayerEvent>,
    pub library_events: &'a Receiver<LibraryEvent>,
}

/// State tracked by the event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// First half of `gg`.
    pub pending_gg: bool,
}

/// Main terminal loop: input, drawing, and syncing the player snapshot out
/// to the app and MPRIS. Returns when quit is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &Settings,
    app: &mut App,
    wiring: &Wiring<'_>,
    state: &mut EventLoopState,
) -> Result<()> {
    loop {
        while let Ok(event) = wiring.player_events.try_recv() {
            log_player_event(&event);
        }
        while let Ok(event) = wiring.library_events.try_recv() {
            app.apply_library_event(&event);
        }

        app.refresh_playback();
        update_mpris(wiring.mpris, app);

        let display = app.display_indices();
        terminal.draw(|f| ui::draw(f, app, &display, &settings.ui, &settings.controls))?;

        while let Ok(cmd) = wiring.control_rx.try_recv() {
            if handle_control_cmd(cmd, settings, app, wiring.player) {
                return Ok(());
            }
        }

        if event::poll(INPUT_POLL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, wiring, state) {
                    return Ok(());
                }
            }
        }
    }
}

fn log_player_event(event: &PlayerEvent) {
    match event {
        PlayerEvent::TrackChanged(Some(track)) => {
            info!(track = %track.id, title = %track.title, "now playing")
        }
        PlayerEvent::StateChanged(s) => debug!(state = s.label(), "player state"),
        PlayerEvent::TimeUpdate(_) => {}
        other => debug!(event = ?other, "player event"),
    }
}

fn send(player: &Player, cmd: PlayerCmd) {
    if let Err(e) = player.send(cmd) {
        warn!(cmd = ?e.0, "player thread is gone");
    }
}

/// Play the selection, or resume whatever the player holds.
fn play_or_resume(app: &App, player: &Player) {
    if app.playback.track.is_some() {
        send(player, PlayerCmd::Resume);
    } else if let Some(cmd) = app.activate_selected() {
        send(player, cmd);
    }
}

fn handle_control_cmd(cmd: ControlCmd, settings: &Settings, app: &mut App, player: &Player) -> bool {
    debug!(?cmd, "MPRIS command");
    if !app.filter_mode {
        app.follow_playback_on();
    }
    match cmd {
        ControlCmd::Quit => {
            player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return true;
        }
        ControlCmd::Play => play_or_resume(app, player),
        ControlCmd::Pause => send(player, PlayerCmd::Pause),
        ControlCmd::PlayPause => {
            if app.playback.track.is_some() {
                send(player, PlayerCmd::TogglePause);
            } else {
                play_or_resume(app, player);
            }
        }
        ControlCmd::Stop => send(player, PlayerCmd::Stop),
        ControlCmd::Next => send(player, PlayerCmd::Next),
        ControlCmd::Prev => send(player, PlayerCmd::Prev),
        ControlCmd::Seek(micros) => send(player, PlayerCmd::SeekBy(micros as f64 / 1_000_000.0)),
        ControlCmd::SetRepeat(mode) => send(player, PlayerCmd::SetRepeat(mode)),
        ControlCmd::SetShuffle(on) => {
            if on != app.playback.shuffle {
                send(player, PlayerCmd::ToggleShuffle);
            }
        }
        ControlCmd::SetVolume(v) => send(player, PlayerCmd::SetVolume(v as f32)),
    }
    false
}

fn handle_filter_key(key: KeyEvent, app: &mut App, player: &Player) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.clear_filter(),
        KeyCode::Backspace => app.pop_filter_char(),
        KeyCode::Char('j' | 'n') if ctrl => app.next(),
        KeyCode::Char('k' | 'p') if ctrl => app.prev(),
        KeyCode::Char(c) if !c.is_control() => app.push_filter_char(c),
        KeyCode::Enter => {
            if app.display_indices().is_empty() {
                return;
            }
            app.exit_filter_mode();
            app.follow_playback_on();
            if let Some(cmd) = app.activate_selected() {
                send(player, cmd);
            }
        }
        _ => {}
    }
}

fn handle_picker_key(key: KeyEvent, app: &mut App) {
    if app.is_naming_playlist() {
        match key.code {
            KeyCode::Esc => app.cancel_naming_playlist(),
            KeyCode::Backspace => app.pop_name_char(),
            KeyCode::Enter => app.create_named_playlist(),
            KeyCode::Char(c) if !c.is_control() => app.push_name_char(c),
            _ => {}
        }
        return;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('P' | 'q') => app.toggle_playlist_picker(),
        KeyCode::Char('j') | KeyCode::Down => app.picker_next(),
        KeyCode::Char('k') | KeyCode::Up => app.picker_prev(),
        KeyCode::Enter => app.open_highlighted_playlist(),
        KeyCode::Char('a') => app.add_selected_to_highlighted(),
        KeyCode::Char('n') => app.start_naming_playlist(),
        KeyCode::Char('D') => app.delete_highlighted_playlist(),
        _ => {}
    }
}

fn handle_key_event(
    key: KeyEvent,
    settings: &Settings,
    app: &mut App,
    wiring: &Wiring<'_>,
    state: &mut EventLoopState,
) -> bool {
    let player = wiring.player;
    if app.playlist_picker.is_some() {
        state.pending_gg = false;
        handle_picker_key(key, app);
        return false;
    }
    if app.filter_mode {
        state.pending_gg = false;
        handle_filter_key(key, app, player);
        return false;
    }

    let was_gg = std::mem::take(&mut state.pending_gg);
    let scrub = settings.controls.scrub_seconds as f64;
    let step = settings.controls.volume_step;

    match key.code {
        KeyCode::Char('q') => {
            player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return true;
        }
        KeyCode::Char('g') => {
            if was_gg {
                app.follow_playback_off();
                if let Some(&first) = app.display_indices().first() {
                    app.selected = first;
                }
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            if let Some(&last) = app.display_indices().last() {
                app.selected = last;
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Enter => {
            app.follow_playback_on();
            if let Some(cmd) = app.activate_selected() {
                send(player, cmd);
            }
        }
        KeyCode::Char('p' | ' ') => {
            let _ = wiring.control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => send(player, PlayerCmd::Next),
        KeyCode::Char('h') => send(player, PlayerCmd::Prev),
        KeyCode::Char('L') => send(player, PlayerCmd::SeekBy(scrub)),
        KeyCode::Char('H') => send(player, PlayerCmd::SeekBy(-scrub)),
        KeyCode::Char('+' | '=') => send(player, PlayerCmd::AdjustVolume(step)),
        KeyCode::Char('-') => send(player, PlayerCmd::AdjustVolume(-step)),
        KeyCode::Char('x') => send(player, PlayerCmd::Stop),
        KeyCode::Char('s') => send(player, PlayerCmd::ToggleShuffle),
        KeyCode::Char('r') => send(player, PlayerCmd::ToggleRepeat),
        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Char('f') => app.toggle_like_selected(),
        KeyCode::Char('F') => app.toggle_liked_only(),
        KeyCode::Char('c') => {
            if app.follow_playback {
                app.follow_playback_off();
            } else {
                app.follow_playback_on();
            }
        }
        KeyCode::Char('K') => app.toggle_metadata_window(),
        KeyCode::Char('P') => app.toggle_playlist_picker(),
        KeyCode::Char('d') => app.remove_selected_from_open(),
        KeyCode::Esc => app.close_playlist(),
        _ => {}
    }

    false
}
