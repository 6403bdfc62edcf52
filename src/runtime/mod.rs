use std::env;
use std::path::Path;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::events::{EventBus, LibraryEvent};
use crate::library::scan;
use crate::logging;
use crate::media::RodioBackend;
use crate::mpris::{self, ControlCmd};
use crate::player::{Player, PlayerOptions};
use crate::provider::{LibraryProvider, StateStore};

mod event_loop;
mod mpris_sync;
mod settings;

pub fn run() -> Result<()> {
    let (settings, config_problem) = settings::load_settings();
    let _log_guard = logging::init(&settings)?;
    if let Some(e) = config_problem {
        warn!(error = %e, "config ignored, using defaults");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "encore starting");

    let dir = env::args().nth(1).unwrap_or_else(|| {
        env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "Music".to_string())
    });

    let entries = scan(Path::new(&dir), &settings.library);

    let state_path = settings
        .state_path()
        .unwrap_or_else(|| Path::new("encore-state.toml").to_path_buf());
    let store = StateStore::open(&state_path).unwrap_or_else(|e| {
        warn!(path = %state_path.display(), error = %e, "unreadable state file, starting fresh");
        StateStore::empty(&state_path)
    });
    let provider = Arc::new(LibraryProvider::new(&entries, store));

    let player = Player::spawn(
        RodioBackend::open_default,
        provider.clone(),
        PlayerOptions::from_settings(&settings),
    )
    .context("opening audio output")?;
    let player_events = player.events().subscribe();

    let library_bus = EventBus::<LibraryEvent>::new();
    let library_events = library_bus.subscribe();

    let mut app = App::new(entries, provider, library_bus);
    app.follow_playback = settings.ui.follow_playback;
    app.set_current_dir(dir);
    app.set_playback_handle(player.playback_handle());

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = mpris::spawn_mpris(control_tx.clone());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let wiring = event_loop::Wiring {
        player: &player,
        mpris: &mpris,
        control_tx: &control_tx,
        control_rx: &control_rx,
        player_events: &player_events,
        library_events: &library_events,
    };
    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(&mut terminal, &settings, &mut app, &wiring, &mut state);
    if let Err(e) = &run_result {
        warn!(error = %e, "event loop failed, shutting the player down");
    }
    // No-op after a normal quit.
    player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("encore exiting");
    run_result
}
