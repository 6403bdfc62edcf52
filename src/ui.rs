//! Terminal rendering with `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::time::Duration;

use crate::app::App;
use crate::config::{ControlsSettings, TimeField, UiSettings};
use crate::engine::{PlayerState, RepeatMode};
use crate::library::track_display;
use crate::player::PlaybackSnapshot;
use crate::playlist::{Playlist, PlaylistKind};

const LIKED_MARK: &str = "♥ ";

/// Footer help, in display order.
fn controls_text(controls: &ControlsSettings) -> String {
    let volume_pct = (controls.volume_step * 100.0).round() as u32;
    [
        "[j/k] up/down".to_string(),
        "[h/l] prev/next song".to_string(),
        format!("[H/L] scrub -/+{}s", controls.scrub_seconds),
        "[enter] play selected".to_string(),
        "[space/p] play/pause".to_string(),
        "[x] stop".to_string(),
        format!("[+/-] volume ±{volume_pct}%"),
        "[gg/G] top/bottom".to_string(),
        "[/] filter".to_string(),
        "[f] like".to_string(),
        "[F] liked only".to_string(),
        "[P] playlists".to_string(),
        "[d] remove from playlist".to_string(),
        "[esc] back to library".to_string(),
        "[s] shuffle".to_string(),
        "[r] repeat".to_string(),
        "[c] follow".to_string(),
        "[K] metadata".to_string(),
        "[q] quit".to_string(),
    ]
    .join(" | ")
}

/// Format seconds as `MM:SS`.
fn format_mmss(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) as u64 } else { 0 };
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn playlist_label(playlist: &Playlist) -> String {
    let count = playlist.tracks.len();
    match playlist.kind {
        PlaylistKind::User => format!("{} ({count})", playlist.name),
        PlaylistKind::Album => match &playlist.description {
            Some(artist) => format!("{} [album, {artist}] ({count})", playlist.name),
            None => format!("{} [album] ({count})", playlist.name),
        },
    }
}

fn repeat_label(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::Off => "REPEAT: Off",
        RepeatMode::All => "REPEAT: All",
        RepeatMode::One => "REPEAT: One",
    }
}

/// Elapsed/total/remaining per `UiSettings`. Fields needing the total are
/// skipped while the duration is unknown.
fn now_playing_time_text(elapsed: f64, total: f64, ui: &UiSettings) -> Option<String> {
    let total = (total > 0.0).then_some(total);
    let parts: Vec<String> = ui
        .now_playing_time_fields
        .iter()
        .filter_map(|f| match f {
            TimeField::Elapsed => Some(format_mmss(elapsed)),
            TimeField::Total => total.map(format_mmss),
            TimeField::Remaining => total.map(|t| format!("-{}", format_mmss(t - elapsed))),
        })
        .collect();

    (!parts.is_empty()).then(|| parts.join(&ui.now_playing_time_separator))
}

fn status_text(app: &App, ui: &UiSettings) -> String {
    let snap: &PlaybackSnapshot = &app.playback;
    let mut parts: Vec<String> = Vec::new();

    parts.push(if app.follow_playback {
        " CURSOR: Follow".to_string()
    } else {
        " CURSOR: Free-roam".to_string()
    });
    parts.push(repeat_label(snap.repeat).to_string());

    let q = app.filter_query.trim();
    if app.filter_mode || !q.is_empty() {
        parts.push(format!("FILTER: {q}").trim_end().to_string());
    }
    if let Some(playlist) = app.open_playlist() {
        parts.push(format!("PLAYLIST: {}", playlist.name));
    }
    if app.liked_only {
        parts.push("VIEW: Liked".to_string());
    }

    if let Some(track) = &snap.track {
        let song = track_display(
            track,
            &ui.now_playing_track_fields,
            &ui.now_playing_track_separator,
        );
        match now_playing_time_text(snap.position, snap.duration, ui) {
            Some(time) => parts.push(format!("Song: {song} [{time}]")),
            None => parts.push(format!("Song: {song}")),
        }
    }
    parts.push(snap.state.label().to_string());

    parts.push(format!(
        "Shuffle: {}",
        if snap.shuffle { "ON" } else { "OFF" }
    ));
    parts.push(format!("Vol: {}%", (snap.volume * 100.0).round() as u32));

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {dir}"));
    }

    parts.join(" • ")
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// `M:SS (Ns)`, rounding partial seconds up.
fn format_duration_mmss_ceil(d: Duration) -> String {
    if d.is_zero() {
        return "-".to_string();
    }
    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }
    format!("{}:{:02} ({}s)", total_secs / 60, total_secs % 60, total_secs)
}

fn left_padded() -> Padding {
    Padding {
        left: 1,
        right: 0,
        top: 0,
        bottom: 0,
    }
}

/// Uppercase the chars at `positions` so matches stand out without colour.
fn emphasise(label: &str, positions: &[usize]) -> String {
    label
        .chars()
        .enumerate()
        .flat_map(|(i, ch)| {
            let up = positions.contains(&i);
            let chars: Vec<char> = if up {
                ch.to_uppercase().collect()
            } else {
                vec![ch]
            };
            chars
        })
        .collect()
}

/// Render the entire UI into `frame`.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    display: &[usize],
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" encore ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let mut status_par = Paragraph::new(status_text(app, ui_settings))
        .block(Block::bordered().padding(left_padded()).title(" status "))
        .wrap(Wrap { trim: true });
    if app.playback.state == PlayerState::Error {
        status_par = status_par.red();
    }
    frame.render_widget(status_par, chunks[1]);

    // Main list: only build items for the window around the selection.
    {
        let q = app.filter_query.trim();
        let now_playing = app.now_playing_index();

        let total = display.len();
        let list_height = chunks[2].height as usize;
        let sel_pos = display.iter().position(|&i| i == app.selected).unwrap_or(0);
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = display[start..end]
            .iter()
            .map(|&i| {
                let label = &app.entries[i].display;
                let text = if q.is_empty() {
                    label.clone()
                } else {
                    emphasise(label, &App::highlight_positions(label, q))
                };
                let mark = if app.is_liked(i) { LIKED_MARK } else { "  " };
                let item = ListItem::new(format!("{mark}{text}"));
                if Some(i) == now_playing {
                    item.bold()
                } else {
                    item
                }
            })
            .collect();

        let title = match (app.open_playlist(), app.liked_only) {
            (Some(p), true) => format!(" {} (liked) ", p.name),
            (Some(p), false) => format!(" {} ", p.name),
            (None, true) => " liked ".to_string(),
            (None, false) => " tracks ".to_string(),
        };
        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    if app.metadata_window {
        let popup_area = centered_rect_sized(72, 10, chunks[2]);
        frame.render_widget(Clear, popup_area);

        let meta = match app.selected_entry() {
            Some(entry) => {
                let t = &entry.track;
                format!(
                    "Title: {}\nArtist: {}\nAlbum: {}\nDuration: {}\nPath: {}\nCover: {}",
                    t.title,
                    if t.artist.is_empty() { "-" } else { &t.artist },
                    t.album.as_deref().unwrap_or("-"),
                    format_duration_mmss_ceil(t.duration),
                    entry.path.display(),
                    t.cover_url.as_deref().unwrap_or("-"),
                )
            }
            None => "No track selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(
                Block::default()
                    .padding(left_padded())
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    if let Some(picker) = &app.playlist_picker {
        let popup_area = centered_rect_sized(64, 14, chunks[2]);
        frame.render_widget(Clear, popup_area);

        let items: Vec<ListItem> = app
            .playlists()
            .iter()
            .map(|p| ListItem::new(playlist_label(p)))
            .collect();
        let title = match &picker.new_name {
            Some(name) => format!(" new playlist: {name}_ "),
            None => " playlists: [enter] open [a] add [n] new [D] delete ".to_string(),
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if !app.playlists().is_empty() {
            state.select(Some(picker.selected));
        }
        frame.render_stateful_widget(list, popup_area, &mut state);
    }

    let footer = Paragraph::new(controls_text(controls_settings))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(left_padded()),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}
