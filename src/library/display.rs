use std::path::Path;

use crate::config::TrackDisplayField;
use crate::track::Track;

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Join the requested `fields` with `sep`, skipping blanks. Falls back to
/// `title` when nothing was produced.
pub fn display_from_fields(
    path: &Path,
    title: &str,
    artist: Option<&str>,
    album: Option<&str>,
    fields: &[TrackDisplayField],
    sep: &str,
) -> String {
    let title = non_blank(Some(title));
    let mut parts: Vec<String> = Vec::new();

    for field in fields {
        let values: [Option<String>; 2] = match field {
            // "artist - title"
            TrackDisplayField::Display => [
                non_blank(artist).map(str::to_string),
                title.map(str::to_string),
            ],
            TrackDisplayField::Title => [title.map(str::to_string), None],
            TrackDisplayField::Artist => [non_blank(artist).map(str::to_string), None],
            TrackDisplayField::Album => [non_blank(album).map(str::to_string), None],
            TrackDisplayField::Filename => [
                non_blank(path.file_stem().and_then(|s| s.to_str())).map(str::to_string),
                None,
            ],
            TrackDisplayField::Path => [Some(path.display().to_string()), None],
        };
        parts.extend(values.into_iter().flatten());
    }

    if parts.is_empty() {
        title.unwrap_or_default().to_string()
    } else {
        parts.join(sep)
    }
}

/// Label for an already-built `Track`; its `audio_url` stands in for the path.
pub fn track_display(track: &Track, fields: &[TrackDisplayField], sep: &str) -> String {
    let url = track.audio_url.strip_prefix("file://").unwrap_or(&track.audio_url);
    display_from_fields(
        Path::new(url),
        &track.title,
        Some(track.artist.as_str()),
        track.album.as_deref(),
        fields,
        sep,
    )
}
