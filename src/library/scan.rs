use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::track::{Track, TrackId};

use super::LibraryEntry;
use super::display::display_from_fields;

const COVER_NAMES: [&str; 4] = ["cover.jpg", "cover.png", "folder.jpg", "folder.png"];

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Id = path relative to the scan root, `/`-separated.
fn track_id(root: &Path, path: &Path) -> TrackId {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    TrackId::from(parts.join("/"))
}

fn cover_for(path: &Path) -> Option<String> {
    let dir = path.parent()?;
    COVER_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .map(|p| p.to_string_lossy().into_owned())
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

struct Tags {
    title: String,
    artist: Option<String>,
    album: Option<String>,
    duration: Duration,
}

fn read_tags(path: &Path) -> Tags {
    let mut tags = Tags {
        title: path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string(),
        artist: None,
        album: None,
        duration: Duration::ZERO,
    };

    let tagged = match lofty::read_from_path(path) {
        Ok(t) => t,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable tags");
            return tags;
        }
    };
    tags.duration = tagged.properties().duration();

    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        let non_empty = |v: Option<std::borrow::Cow<'_, str>>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        if let Some(title) = non_empty(tag.title()) {
            tags.title = title;
        }
        tags.artist = non_empty(tag.artist());
        tags.album = non_empty(tag.album());
    }
    tags
}

/// Walk `dir` per `settings` and return entries sorted by display label.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<LibraryEntry> {
    let mut entries: Vec<LibraryEntry> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file()
            || (!settings.include_hidden && is_hidden(path))
            || !is_audio_file(path, settings)
        {
            continue;
        }

        let tags = read_tags(path);
        let display = display_from_fields(
            path,
            &tags.title,
            tags.artist.as_deref(),
            tags.album.as_deref(),
            &settings.display_fields,
            &settings.display_separator,
        );

        let track = Track {
            id: track_id(dir, path),
            title: tags.title,
            artist: tags.artist.unwrap_or_default(),
            album: tags.album,
            duration: tags.duration,
            audio_url: absolute(path).to_string_lossy().into_owned(),
            cover_url: cover_for(path),
        };

        entries.push(LibraryEntry {
            track: Arc::new(track),
            path: path.to_path_buf(),
            display,
        });
    }

    entries.sort_by_key(|e| e.display.to_lowercase());
    info!(dir = %dir.display(), tracks = entries.len(), "library scanned");
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackDisplayField;
    use std::fs;
    use tempfile::tempdir;

    fn displays(entries: &[LibraryEntry]) -> Vec<String> {
        entries.iter().map(|e| e.display.clone()).collect()
    }

    #[test]
    fn is_audio_file_matches_configured_extensions_case_insensitive() {
        let settings = LibrarySettings::default();
        assert!(is_audio_file(Path::new("/tmp/a.mp3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.MP3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.flac"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a.txt"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a"), &settings));
    }

    #[test]
    fn scan_filters_non_audio_and_sorts_by_display_case_insensitive() {
        let dir = tempdir().unwrap();

        fs::write(dir.path().join("b.MP3"), b"not a real mp3").unwrap();
        fs::write(dir.path().join("A.ogg"), b"not a real ogg").unwrap();
        fs::write(dir.path().join("c.txt"), b"ignore me").unwrap();

        let settings = LibrarySettings {
            display_fields: vec![TrackDisplayField::Title],
            ..LibrarySettings::default()
        };
        let entries = scan(dir.path(), &settings);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].track.title, "A");
        assert_eq!(entries[0].display, "A");
        assert_eq!(entries[1].track.title, "b");
        assert_eq!(entries[1].track.artist, "");
    }

    #[test]
    fn ids_are_relative_paths_and_urls_are_absolute() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("album");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("song.mp3"), b"not real").unwrap();

        let entries = scan(dir.path(), &LibrarySettings::default());
        let track = &entries[0].track;
        assert_eq!(track.id, TrackId::from("album/song.mp3"));
        assert!(Path::new(&track.audio_url).is_absolute());
        assert!(track.audio_url.ends_with("song.mp3"));
    }

    #[test]
    fn cover_art_next_to_the_file_is_picked_up() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("song.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"jpeg").unwrap();

        let entries = scan(dir.path(), &LibrarySettings::default());
        let cover = entries[0].track.cover_url.as_deref().unwrap();
        assert!(cover.ends_with("cover.jpg"));
    }

    #[test]
    fn scan_respects_include_hidden_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hidden.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("visible.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            include_hidden: false,
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        };
        let entries = scan(dir.path(), &settings);

        assert_eq!(displays(&entries), vec!["visible"]);
    }

    #[test]
    fn scan_respects_recursive_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("child.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            recursive: false,
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        };
        let entries = scan(dir.path(), &settings);
        assert_eq!(displays(&entries), vec!["root"]);
    }

    #[test]
    fn scan_respects_max_depth() {
        let dir = tempdir().unwrap();
        let d1 = dir.path().join("d1");
        let d2 = d1.join("d2");
        fs::create_dir_all(&d2).unwrap();
        fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
        fs::write(d1.join("one.mp3"), b"not real").unwrap();
        fs::write(d2.join("two.mp3"), b"not real").unwrap();

        // Root is depth 0, so 2 reaches d1/* but not d1/d2/*.
        let settings = LibrarySettings {
            max_depth: Some(2),
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        };
        let names = displays(&scan(dir.path(), &settings));

        assert!(names.contains(&"root".to_string()));
        assert!(names.contains(&"one".to_string()));
        assert!(!names.contains(&"two".to_string()));
    }
}
