//! Music directory scanning.
//!
//! `scan` walks a directory and produces one `LibraryEntry` per audio file,
//! each wrapping an immutable `Track` plus the label the UI lists it under.

mod display;
mod scan;

pub use display::{display_from_fields, track_display};
pub use scan::scan;

use std::path::PathBuf;
use std::sync::Arc;

use crate::track::Track;

#[derive(Debug, Clone)]
pub struct LibraryEntry {
    pub track: Arc<Track>,
    pub path: PathBuf,
    /// List label built from `library.display_fields`.
    pub display: String,
}
