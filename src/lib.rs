//! encore: a terminal music player built around a queue-driven playback
//! engine.
//!
//! The engine (`engine`) is backend-agnostic and drives any `MediaBackend`;
//! `player` runs it on a dedicated thread, and `runtime` wires it to the
//! TUI, the library and MPRIS.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod library;
pub mod logging;
pub mod media;
pub mod mpris;
pub mod player;
pub mod playlist;
pub mod provider;
pub mod runtime;
pub mod track;
pub mod ui;
