//! Presentation model shared by the TUI and the runtime.

mod model;

pub use model::*;
