//! Configuration schema and loader.
//!
//! Settings come from an optional TOML file overlaid by `ENCORE__*`
//! environment variables; every field has a default.

mod load;
mod schema;

pub use load::{default_config_path, resolve_config_path, state_home};
pub use schema::*;

#[cfg(test)]
mod tests;
