use crate::config::Settings;
use crate::error::ConfigError;

/// Load and validate settings. Config is optional: any problem falls back to
/// defaults and is handed back so it can be logged once logging is up.
pub fn load_settings() -> (Settings, Option<ConfigError>) {
    match Settings::load() {
        Ok(s) => match s.validate() {
            Ok(()) => (s, None),
            Err(e) => (Settings::default(), Some(e)),
        },
        Err(e) => (Settings::default(), Some(e)),
    }
}
