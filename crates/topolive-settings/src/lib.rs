//! Layered configuration for the topolive client.
//!
//! Settings are loaded from compiled defaults, deep-merged with
//! `~/.topolive/settings.json`, then overridden by `TOPOLIVE_*` env vars.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{
    LoggingSettings, NotificationSettings, ServerSettings, SessionSettings, TopoliveSettings,
};
