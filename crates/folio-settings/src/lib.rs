//! # folio-settings
//!
//! Configuration management with layered sources for the Folio assistant.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`FolioSettings::default()`]
//! 2. **User file**: `~/.folio/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `FOLIO_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    deep_merge, folio_home, load_settings, load_settings_from_path, read_settings_file,
    settings_path,
};
pub use types::*;
