//! Tool settings
//!
//! Settings are merged from four layers, later layers winning:
//! 1. Built-in defaults
//! 2. Host file (`~/.config/mb/settings.toml`)
//! 3. Repo file (`<src_root>/.mb/settings.toml`)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{AnalyzeSettings, EffectiveSettings, Settings, SettingsError, SettingsOrigin, SettingsSource};
pub use merge::{deep_merge, merge_layers};
