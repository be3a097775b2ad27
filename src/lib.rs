//! Metabuild - CI builder to GN configuration mapping
//!
//! This crate implements `mb`, the meta-build wrapper that maps a
//! master/builder pair (or a named config) to a set of GN arguments, runs
//! `gn gen`, packages test targets for swarming, and translates
//! `gn analyze` results for the commit queue.

pub mod config;
pub mod error;
pub mod format;
pub mod gn;
pub mod isolate;
pub mod paths;
pub mod resolve;
pub mod runner;
pub mod session;
pub mod settings;

pub use config::{ConfigDocument, ConfigError, ConfigRef};
pub use error::{MbError, MbResult};
pub use gn::{ArgsExtras, GnArgs, GnTool};
pub use paths::{Platform, SourceTree};
pub use resolve::phase::ConfigSelector;
pub use resolve::ResolvedSettings;
pub use runner::{CommandOutput, CommandRunner, MockRunner, SystemRunner};
pub use session::{ConfigRequest, LookupMode, Session};
pub use settings::{EffectiveSettings, Settings};
