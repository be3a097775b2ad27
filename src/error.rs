//! Top-level error type for `mb` subcommands.

use std::io;
use std::path::PathBuf;

use crate::config::{format_problems, ConfigError, ValidationError};
use crate::gn::GnArgsError;
use crate::isolate::IsolateMapError;
use crate::resolve::phase::PhaseError;
use crate::resolve::ResolveError;
use crate::runner::RunnerError;
use crate::settings::SettingsError;

/// Errors that end an invocation
#[derive(Debug, thiserror::Error)]
pub enum MbError {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("mb config file {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("mb config file {path} has problems:{}", format_problems(.problems))]
    ConfigProblems {
        path: String,
        problems: Vec<ValidationError>,
    },

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("args file \"{0}\" not found")]
    ArgsFileNotFound(String),

    #[error("args file \"{0}\" imports itself")]
    ImportCycle(String),

    #[error(transparent)]
    GnArgs(#[from] GnArgsError),

    #[error(transparent)]
    IsolateMap(#[from] IsolateMapError),

    #[error(transparent)]
    Analyze(#[from] mb_analyze::AnalyzeError),

    #[error("invalid analyze input {}: {source}", .path.display())]
    AnalyzeInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("GN failed with status {status}")]
    Generator { status: i32 },

    #[error("isolate failed with status {status}")]
    Isolate { status: i32 },

    #[error(
        "Must either specify a path to an existing GN build dir or pass in a -m/-b pair or a -c flag to specify the configuration"
    )]
    MissingBuildConfig,

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MbError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        1
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MbError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for subcommands
pub type MbResult<T> = Result<T, MbError>;
