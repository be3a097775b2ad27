//! Config resolution
//!
//! Expands a config's mixin chain into one [`ResolvedSettings`] bundle.
//! Phase selection (which config a builder means) lives in [`phase`].

pub mod phase;

use regex_lite::Regex;
use serde::Serialize;

use crate::config::ConfigDocument;

/// Merged settings for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedSettings {
    /// Space-joined `key=value` fragments, or the passthrough value verbatim
    pub gn_args: String,

    /// Args file imported ahead of `gn_args`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args_file: Option<String>,

    /// Whether `gn_args` came from the passthrough environment variable
    pub cros_passthrough: bool,

    /// Mixins applied, in order
    pub mixins: Vec<String>,
}

impl ResolvedSettings {
    /// Settings for a builder that points straight at an args file.
    pub fn from_args_file(path: impl Into<String>) -> Self {
        Self {
            args_file: Some(path.into()),
            ..Self::default()
        }
    }

    /// Settings read back from an existing build directory's `args.gn`.
    pub fn from_gn_args(gn_args: impl Into<String>) -> Self {
        Self {
            gn_args: gn_args.into(),
            ..Self::default()
        }
    }
}

/// GN arguments supplied by the environment for passthrough configs
#[derive(Debug, Clone, Copy)]
pub struct Passthrough<'a> {
    /// Variable name, for error messages
    pub var: &'a str,

    /// Its value, if set
    pub value: Option<&'a str>,
}

impl<'a> Passthrough<'a> {
    pub fn new(var: &'a str, value: Option<&'a str>) -> Self {
        Self { var, value }
    }

    /// No passthrough value available.
    pub fn unset(var: &'a str) -> Self {
        Self { var, value: None }
    }

    fn require(&self) -> Result<&'a str, ResolveError> {
        let value = self.value.ok_or_else(|| ResolveError::MissingPassthrough {
            var: self.var.to_string(),
        })?;
        let target_os = Regex::new(r#"target_os.*=.*"chromeos""#).unwrap();
        if !target_os.is_match(value) {
            return Err(ResolveError::PassthroughTargetOs {
                var: self.var.to_string(),
                value: value.to_string(),
            });
        }
        Ok(value)
    }
}

/// Errors raised while expanding a config
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Config \"{0}\" not found")]
    UnknownConfig(String),

    #[error("Unknown mixin \"{mixin}\" referenced by config \"{config}\"")]
    UnknownMixin { mixin: String, config: String },

    #[error("args_file specified multiple times in mixins for config \"{config}\"")]
    DuplicateArgsFile { config: String },

    #[error("expected {var} to be set in the environment")]
    MissingPassthrough { var: String },

    #[error("{var} is missing target_os = \"chromeos\": ({var}={value})")]
    PassthroughTargetOs { var: String, value: String },
}

/// Expand `config` without consulting the passthrough value. Passthrough
/// configs come back with empty `gn_args` and `cros_passthrough` set.
pub fn flatten_config(doc: &ConfigDocument, config: &str) -> Result<ResolvedSettings, ResolveError> {
    let mixins = doc
        .configs
        .get(config)
        .ok_or_else(|| ResolveError::UnknownConfig(config.to_string()))?;

    let mut resolved = ResolvedSettings::default();
    for name in mixins {
        let mixin = doc.mixins.get(name).ok_or_else(|| ResolveError::UnknownMixin {
            mixin: name.clone(),
            config: config.to_string(),
        })?;
        resolved.mixins.push(name.clone());

        if mixin.cros_passthrough {
            resolved.cros_passthrough = true;
        }
        if let Some(args_file) = &mixin.args_file {
            if resolved.args_file.is_some() {
                return Err(ResolveError::DuplicateArgsFile {
                    config: config.to_string(),
                });
            }
            resolved.args_file = Some(args_file.clone());
        }
        if let Some(gn_args) = &mixin.gn_args {
            if !resolved.gn_args.is_empty() {
                resolved.gn_args.push(' ');
            }
            resolved.gn_args.push_str(gn_args);
        }
    }

    Ok(resolved)
}

/// Expand `config`, substituting the passthrough value when any mixin asks
/// for it.
pub fn resolve_config(
    doc: &ConfigDocument,
    config: &str,
    passthrough: Passthrough<'_>,
) -> Result<ResolvedSettings, ResolveError> {
    let mut resolved = flatten_config(doc, config)?;
    if resolved.cros_passthrough {
        resolved.gn_args = passthrough.require()?.to_string();
    }
    Ok(resolved)
}
