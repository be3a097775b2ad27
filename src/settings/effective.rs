//! Effective settings with provenance
//!
//! Merges the settings layers and deserializes the result into [`Settings`],
//! recording which files contributed and their digests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::paths::Platform;

/// Origin of a settings layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SettingsOrigin {
    Builtin,
    Host,
    Repo,
    Cli,
}

/// A contributing settings layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSource {
    pub origin: SettingsOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Analyze tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeSettings {
    /// Longest joined compile-target list kept before falling back
    pub max_cmdline_len: usize,
}

/// Typed view of the merged settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub config_file: String,

    pub isolate_map_files: Vec<String>,

    pub python: String,

    pub isolate_script: String,

    /// Explicit GN binary; defaults to the copy under `buildtools/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gn_path: Option<String>,

    pub passthrough_env: String,

    #[serde(default)]
    pub platform: Platform,

    pub analyze: AnalyzeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            config_file: defaults.config_file,
            isolate_map_files: defaults.isolate_map_files,
            python: defaults.python,
            isolate_script: defaults.isolate_script,
            gn_path: None,
            passthrough_env: defaults.passthrough_env,
            platform: Platform::host(),
            analyze: AnalyzeSettings {
                max_cmdline_len: defaults.max_cmdline_len,
            },
        }
    }
}

/// Merged settings plus the layers they came from
#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub settings: Settings,

    /// Contributing layers in precedence order
    pub sources: Vec<SettingsSource>,
}

impl EffectiveSettings {
    /// Build effective settings from layers. Missing files are skipped.
    pub fn build(
        host_path: Option<&Path>,
        repo_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, SettingsError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![SettingsSource {
            origin: SettingsOrigin::Builtin,
            path: None,
            digest: None,
        }];

        for (origin, path) in [(SettingsOrigin::Host, host_path), (SettingsOrigin::Repo, repo_path)] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let (value, digest) = Self::load_toml_file(path)?;
            debug!(path = %path.display(), digest = %digest, "loaded settings layer");
            layers.push(value);
            sources.push(SettingsSource {
                origin,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(SettingsSource {
                origin: SettingsOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let settings: Settings = serde_json::from_value(merged)
            .map_err(|e| SettingsError::Parse(format!("invalid settings: {}", e)))?;
        Self::validate(&settings)?;

        Ok(Self { settings, sources })
    }

    fn load_toml_file(path: &Path) -> Result<(Value, String), SettingsError> {
        let bytes = fs::read(path).map_err(|e| SettingsError::Io(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| SettingsError::Parse(format!("Invalid UTF-8: {}", e)))?;
        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| SettingsError::Parse(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }

    fn validate(settings: &Settings) -> Result<(), SettingsError> {
        if settings.isolate_map_files.is_empty() {
            return Err(SettingsError::Validation(
                "isolate_map_files must name at least one file".to_string(),
            ));
        }
        if settings.analyze.max_cmdline_len == 0 {
            return Err(SettingsError::Validation(
                "analyze.max_cmdline_len must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
