//! Typed config document and its load-time validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::format::{DocumentFormat, UniqueMap};
use crate::paths::SOURCE_ROOT_PREFIX;

/// Keys a mixin may carry
const MIXIN_KEYS: [&str; 3] = ["gn_args", "args_file", "cros_passthrough"];

/// What a builder (or one of its phases) resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigRef {
    /// Name of an entry in `configs`
    Config(String),

    /// Source-absolute path of a checked-in args file
    ArgsFile(String),

    /// Phase name -> config name (or args file)
    Phases(BTreeMap<String, String>),
}

impl ConfigRef {
    fn from_name(name: String) -> Self {
        if name.starts_with(SOURCE_ROOT_PREFIX) {
            ConfigRef::ArgsFile(name)
        } else {
            ConfigRef::Config(name)
        }
    }

    /// Every config or args-file name this reference can select.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            ConfigRef::Config(name) | ConfigRef::ArgsFile(name) => vec![name.as_str()],
            ConfigRef::Phases(phases) => phases.values().map(String::as_str).collect(),
        }
    }
}

/// A named fragment of GN arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mixin {
    /// Whitespace-separated `key=value` assignments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gn_args: Option<String>,

    /// Source-absolute args file to import
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args_file: Option<String>,

    /// Take GN args verbatim from the passthrough environment variable
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cros_passthrough: bool,
}

/// The whole config document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigDocument {
    /// master -> builder -> config reference
    pub masters: BTreeMap<String, BTreeMap<String, ConfigRef>>,

    /// config -> ordered mixin names
    pub configs: BTreeMap<String, Vec<String>>,

    /// mixin name -> mixin
    pub mixins: BTreeMap<String, Mixin>,
}

/// One structural or lint problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Render collected problems one per indented line.
pub(crate) fn format_problems(problems: &[ValidationError]) -> String {
    problems
        .iter()
        .map(|p| format!("\n  {}", p))
        .collect::<String>()
}

/// Errors raised while loading a config document
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(String),

    #[error("invalid document:{}", format_problems(.0))]
    Invalid(Vec<ValidationError>),
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    masters: UniqueMap<UniqueMap<RawConfigRef>>,

    #[serde(default)]
    configs: UniqueMap<Vec<String>>,

    #[serde(default)]
    mixins: UniqueMap<RawMixin>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawConfigRef {
    Name(String),
    Phases(UniqueMap<String>),
}

#[derive(Deserialize)]
struct RawMixin {
    #[serde(default)]
    gn_args: Option<String>,

    #[serde(default)]
    args_file: Option<String>,

    #[serde(default)]
    cros_passthrough: Option<bool>,

    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

impl ConfigDocument {
    /// Load and validate the document at `path`. The format follows the
    /// file extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, DocumentFormat::from_path(path))
    }

    /// Parse and validate a document.
    pub fn parse(content: &str, format: DocumentFormat) -> Result<Self, ConfigError> {
        let raw: RawDocument = format.parse(content).map_err(ConfigError::Parse)?;

        let mut problems = Vec::new();
        let doc = Self::from_raw(raw, &mut problems);
        doc.check_references(&mut problems);

        if problems.is_empty() {
            Ok(doc)
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    fn from_raw(raw: RawDocument, problems: &mut Vec<ValidationError>) -> Self {
        let masters = raw
            .masters
            .into_inner()
            .into_iter()
            .map(|(master, builders)| {
                let builders = builders
                    .into_inner()
                    .into_iter()
                    .map(|(builder, config)| {
                        let config = match config {
                            RawConfigRef::Name(name) => ConfigRef::from_name(name),
                            RawConfigRef::Phases(phases) => ConfigRef::Phases(phases.into_inner()),
                        };
                        (builder, config)
                    })
                    .collect();
                (master, builders)
            })
            .collect();

        let mut mixins = BTreeMap::new();
        for (name, raw_mixin) in raw.mixins.into_inner() {
            for key in raw_mixin.other.keys() {
                if key == "mixins" {
                    problems.push(ValidationError::new(format!(
                        "Mixin \"{}\" declares nested mixins; mixins must be flat.",
                        name
                    )));
                } else {
                    problems.push(ValidationError::new(format!(
                        "Mixin \"{}\" has unknown key \"{}\"; expected one of {}.",
                        name,
                        key,
                        MIXIN_KEYS.join(", ")
                    )));
                }
            }
            mixins.insert(
                name,
                Mixin {
                    gn_args: raw_mixin.gn_args,
                    args_file: raw_mixin.args_file,
                    cros_passthrough: raw_mixin.cros_passthrough.unwrap_or(false),
                },
            );
        }

        Self {
            masters,
            configs: raw.configs.into_inner(),
            mixins,
        }
    }

    fn check_references(&self, problems: &mut Vec<ValidationError>) {
        for (config, mixins) in &self.configs {
            for mixin in mixins {
                if !self.mixins.contains_key(mixin) {
                    problems.push(ValidationError::new(format!(
                        "Unknown mixin \"{}\" referenced by config \"{}\".",
                        mixin, config
                    )));
                }
            }
        }

        for (master, builders) in &self.masters {
            for (builder, config_ref) in builders {
                let mut check = |name: &str, location: String| {
                    if !name.starts_with(SOURCE_ROOT_PREFIX) && !self.configs.contains_key(name) {
                        problems.push(ValidationError::new(format!(
                            "Unknown config \"{}\" referenced from \"{}\".",
                            name, location
                        )));
                    }
                };
                match config_ref {
                    ConfigRef::Config(name) => check(name, format!("{}/{}", master, builder)),
                    ConfigRef::ArgsFile(_) => {}
                    ConfigRef::Phases(phases) => {
                        for (phase, name) in phases {
                            check(name, format!("{}/{}/{}", master, builder, phase));
                        }
                    }
                }
            }
        }
    }

    /// Look up a builder's config reference.
    pub fn builder(&self, master: &str, builder: &str) -> Option<&ConfigRef> {
        self.masters.get(master).and_then(|builders| builders.get(builder))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
