//! Isolate maps: swarming target name -> GN label and test type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use super::IsolateMapError;
use crate::format::{DocumentFormat, UniqueMap};
use crate::paths::SOURCE_ROOT_PREFIX;

/// How a target is launched on a bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Raw,
    Script,
    ConsoleTestLauncher,
    Fuzzer,
}

impl FromStr for TargetType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(TargetType::Raw),
            "script" => Ok(TargetType::Script),
            "console_test_launcher" => Ok(TargetType::ConsoleTestLauncher),
            "fuzzer" => Ok(TargetType::Fuzzer),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetType::Raw => "raw",
            TargetType::Script => "script",
            TargetType::ConsoleTestLauncher => "console_test_launcher",
            TargetType::Fuzzer => "fuzzer",
        };
        f.write_str(name)
    }
}

/// One isolate map entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolateMapEntry {
    /// GN label of the target
    pub label: String,

    /// Declared test type; unknown types load but cannot be packaged
    #[serde(rename = "type")]
    pub kind: String,

    /// Script run by `script` targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Extra arguments appended to the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Binary name when it differs from the target name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    /// `group` when the label names a GN group rather than a binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_type: Option<String>,
}

impl IsolateMapEntry {
    /// The parsed test type, or an error naming `target`.
    pub fn target_type(&self, target: &str) -> Result<TargetType, IsolateMapError> {
        self.kind.parse().map_err(|_| IsolateMapError::UnsupportedType {
            target: target.to_string(),
            kind: self.kind.clone(),
        })
    }

    pub fn is_group(&self) -> bool {
        self.label_type.as_deref() == Some("group")
    }
}

/// All isolate maps of an invocation, merged
#[derive(Debug, Clone, Default)]
pub struct IsolateMap {
    entries: BTreeMap<String, IsolateMapEntry>,
}

impl IsolateMap {
    /// Load and merge map files. A target may only be defined once across
    /// all of them, even if the definitions are identical.
    pub fn load_all(paths: &[PathBuf]) -> Result<Self, IsolateMapError> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            documents.push((path.clone(), Self::load_file(path)?));
        }
        Self::merge(documents)
    }

    fn load_file(path: &Path) -> Result<BTreeMap<String, IsolateMapEntry>, IsolateMapError> {
        if !path.exists() {
            return Err(IsolateMapError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| IsolateMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map: UniqueMap<IsolateMapEntry> = DocumentFormat::from_path(path)
            .parse(&content)
            .map_err(|message| IsolateMapError::Parse {
                path: path.to_path_buf(),
                message,
            })?;
        debug!(path = %path.display(), targets = map.0.len(), "loaded isolate map");
        Ok(map.into_inner())
    }

    /// Merge already-parsed documents, rejecting duplicate target names.
    pub fn merge(
        documents: Vec<(PathBuf, BTreeMap<String, IsolateMapEntry>)>,
    ) -> Result<Self, IsolateMapError> {
        let mut entries = BTreeMap::new();
        let mut duplicates = Vec::new();
        for (_, document) in documents {
            for (target, entry) in document {
                if entries.contains_key(&target) {
                    duplicates.push(target);
                } else {
                    entries.insert(target, entry);
                }
            }
        }

        if duplicates.is_empty() {
            Ok(Self { entries })
        } else {
            duplicates.sort();
            duplicates.dedup();
            Err(IsolateMapError::DuplicateTargets(duplicates))
        }
    }

    pub fn get(&self, target: &str) -> Option<&IsolateMapEntry> {
        self.entries.get(target)
    }

    /// Look up a target that must be present and packageable.
    pub fn entry(&self, target: &str) -> Result<(&IsolateMapEntry, TargetType), IsolateMapError> {
        let entry = self
            .get(target)
            .ok_or_else(|| IsolateMapError::UnknownTarget(target.to_string()))?;
        Ok((entry, entry.target_type(target)?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map target names to GN labels. `all` and labels already in `//`
    /// form pass through. Every unmappable target is reported.
    pub fn map_targets_to_labels<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<String>, IsolateMapError> {
        let mut labels = Vec::with_capacity(targets.len());
        let mut problems = Vec::new();

        for target in targets {
            let target = target.as_ref();
            if target == "all" || target.starts_with(SOURCE_ROOT_PREFIX) {
                labels.push(target.to_string());
                continue;
            }
            match self.entry(target) {
                Ok((entry, _)) => labels.push(entry.label.clone()),
                Err(e) => problems.push(e.to_string()),
            }
        }

        if problems.is_empty() {
            Ok(labels)
        } else {
            Err(IsolateMapError::UnmappedTargets(problems))
        }
    }
}
