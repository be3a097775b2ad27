//! Analyze result types.

use serde::{Deserialize, Serialize};

/// Status reported when the patch touched no files.
pub const NO_DEPENDENCY: &str = "No dependency";

/// Raw document written by `gn analyze`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GnAnalyzeOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_targets: Option<Vec<String>>,

    /// Affected compile labels. Absent when GN found nothing to build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_targets: Option<Vec<String>>,

    /// Affected test labels, filtered to the requested ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_targets: Option<Vec<String>>,
}

impl GnAnalyzeOutput {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Caller-facing analyze result. Fields are declared in key order so the
/// serialized document is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResult {
    /// Ninja targets to compile.
    pub compile_targets: Vec<String>,

    /// Error string reported by GN, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Targets GN did not recognise, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_targets: Option<Vec<String>>,

    /// GN's status string, e.g. "Found dependency".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Requested test target names that are affected.
    pub test_targets: Vec<String>,
}

impl AnalyzeResult {
    /// Result for a patch that touched no files.
    pub fn no_dependency() -> Self {
        Self {
            status: Some(NO_DEPENDENCY.to_string()),
            ..Self::default()
        }
    }

    /// Serialize to JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}
