//! Analyze request documents.

use serde::{Deserialize, Serialize};

use crate::label::to_source_absolute;

/// Caller-facing analyze request, read from the input JSON file.
///
/// All three keys are required; a missing key is a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Changed files, relative to the source root.
    pub files: Vec<String>,

    /// Test target names (isolate-map keys).
    pub test_targets: Vec<String>,

    /// Extra compile targets, e.g. `all`.
    pub additional_compile_targets: Vec<String>,
}

impl AnalyzeRequest {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether the patch touched any file at all.
    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    /// Names GN should be asked to build, used for the union fallback.
    pub fn requested_targets(&self) -> impl Iterator<Item = &String> {
        self.test_targets
            .iter()
            .chain(self.additional_compile_targets.iter())
    }

    /// Whether `all` was among the requested targets.
    pub fn requests_all(&self) -> bool {
        self.requested_targets().any(|t| t == "all")
    }
}

/// Request document handed to `gn analyze`, with targets already mapped to
/// GN labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GnAnalyzeInput {
    /// Source-absolute changed files (`//` prefixed)
    pub files: Vec<String>,

    /// Test target labels
    pub test_targets: Vec<String>,

    /// Additional compile target labels
    pub additional_compile_targets: Vec<String>,
}

impl GnAnalyzeInput {
    /// Build the GN request from the caller's request and pre-mapped labels.
    pub fn new(
        request: &AnalyzeRequest,
        test_labels: Vec<String>,
        compile_labels: Vec<String>,
    ) -> Self {
        Self {
            files: request.files.iter().map(|f| to_source_absolute(f)).collect(),
            test_targets: test_labels,
            additional_compile_targets: compile_labels,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
