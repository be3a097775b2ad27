//! Translation of `gn analyze` output into caller-facing target names.
//!
//! GN answers in labels (`//foo:foo_unittests`); callers asked in isolate-map
//! names (`foo_unittests`) and ninja targets. The translator maps one onto the
//! other and falls back to "build everything that was asked for" whenever a
//! precise answer cannot be expressed safely.

mod label;
mod request;
mod result;

pub use label::{has_toolchain, strip_root, to_source_absolute};
pub use request::{AnalyzeRequest, GnAnalyzeInput};
pub use result::{AnalyzeResult, GnAnalyzeOutput, NO_DEPENDENCY};

use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Windows caps a command line at 8k; stay below that with some headroom.
pub const DEFAULT_MAX_CMDLINE_LEN: usize = 7 * 1024;

/// Map from a requested test target's GN label back to its requested name.
pub type LabelMap = BTreeMap<String, String>;

/// Build a [`LabelMap`] from parallel label/name lists. Later pairs win.
pub fn label_map(labels: &[String], targets: &[String]) -> LabelMap {
    labels
        .iter()
        .cloned()
        .zip(targets.iter().cloned())
        .collect()
}

/// Why precise translation was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// The compile target list would not fit on a command line.
    CommandLineTooLong { len: usize, limit: usize },
    /// A label lives in a non-default toolchain.
    NonDefaultToolchain { label: String },
}

impl std::fmt::Display for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::CommandLineTooLong { len, limit } => write!(
                f,
                "too many compile targets were affected ({} bytes, limit {}); building everything instead",
                len, limit
            ),
            Fallback::NonDefaultToolchain { label } => write!(
                f,
                "target {} is in a non-default toolchain; building everything instead",
                label
            ),
        }
    }
}

/// Outcome of a translation.
#[derive(Debug, Clone)]
pub struct Translation {
    pub result: AnalyzeResult,
    pub fallback: Option<Fallback>,
}

/// Errors for analyze translation
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("GN returned test label \"{0}\" that was not requested")]
    UnrequestedTestLabel(String),

    #[error("failed to parse GN analyze output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Analyze translator
#[derive(Debug, Clone)]
pub struct Translator {
    max_cmdline_len: usize,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    /// Create a translator with the default command-line budget.
    pub fn new() -> Self {
        Self {
            max_cmdline_len: DEFAULT_MAX_CMDLINE_LEN,
        }
    }

    /// Override the command-line budget.
    pub fn with_max_cmdline_len(mut self, max_cmdline_len: usize) -> Self {
        self.max_cmdline_len = max_cmdline_len;
        self
    }

    /// Translate GN's analyze output for `request`.
    ///
    /// `test_labels` maps each requested test target's label back to the name
    /// the caller used.
    pub fn translate(
        &self,
        request: &AnalyzeRequest,
        test_labels: &LabelMap,
        raw: GnAnalyzeOutput,
    ) -> Result<Translation, AnalyzeError> {
        let test_targets = match &raw.test_targets {
            Some(labels) => {
                let names = labels
                    .iter()
                    .map(|label| {
                        test_labels
                            .get(label)
                            .cloned()
                            .ok_or_else(|| AnalyzeError::UnrequestedTestLabel(label.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                dedup(names)
            }
            None => Vec::new(),
        };

        let (compile_targets, fallback) = match &raw.compile_targets {
            Some(labels) => self.translate_compile_targets(request, labels),
            None => (Vec::new(), None),
        };

        Ok(Translation {
            result: AnalyzeResult {
                compile_targets,
                error: raw.error,
                invalid_targets: raw.invalid_targets,
                status: raw.status,
                test_targets,
            },
            fallback,
        })
    }

    fn translate_compile_targets(
        &self,
        request: &AnalyzeRequest,
        labels: &[String],
    ) -> (Vec<String>, Option<Fallback>) {
        let short_names = dedup(labels.iter().map(|l| strip_root(l).to_string()));

        let len = short_names.join(" ").len();
        if len > self.max_cmdline_len {
            let fallback = Fallback::CommandLineTooLong {
                len,
                limit: self.max_cmdline_len,
            };
            return (requested_union(request), Some(fallback));
        }

        if let Some(label) = labels.iter().find(|l| has_toolchain(l)) {
            let fallback = Fallback::NonDefaultToolchain {
                label: label.clone(),
            };
            return (requested_union(request), Some(fallback));
        }

        // Every default-toolchain target is a dependency of "all".
        if request.requests_all() && labels.iter().any(|l| l == "all") {
            return (vec!["all".to_string()], None);
        }

        (short_names, None)
    }
}

/// Sorted, de-duplicated union of everything the caller asked for.
fn requested_union(request: &AnalyzeRequest) -> Vec<String> {
    request
        .requested_targets()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
