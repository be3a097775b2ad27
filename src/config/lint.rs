//! Checks behind `mb validate` that go beyond load-time validation.

use std::collections::{BTreeMap, BTreeSet};

use super::document::{ConfigDocument, ValidationError};
use crate::paths::SOURCE_ROOT_PREFIX;

/// Master whose builders publish artifacts
pub const PUBLIC_ARTIFACT_MASTER: &str = "chromium";

/// Mixin that public artifact builders must not pull in
pub const CODECS_MIXIN: &str = "chrome_with_codecs";

/// Lint a loaded document.
///
/// `args_file_exists` answers whether a source-absolute args file exists in
/// the checkout.
pub fn lint(doc: &ConfigDocument, args_file_exists: impl Fn(&str) -> bool) -> Vec<ValidationError> {
    let mut problems = Vec::new();

    // config (or args file) -> first master referencing it
    let mut referenced: BTreeMap<&str, &str> = BTreeMap::new();
    for (master, builders) in &doc.masters {
        for config_ref in builders.values() {
            for name in config_ref.targets() {
                referenced.entry(name).or_insert(master.as_str());
            }
        }
    }

    for (name, master) in &referenced {
        if name.starts_with(SOURCE_ROOT_PREFIX) && !args_file_exists(name) {
            problems.push(ValidationError::new(format!(
                "Unknown args file \"{}\" referenced from \"{}\".",
                name, master
            )));
        }
    }

    for config in doc.configs.keys() {
        if !referenced.contains_key(config.as_str()) {
            problems.push(ValidationError::new(format!("Unused config \"{}\".", config)));
        }
    }

    let used_mixins: BTreeSet<&str> = doc.configs.values().flatten().map(String::as_str).collect();
    for mixin in doc.mixins.keys() {
        if !used_mixins.contains(mixin.as_str()) {
            problems.push(ValidationError::new(format!("Unreferenced mixin \"{}\".", mixin)));
        }
    }

    if let Some(builders) = doc.masters.get(PUBLIC_ARTIFACT_MASTER) {
        for (builder, config_ref) in builders {
            let has_codecs = config_ref
                .targets()
                .into_iter()
                .filter_map(|name| doc.configs.get(name))
                .flatten()
                .any(|mixin| mixin == CODECS_MIXIN);
            if has_codecs {
                problems.push(ValidationError::new(format!(
                    "Public artifact builder \"{}\" can not contain the \"{}\" mixin.",
                    builder, CODECS_MIXIN
                )));
            }
        }
    }

    problems
}
