//! GN label helpers.

/// Prefix GN uses for source-root-relative labels and paths.
pub const SOURCE_ROOT_PREFIX: &str = "//";

/// Returns true when the label names a target in a non-default toolchain,
/// e.g. `//foo:foo_unittests(//build/toolchain:bar)`.
///
/// Ninja only has phony targets for the default toolchain, so such a label
/// cannot be reduced to a plain compile target.
pub fn has_toolchain(label: &str) -> bool {
    label.contains('(')
}

/// Strip the leading `//` from a label, yielding the ninja target name.
pub fn strip_root(label: &str) -> &str {
    label.strip_prefix(SOURCE_ROOT_PREFIX).unwrap_or(label)
}

/// Express a changed file as a source-absolute GN path.
pub fn to_source_absolute(path: &str) -> String {
    if path.starts_with(SOURCE_ROOT_PREFIX) {
        path.to_string()
    } else {
        format!("{}{}", SOURCE_ROOT_PREFIX, path)
    }
}
