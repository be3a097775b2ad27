//! Source-tree paths and host platform conventions.
//!
//! GN paths are written source-absolute (`//out/Default`). Filesystem access
//! goes through native [`PathBuf`]s, while paths handed to external tools are
//! rendered with the target platform's separator.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of a source-absolute path
pub const SOURCE_ROOT_PREFIX: &str = "//";

/// Platform the build runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Mac,
    Win,
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Win
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Linux
        }
    }

    pub fn is_win(self) -> bool {
        self == Platform::Win
    }

    /// Path separator used when rendering paths for tools.
    pub fn sep(self) -> char {
        if self.is_win() {
            '\\'
        } else {
            '/'
        }
    }

    /// Suffix of executables produced by the build.
    pub fn exe_suffix(self) -> &'static str {
        if self.is_win() {
            ".exe"
        } else {
            ""
        }
    }

    /// `(buildtools subdirectory, binary name)` of the bundled GN.
    pub fn gn_binary(self) -> (&'static str, &'static str) {
        match self {
            Platform::Linux => ("linux64", "gn"),
            Platform::Mac => ("mac", "gn"),
            Platform::Win => ("win", "gn.exe"),
        }
    }
}

/// A checkout rooted at `root`.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
    platform: Platform,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The source root as handed to tools.
    pub fn root_display(&self) -> String {
        self.root.display().to_string()
    }

    /// Join components onto the rendered source root.
    pub fn render_under_root(&self, components: &[&str]) -> String {
        let sep = self.platform.sep();
        let mut rendered = self.root_display();
        for component in components {
            if !rendered.ends_with(sep) {
                rendered.push(sep);
            }
            rendered.push_str(component);
        }
        rendered
    }

    /// Path relative to the source root, rendered with the platform
    /// separator. Paths outside the root are returned unchanged.
    pub fn to_src_rel(&self, path: &str) -> String {
        let sep = self.platform.sep().to_string();
        if let Some(rest) = path.strip_prefix(SOURCE_ROOT_PREFIX) {
            return rest.replace('/', &sep);
        }
        match Path::new(path).strip_prefix(&self.root) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(&sep),
            Err(_) => path.to_string(),
        }
    }

    /// Filesystem location of a source-absolute, absolute, or
    /// root-relative path.
    pub fn to_abs(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix(SOURCE_ROOT_PREFIX) {
            let mut abs = self.root.clone();
            abs.extend(rest.split('/').filter(|c| !c.is_empty()));
            return abs;
        }
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }

    /// Filesystem location of `rel` (slash separated) inside a build dir.
    pub fn build_file(&self, build_dir: &str, rel: &str) -> PathBuf {
        let mut path = self.to_abs(build_dir);
        path.extend(rel.split('/').filter(|c| !c.is_empty()));
        path
    }

    /// Source-relative rendering of a file directly inside a build dir.
    pub fn build_rel(&self, build_dir: &str, file: &str) -> String {
        let dir = self.to_src_rel(build_dir);
        format!("{}{}{}", dir.trim_end_matches(self.platform.sep()), self.platform.sep(), file)
    }
}
