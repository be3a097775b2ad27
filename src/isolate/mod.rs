//! Isolate packaging for swarming targets
//!
//! For each target the packager locates the runtime deps GN wrote, builds
//! the command the bot should run, and produces two files in the build dir:
//! `<target>.isolate` and `<target>.isolated.gen.json`.

mod manifest;
mod map;

pub use manifest::{GenRequest, IsolateManifest, IsolateVariables};
pub use map::{IsolateMap, IsolateMapEntry, TargetType};

use std::path::PathBuf;

use tracing::warn;

use crate::gn::GnArgs;
use crate::paths::{SourceTree, SOURCE_ROOT_PREFIX};

/// Launcher used by test-launcher and script targets
const TEST_ENV: &str = "../../testing/test_env.py";

/// Files every wrapped command needs besides its runtime deps
const WRAPPER_FILES: [&str; 2] = ["../../.vpython", TEST_ENV];

/// Isolate map and packaging errors
#[derive(Debug, thiserror::Error)]
pub enum IsolateMapError {
    #[error("isolate map file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read isolate map file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse isolate map file \"{}\": {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Duplicate targets in isolate map files: {}.", .0.join(", "))]
    DuplicateTargets(Vec<String>),

    #[error("target \"{0}\" not found in the isolate maps")]
    UnknownTarget(String),

    #[error("target \"{target}\" has unsupported type \"{kind}\"")]
    UnsupportedType { target: String, kind: String },

    #[error("Failed to match targets to isolate maps:{}", .0.iter().map(|p| format!("\n  {}", p)).collect::<String>())]
    UnmappedTargets(Vec<String>),

    #[error("script target \"{0}\" does not name a script")]
    MissingScript(String),

    #[error("Did not generate any of {}", .0.join(", "))]
    MissingRuntimeDeps(Vec<String>),

    #[error("failed to read runtime deps {}: {source}", .path.display())]
    RuntimeDepsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Build properties that change how a target is packaged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildFlavor {
    pub is_win: bool,
    pub is_android: bool,
    pub asan: bool,
    pub msan: bool,
    pub tsan: bool,
    pub cfi_diag: bool,
}

impl BuildFlavor {
    /// Derive the flavor from the build's GN args. Unparseable args are
    /// logged and treated as empty.
    pub fn from_gn_args(gn_args: &str, host_is_win: bool) -> Self {
        let args = GnArgs::parse(gn_args).unwrap_or_else(|e| {
            warn!(error = %e, "could not parse GN args; packaging with defaults");
            GnArgs::default()
        });
        let target_os = args.string_value("target_os");
        Self {
            is_win: host_is_win || target_os == Some("win"),
            is_android: target_os == Some("android"),
            asan: args.is_true("is_asan"),
            msan: args.is_true("is_msan"),
            tsan: args.is_true("is_tsan"),
            cfi_diag: args.is_true("use_cfi_diag"),
        }
    }

    fn exe_suffix(&self) -> &'static str {
        if self.is_win {
            ".exe"
        } else {
            ""
        }
    }
}

/// Command line and support files for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolateCommand {
    pub command: Vec<String>,
    pub extra_files: Vec<String>,
}

fn executable(target: &str, entry: &IsolateMapEntry, flavor: &BuildFlavor) -> String {
    format!(
        "{}{}",
        entry.executable.as_deref().unwrap_or(target),
        flavor.exe_suffix()
    )
}

/// Runtime-deps files GN may have written for `target`, relative to the
/// build dir, most specific first.
pub fn runtime_deps_candidates(
    target: &str,
    entry: &IsolateMapEntry,
    target_type: TargetType,
    flavor: &BuildFlavor,
) -> Vec<String> {
    let label_path = entry
        .label
        .trim_start_matches(SOURCE_ROOT_PREFIX)
        .replace(':', "/");
    let stamp = format!("obj/{}.stamp.runtime_deps", label_path);

    if flavor.is_android {
        vec![format!("{}.runtime_deps", target), stamp]
    } else if target_type == TargetType::Script || entry.is_group() {
        vec![stamp, format!("{}.runtime_deps", executable(target, entry, flavor))]
    } else {
        vec![format!("{}.runtime_deps", executable(target, entry, flavor))]
    }
}

/// The command a bot runs for `target`.
pub fn isolate_command(
    tree: &SourceTree,
    target: &str,
    entry: &IsolateMapEntry,
    target_type: TargetType,
    flavor: &BuildFlavor,
) -> Result<IsolateCommand, IsolateMapError> {
    let binary = format!("./{}", executable(target, entry, flavor));
    let flag = |on: bool| if on { "1" } else { "0" };

    let (mut command, extra_files) = match target_type {
        TargetType::Raw | TargetType::Fuzzer => (vec![binary], vec![]),
        TargetType::ConsoleTestLauncher => (
            vec![
                TEST_ENV.to_string(),
                binary,
                "--test-launcher-bot-mode".to_string(),
                format!("--asan={}", flag(flavor.asan)),
                format!("--msan={}", flag(flavor.msan)),
                format!("--tsan={}", flag(flavor.tsan)),
                format!("--cfi-diag={}", flag(flavor.cfi_diag)),
            ],
            WRAPPER_FILES.iter().map(|f| f.to_string()).collect(),
        ),
        TargetType::Script => {
            let script = entry
                .script
                .as_deref()
                .ok_or_else(|| IsolateMapError::MissingScript(target.to_string()))?;
            (
                vec![TEST_ENV.to_string(), format!("../../{}", tree.to_src_rel(script))],
                WRAPPER_FILES.iter().map(|f| f.to_string()).collect(),
            )
        }
    };
    command.extend(entry.args.iter().cloned());

    Ok(IsolateCommand {
        command,
        extra_files,
    })
}

/// Everything written for one packaged target
#[derive(Debug, Clone)]
pub struct PackagedTarget {
    pub manifest: IsolateManifest,
    pub gen_request: GenRequest,

    /// `<build>/<target>.isolate` on disk
    pub isolate_path: PathBuf,

    /// `<build>/<target>.isolated.gen.json` on disk
    pub gen_path: PathBuf,

    /// Source-relative `.isolate` path, as passed to the isolate tool
    pub isolate_rel: String,

    /// Source-relative `.isolated` path, as passed to the isolate tool
    pub isolated_rel: String,
}

/// Assemble both packaging files for `target` from its runtime deps.
pub fn package_target(
    tree: &SourceTree,
    build_dir: &str,
    target: &str,
    entry: &IsolateMapEntry,
    target_type: TargetType,
    flavor: &BuildFlavor,
    runtime_deps: Vec<String>,
) -> Result<PackagedTarget, IsolateMapError> {
    let IsolateCommand {
        command,
        extra_files,
    } = isolate_command(tree, target, entry, target_type, flavor)?;

    let mut files = runtime_deps;
    files.extend(extra_files);

    let isolate_rel = tree.build_rel(build_dir, &format!("{}.isolate", target));
    let isolated_rel = tree.build_rel(build_dir, &format!("{}.isolated", target));

    Ok(PackagedTarget {
        manifest: IsolateManifest::new(command, files),
        gen_request: GenRequest::new(isolated_rel.clone(), isolate_rel.clone(), tree.root_display()),
        isolate_path: tree.build_file(build_dir, &format!("{}.isolate", target)),
        gen_path: tree.build_file(build_dir, &format!("{}.isolated.gen.json", target)),
        isolate_rel,
        isolated_rel,
    })
}

/// Read the first runtime-deps file GN produced for `target`.
pub fn read_runtime_deps(
    tree: &SourceTree,
    build_dir: &str,
    candidates: &[String],
) -> Result<Vec<String>, IsolateMapError> {
    let found = candidates
        .iter()
        .map(|rel| tree.build_file(build_dir, rel))
        .find(|path| path.exists());

    let Some(path) = found else {
        let rendered = candidates
            .iter()
            .map(|rel| tree.build_rel(build_dir, rel))
            .collect();
        return Err(IsolateMapError::MissingRuntimeDeps(rendered));
    };

    let content = std::fs::read_to_string(&path).map_err(|source| IsolateMapError::RuntimeDepsIo {
        path: path.clone(),
        source,
    })?;
    Ok(content.lines().map(str::to_string).collect())
}
