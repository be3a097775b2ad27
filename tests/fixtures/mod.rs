//! Test fixtures for subcommand tests
//!
//! Provides a throwaway source tree seeded with a config document, an
//! isolate map and a bot args file, plus helpers to drive a [`Session`]
//! against it and capture what it printed.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use metabuild::{CommandRunner, MbResult, Platform, Session, Settings, SourceTree};
use tempfile::TempDir;

/// Config document covering plain, goma, args-file, passthrough and
/// multi-phase builders.
pub const TEST_CONFIG: &str = r#"
[masters.chromium]

[masters.fake_master]
fake_builder = "rel_bot"
fake_debug_builder = "debug_goma"
fake_simplechrome_builder = "cros_chrome_sdk"
fake_args_bot = "//build/args/bots/fake_master/fake_args_bot.gn"
fake_args_file = "args_file_goma"
fake_args_file_twice = "args_file_twice"

[masters.fake_master.fake_multi_phase]
phase_1 = "phase_1"
phase_2 = "phase_2"

[configs]
args_file_goma = ["args_file", "goma"]
args_file_twice = ["args_file", "args_file"]
cros_chrome_sdk = ["cros_chrome_sdk"]
rel_bot = ["rel", "goma", "fake_feature1"]
debug_goma = ["debug", "goma"]
phase_1 = ["phase_1"]
phase_2 = ["phase_2"]

[mixins.cros_chrome_sdk]
cros_passthrough = true

[mixins.fake_feature1]
gn_args = "enable_doom_melon=true"

[mixins.goma]
gn_args = "use_goma=true"

[mixins.args_file]
args_file = "//build/args/fake.gn"

[mixins.phase_1]
gn_args = "phase=1"

[mixins.phase_2]
gn_args = "phase=2"

[mixins.rel]
gn_args = "is_debug=false"

[mixins.debug]
gn_args = "is_debug=true"
"#;

/// Config document that fails `validate`
pub const TEST_BAD_CONFIG: &str = r#"
[configs]
rel_bot_1 = ["rel", "chrome_with_codecs"]
rel_bot_2 = ["rel", "bad_nested_config"]

[masters.chromium]
a = "rel_bot_1"
b = "rel_bot_2"

[mixins.chrome_with_codecs]
gn_args = "proprietary_codecs=true"

[mixins.bad_nested_config]
mixins = ["chrome_with_codecs"]

[mixins.rel]
gn_args = "is_debug=false"
"#;

/// Config document with try servers and a regular master
pub const TRYSERVER_CONFIG: &str = r#"
[masters.not_a_tryserver]
fake_builder = "fake_config"

[masters."tryserver.chromium.linux"]
try_builder = "fake_config"

[masters."tryserver.chromium.mac"]
try_builder2 = "fake_config"

[configs]
fake_config = []

[mixins]
"#;

/// Default isolate map contents
pub const TEST_ISOLATE_MAP: &str = r#"{
  "foo_unittests": {
    "label": "//foo:foo_unittests",
    "type": "console_test_launcher",
    "args": []
  }
}"#;

pub const CONFIG_PATH: &str = "tools/mb/mb_config.toml";
pub const ISOLATE_MAP_PATH: &str = "testing/buildbot/gn_isolate_map.json";
pub const ARGS_BOT_PATH: &str = "build/args/bots/fake_master/fake_args_bot.gn";

/// Isolate map with a single target of the given type
pub fn isolate_map(target: &str, label: &str, kind: &str) -> String {
    format!(
        r#"{{"{}": {{"label": "{}", "type": "{}", "args": []}}}}"#,
        target, label, kind
    )
}

/// A temporary source checkout
pub struct FakeTree {
    dir: TempDir,
    platform: Platform,
}

impl FakeTree {
    pub fn new() -> Self {
        Self::with_platform(Platform::Linux)
    }

    pub fn win() -> Self {
        Self::with_platform(Platform::Win)
    }

    fn with_platform(platform: Platform) -> Self {
        let tree = Self {
            dir: TempDir::new().unwrap(),
            platform,
        };
        tree.write(CONFIG_PATH, TEST_CONFIG);
        tree.write(ISOLATE_MAP_PATH, TEST_ISOLATE_MAP);
        tree.write(ARGS_BOT_PATH, "is_debug = false\n");
        tree
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn root_display(&self) -> String {
        self.root().display().to_string()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            platform: self.platform,
            ..Settings::default()
        }
    }

    /// Run `f` against a fresh session; returns its result and the output.
    pub fn session<F>(&self, runner: &dyn CommandRunner, f: F) -> (MbResult<()>, String)
    where
        F: FnOnce(&mut Session<'_>) -> MbResult<()>,
    {
        self.session_with(self.settings(), runner, |s| s, f)
    }

    /// Like [`FakeTree::session`], with custom settings and session setup.
    pub fn session_with<F, S>(
        &self,
        settings: Settings,
        runner: &dyn CommandRunner,
        setup: S,
        f: F,
    ) -> (MbResult<()>, String)
    where
        S: for<'a> FnOnce(Session<'a>) -> Session<'a>,
        F: FnOnce(&mut Session<'_>) -> MbResult<()>,
    {
        let mut out = Vec::new();
        let result = {
            let tree = SourceTree::new(self.root(), self.platform);
            let mut session = setup(Session::new(tree, settings, runner, &mut out));
            f(&mut session)
        };
        (result, String::from_utf8(out).unwrap())
    }
}

/// Owned argv, for comparing against recorded calls
pub fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}
