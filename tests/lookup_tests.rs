//! `mb lookup`, `export` and `gerrit-buildbucket-config`

mod fixtures;

use fixtures::{FakeTree, TRYSERVER_CONFIG};
use metabuild::resolve::phase::PhaseError;
use metabuild::{ArgsExtras, ConfigRequest, ConfigSelector, LookupMode, MbError, MockRunner};

fn lookup(tree: &FakeTree, request: ConfigRequest, mode: LookupMode) -> (Result<(), MbError>, String) {
    let runner = MockRunner::new();
    tree.session(&runner, |s| s.lookup(&request, mode))
}

#[test]
fn test_lookup_config() {
    let tree = FakeTree::new();
    let (result, out) = lookup(&tree, ConfigRequest::new(ConfigSelector::config("debug_goma")), LookupMode::Full);
    result.unwrap();
    assert!(out.contains("is_debug = true\nuse_goma = true\n"));
}

#[test]
fn test_lookup_goma_dir_expansion() {
    let tree = FakeTree::new();
    let request = ConfigRequest::new(ConfigSelector::config("rel_bot")).with_extras(ArgsExtras {
        goma_dir: Some("/foo".to_string()),
        ..ArgsExtras::default()
    });
    let (result, out) = lookup(&tree, request, LookupMode::Full);
    result.unwrap();

    let expected = format!(
        "\nWriting \"\"\"\\\n\
         enable_doom_melon = true\n\
         goma_dir = \"/foo\"\n\
         is_debug = false\n\
         use_goma = true\n\
         \"\"\" to _path_/args.gn.\n\n\
         {}/buildtools/linux64/gn gen _path_\n",
        tree.root_display()
    );
    assert_eq!(out, expected);
}

#[test]
fn test_lookup_quiet_prints_only_args() {
    let tree = FakeTree::new();
    let (result, out) = lookup(&tree, ConfigRequest::new(ConfigSelector::config("rel_bot")), LookupMode::Quiet);
    result.unwrap();
    assert_eq!(out, "enable_doom_melon = true\nis_debug = false\nuse_goma = true\n");
}

#[test]
fn test_lookup_recursive_inlines_args_file() {
    let tree = FakeTree::new();
    tree.write("build/args/fake.gn", "import(\"//build/args/base.gn\")\nis_debug = false\n");
    tree.write("build/args/base.gn", "is_component_build = true\nuse_goma = false\n");

    let request = ConfigRequest::new(ConfigSelector::builder("fake_master", "fake_args_file"));
    let (result, out) = lookup(&tree, request, LookupMode::Recursive);
    result.unwrap();
    assert_eq!(out, "is_component_build = true\nis_debug = false\nuse_goma = true\n");
}

#[test]
fn test_lookup_recursive_detects_import_cycle() {
    let tree = FakeTree::new();
    tree.write("build/args/fake.gn", "import(\"//build/args/fake.gn\")\n");

    let request = ConfigRequest::new(ConfigSelector::config("args_file_goma"));
    let (result, _) = lookup(&tree, request, LookupMode::Recursive);
    assert!(matches!(result, Err(MbError::ImportCycle(path)) if path == "//build/args/fake.gn"));
}

#[test]
fn test_lookup_simplechrome_uses_passthrough() {
    let tree = FakeTree::new();
    let runner = MockRunner::new();
    let request = ConfigRequest::new(ConfigSelector::config("cros_chrome_sdk"));
    let (result, out) = tree.session_with(
        tree.settings(),
        &runner,
        |s| s.with_passthrough(Some("is_chromeos=1 target_os=\"chromeos\"".to_string())),
        |s| s.lookup(&request, LookupMode::Quiet),
    );
    result.unwrap();
    assert_eq!(out, "is_chromeos = 1\ntarget_os = \"chromeos\"\n");
}

#[test]
fn test_lookup_simplechrome_without_passthrough_fails() {
    let tree = FakeTree::new();
    let (result, _) = lookup(&tree, ConfigRequest::new(ConfigSelector::config("cros_chrome_sdk")), LookupMode::Full);
    assert!(matches!(result, Err(MbError::Resolve(_))));
}

#[test]
fn test_lookup_args_bot() {
    let tree = FakeTree::new();
    let request = ConfigRequest::new(ConfigSelector::builder("fake_master", "fake_args_bot"));
    let (result, out) = lookup(&tree, request, LookupMode::Quiet);
    result.unwrap();
    assert_eq!(out, "import(\"//build/args/bots/fake_master/fake_args_bot.gn\")\n");
}

#[test]
fn test_lookup_missing_args_bot_file() {
    let tree = FakeTree::new();
    std::fs::remove_file(tree.path(fixtures::ARGS_BOT_PATH)).unwrap();
    let request = ConfigRequest::new(ConfigSelector::builder("fake_master", "fake_args_bot"));
    let (result, _) = lookup(&tree, request, LookupMode::Quiet);
    assert!(matches!(result, Err(MbError::ArgsFileNotFound(_))));
}

#[test]
fn test_multiple_phases() {
    let tree = FakeTree::new();
    let multi = || ConfigSelector::builder("fake_master", "fake_multi_phase");

    let (result, _) = lookup(&tree, ConfigRequest::new(multi()), LookupMode::Full);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("Must specify a build --phase"));

    let selector = ConfigSelector::builder("fake_master", "fake_builder").with_phase("phase_1");
    let (result, _) = lookup(&tree, ConfigRequest::new(selector), LookupMode::Full);
    let err = result.unwrap_err();
    assert!(matches!(err, MbError::Phase(PhaseError::PhaseNotAllowed { .. })));
    assert!(err.to_string().contains("Must not specify a build --phase"));

    let (result, _) = lookup(&tree, ConfigRequest::new(multi().with_phase("wrong_phase")), LookupMode::Full);
    assert!(result.unwrap_err().to_string().contains("Phase wrong_phase doesn't exist"));

    let (result, out) = lookup(&tree, ConfigRequest::new(multi().with_phase("phase_1")), LookupMode::Full);
    result.unwrap();
    assert!(out.contains("phase = 1"));

    let (result, out) = lookup(&tree, ConfigRequest::new(multi().with_phase("phase_2")), LookupMode::Full);
    result.unwrap();
    assert!(out.contains("phase = 2"));
}

#[test]
fn test_lookup_unknown_config() {
    let tree = FakeTree::new();
    let (result, _) = lookup(&tree, ConfigRequest::new(ConfigSelector::config("nope")), LookupMode::Full);
    let err = result.unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("\"nope\""));
}

#[test]
fn test_export() {
    let tree = FakeTree::new();
    tree.write(
        fixtures::CONFIG_PATH,
        &fixtures::TEST_CONFIG.replace("fake_args_file_twice = \"args_file_twice\"\n", ""),
    );
    let runner = MockRunner::new();
    let (result, out) = tree.session(&runner, |s| s.export());
    result.unwrap();

    let exported: serde_json::Value = serde_json::from_str(&out).unwrap();
    let fake_master = &exported["fake_master"];
    assert_eq!(fake_master["fake_builder"], "is_debug=false use_goma=true enable_doom_melon=true");
    assert_eq!(fake_master["fake_args_bot"], "//build/args/bots/fake_master/fake_args_bot.gn");
    assert_eq!(fake_master["fake_multi_phase"]["phase_1"], "phase=1");
    assert_eq!(fake_master["fake_multi_phase"]["phase_2"], "phase=2");
    assert_eq!(exported["chromium"], serde_json::json!({}));
    assert!(out.ends_with("}\n"));
}

#[test]
fn test_export_rejects_duplicate_args_file() {
    let tree = FakeTree::new();
    let runner = MockRunner::new();
    let (result, out) = tree.session(&runner, |s| s.export());
    assert!(matches!(result, Err(MbError::Resolve(_))));
    assert!(out.is_empty());
}

#[test]
fn test_buildbucket_config() {
    let tree = FakeTree::new();
    tree.write(fixtures::CONFIG_PATH, TRYSERVER_CONFIG);
    let runner = MockRunner::new();
    let (result, out) = tree.session(&runner, |s| s.buildbucket_config());
    result.unwrap();
    assert_eq!(
        out,
        "# This file was generated using \"mb gerrit-buildbucket-config\".\n\
         [bucket \"master.tryserver.chromium.linux\"]\n\
         \tbuilder = try_builder\n\
         [bucket \"master.tryserver.chromium.mac\"]\n\
         \tbuilder = try_builder2\n"
    );
}
