//! `mb isolate`

mod fixtures;

use fixtures::{argv, isolate_map, FakeTree, ISOLATE_MAP_PATH};
use metabuild::{CommandOutput, ConfigRequest, ConfigSelector, MbError, MockRunner};

fn base_unittests_tree() -> FakeTree {
    let tree = FakeTree::new();
    tree.write("out/Default/toolchain.ninja", "");
    tree.write(ISOLATE_MAP_PATH, &isolate_map("base_unittests", "//base:base_unittests", "raw"));
    tree
}

/// Answers `gn desc` with a runtime deps listing.
fn desc_runner() -> MockRunner {
    MockRunner::new().with_hook(|cmd| {
        (cmd.get(1).map(String::as_str) == Some("desc")).then(|| CommandOutput::ok("base_unittests\n"))
    })
}

#[test]
fn test_isolate_with_config() {
    let tree = base_unittests_tree();
    let runner = desc_runner();
    let request = ConfigRequest::new(ConfigSelector::config("debug_goma"));
    let (result, _) = tree.session(&runner, |s| s.isolate("//out/Default", "base_unittests", &request));
    result.unwrap();

    let gn = format!("{}/buildtools/linux64/gn", tree.root_display());
    let isolate_py = tree.path("tools/swarming_client/isolate.py").display().to_string();
    assert_eq!(
        runner.calls(),
        vec![
            argv(&[&gn, "gen", "//out/Default", "--check"]),
            argv(&[&gn, "desc", "//out/Default", "//base:base_unittests", "runtime_deps"]),
            argv(&[
                "python3",
                &isolate_py,
                "check",
                "-i",
                "out/Default/base_unittests.isolate",
                "-s",
                "out/Default/base_unittests.isolated",
            ]),
        ]
    );

    let isolate: serde_json::Value = serde_json::from_str(&tree.read("out/Default/base_unittests.isolate")).unwrap();
    assert_eq!(isolate["variables"]["files"], serde_json::json!(["base_unittests"]));
    assert!(tree.exists("out/Default/base_unittests.isolated.gen.json"));
}

#[test]
fn test_isolate_existing_build_dir() {
    let tree = base_unittests_tree();
    tree.write("out/Default/args.gn", "is_debug = True\n");
    let runner = desc_runner();
    let (result, _) = tree.session(&runner, |s| {
        s.isolate("//out/Default", "base_unittests", &ConfigRequest::default())
    });
    result.unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0][1], "desc");
    assert_eq!(calls[1][2], "check");

    // Run again over the files the first pass wrote.
    let (result, _) = tree.session(&runner, |s| {
        s.isolate("//out/Default", "base_unittests", &ConfigRequest::default())
    });
    result.unwrap();
}

#[test]
fn test_isolate_requires_build_dir_or_config() {
    let tree = FakeTree::new();
    tree.write(ISOLATE_MAP_PATH, &isolate_map("base_unittests", "//base:base_unittests", "raw"));
    let runner = MockRunner::new();
    let (result, _) = tree.session(&runner, |s| {
        s.isolate("//out/Default", "base_unittests", &ConfigRequest::default())
    });
    let err = result.unwrap_err();
    assert!(matches!(err, MbError::MissingBuildConfig));
    assert!(err.to_string().starts_with("Must either specify a path to an existing GN build dir"));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_isolate_check_failure() {
    let tree = base_unittests_tree();
    let runner = MockRunner::new().with_hook(|cmd| match cmd.get(2).map(String::as_str) {
        Some("check") => Some(CommandOutput::failed(2)),
        _ => None,
    });
    let (result, out) = tree.session(&runner, |s| {
        s.isolate("//out/Default", "base_unittests", &ConfigRequest::default())
    });
    assert!(matches!(result, Err(MbError::Isolate { status: 2 })));
    assert!(out.contains("  -> returned 2"));
}

#[test]
fn test_isolate_console_test_launcher_wraps_command() {
    let tree = FakeTree::new();
    tree.write("out/Default/toolchain.ninja", "");
    tree.write("out/Default/args.gn", "is_asan = true\n");
    let runner = MockRunner::new().with_hook(|cmd| {
        (cmd.get(1).map(String::as_str) == Some("desc")).then(|| CommandOutput::ok("foo_unittests\n"))
    });
    let (result, _) = tree.session(&runner, |s| {
        s.isolate("//out/Default", "foo_unittests", &ConfigRequest::default())
    });
    result.unwrap();

    let isolate: serde_json::Value = serde_json::from_str(&tree.read("out/Default/foo_unittests.isolate")).unwrap();
    assert_eq!(
        isolate["variables"]["command"],
        serde_json::json!([
            "../../testing/test_env.py",
            "./foo_unittests",
            "--test-launcher-bot-mode",
            "--asan=1",
            "--msan=0",
            "--tsan=0",
            "--cfi-diag=0"
        ])
    );
    assert_eq!(
        isolate["variables"]["files"],
        serde_json::json!(["../../.vpython", "../../testing/test_env.py", "foo_unittests"])
    );
}
