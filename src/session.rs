//! One `mb` invocation
//!
//! A [`Session`] owns the source tree, the effective settings, the command
//! runner and the output stream, and implements each subcommand on top of
//! the library modules. User-facing text (the `Writing` blocks, echoed
//! command lines) goes to the output stream; diagnostics go to `tracing`.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use mb_analyze::{label_map, AnalyzeRequest, AnalyzeResult, GnAnalyzeInput, GnAnalyzeOutput, Translator};

use crate::config::{lint, ConfigDocument, ConfigRef};
use crate::error::{MbError, MbResult};
use crate::gn::{format_command, render_args, ArgsExtras, GnArgs, GnTool};
use crate::isolate::{self, BuildFlavor, IsolateMap};
use crate::paths::{SourceTree, SOURCE_ROOT_PREFIX};
use crate::resolve::phase::{select_config, ConfigSelector, ConfigTarget};
use crate::resolve::{flatten_config, resolve_config, Passthrough, ResolvedSettings};
use crate::runner::{CommandOutput, CommandRunner};
use crate::settings::Settings;

/// Placeholder build dir used by `lookup`
const LOOKUP_PATH: &str = "_path_";

/// Master name prefix of try servers
const TRYSERVER_PREFIX: &str = "tryserver.";

/// Which config to use and the command-line additions to its args
#[derive(Debug, Clone, Default)]
pub struct ConfigRequest {
    pub selector: ConfigSelector,
    pub extras: ArgsExtras,
}

impl ConfigRequest {
    pub fn new(selector: ConfigSelector) -> Self {
        Self {
            selector,
            extras: ArgsExtras::default(),
        }
    }

    pub fn with_extras(mut self, extras: ArgsExtras) -> Self {
        self.extras = extras;
        self
    }
}

/// How `lookup` prints its answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupMode {
    /// `Writing` block plus the `gn gen` command
    #[default]
    Full,
    /// Only the args text
    Quiet,
    /// Only the args text, with args files inlined
    Recursive,
}

/// Per-invocation state
pub struct Session<'a> {
    tree: SourceTree,
    settings: Settings,
    runner: &'a dyn CommandRunner,
    out: &'a mut dyn Write,
    passthrough: Option<String>,
    dryrun: bool,
    verbose: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        tree: SourceTree,
        settings: Settings,
        runner: &'a dyn CommandRunner,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            tree,
            settings,
            runner,
            out,
            passthrough: None,
            dryrun: false,
            verbose: false,
        }
    }

    /// Value of the passthrough environment variable, if set
    pub fn with_passthrough(mut self, value: Option<String>) -> Self {
        self.passthrough = value;
        self
    }

    pub fn with_dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = dryrun;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn tree(&self) -> &SourceTree {
        &self.tree
    }

    fn gn(&self) -> GnTool {
        GnTool::for_tree(&self.tree, self.settings.gn_path.as_deref())
    }

    fn config_path(&self) -> PathBuf {
        self.tree.to_abs(&self.settings.config_file)
    }

    fn print(&mut self, text: &str) -> MbResult<()> {
        writeln!(self.out, "{}", text).map_err(MbError::Output)
    }

    fn print_raw(&mut self, text: &str) -> MbResult<()> {
        write!(self.out, "{}", text).map_err(MbError::Output)
    }

    fn print_command(&mut self, cmd: &[String]) -> MbResult<()> {
        let line = format_command(self.tree.platform(), cmd);
        self.print(&line)
    }

    /// Write `contents` to `path`, echoing it first when verbose, in dry-run
    /// mode, or when `force_verbose` is set. Dry runs do not touch the disk.
    fn write_file(&mut self, path: &Path, contents: &str, force_verbose: bool) -> MbResult<()> {
        if self.dryrun || self.verbose || force_verbose {
            self.print(&format!(
                "\nWriting \"\"\"\\\n{}\"\"\" to {}.\n",
                contents,
                path.display()
            ))?;
        }
        if self.dryrun {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MbError::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| MbError::io(path, e))
    }

    /// Echo and run `cmd` from the source root. Dry runs only echo.
    fn run(&mut self, cmd: &[String]) -> MbResult<CommandOutput> {
        self.print_command(cmd)?;
        if self.dryrun {
            return Ok(CommandOutput::default());
        }

        let output = self.runner.call(cmd, self.tree.root())?;
        if !output.success() {
            self.print(&format!("  -> returned {}", output.status))?;
        }
        if !output.stdout.is_empty() {
            self.print_raw(&output.stdout)?;
        }
        if !output.stderr.is_empty() {
            eprint!("{}", output.stderr);
        }
        Ok(output)
    }

    fn load_config(&self) -> MbResult<ConfigDocument> {
        let path = self.config_path();
        debug!(path = %path.display(), "loading config document");
        ConfigDocument::load(&path).map_err(|source| MbError::Config {
            path: path.display().to_string(),
            source,
        })
    }

    fn load_isolate_map(&self) -> MbResult<IsolateMap> {
        let paths: Vec<PathBuf> = self
            .settings
            .isolate_map_files
            .iter()
            .map(|p| self.tree.to_abs(p))
            .collect();
        Ok(IsolateMap::load_all(&paths)?)
    }

    /// Resolve the selected config into settings.
    fn lookup_settings(&self, doc: &ConfigDocument, selector: &ConfigSelector) -> MbResult<ResolvedSettings> {
        match select_config(doc, selector)? {
            ConfigTarget::Config(name) => {
                let passthrough = Passthrough::new(&self.settings.passthrough_env, self.passthrough.as_deref());
                let resolved = resolve_config(doc, &name, passthrough)?;
                info!(config = %name, mixins = ?resolved.mixins, "resolved config");
                Ok(resolved)
            }
            ConfigTarget::ArgsFile(path) => {
                if !self.tree.to_abs(&path).exists() {
                    return Err(MbError::ArgsFileNotFound(path));
                }
                Ok(ResolvedSettings::from_args_file(path))
            }
        }
    }

    /// Parse an args file, inlining its own imports first.
    fn load_args_file(&self, path: &str, chain: &mut Vec<String>) -> MbResult<GnArgs> {
        if chain.iter().any(|p| p == path) {
            return Err(MbError::ImportCycle(path.to_string()));
        }
        let abs = self.tree.to_abs(path);
        if !abs.exists() {
            return Err(MbError::ArgsFileNotFound(path.to_string()));
        }
        let text = fs::read_to_string(&abs).map_err(|e| MbError::io(&abs, e))?;
        let parsed = GnArgs::parse(&text)?;

        chain.push(path.to_string());
        let mut merged = GnArgs::new();
        for import in parsed.imports() {
            merged.extend(self.load_args_file(import, chain)?);
        }
        chain.pop();

        merged.extend(parsed);
        Ok(merged)
    }

    fn gn_args_text(&self, resolved: &ResolvedSettings, extras: &ArgsExtras, recursive: bool) -> MbResult<String> {
        let imported = match (&resolved.args_file, recursive) {
            (Some(args_file), true) => Some(self.load_args_file(args_file, &mut Vec::new())?),
            _ => None,
        };
        Ok(render_args(resolved, extras, imported)?)
    }

    /// `mb lookup`
    pub fn lookup(&mut self, request: &ConfigRequest, mode: LookupMode) -> MbResult<()> {
        let doc = self.load_config()?;
        let resolved = self.lookup_settings(&doc, &request.selector)?;
        let text = self.gn_args_text(&resolved, &request.extras, mode == LookupMode::Recursive)?;

        match mode {
            LookupMode::Quiet | LookupMode::Recursive => self.print_raw(&text),
            LookupMode::Full => {
                self.print(&format!(
                    "\nWriting \"\"\"\\\n{}\"\"\" to {}/args.gn.\n",
                    text, LOOKUP_PATH
                ))?;
                let cmd = self.gn().gen(LOOKUP_PATH, false);
                self.print_command(&cmd)
            }
        }
    }

    /// `mb gen`
    pub fn gen(&mut self, build_dir: &str, request: &ConfigRequest, swarming_targets_file: Option<&Path>) -> MbResult<()> {
        let swarming_targets = match swarming_targets_file {
            Some(path) => read_target_list(path)?,
            None => Vec::new(),
        };
        let doc = self.load_config()?;
        let resolved = self.lookup_settings(&doc, &request.selector)?;
        self.run_gn_gen(build_dir, &resolved, &request.extras, &swarming_targets)?;
        Ok(())
    }

    /// Write `args.gn`, run `gn gen`, then package any swarming targets.
    /// Returns the args text written.
    fn run_gn_gen(
        &mut self,
        build_dir: &str,
        resolved: &ResolvedSettings,
        extras: &ArgsExtras,
        swarming_targets: &[String],
    ) -> MbResult<String> {
        let text = self.gn_args_text(resolved, extras, false)?;
        let build_path = self.tree.to_abs(build_dir);
        self.write_file(&build_path.join("args.gn"), &text, true)?;

        let mut cmd = self.gn().gen(build_dir, true);
        let mut isolate_map = None;
        if !swarming_targets.is_empty() {
            let map = self.load_isolate_map()?;
            let labels = map.map_targets_to_labels(swarming_targets)?;
            let deps_list = build_path.join("runtime_deps");
            self.write_file(&deps_list, &format!("{}\n", labels.join("\n")), false)?;
            cmd.push(format!("--runtime-deps-list-file={}", deps_list.display()));
            isolate_map = Some(map);
        }

        let output = self.run(&cmd)?;
        if !output.success() {
            self.print(&format!("GN gen failed: {}", output.status))?;
            return Err(MbError::Generator { status: output.status });
        }

        if let (Some(map), false) = (isolate_map, self.dryrun) {
            let flavor = BuildFlavor::from_gn_args(&text, self.tree.platform().is_win());
            for target in swarming_targets {
                let (entry, target_type) = map.entry(target)?;
                let candidates = isolate::runtime_deps_candidates(target, entry, target_type, &flavor);
                let runtime_deps = isolate::read_runtime_deps(&self.tree, build_dir, &candidates)?;
                self.write_isolate_files(build_dir, target, &map, &flavor, runtime_deps)?;
            }
        }

        Ok(text)
    }

    fn write_isolate_files(
        &mut self,
        build_dir: &str,
        target: &str,
        map: &IsolateMap,
        flavor: &BuildFlavor,
        runtime_deps: Vec<String>,
    ) -> MbResult<isolate::PackagedTarget> {
        let (entry, target_type) = map.entry(target)?;
        let packaged = isolate::package_target(
            &self.tree,
            build_dir,
            target,
            entry,
            target_type,
            flavor,
            runtime_deps,
        )?;
        debug!(name = %target, files = packaged.manifest.variables.files.len(), "packaged target");

        self.write_file(&packaged.isolate_path, &packaged.manifest.to_json()?, false)?;
        self.write_file(&packaged.gen_path, &packaged.gen_request.to_json()?, false)?;
        Ok(packaged)
    }

    /// `mb isolate`
    ///
    /// With a config selector the build dir is regenerated first; otherwise
    /// it must already be a GN build dir and its `args.gn` is reused.
    pub fn isolate(&mut self, build_dir: &str, target: &str, request: &ConfigRequest) -> MbResult<()> {
        let gn_args = if request.selector.is_set() {
            let doc = self.load_config()?;
            let resolved = self.lookup_settings(&doc, &request.selector)?;
            self.run_gn_gen(build_dir, &resolved, &request.extras, &[])?
        } else {
            self.existing_build_args(build_dir)?
        };

        let map = self.load_isolate_map()?;
        let (entry, _) = map.entry(target)?;
        let cmd = self.gn().desc_runtime_deps(build_dir, &entry.label);
        let output = self.run(&cmd)?;
        if !output.success() {
            return Err(MbError::Generator { status: output.status });
        }
        if self.dryrun {
            return Ok(());
        }

        let runtime_deps = output.stdout.lines().map(str::to_string).collect();
        let flavor = BuildFlavor::from_gn_args(&gn_args, self.tree.platform().is_win());
        let packaged = self.write_isolate_files(build_dir, target, &map, &flavor, runtime_deps)?;

        let cmd = vec![
            self.settings.python.clone(),
            self.tree.to_abs(&self.settings.isolate_script).display().to_string(),
            "check".to_string(),
            "-i".to_string(),
            packaged.isolate_rel,
            "-s".to_string(),
            packaged.isolated_rel,
        ];
        let output = self.run(&cmd)?;
        if !output.success() {
            return Err(MbError::Isolate { status: output.status });
        }
        Ok(())
    }

    fn existing_build_args(&self, build_dir: &str) -> MbResult<String> {
        if !self.tree.build_file(build_dir, "toolchain.ninja").exists() {
            return Err(MbError::MissingBuildConfig);
        }
        let args_path = self.tree.build_file(build_dir, "args.gn");
        if !args_path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&args_path).map_err(|e| MbError::io(&args_path, e))
    }

    /// `mb analyze`
    pub fn analyze(
        &mut self,
        build_dir: &str,
        input_path: &Path,
        output_path: &Path,
        request: &ConfigRequest,
    ) -> MbResult<()> {
        let doc = self.load_config()?;
        let resolved = self.lookup_settings(&doc, &request.selector)?;
        self.run_gn_gen(build_dir, &resolved, &request.extras, &[])?;

        let input = fs::read_to_string(input_path).map_err(|e| MbError::io(input_path, e))?;
        let analyze_request = AnalyzeRequest::from_json(&input).map_err(|source| MbError::AnalyzeInput {
            path: input_path.to_path_buf(),
            source,
        })?;
        if self.verbose {
            let json = serde_json::to_string_pretty(&analyze_request)?;
            self.print(&format!("\nanalyze input:\n{}\n", json))?;
        }

        if !analyze_request.has_files() {
            self.print("Warning: No files modified in patch, bailing out early.")?;
            return self.write_file(output_path, &AnalyzeResult::no_dependency().to_json()?, false);
        }

        let gn_input_path = with_gn_suffix(input_path);
        let gn_output_path = with_gn_suffix(output_path);
        let result = self.run_gn_analyze(build_dir, &analyze_request, &gn_input_path, &gn_output_path, output_path);

        for path in [&gn_input_path, &gn_output_path] {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to remove temporary file");
                }
            }
        }
        result
    }

    fn run_gn_analyze(
        &mut self,
        build_dir: &str,
        request: &AnalyzeRequest,
        gn_input_path: &Path,
        gn_output_path: &Path,
        output_path: &Path,
    ) -> MbResult<()> {
        let map = self.load_isolate_map()?;
        let compile_labels = map.map_targets_to_labels(&request.additional_compile_targets)?;
        let test_labels = map.map_targets_to_labels(&request.test_targets)?;
        let labels_to_targets = label_map(&test_labels, &request.test_targets);

        let gn_input = GnAnalyzeInput::new(request, test_labels, compile_labels);
        self.write_file(gn_input_path, &gn_input.to_json()?, false)?;

        let cmd = self.gn().analyze(
            build_dir,
            &gn_input_path.display().to_string(),
            &gn_output_path.display().to_string(),
        );
        let output = self.run(&cmd)?;
        if !output.success() {
            return Err(MbError::Generator { status: output.status });
        }
        if self.dryrun {
            return Ok(());
        }

        let raw_text = fs::read_to_string(gn_output_path).map_err(|e| MbError::io(gn_output_path, e))?;
        let raw = GnAnalyzeOutput::from_json(&raw_text).map_err(mb_analyze::AnalyzeError::from)?;

        let translation = Translator::new()
            .with_max_cmdline_len(self.settings.analyze.max_cmdline_len)
            .translate(request, &labels_to_targets, raw)?;
        if let Some(fallback) = &translation.fallback {
            warn!("{}", fallback);
        }

        let json = translation.result.to_json()?;
        if self.verbose {
            self.print(&format!("\nanalyze output:\n{}", json))?;
        }
        self.write_file(output_path, &json, false)
    }

    /// `mb validate`
    pub fn validate(&mut self) -> MbResult<()> {
        let doc = self.load_config()?;
        let problems = lint(&doc, |path| self.tree.to_abs(path).exists());
        let path = self.config_path().display().to_string();
        if !problems.is_empty() {
            return Err(MbError::ConfigProblems { path, problems });
        }
        self.print(&format!("mb config file {} looks ok.", path))
    }

    /// `mb export`: master -> builder -> GN args, as JSON.
    pub fn export(&mut self) -> MbResult<()> {
        let doc = self.load_config()?;

        let flatten = |name: &str| -> MbResult<Value> {
            if name.starts_with(SOURCE_ROOT_PREFIX) {
                Ok(Value::String(name.to_string()))
            } else {
                Ok(Value::String(flatten_config(&doc, name)?.gn_args))
            }
        };

        let mut masters = BTreeMap::new();
        for (master, builders) in &doc.masters {
            let mut exported = BTreeMap::new();
            for (builder, config_ref) in builders {
                let value = match config_ref {
                    ConfigRef::Config(name) | ConfigRef::ArgsFile(name) => flatten(name)?,
                    ConfigRef::Phases(phases) => {
                        let mut by_phase = serde_json::Map::new();
                        for (phase, name) in phases {
                            by_phase.insert(phase.clone(), flatten(name)?);
                        }
                        Value::Object(by_phase)
                    }
                };
                exported.insert(builder.clone(), value);
            }
            masters.insert(master.clone(), exported);
        }

        let json = serde_json::to_string_pretty(&masters)?;
        self.print(&json)
    }

    /// `mb gerrit-buildbucket-config`
    pub fn buildbucket_config(&mut self) -> MbResult<()> {
        let doc = self.load_config()?;

        let mut text = String::from("# This file was generated using \"mb gerrit-buildbucket-config\".\n");
        for (master, builders) in &doc.masters {
            if !master.starts_with(TRYSERVER_PREFIX) {
                continue;
            }
            text.push_str(&format!("[bucket \"master.{}\"]\n", master));
            for builder in builders.keys() {
                text.push_str(&format!("\tbuilder = {}\n", builder));
            }
        }
        self.print_raw(&text)
    }
}

/// `<path>.gn`, the scratch file GN analyze reads or writes.
fn with_gn_suffix(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gn");
    PathBuf::from(name)
}

/// One target per non-empty line.
fn read_target_list(path: &Path) -> MbResult<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| MbError::io(path, e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
