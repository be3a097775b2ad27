//! `mb` CLI
//!
//! Entry point for the meta-build wrapper.

use clap::{Args, Parser, Subcommand};
use metabuild::settings::EffectiveSettings;
use metabuild::{
    ArgsExtras, ConfigRequest, ConfigSelector, LookupMode, MbError, MbResult, Session, SourceTree,
    SystemRunner,
};
use serde_json::{json, Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "MB_LOG";

#[derive(Parser)]
#[command(name = "mb")]
#[command(about = "Meta-build wrapper mapping CI builders to GN configurations", version)]
struct Cli {
    /// Print what would be done without doing it
    #[arg(long, short = 'n', global = true)]
    dryrun: bool,

    /// Verbose logging and echo of written files
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Root of the source checkout (default: current directory)
    #[arg(long, global = true)]
    src_root: Option<PathBuf>,

    /// Config document (default: //tools/mb/mb_config.toml)
    #[arg(long, short = 'f', global = true)]
    config_file: Option<String>,

    /// Isolate map file; may be repeated
    #[arg(long = "isolate-map-file", global = true)]
    isolate_map_files: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the GN args a config resolves to
    Lookup {
        #[command(flatten)]
        select: SelectArgs,

        #[command(flatten)]
        extras: ExtrasArgs,

        /// Print only the args text
        #[arg(long, short = 'q')]
        quiet: bool,

        /// Inline args files instead of importing them
        #[arg(long)]
        recursive: bool,
    },

    /// Write args.gn and run `gn gen`
    Gen {
        #[command(flatten)]
        select: SelectArgs,

        #[command(flatten)]
        extras: ExtrasArgs,

        /// File listing targets to package for swarming, one per line
        #[arg(long)]
        swarming_targets_file: Option<PathBuf>,

        /// Build directory, e.g. //out/Default
        path: String,
    },

    /// Package a test target for swarming
    Isolate {
        #[command(flatten)]
        select: SelectArgs,

        #[command(flatten)]
        extras: ExtrasArgs,

        /// Build directory, e.g. //out/Default
        path: String,

        /// Isolate map name of the target
        target: String,
    },

    /// Report which targets a patch affects
    Analyze {
        #[command(flatten)]
        select: SelectArgs,

        #[command(flatten)]
        extras: ExtrasArgs,

        /// Build directory, e.g. //out/Default
        path: String,

        /// Analyze request JSON
        input_path: PathBuf,

        /// Where to write the analyze result JSON
        output_path: PathBuf,
    },

    /// Check the config document for problems
    Validate,

    /// Print every builder's flattened GN args as JSON
    Export,

    /// Print the buildbucket section for Gerrit's project config
    GerritBuildbucketConfig,
}

#[derive(Args, Default)]
struct SelectArgs {
    /// Config name to look up
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Master name
    #[arg(long, short = 'm')]
    master: Option<String>,

    /// Builder name
    #[arg(long, short = 'b')]
    builder: Option<String>,

    /// Build phase, for multi-phase builders
    #[arg(long)]
    phase: Option<String>,
}

impl SelectArgs {
    fn into_selector(self) -> ConfigSelector {
        ConfigSelector {
            config: self.config,
            master: self.master,
            builder: self.builder,
            phase: self.phase,
        }
    }
}

#[derive(Args, Default)]
struct ExtrasArgs {
    /// Goma directory to add to the args
    #[arg(long, short = 'g')]
    goma_dir: Option<String>,

    /// Android version code
    #[arg(long)]
    android_version_code: Option<String>,

    /// Android version name
    #[arg(long)]
    android_version_name: Option<String>,
}

impl ExtrasArgs {
    fn into_extras(self) -> ArgsExtras {
        ArgsExtras {
            goma_dir: self.goma_dir,
            android_version_code: self.android_version_code,
            android_version_name: self.android_version_name,
        }
    }
}

fn request(select: SelectArgs, extras: ExtrasArgs) -> ConfigRequest {
    ConfigRequest::new(select.into_selector()).with_extras(extras.into_extras())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("mb: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> MbResult<()> {
    let src_root = match cli.src_root.clone() {
        Some(root) => root,
        None => std::env::current_dir().map_err(|e| MbError::io(".", e))?,
    };

    let host_path = std::env::var("HOME")
        .ok()
        .map(|home| Path::new(&home).join(".config/mb/settings.toml"));
    let repo_path = src_root.join(".mb/settings.toml");
    let effective = EffectiveSettings::build(
        host_path.as_deref(),
        Some(&repo_path),
        cli_overrides(&cli),
    )?;
    let settings = effective.settings;

    let tree = SourceTree::new(src_root, settings.platform);
    let passthrough = std::env::var(&settings.passthrough_env).ok();
    let runner = SystemRunner;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut session = Session::new(tree, settings, &runner, &mut out)
        .with_passthrough(passthrough)
        .with_dryrun(cli.dryrun)
        .with_verbose(cli.verbose);

    match cli.command {
        Commands::Lookup {
            select,
            extras,
            quiet,
            recursive,
        } => {
            let mode = if recursive {
                LookupMode::Recursive
            } else if quiet {
                LookupMode::Quiet
            } else {
                LookupMode::Full
            };
            session.lookup(&request(select, extras), mode)
        }
        Commands::Gen {
            select,
            extras,
            swarming_targets_file,
            path,
        } => session.gen(&path, &request(select, extras), swarming_targets_file.as_deref()),
        Commands::Isolate {
            select,
            extras,
            path,
            target,
        } => session.isolate(&path, &target, &request(select, extras)),
        Commands::Analyze {
            select,
            extras,
            path,
            input_path,
            output_path,
        } => session.analyze(&path, &input_path, &output_path, &request(select, extras)),
        Commands::Validate => session.validate(),
        Commands::Export => session.export(),
        Commands::GerritBuildbucketConfig => session.buildbucket_config(),
    }
}

/// Settings layer built from CLI flags, if any were given.
fn cli_overrides(cli: &Cli) -> Option<Value> {
    let mut overrides = Map::new();
    if let Some(config_file) = &cli.config_file {
        overrides.insert("config_file".to_string(), json!(config_file));
    }
    if !cli.isolate_map_files.is_empty() {
        overrides.insert("isolate_map_files".to_string(), json!(cli.isolate_map_files));
    }
    if overrides.is_empty() {
        None
    } else {
        Some(Value::Object(overrides))
    }
}
