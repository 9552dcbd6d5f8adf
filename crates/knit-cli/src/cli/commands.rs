use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::enums::*;
use crate::cli::validation::{parse_env_pair, parse_global};

/// Available knit subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the configured packages (the default command)
    ///
    /// Loads `knit.config.*` (or the `knit` field of package.json), applies
    /// the flags below on top and builds every resulting config.
    Build(BuildArgs),

    /// Migrate a tsup project to knit
    ///
    /// Renames `tsup.config.*` to `knit.config.*` and rewrites the tsup
    /// references in package.json.
    Migrate(MigrateArgs),
}

/// Arguments for the build command.
///
/// Every flag is optional; unset flags leave the config file values alone.
#[derive(Args, Debug, Default, Clone)]
pub struct BuildArgs {
    /// Entry files, overriding `entry` of the config
    ///
    /// Examples:
    ///   knit src/index.ts
    ///   knit src/index.ts src/cli.ts
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// Use a custom config file or directory
    #[arg(short = 'c', long, value_name = "PATH", conflicts_with = "no_config")]
    pub config: Option<PathBuf>,

    /// Disable config file loading
    #[arg(long)]
    pub no_config: bool,

    /// How script config files are evaluated
    #[arg(long, value_enum, value_name = "LOADER")]
    pub config_loader: Option<ConfigLoaderArg>,

    /// Output formats (repeatable or comma separated)
    #[arg(short = 'f', long, value_enum, value_delimiter = ',', value_name = "FORMAT")]
    pub format: Vec<FormatArg>,

    /// Output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<String>,

    /// Working directory of the build
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Config name, shown in log lines
    #[arg(long)]
    pub name: Option<String>,

    /// Clean the output directory before building
    #[arg(long, conflicts_with = "no_clean")]
    pub clean: bool,

    /// Keep existing files in the output directory
    #[arg(long)]
    pub no_clean: bool,

    /// Target platform
    #[arg(long, value_enum)]
    pub platform: Option<PlatformArg>,

    /// Compilation targets, e.g. `node18,chrome100`
    #[arg(long, value_delimiter = ',', value_name = "TARGET")]
    pub target: Vec<String>,

    /// Generate source maps (`inline` and `hidden` select the mode)
    #[arg(long, value_enum, num_args = 0..=1, default_missing_value = "true", value_name = "MODE")]
    pub sourcemap: Option<SourcemapArg>,

    /// Minify output
    #[arg(long)]
    pub minify: bool,

    /// Disable tree shaking
    #[arg(long)]
    pub no_treeshake: bool,

    /// Generate declaration files
    #[arg(long)]
    pub dts: bool,

    /// Generate package.json exports
    #[arg(long)]
    pub exports: bool,

    /// Run publint after building
    #[arg(long)]
    pub publint: bool,

    /// Run `@arethetypeswrong/cli` after building
    #[arg(long)]
    pub attw: bool,

    /// Skip the size report
    #[arg(long)]
    pub no_report: bool,

    /// Mark modules as external (repeatable)
    #[arg(long, value_name = "MODULE")]
    pub external: Vec<String>,

    /// Modules to always bundle (repeatable)
    #[arg(long, value_name = "MODULE")]
    pub no_external: Vec<String>,

    /// Path of tsconfig.json
    #[arg(long, value_name = "PATH")]
    pub tsconfig: Option<String>,

    /// Keep the source module structure instead of bundling
    #[arg(long)]
    pub unbundle: bool,

    /// Add CommonJS/ESM shims
    #[arg(long)]
    pub shims: bool,

    /// Global variable name for IIFE/UMD output
    #[arg(long, value_parser = parse_global, value_name = "NAME")]
    pub global_name: Option<String>,

    /// Always use `.mjs`/`.cjs` extensions
    #[arg(long)]
    pub fixed_extension: bool,

    /// Environment variables inlined as `process.env.KEY` (repeatable)
    #[arg(long = "env", value_parser = parse_env_pair, value_name = "KEY=VALUE")]
    pub env: Vec<(String, String)>,

    /// Load environment variables from a file
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<String>,

    /// Prefixes of variables taken from the env file (repeatable)
    #[arg(long, value_name = "PREFIX")]
    pub env_prefix: Vec<String>,

    /// Copy files to the output directory after building (repeatable)
    #[arg(long, value_name = "PATH")]
    pub copy: Vec<String>,

    /// Watch mode, optionally watching only the given paths
    #[arg(short = 'w', long, num_args = 0..=1, value_name = "PATH")]
    pub watch: Option<Vec<String>>,

    /// Paths or `/regex/`es to ignore in watch mode (repeatable)
    #[arg(long, value_name = "PATH")]
    pub ignore_watch: Vec<String>,

    /// Command to run after every successful build
    #[arg(long, value_name = "COMMAND")]
    pub on_success: Option<String>,

    /// Log level of the build
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Fail the build on warnings
    #[arg(long)]
    pub fail_on_warn: bool,

    /// Build every workspace package, or only the members matching GLOB
    #[arg(short = 'W', long, num_args = 0..=1, default_missing_value = "", value_name = "GLOB")]
    pub workspace: Option<String>,

    /// Only build workspace packages whose name or directory matches
    #[arg(short = 'F', long, value_name = "PATTERN")]
    pub filter: Vec<String>,
}

/// Arguments for the migrate command
#[derive(Args, Debug, Default, Clone)]
pub struct MigrateArgs {
    /// Project directory to migrate
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Show the planned changes without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}
