//! Command-line interface definition for knit.
//!
//! # Command Structure
//!
//! - `knit [FILES]...` / `knit build [FILES]...` - build with the resolved configs
//! - `knit migrate` - convert a tsup setup to knit

mod commands;
pub mod enums;
mod tests;
mod validation;

use clap::Parser;

pub use commands::{BuildArgs, Command, MigrateArgs};
pub use enums::*;
pub use validation::{parse_env_pair, parse_global};

/// Knit - build orchestrator for JavaScript/TypeScript libraries
#[derive(Parser, Debug)]
#[command(
    name = "knit",
    version,
    about = "Build JavaScript/TypeScript libraries and monorepos",
    long_about = "Knit resolves config files, CLI flags and workspace packages into build\n\
                  configs, bundles every format in parallel and keeps package.json exports,\n\
                  declarations and package checks in sync.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Build options when no subcommand is given
    #[command(flatten)]
    pub build: BuildArgs,
}

impl Cli {
    /// The command to run; a bare `knit` builds.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Build(self.build))
    }
}
