//! Knit CLI entry point: argument parsing, logging setup and command dispatch.

use clap::Parser;
use knit_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.into_command() {
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
        cli::Command::Migrate(migrate_args) => commands::migrate_execute(migrate_args),
    };

    let code = result.map_err(error::cli_error_to_miette)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
