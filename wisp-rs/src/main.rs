//! Main entry point for the wisp-rs CLI

mod cli;
mod commands;
mod utils;

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Commands::Simulate(args) => commands::simulate::execute(&args, cli.quiet),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the level picked by `-v`/`-q`
fn init_logging(cli: &Cli) {
    let level = cli.log_level().to_string().to_lowercase();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
