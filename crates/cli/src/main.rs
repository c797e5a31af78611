//! Quell CLI - Suppression-aware scan coordinator

use anyhow::Result;
use clap::Parser;
use quell_cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let failed = match cli.command {
        Some(Commands::Init { ref path }) => {
            commands::init::run(path.as_deref())?;
            false
        }
        Some(Commands::Scan { ref path }) => commands::scan::run(path.as_deref(), &cli)?,
        Some(Commands::Watch {
            ref path,
            debounce,
            no_clear,
        }) => {
            commands::watch::run(path.as_deref(), &cli, debounce, no_clear)?;
            false
        }
        Some(Commands::Ignore { ref target }) => {
            commands::ignore::run(target)?;
            false
        }
        Some(Commands::Ignores { ref action }) => {
            commands::ignores::run(action.as_ref())?;
            false
        }
        None => {
            // Default command is scan with current directory
            commands::scan::run(None, &cli)?
        }
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
