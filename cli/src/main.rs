mod cli;
mod commands;
mod config;
mod data;
mod logging;
mod monitor;

use clap::Parser;
use color_eyre::eyre::Result;

use cli::{Cli, Commands};
use config::{ensure_dirs, LogLevel, UserConfig};
use logging::LogMode;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = ensure_dirs();

    let cli = Cli::parse();
    let config = UserConfig::load();
    let log_level_override = cli.log_level.as_deref().and_then(LogLevel::from_str);

    match cli.command {
        Commands::Monitor {
            json,
            capacity_mah,
            interval_secs,
            no_store,
        } => {
            let mode = if json { LogMode::File } else { LogMode::Both };
            let _guard = logging::init(config.log_level, mode, log_level_override);
            commands::monitor::run(config, json, capacity_mah, interval_secs, no_store)
        }
        Commands::History { limit, json, clear } => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::history::run(limit, json, clear)
        }
        Commands::Config { path, reset, edit } => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::config::run(path, reset, edit)
        }
        Commands::Logs { lines, follow } => commands::logs::run(lines, follow),
    }
}
