use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track charging power and sessions for the system battery
    #[command(alias = "watch")]
    Monitor {
        /// Print one JSON object per line instead of text
        #[arg(short, long)]
        json: bool,

        /// Battery capacity in mAh (overrides the battery's own rating)
        #[arg(short = 'C', long)]
        capacity_mah: Option<f64>,

        /// Seconds between samples while a session is open
        #[arg(short, long)]
        interval_secs: Option<u64>,

        /// Do not write sessions to the history database
        #[arg(long)]
        no_store: bool,
    },

    /// List recorded charging sessions
    History {
        /// Number of sessions to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Delete all recorded sessions
        #[arg(long)]
        clear: bool,
    },

    /// Show or edit configuration
    Config {
        /// Print config file path
        #[arg(long)]
        path: bool,

        /// Reset config to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(short, long)]
        edit: bool,
    },

    /// View log output
    Logs {
        /// Number of lines to show
        #[arg(short, long, default_value_t = 50)]
        lines: usize,

        /// Follow log output
        #[arg(short, long)]
        follow: bool,
    },
}

/// Charging power estimates and session history for your battery
#[derive(Debug, Parser)]
#[command(name = "trickle", version, verbatim_doc_comment)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_flags() {
        let cli = Cli::try_parse_from([
            "trickle",
            "monitor",
            "--json",
            "--capacity-mah",
            "4200",
            "--interval-secs",
            "10",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let Commands::Monitor {
            json,
            capacity_mah,
            interval_secs,
            no_store,
        } = cli.command
        else {
            panic!("expected monitor");
        };
        assert!(json);
        assert_eq!(capacity_mah, Some(4200.0));
        assert_eq!(interval_secs, Some(10));
        assert!(!no_store);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_history_defaults() {
        let cli = Cli::try_parse_from(["trickle", "history"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                limit: 20,
                json: false,
                clear: false
            }
        ));
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["trickle"]).is_err());
    }

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
