//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;

pub mod commands;

/// Sync markdown flashcards to a Mochi deck
#[derive(Parser, Debug)]
#[command(name = "cards", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base directory holding config.toml and credentials.toml (default: ./data)
    #[arg(long, global = true, env = "CARDS_BASE")]
    pub base: Option<PathBuf>,

    /// Use the test base directory (./test-data)
    #[arg(long, global = true)]
    pub test: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Run flags that decide where configuration is read from.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            base: self.base.clone(),
            test: self.test,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bring the deck in line with the local documents
    Sync {
        /// Show the planned changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Answer every confirmation with yes
        #[arg(short, long)]
        yes: bool,
    },

    /// Parse every document and report pending work, without network access
    Check,

    /// Save the raw JSON of every card in the deck
    Backup {
        /// Output file (default: backup-mochi-deck-<deck>-from-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cards", "sync", "--dry-run", "--test", "-vv"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync { dry_run: true, yes: false }));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.settings().base_dir(), PathBuf::from("./test-data"));
    }

    #[test]
    fn test_base_flag() {
        let cli = Cli::try_parse_from(["cards", "--base", "/tmp/decks", "check"]).unwrap();
        assert_eq!(cli.settings().base_dir(), PathBuf::from("/tmp/decks"));
    }
}
