pub mod latest;
pub mod score;
pub mod verbosity;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::{latest::LatestConfig, score::ScoreConfig, verbosity::Verbosity};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level used when RUST_LOG is not set
    #[arg(short, long, global = true, value_enum, default_value_t = Verbosity::Info)]
    pub verbosity: Verbosity,

    #[arg(
        long,
        global = true,
        env = "BPMON_DATA_DIR",
        help = "The directory for storing the score database. If used together with --ephemeral, new child directory will be created."
    )]
    pub data_dir: Option<PathBuf>,

    #[arg(
        long,
        short,
        global = true,
        help = "Use new data directory, located in OS temporary directory. If used together with --data-dir, new directory will be created there instead."
    )]
    pub ephemeral: bool,

    /// Delete the score database before running
    #[arg(long, global = true)]
    pub purge_db: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a scoring cycle over the snapshot
    #[command(name = "score")]
    Score(Box<ScoreConfig>),

    /// Show the latest score record of a subject
    #[command(name = "latest")]
    Latest(LatestConfig),
}

#[cfg(test)]
mod tests {
    use bpmon_model::subject::SubjectId;
    use bpmon_network_spec::networks::Chain;

    use super::*;

    #[test]
    fn test_cli_score_command() {
        let cli = Cli::parse_from([
            "program",
            "score",
            "--snapshot",
            "snapshot.json",
            "--chains",
            "mainnet",
            "--verbosity",
            "debug",
        ]);

        assert_eq!(cli.verbosity, Verbosity::Debug);
        match cli.command {
            Commands::Score(config) => {
                assert_eq!(config.snapshot, PathBuf::from("snapshot.json"));
                assert_eq!(config.chains, vec![Chain::Mainnet]);
                assert!(!config.enable_metrics);
                assert!(config.catalog.is_none());
            }
            Commands::Latest(_) => panic!("Expected score command"),
        }
    }

    #[test]
    fn test_cli_score_defaults_to_both_chains() {
        let cli = Cli::parse_from(["program", "score", "--snapshot", "s.json", "--ephemeral"]);

        assert!(cli.ephemeral);
        assert_eq!(cli.verbosity, Verbosity::Info);
        match cli.command {
            Commands::Score(config) => {
                assert_eq!(config.chains, vec![Chain::Mainnet, Chain::Testnet]);
                assert_eq!(config.metrics_port, 8080);
            }
            Commands::Latest(_) => panic!("Expected score command"),
        }
    }

    #[test]
    fn test_cli_latest_command() {
        let cli = Cli::parse_from(["program", "latest", "--subject", "testnet:bp1/4", "--history"]);

        match cli.command {
            Commands::Latest(config) => {
                assert_eq!(config.subject, SubjectId::node(Chain::Testnet, "bp1", 4));
                assert!(config.history);
            }
            Commands::Score(_) => panic!("Expected latest command"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_subject() {
        assert!(Cli::try_parse_from(["program", "latest", "--subject", "bp1"]).is_err());
    }
}
