use std::{net::IpAddr, path::PathBuf};

use bpmon_network_spec::{cli::chain_parser, networks::Chain};
use chrono::{DateTime, Utc};
use clap::Parser;
use url::Url;

const DEFAULT_CHAINS: &str = "mainnet,testnet";
const DEFAULT_METRICS_ENABLED: bool = false;
const DEFAULT_METRICS_ADDRESS: &str = "127.0.0.1";
const DEFAULT_METRICS_PORT: u16 = 8080;

#[derive(Debug, Parser)]
pub struct ScoreConfig {
    /// JSON snapshot of producers, proposals, the chain map and reliability figures
    #[arg(long, env = "BPMON_SNAPSHOT")]
    pub snapshot: PathBuf,

    #[arg(
        long,
        env = "BPMON_CATALOG",
        help = "YAML criteria catalog. Without it the catalog is read from the SCORING_* and related environment variables."
    )]
    pub catalog: Option<PathBuf>,

    /// Chains to score, in any order. The secondary chain is always scored first.
    #[arg(
        long,
        env = "BPMON_CHAINS",
        value_delimiter = ',',
        value_parser = chain_parser,
        default_value = DEFAULT_CHAINS
    )]
    pub chains: Vec<Chain>,

    /// Block reliability feed. Without it the figures shipped in the snapshot are used.
    #[arg(long, env = "BPMON_RELIABILITY_URL")]
    pub reliability_url: Option<Url>,

    /// Score as of this instant (RFC 3339) instead of now
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,

    /// Re-run the cycle every this many seconds until interrupted
    #[arg(long, env = "BPMON_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Print the stored records as JSON
    #[arg(long)]
    pub print_records: bool,

    #[arg(long, default_value_t = DEFAULT_METRICS_ENABLED)]
    pub enable_metrics: bool,

    #[arg(long, default_value = DEFAULT_METRICS_ADDRESS)]
    pub metrics_address: IpAddr,

    #[arg(long, default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,
}
