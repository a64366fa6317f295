use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use bpmon::{
    cli::{Cli, Commands, latest::LatestConfig, score::ScoreConfig},
    startup_message::startup_message,
};
use bpmon_catalog::catalog::Catalog;
use bpmon_metrics::{NODE_INFO, set_int_gauge_vec};
use bpmon_reliability_feed::{HttpReliabilityFeed, StaticReliabilityFeed};
use bpmon_scoring::{
    service::{CycleReport, ScoringService, Sources},
    sources::ReliabilityFeed,
};
use bpmon_storage::{
    db::{BpmonDB, reset_db_interactive},
    dir::setup_data_dir,
    snapshot::SnapshotSource,
};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub const APP_NAME: &str = "bpmon";

/// Entry point for the scorer. Initializes logging, opens the score database and runs the
/// requested command until it finishes or Ctrl-C is received.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set the default log level based on verbosity flag or RUST_LOG env var
    let rust_log = env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let env_filter = match rust_log.is_empty() {
        true => EnvFilter::builder().parse_lossy(cli.verbosity.directive()),
        false => EnvFilter::builder().parse_lossy(rust_log),
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    info!("\n{}", startup_message());

    let bpmon_dir = setup_data_dir(APP_NAME, cli.data_dir.clone(), cli.ephemeral)
        .context("Unable to initialize data directory")?;
    if cli.purge_db {
        reset_db_interactive(bpmon_dir.clone())?;
    }
    let bpmon_db = BpmonDB::new(bpmon_dir).context("Unable to open score database")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        match cli.command {
            Commands::Score(config) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl-C received, shutting down...");
                        Ok(())
                    }
                    result = run_score(*config, bpmon_db) => result,
                }
            }
            Commands::Latest(config) => run_latest(config, bpmon_db),
        }
    })
}

/// Scores the configured chains from a snapshot, once or on an interval.
pub async fn run_score(config: ScoreConfig, bpmon_db: BpmonDB) -> anyhow::Result<()> {
    if config.enable_metrics {
        let address = SocketAddr::new(config.metrics_address, config.metrics_port);
        prometheus_exporter::start(address).context("Failed to start prometheus exporter")?;
        info!(
            "Metrics started on {}:{}",
            config.metrics_address, config.metrics_port
        );
        set_int_gauge_vec(&NODE_INFO, 1, &[env!("CARGO_PKG_VERSION")]);
    }

    let catalog = match &config.catalog {
        Some(path) => Catalog::from_yaml_file(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display()))?,
        None => Catalog::from_env().context("Failed to load catalog from the environment")?,
    };

    let snapshot = Arc::new(SnapshotSource::from_json_file(&config.snapshot)?);
    let reliability: Arc<dyn ReliabilityFeed> = match config.reliability_url.clone() {
        Some(url) => {
            info!(%url, "Reading block reliability from feed");
            Arc::new(HttpReliabilityFeed::new(url, catalog.lookup_timeout())?)
        }
        None => Arc::new(StaticReliabilityFeed::new(
            snapshot
                .reliability()
                .iter()
                .map(|entry| (entry.chain, entry.owner.clone(), entry.reliability)),
        )),
    };

    let sources = Sources {
        producers: snapshot.clone(),
        population: snapshot.clone(),
        proposals: snapshot.clone(),
        chain_map: snapshot,
        reliability,
        store: Arc::new(bpmon_db.score_records_provider()),
    };
    let service = ScoringService::new(catalog, sources)?;

    loop {
        let as_of = config.as_of.unwrap_or_else(Utc::now);
        let report = service.run_cycle(&config.chains, as_of).await;
        log_report(&report);
        if config.print_records {
            for chain_report in &report.chains {
                println!("{}", serde_json::to_string_pretty(&chain_report.records)?);
            }
        }

        match config.interval_secs {
            Some(interval) => tokio::time::sleep(Duration::from_secs(interval)).await,
            None => return Ok(()),
        }
    }
}

/// Prints the latest record, or the whole history, of one subject as JSON.
pub fn run_latest(config: LatestConfig, bpmon_db: BpmonDB) -> anyhow::Result<()> {
    let table = bpmon_db.score_records_provider();
    if config.history {
        let history = table.history(&config.subject)?;
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    match table.latest(&config.subject)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => warn!(subject = %config.subject, "No score recorded yet"),
    }
    Ok(())
}

fn log_report(report: &CycleReport) {
    for chain_report in &report.chains {
        if let Some(failure) = &chain_report.failure {
            error!(chain = %chain_report.chain, "Chain could not be scored: {failure}");
            continue;
        }
        for skipped in &chain_report.skipped {
            warn!(subject = %skipped.subject, "Subject skipped: {}", skipped.error);
        }
        info!(
            chain = %chain_report.chain,
            scored = chain_report.records.len(),
            skipped = chain_report.skipped.len(),
            malformed_proposals = chain_report.malformed_proposals,
            "Scoring cycle finished"
        );
    }
}
