//! Collaborators the engine reads from. Every call is wrapped in a timeout by the caller.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use bpmon_model::{
    producer::{Producer, ProducerSummary},
    proposal::Proposal,
    score::ScoreRecord,
    subject::SubjectId,
    window::Window,
};
use bpmon_network_spec::networks::Chain;

use crate::errors::ScoringError;

#[async_trait]
pub trait ProducerSource: Send + Sync {
    /// Every producer recorded for `chain`, whatever its status.
    async fn list_producers(&self, chain: Chain) -> anyhow::Result<Vec<ProducerSummary>>;

    /// The producer with all of its associations, or `None` if it is unknown.
    async fn load_producer(&self, chain: Chain, owner: &str) -> anyhow::Result<Option<Producer>>;
}

#[async_trait]
pub trait PopulationSource: Send + Sync {
    /// Per-node maximum API result count sampled on `chain` within `window`. Nodes without a
    /// sample in the window are left out.
    async fn best_results(&self, chain: Chain, window: Window) -> anyhow::Result<Vec<u64>>;

    /// The subject's own maximum over the same window. For a producer this is the maximum over
    /// all of its nodes.
    async fn subject_best_results(
        &self,
        subject: &SubjectId,
        window: Window,
    ) -> anyhow::Result<Option<u64>>;
}

#[async_trait]
pub trait ProposalSource: Send + Sync {
    /// Up to `limit` proposals of `chain`, most recent first.
    async fn recent_proposals(&self, chain: Chain, limit: usize) -> anyhow::Result<Vec<Proposal>>;
}

#[async_trait]
pub trait ChainMapSource: Send + Sync {
    /// The account `owner` on chain `from` operates on chain `to`.
    async fn counterpart(
        &self,
        owner: &str,
        from: Chain,
        to: Chain,
    ) -> anyhow::Result<Option<String>>;
}

#[async_trait]
pub trait ReliabilityFeed: Send + Sync {
    /// Block production reliability in percent, `None` when the feed has no data.
    async fn reliability(&self, chain: Chain, owner: &str) -> anyhow::Result<Option<f64>>;
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Appends a record. Implementations reject a record that is not strictly newer than the
    /// subject's latest one.
    async fn append(&self, record: ScoreRecord) -> anyhow::Result<()>;

    /// The subject's record with the greatest timestamp.
    async fn latest(&self, subject: &SubjectId) -> anyhow::Result<Option<ScoreRecord>>;

    /// All records of the subject, oldest first.
    async fn history(&self, subject: &SubjectId) -> anyhow::Result<Vec<ScoreRecord>>;
}

/// Awaits a collaborator read for at most `timeout`.
pub async fn bounded<T>(
    lookup: &'static str,
    timeout: Duration,
    read: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, ScoringError> {
    match tokio::time::timeout(timeout, read).await {
        Ok(result) => result.map_err(|err| ScoringError::lookup(lookup, err)),
        Err(_) => Err(ScoringError::LookupTimeout { lookup, timeout }),
    }
}
