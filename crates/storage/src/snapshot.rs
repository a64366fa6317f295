//! A point-in-time copy of everything the scoring engine reads, loaded from one JSON file.

use std::{fs, path::Path};

use async_trait::async_trait;
use bpmon_model::{
    chain_map::{ChainMapping, parse_chain_map},
    node::Node,
    producer::{Producer, ProducerSummary},
    proposal::Proposal,
    subject::SubjectId,
    window::Window,
};
use bpmon_network_spec::networks::Chain;
use bpmon_scoring::sources::{ChainMapSource, PopulationSource, ProducerSource, ProposalSource};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::StoreError;

/// Block production reliability last published for a producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityEntry {
    pub chain: Chain,
    pub owner: String,
    pub reliability: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub producers: Vec<Producer>,
    #[serde(default)]
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub chain_map: Vec<ChainMapping>,
    /// The published markdown chain map. Its rows are added to `chain_map`.
    #[serde(default)]
    pub chain_map_markdown: Option<String>,
    #[serde(default)]
    pub reliability: Vec<ReliabilityEntry>,
}

/// Serves a [Snapshot] through the engine's source traits.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(mut snapshot: Snapshot) -> Self {
        if let Some(markdown) = snapshot.chain_map_markdown.take() {
            snapshot.chain_map.extend(parse_chain_map(&markdown));
        }
        Self { snapshot }
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let source = Self::from_json_str(&fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            producers = source.snapshot.producers.len(),
            proposals = source.snapshot.proposals.len(),
            "Loaded snapshot"
        );
        Ok(source)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn reliability(&self) -> &[ReliabilityEntry] {
        &self.snapshot.reliability
    }

    fn producers_of(&self, chain: Chain) -> impl Iterator<Item = &Producer> {
        self.snapshot
            .producers
            .iter()
            .filter(move |producer| producer.chain == chain)
    }

    fn producer(&self, chain: Chain, owner: &str) -> Option<&Producer> {
        self.producers_of(chain)
            .find(|producer| producer.owner == owner)
    }

    fn subject_nodes<'a>(&'a self, subject: &SubjectId) -> Vec<&'a Node> {
        let Some(producer) = self.producer(subject.chain(), subject.owner()) else {
            return vec![];
        };
        match subject {
            SubjectId::Producer { .. } => producer.nodes.iter().collect(),
            SubjectId::Node { node_id, .. } => producer.node(*node_id).into_iter().collect(),
        }
    }
}

#[async_trait]
impl ProducerSource for SnapshotSource {
    async fn list_producers(&self, chain: Chain) -> anyhow::Result<Vec<ProducerSummary>> {
        Ok(self.producers_of(chain).map(Producer::summary).collect())
    }

    async fn load_producer(&self, chain: Chain, owner: &str) -> anyhow::Result<Option<Producer>> {
        Ok(self.producer(chain, owner).cloned())
    }
}

#[async_trait]
impl PopulationSource for SnapshotSource {
    async fn best_results(&self, chain: Chain, window: Window) -> anyhow::Result<Vec<u64>> {
        Ok(self
            .producers_of(chain)
            .flat_map(|producer| producer.nodes.iter())
            .filter_map(|node| node.best_results_within(window))
            .collect())
    }

    async fn subject_best_results(
        &self,
        subject: &SubjectId,
        window: Window,
    ) -> anyhow::Result<Option<u64>> {
        Ok(self
            .subject_nodes(subject)
            .into_iter()
            .filter_map(|node| node.best_results_within(window))
            .max())
    }
}

#[async_trait]
impl ProposalSource for SnapshotSource {
    async fn recent_proposals(&self, chain: Chain, limit: usize) -> anyhow::Result<Vec<Proposal>> {
        let mut proposals = self
            .snapshot
            .proposals
            .iter()
            .filter(|proposal| proposal.chain == chain)
            .cloned()
            .collect::<Vec<_>>();
        proposals.sort_by(|a, b| b.time_stamp.cmp(&a.time_stamp));
        proposals.truncate(limit);
        Ok(proposals)
    }
}

#[async_trait]
impl ChainMapSource for SnapshotSource {
    async fn counterpart(
        &self,
        owner: &str,
        from: Chain,
        to: Chain,
    ) -> anyhow::Result<Option<String>> {
        let counterpart = match (from, to) {
            (Chain::Mainnet, Chain::Testnet) => self
                .snapshot
                .chain_map
                .iter()
                .find(|mapping| mapping.mainnet_producer == owner)
                .map(|mapping| mapping.testnet_producer.clone()),
            (Chain::Testnet, Chain::Mainnet) => self
                .snapshot
                .chain_map
                .iter()
                .find(|mapping| mapping.testnet_producer == owner)
                .map(|mapping| mapping.mainnet_producer.clone()),
            _ => Some(owner.to_string()),
        };
        Ok(counterpart)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    const SNAPSHOT: &str = r#"{
        "producers": [
            {
                "owner": "bp1", "chain": "Mainnet", "status": "active", "total_votes": 500,
                "nodes": [
                    {
                        "id": 1, "type": "api", "url": "https://api.bp1.io", "api": true,
                        "status": "active", "server_version": "v3.5.0",
                        "apiFetchChecks": [
                            { "time_stamp": "2024-06-01T00:00:00Z", "results": 40 },
                            { "time_stamp": "2024-06-10T00:00:00Z", "results": 25 }
                        ]
                    },
                    {
                        "id": 2, "type": "api", "url": "https://api2.bp1.io", "api": true,
                        "status": "active",
                        "apiFetchChecks": [
                            { "time_stamp": "2024-06-10T00:00:00Z", "results": 30 }
                        ]
                    }
                ]
            },
            { "owner": "bp2", "chain": "Mainnet", "status": "inactive", "total_votes": 10 },
            { "owner": "bp1test", "chain": "Testnet", "status": "active", "total_votes": 7 }
        ],
        "proposals": [
            { "chain": "Mainnet", "proposal_name": "old", "block_num": 1,
              "time_stamp": "2024-05-01T00:00:00Z" },
            { "chain": "Mainnet", "proposal_name": "new", "block_num": 9,
              "time_stamp": "2024-06-01T00:00:00Z" },
            { "chain": "Testnet", "proposal_name": "test", "block_num": 3,
              "time_stamp": "2024-06-02T00:00:00Z" }
        ],
        "chain_map": [ { "mainnetProducer": "bp1", "testnetProducer": "bp1test" } ],
        "chain_map_markdown": "| Mainnet | Testnet |\n|---|---|\n| bp2 | bp2test |",
        "reliability": [ { "chain": "Mainnet", "owner": "bp1", "reliability": 99.5 } ]
    }"#;

    fn window(from: u32, to: u32) -> Window {
        let day = |day| Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).single().expect("date");
        Window::new(day(from), day(to))
    }

    #[tokio::test]
    async fn test_lists_and_loads_producers_per_chain() {
        let source = SnapshotSource::from_json_str(SNAPSHOT).expect("snapshot");

        let owners = source
            .list_producers(Chain::Mainnet)
            .await
            .expect("producers")
            .into_iter()
            .map(|summary| summary.owner)
            .collect::<Vec<_>>();
        assert_eq!(owners, vec!["bp1", "bp2"]);

        assert!(source.load_producer(Chain::Mainnet, "bp1").await.expect("producer").is_some());
        assert!(source.load_producer(Chain::Testnet, "bp1").await.expect("producer").is_none());
        assert_eq!(source.reliability().len(), 1);
    }

    #[tokio::test]
    async fn test_population_respects_window() {
        let source = SnapshotSource::from_json_str(SNAPSHOT).expect("snapshot");

        let mut all = source.best_results(Chain::Mainnet, window(1, 30)).await.expect("population");
        all.sort();
        assert_eq!(all, vec![30, 40]);

        let mut recent = source.best_results(Chain::Mainnet, window(5, 30)).await.expect("population");
        recent.sort();
        assert_eq!(recent, vec![25, 30]);

        let producer = SubjectId::producer(Chain::Mainnet, "bp1");
        let node = SubjectId::node(Chain::Mainnet, "bp1", 1);
        let unknown = SubjectId::node(Chain::Mainnet, "bp1", 99);
        assert_eq!(
            source.subject_best_results(&producer, window(5, 30)).await.expect("population"),
            Some(30)
        );
        assert_eq!(
            source.subject_best_results(&node, window(1, 30)).await.expect("population"),
            Some(40)
        );
        assert_eq!(
            source.subject_best_results(&unknown, window(1, 30)).await.expect("population"),
            None
        );

        // June 10th samples fall after a window ending on the 5th.
        assert_eq!(
            source.best_results(Chain::Mainnet, window(1, 5)).await.expect("population"),
            vec![40]
        );
        assert_eq!(
            source.subject_best_results(&producer, window(5, 9)).await.expect("population"),
            None
        );
    }

    #[tokio::test]
    async fn test_recent_proposals_newest_first() {
        let source = SnapshotSource::from_json_str(SNAPSHOT).expect("snapshot");

        let names = source
            .recent_proposals(Chain::Mainnet, 5)
            .await
            .expect("proposals")
            .into_iter()
            .map(|proposal| proposal.proposal_name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["new", "old"]);
        assert_eq!(
            source.recent_proposals(Chain::Mainnet, 1).await.expect("proposals").len(),
            1
        );
    }

    #[tokio::test]
    async fn test_counterpart_uses_both_map_sources() {
        let source = SnapshotSource::from_json_str(SNAPSHOT).expect("snapshot");

        assert_eq!(
            source
                .counterpart("bp1", Chain::Mainnet, Chain::Testnet)
                .await
                .expect("counterpart")
                .as_deref(),
            Some("bp1test")
        );
        assert_eq!(
            source
                .counterpart("bp2test", Chain::Testnet, Chain::Mainnet)
                .await
                .expect("counterpart")
                .as_deref(),
            Some("bp2")
        );
        assert_eq!(
            source
                .counterpart("bp9", Chain::Mainnet, Chain::Testnet)
                .await
                .expect("counterpart"),
            None
        );
    }

    #[test]
    fn test_malformed_snapshot() {
        assert!(matches!(
            SnapshotSource::from_json_str("{\"producers\": 3}"),
            Err(StoreError::Encoding(_))
        ));
    }
}
