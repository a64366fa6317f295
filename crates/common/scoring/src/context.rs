use std::collections::HashSet;

use bpmon_model::{producer::Producer, version::ServerVersion, window::Window};
use bpmon_network_spec::networks::Chain;
use chrono::{DateTime, Utc};

use crate::{governance::ProposalBook, percentile::Population};

/// Chain-wide facts materialised once per cycle and shared read-only by every subject of the
/// chain.
#[derive(Debug)]
pub struct ChainContext {
    pub chain: Chain,
    /// The instant the cycle scores as of. Every rolling window ends here.
    pub as_of: DateTime<Utc>,
    /// `None` when the population could not be read.
    pub population: Option<Population>,
    /// `None` when the proposals could not be read.
    pub proposals: Option<ProposalBook>,
    /// Greatest server version advertised by a node of an active producer.
    pub latest_version: Option<ServerVersion>,
    /// Owners of the top-tier producers by votes.
    pub top_tier: HashSet<String>,
}

impl ChainContext {
    pub fn new(chain: Chain, as_of: DateTime<Utc>) -> Self {
        Self {
            chain,
            as_of,
            population: None,
            proposals: None,
            latest_version: None,
            top_tier: HashSet::new(),
        }
    }

    pub fn is_top_tier(&self, owner: &str) -> bool {
        self.top_tier.contains(owner)
    }

    /// The rolling window of `days` ending at `as_of`.
    pub fn window(&self, days: u32) -> Window {
        Window::days_before(self.as_of, days)
    }
}

/// Greatest version among the nodes of the active producers in `producers`.
pub fn latest_version<'a>(
    producers: impl IntoIterator<Item = &'a Producer>,
) -> Option<ServerVersion> {
    producers
        .into_iter()
        .filter(|producer| producer.is_active())
        .flat_map(|producer| producer.nodes.iter())
        .filter_map(|node| node.version())
        .max()
}

#[cfg(test)]
mod tests {
    use bpmon_model::{
        node::{Node, NodeStatus, NodeType},
        producer::ProducerStatus,
    };

    use super::*;

    fn producer(status: ProducerStatus, versions: &[&str]) -> Producer {
        Producer {
            owner: "bp1".to_string(),
            chain: Chain::Mainnet,
            status,
            total_votes: 0,
            extended_data: None,
            nodes: versions
                .iter()
                .enumerate()
                .map(|(id, version)| Node {
                    id: id as u64,
                    node_type: NodeType::Api,
                    url: "https://api.example.io".to_string(),
                    api: true,
                    history_v1: false,
                    hyperion: false,
                    status: NodeStatus::Active,
                    server_version: version.to_string(),
                    api_fetch_checks: vec![],
                    api_node_checks: vec![],
                })
                .collect(),
            fee_votes: vec![],
            fee_multiplier: None,
            bundle_votes: None,
            tools: vec![],
        }
    }

    #[test]
    fn test_latest_version_ignores_inactive_producers() {
        let producers = [
            producer(ProducerStatus::Active, &["v3.4.1", "garbage"]),
            producer(ProducerStatus::Active, &["v3.10.0-rc1"]),
            producer(ProducerStatus::Inactive, &["v4.0.0"]),
        ];
        assert_eq!(
            latest_version(&producers).map(|version| version.to_string()),
            Some("3.10.0".to_string())
        );
        assert_eq!(latest_version(&producers[2..]), None);
    }
}
