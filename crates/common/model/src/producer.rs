use bpmon_network_spec::networks::Chain;
use serde::{Deserialize, Serialize};

use crate::{
    node::Node,
    votes::{BundleVote, FeeMultiplier, FeeVote, Tool},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerStatus {
    Active,
    Inactive,
    Removed,
}

/// Organisation metadata published in the producer's bp.json.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedData {
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location_country: Option<String>,
}

/// The lightweight view used to rank and enumerate producers before loading them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSummary {
    pub owner: String,
    pub chain: Chain,
    pub status: ProducerStatus,
    pub total_votes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producer {
    pub owner: String,
    pub chain: Chain,
    pub status: ProducerStatus,
    #[serde(rename = "total_votes")]
    pub total_votes: u64,
    #[serde(default)]
    pub extended_data: Option<ExtendedData>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub fee_votes: Vec<FeeVote>,
    #[serde(default)]
    pub fee_multiplier: Option<FeeMultiplier>,
    #[serde(default)]
    pub bundle_votes: Option<BundleVote>,
    #[serde(default)]
    pub tools: Vec<Tool>,
}

impl Producer {
    pub fn summary(&self) -> ProducerSummary {
        ProducerSummary {
            owner: self.owner.clone(),
            chain: self.chain,
            status: self.status,
            total_votes: self.total_votes,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProducerStatus::Active
    }

    pub fn node(&self, node_id: u64) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    /// Nodes that serve the chain API and therefore get a score of their own.
    pub fn api_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.api)
    }
}
