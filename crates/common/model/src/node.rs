use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{version::ServerVersion, window::Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Producer,
    Seed,
    Query,
    Full,
    Api,
}

impl NodeType {
    /// Query and full nodes both serve chain queries.
    pub fn is_query(&self) -> bool {
        matches!(self, NodeType::Query | NodeType::Full)
    }
}

/// Node health as last written by the health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Active,
    Down,
    Reported,
    /// The node answered for the wrong chain.
    Inactive,
    Removed,
}

/// One `get_table_rows` probe: how many rows the node returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFetchCheck {
    pub time_stamp: DateTime<Utc>,
    pub results: u64,
}

/// One `get_info` liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiNodeCheck {
    pub time_stamp: DateTime<Utc>,
    /// HTTP status of the probe, 0 when the node could not be reached.
    pub status: u32,
    #[serde(default)]
    pub server_version: String,
}

impl ApiNodeCheck {
    pub fn is_healthy(&self) -> bool {
        self.status == 200 && !self.server_version.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub url: String,
    #[serde(default)]
    pub api: bool,
    #[serde(default, rename = "historyV1")]
    pub history_v1: bool,
    #[serde(default)]
    pub hyperion: bool,
    pub status: NodeStatus,
    #[serde(default)]
    pub server_version: String,
    #[serde(default, rename = "apiFetchChecks")]
    pub api_fetch_checks: Vec<ApiFetchCheck>,
    #[serde(default, rename = "apiNodeChecks")]
    pub api_node_checks: Vec<ApiNodeCheck>,
}

impl Node {
    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    pub fn version(&self) -> Option<ServerVersion> {
        ServerVersion::parse(&self.server_version)
    }

    /// Largest result count sampled within `window`.
    pub fn best_results_within(&self, window: Window) -> Option<u64> {
        self.api_fetch_checks
            .iter()
            .filter(|check| window.contains(check.time_stamp))
            .map(|check| check.results)
            .max()
    }

    /// Liveness probes taken within `window`.
    pub fn node_checks_within(&self, window: Window) -> impl Iterator<Item = &ApiNodeCheck> {
        self.api_node_checks
            .iter()
            .filter(move |check| window.contains(check.time_stamp))
    }
}
