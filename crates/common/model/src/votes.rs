use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A producer's vote on one fee endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeVote {
    pub end_point: String,
    pub value: u64,
    pub last_vote: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeMultiplier {
    pub multiplier: f64,
    pub last_vote: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleVote {
    pub bundled_tx: u64,
    pub last_vote: DateTime<Utc>,
}

/// A public tool the producer operates for the community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub url: String,
}
