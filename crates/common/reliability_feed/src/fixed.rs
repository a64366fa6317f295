use std::collections::HashMap;

use async_trait::async_trait;
use bpmon_network_spec::networks::Chain;
use bpmon_scoring::sources::ReliabilityFeed;

/// Reliability figures known up front, such as those shipped with a snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticReliabilityFeed {
    reliability: HashMap<(Chain, String), f64>,
}

impl StaticReliabilityFeed {
    pub fn new(entries: impl IntoIterator<Item = (Chain, String, f64)>) -> Self {
        Self {
            reliability: entries
                .into_iter()
                .map(|(chain, owner, reliability)| ((chain, owner), reliability))
                .collect(),
        }
    }
}

#[async_trait]
impl ReliabilityFeed for StaticReliabilityFeed {
    async fn reliability(&self, chain: Chain, owner: &str) -> anyhow::Result<Option<f64>> {
        Ok(self.reliability.get(&(chain, owner.to_string())).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_per_chain() {
        let feed = StaticReliabilityFeed::new([(Chain::Mainnet, "bp1".to_string(), 99.5)]);

        assert_eq!(
            feed.reliability(Chain::Mainnet, "bp1")
                .await
                .expect("reliability"),
            Some(99.5)
        );
        assert_eq!(
            feed.reliability(Chain::Testnet, "bp1")
                .await
                .expect("reliability"),
            None
        );
    }
}
