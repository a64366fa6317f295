use std::time::Duration;

use anyhow::{anyhow, ensure};
use async_trait::async_trait;
use bpmon_network_spec::networks::Chain;
use bpmon_scoring::sources::ReliabilityFeed;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ReliabilityResponse {
    reliability: Option<f64>,
}

/// Reads block production reliability from an HTTP feed at
/// `{base_url}/reliability/{network_id}/{owner}`.
///
/// The feed answers `{"reliability": <percent>}`. A 404, or a null value, means it has no data
/// for the producer.
#[derive(Debug, Clone)]
pub struct HttpReliabilityFeed {
    client: Client,
    base_url: Url,
}

impl HttpReliabilityFeed {
    pub fn new(base_url: Url, timeout: Duration) -> anyhow::Result<Self> {
        ensure!(
            !base_url.cannot_be_a_base(),
            "Reliability feed url {base_url} cannot be used as a base"
        );
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    pub fn endpoint(&self, chain: Chain, owner: &str) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Reliability feed url {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(["reliability", chain.spec().reliability_network_id, owner]);
        Ok(url)
    }
}

#[async_trait]
impl ReliabilityFeed for HttpReliabilityFeed {
    async fn reliability(&self, chain: Chain, owner: &str) -> anyhow::Result<Option<f64>> {
        let endpoint = self.endpoint(chain, owner)?;
        let response = self.client.get(endpoint.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(%endpoint, "No reliability data");
            return Ok(None);
        }

        let response = response.error_for_status()?;
        Ok(response.json::<ReliabilityResponse>().await?.reliability)
    }
}
