use std::{
    fmt,
    str::FromStr,
    sync::{Arc, LazyLock},
};

use serde::{Deserialize, Serialize};

/// The chains a producer can be registered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chain {
    Mainnet,
    Testnet,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Mainnet, Chain::Testnet];

    pub fn spec(&self) -> Arc<ChainSpec> {
        match self {
            Chain::Mainnet => MAINNET.clone(),
            Chain::Testnet => TESTNET.clone(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Mainnet => "mainnet",
            Chain::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Chain::Mainnet),
            "testnet" => Ok(Chain::Testnet),
            other => Err(format!("Unknown chain: {other}")),
        }
    }
}

/// Static identifiers of a chain deployment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainSpec {
    pub chain: Chain,
    /// `chain_id` reported by `/v1/chain/get_info`.
    pub chain_id: &'static str,
    /// Account that proposes the governance multisigs we evaluate.
    pub proposer: &'static str,
    /// Network identifier understood by the block reliability feed.
    pub reliability_network_id: &'static str,
}

pub static MAINNET: LazyLock<Arc<ChainSpec>> = LazyLock::new(|| {
    ChainSpec {
        chain: Chain::Mainnet,
        chain_id: "21dcae42c0182200e93f954a074011f9048a7624c6fe81d3c9541a614a88bd1c",
        proposer: "fio1uipge5sr",
        reliability_network_id: "fio",
    }
    .into()
});

pub static TESTNET: LazyLock<Arc<ChainSpec>> = LazyLock::new(|| {
    ChainSpec {
        chain: Chain::Testnet,
        chain_id: "b20901380af44ef59c5918439a1f9a41d83669020319a80574b804a5f95cbd7e",
        proposer: "nyvrxkxhiyql",
        reliability_network_id: "fio-test",
    }
    .into()
});

/// Looks up the chain a `chain_id` belongs to.
pub fn chain_for_id(chain_id: &str) -> Option<Chain> {
    Chain::ALL
        .into_iter()
        .find(|chain| chain.spec().chain_id == chain_id)
}
