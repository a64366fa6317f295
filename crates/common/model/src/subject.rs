use std::{fmt, str::FromStr};

use bpmon_network_spec::networks::Chain;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Producer,
    Node,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Producer => f.write_str("producer"),
            SubjectKind::Node => f.write_str("node"),
        }
    }
}

/// Identifies what a score record is about: a producer, or one node of a producer.
///
/// The textual form is `<chain>:<owner>` for producers and `<chain>:<owner>/<node id>` for
/// nodes; it is also the storage key prefix of the subject's score history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SubjectId {
    Producer { chain: Chain, owner: String },
    Node { chain: Chain, owner: String, node_id: u64 },
}

impl SubjectId {
    pub fn producer(chain: Chain, owner: impl Into<String>) -> Self {
        SubjectId::Producer {
            chain,
            owner: owner.into(),
        }
    }

    pub fn node(chain: Chain, owner: impl Into<String>, node_id: u64) -> Self {
        SubjectId::Node {
            chain,
            owner: owner.into(),
            node_id,
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            SubjectId::Producer { chain, .. } | SubjectId::Node { chain, .. } => *chain,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            SubjectId::Producer { owner, .. } | SubjectId::Node { owner, .. } => owner,
        }
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            SubjectId::Producer { .. } => SubjectKind::Producer,
            SubjectId::Node { .. } => SubjectKind::Node,
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectId::Producer { chain, owner } => write!(f, "{chain}:{owner}"),
            SubjectId::Node {
                chain,
                owner,
                node_id,
            } => write!(f, "{chain}:{owner}/{node_id}"),
        }
    }
}

impl FromStr for SubjectId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (chain, rest) = value
            .split_once(':')
            .ok_or_else(|| format!("Subject must look like <chain>:<owner>, got {value}"))?;
        let chain = chain.parse::<Chain>()?;
        match rest.split_once('/') {
            Some((owner, node_id)) if !owner.is_empty() => {
                let node_id = node_id
                    .parse()
                    .map_err(|err| format!("Invalid node id {node_id}: {err}"))?;
                Ok(SubjectId::node(chain, owner, node_id))
            }
            None if !rest.is_empty() => Ok(SubjectId::producer(chain, rest)),
            _ => Err(format!("Subject is missing an owner: {value}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_text_form() {
        let producer = SubjectId::producer(Chain::Mainnet, "bp1");
        let node = SubjectId::node(Chain::Testnet, "bp1", 42);

        assert_eq!(producer.to_string(), "mainnet:bp1");
        assert_eq!(node.to_string(), "testnet:bp1/42");
        assert_eq!("mainnet:bp1".parse::<SubjectId>(), Ok(producer));
        assert_eq!("testnet:bp1/42".parse::<SubjectId>(), Ok(node));
    }

    #[test]
    fn test_subject_parse_errors() {
        assert!("bp1".parse::<SubjectId>().is_err());
        assert!("mainnet:".parse::<SubjectId>().is_err());
        assert!("mainnet:bp1/x".parse::<SubjectId>().is_err());
        assert!("devnet:bp1".parse::<SubjectId>().is_err());
    }
}
