use std::time::Duration;

use bpmon_catalog::errors::ConfigError;
use bpmon_model::{
    proposal::SignerPayloadError,
    subject::{SubjectId, SubjectKind},
};
use thiserror::Error;

/// Everything that can go wrong while scoring.
///
/// Only [`ScoringError::Configuration`] stops a cycle. The other variants are contained at the
/// criterion or subject they occurred in.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("No population measurements available for the percentile threshold")]
    PopulationUnavailable,

    #[error("Malformed signer payload in proposal {proposal} at block {block_num}: {source}")]
    MalformedGovernanceRecord {
        proposal: String,
        block_num: u64,
        #[source]
        source: SignerPayloadError,
    },

    #[error("{lookup} lookup failed: {reason}")]
    ExternalLookupFailure { lookup: &'static str, reason: String },

    #[error("{lookup} lookup timed out after {timeout:?}")]
    LookupTimeout {
        lookup: &'static str,
        timeout: Duration,
    },

    #[error("Criterion {criterion} cannot be evaluated for a {subject}")]
    UnsupportedCriterion {
        criterion: String,
        subject: SubjectKind,
    },

    #[error("Failed to load {subject}: {reason}")]
    SubjectLoadFailure { subject: SubjectId, reason: String },

    #[error("Failed to store score record for {subject}: {reason}")]
    StoreFailure { subject: SubjectId, reason: String },

    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl ScoringError {
    pub fn lookup(lookup: &'static str, err: anyhow::Error) -> Self {
        ScoringError::ExternalLookupFailure {
            lookup,
            reason: format!("{err:#}"),
        }
    }
}
