use std::collections::BTreeMap;

use bpmon_model::subject::SubjectKind;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

macro_rules! named_checks {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident => ($label:literal, $subject:ident) ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( #[serde(rename = $label)] $variant ),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),* ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),*
                }
            }

            /// The kind of subject this check can be evaluated against.
            pub fn subject(&self) -> SubjectKind {
                match self {
                    $( $name::$variant => SubjectKind::$subject ),*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|check| check.name() == name)
            }
        }
    };
}

named_checks! {
    /// Yes/no facts read off a subject's loaded associations.
    pub enum BooleanCheck {
        HasBpJson => ("has_bp_json", Producer),
        ReportsProducerNode => ("reports_producer_node", Producer),
        ReportsSeedNode => ("reports_seed_node", Producer),
        ReportsQueryNode => ("reports_query_node", Producer),
        RunsApiNode => ("runs_api_node", Producer),
        ReportsLatestVersion => ("reports_latest_version", Producer),
        RunsHistoryNode => ("runs_history_node", Producer),
        RunsHyperionNode => ("runs_hyperion_node", Producer),
        FeeVotes => ("fee_votes", Producer),
        FeeVotedRecently => ("fee_voted_recently", Producer),
        BundleVotes => ("bundle_votes", Producer),
        RunsTools => ("runs_tools", Producer),
        NodeActive => ("node_active", Node),
        NodeReportsLatestVersion => ("node_reports_latest_version", Node),
        NodeRunsHistory => ("node_runs_history", Node),
        NodeRunsHyperion => ("node_runs_hyperion", Node),
        NodeAvailable => ("node_available", Node),
    }
}

named_checks! {
    /// "Must not be X" checks. They only ever subtract.
    pub enum PenaltyCheck {
        BlockReliability => ("block_reliability", Producer),
        ReportsDownNode => ("reports_down_node", Producer),
        ReportsWrongChainNode => ("reports_wrong_chain_node", Producer),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceMetric {
    Participation,
    Timeliness,
}

/// How a criterion is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CriterionKind {
    /// Full weight when the check holds.
    Boolean { check: BooleanCheck },
    /// Full weight when the subject's best API result count clears the population percentile.
    Percentile { percentile: u8 },
    /// Full weight when the producer's multisig record meets the pass percentage.
    Governance { metric: GovernanceMetric },
    /// Subtracts up to the weight; never counts toward the maximum score.
    Penalty { check: PenaltyCheck },
    /// A share of the counterpart chain's score.
    CrossChainBonus,
}

impl CriterionKind {
    /// Resolves the criterion names used by key/value catalogs.
    ///
    /// Percentile criteria (`results_*` and `node_results_*`) take their rank from
    /// `percentiles`, looked up by the producer-level name.
    pub fn for_name(name: &str, percentiles: &BTreeMap<String, u8>) -> Result<Self, ConfigError> {
        if let Some(check) = BooleanCheck::from_name(name) {
            return Ok(CriterionKind::Boolean { check });
        }
        if let Some(check) = PenaltyCheck::from_name(name) {
            return Ok(CriterionKind::Penalty { check });
        }

        match name {
            "signs_msigs" => Ok(CriterionKind::Governance {
                metric: GovernanceMetric::Participation,
            }),
            "signs_msigs_quickly" => Ok(CriterionKind::Governance {
                metric: GovernanceMetric::Timeliness,
            }),
            "testnet_bonus" => Ok(CriterionKind::CrossChainBonus),
            _ => {
                let producer_name = name.strip_prefix("node_").unwrap_or(name);
                if !producer_name.starts_with("results_") {
                    return Err(ConfigError::UnknownCriterion(name.to_string()));
                }
                let percentile = percentiles
                    .get(name)
                    .or_else(|| percentiles.get(producer_name))
                    .copied()
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: name.to_string(),
                        reason: "no percentile configured".to_string(),
                    })?;
                Ok(CriterionKind::Percentile { percentile })
            }
        }
    }
}

/// Largest weight magnitude a criterion may carry. Keeps every score sum far from overflow.
pub const MAX_WEIGHT: i64 = 1_000_000;

/// One named, independently weighted scoring rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    /// Points awarded, or the maximum points deducted for penalties.
    pub weight: i64,
    #[serde(flatten)]
    pub kind: CriterionKind,
}

impl Criterion {
    pub fn new(name: impl Into<String>, weight: i64, kind: CriterionKind) -> Self {
        Self {
            name: name.into(),
            weight,
            kind,
        }
    }

    /// Magnitude of the weight. Penalty sets may be written with negative weights.
    pub fn points(&self) -> i64 {
        self.weight.abs()
    }

    pub fn is_penalty(&self) -> bool {
        matches!(self.kind, CriterionKind::Penalty { .. })
    }

    pub(crate) fn validate(&self, rule_set: &str, subject: SubjectKind) -> Result<(), ConfigError> {
        let misplaced = |reason| ConfigError::MisplacedCriterion {
            criterion: self.name.clone(),
            rule_set: rule_set.to_string(),
            reason,
        };

        let valid_weight = self.weight.unsigned_abs() <= MAX_WEIGHT.unsigned_abs()
            && match self.kind {
                CriterionKind::Penalty { .. } => self.weight != 0,
                _ => self.weight > 0,
            };
        if !valid_weight {
            return Err(ConfigError::InvalidWeight {
                criterion: self.name.clone(),
                weight: self.weight,
            });
        }

        match &self.kind {
            CriterionKind::Boolean { check } if check.subject() != subject => {
                Err(misplaced("check targets a different subject kind"))
            }
            CriterionKind::Penalty { check } if check.subject() != subject => {
                Err(misplaced("check targets a different subject kind"))
            }
            CriterionKind::Percentile { percentile } if *percentile > 100 => {
                Err(ConfigError::InvalidPercentile {
                    criterion: self.name.clone(),
                    percentile: *percentile,
                })
            }
            CriterionKind::Governance { .. } if subject != SubjectKind::Producer => {
                Err(misplaced("governance applies to producers only"))
            }
            CriterionKind::CrossChainBonus if subject != SubjectKind::Producer => {
                Err(misplaced("cross-chain bonus applies to producers only"))
            }
            _ => Ok(()),
        }
    }
}
