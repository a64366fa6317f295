use std::{collections::HashSet, fs, path::Path, time::Duration};

use bpmon_model::subject::SubjectKind;
use bpmon_network_spec::networks::Chain;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    criterion::{BooleanCheck, Criterion, CriterionKind, GovernanceMetric, PenaltyCheck},
    errors::ConfigError,
    grades::GradeTable,
};

/// A group of criteria that apply together to one kind of subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub subject: SubjectKind,
    /// Restricts the set to these chains. All chains when absent.
    #[serde(default)]
    pub chains: Option<Vec<Chain>>,
    /// Restricts the set to the top-tier producers by votes, or to their nodes.
    #[serde(default)]
    pub top_tier_only: bool,
    pub criteria: Vec<Criterion>,
}

impl RuleSet {
    pub fn applies_to(&self, subject: SubjectKind, chain: Chain, top_tier: bool) -> bool {
        self.subject == subject
            && (!self.top_tier_only || top_tier)
            && self
                .chains
                .as_ref()
                .is_none_or(|chains| chains.contains(&chain))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            if !seen.insert(criterion.name.as_str()) {
                return Err(ConfigError::DuplicateCriterion {
                    criterion: criterion.name.clone(),
                    rule_set: self.name.clone(),
                });
            }
            criterion.validate(&self.name, self.subject)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// How many of the most recent proposals are evaluated.
    pub proposal_count: usize,
    /// Percentage a producer must reach to pass a governance criterion.
    pub pass_percent: u8,
    /// Signing within this many days of the proposal counts as a quick turnaround.
    pub quick_turnaround_days: u32,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            proposal_count: 25,
            pass_percent: 75,
            quick_turnaround_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    /// Reliability below this percentage costs the full penalty.
    pub floor_percent: f64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            floor_percent: 95.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossChainConfig {
    /// Producers on this chain receive the bonus.
    pub bonus_chain: Chain,
    /// The chain whose scores are propagated.
    pub counterpart_chain: Chain,
}

impl Default for CrossChainConfig {
    fn default() -> Self {
        Self {
            bonus_chain: Chain::Mainnet,
            counterpart_chain: Chain::Testnet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Rolling window for API result-count samples and node liveness probes.
    pub results_days: u32,
    /// A fee vote younger than this counts as recent.
    pub recent_vote_days: u32,
    /// Share of healthy liveness probes a node needs within the window.
    pub node_availability_percent: u8,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            results_days: 30,
            recent_vote_days: 30,
            node_availability_percent: 90,
        }
    }
}

/// The criteria catalog: every weight, threshold and window the calculator uses.
///
/// A catalog is an immutable value; build it once, call [`Catalog::validate`] and hand it to
/// the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub rule_sets: Vec<RuleSet>,
    #[serde(default)]
    pub grades: GradeTable,
    #[serde(default)]
    pub governance: GovernanceConfig,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
    #[serde(default)]
    pub cross_chain: CrossChainConfig,
    #[serde(default)]
    pub windows: WindowConfig,
    /// Producers ranked within this many by votes are top tier.
    #[serde(default = "default_top_tier_size")]
    pub top_tier_size: usize,
    /// Upper bound on subjects scored at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Bound on every collaborator read made while evaluating a criterion.
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

fn default_top_tier_size() -> usize {
    21
}

fn default_concurrency() -> usize {
    8
}

fn default_lookup_timeout_ms() -> u64 {
    5_000
}

impl Catalog {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let catalog: Catalog =
            serde_yaml::from_str(yaml).map_err(|err| ConfigError::Parse(err.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let catalog = Self::from_yaml_str(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), rule_sets = catalog.rule_sets.len(), "Loaded criteria catalog");
        Ok(catalog)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// Rule sets that apply to a subject, in catalog order.
    pub fn rule_sets_for(
        &self,
        subject: SubjectKind,
        chain: Chain,
        top_tier: bool,
    ) -> impl Iterator<Item = &RuleSet> {
        self.rule_sets
            .iter()
            .filter(move |rule_set| rule_set.applies_to(subject, chain, top_tier))
    }

    /// Whether any rule set scores the given kind of subject.
    pub fn scores(&self, subject: SubjectKind) -> bool {
        self.rule_sets
            .iter()
            .any(|rule_set| rule_set.subject == subject && !rule_set.criteria.is_empty())
    }

    /// A cross-chain bonus can only award points on the bonus chain, so its rule set must not
    /// apply anywhere else.
    fn validate_bonus_placement(&self, rule_set: &RuleSet) -> Result<(), ConfigError> {
        let bonus_chain = self.cross_chain.bonus_chain;
        let off_bonus_chain = rule_set
            .chains
            .as_ref()
            .is_none_or(|chains| chains.iter().any(|chain| *chain != bonus_chain));
        let bonus = rule_set
            .criteria
            .iter()
            .find(|criterion| criterion.kind == CriterionKind::CrossChainBonus);
        match bonus {
            Some(bonus) if off_bonus_chain => Err(ConfigError::MisplacedCriterion {
                criterion: bonus.name.clone(),
                rule_set: rule_set.name.clone(),
                reason: "cross-chain bonus needs a rule set limited to the bonus chain",
            }),
            _ => Ok(()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for rule_set in &self.rule_sets {
            rule_set.validate()?;
            self.validate_bonus_placement(rule_set)?;
        }

        if self.governance.pass_percent > 100 {
            return Err(invalid("governance.pass_percent", "must be at most 100"));
        }
        if self.governance.proposal_count == 0 {
            return Err(invalid("governance.proposal_count", "must be positive"));
        }
        if !(0.0..100.0).contains(&self.reliability.floor_percent) {
            return Err(invalid("reliability.floor_percent", "must be in 0..100"));
        }
        if self.cross_chain.bonus_chain == self.cross_chain.counterpart_chain {
            return Err(invalid(
                "cross_chain",
                "bonus and counterpart chain must differ",
            ));
        }
        if self.windows.node_availability_percent > 100 {
            return Err(invalid(
                "windows.node_availability_percent",
                "must be at most 100",
            ));
        }
        if self.concurrency == 0 {
            return Err(invalid("concurrency", "must be positive"));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(invalid("lookup_timeout_ms", "must be positive"));
        }
        Ok(())
    }
}

impl Default for Catalog {
    /// The weights the monitor has been deployed with.
    fn default() -> Self {
        let boolean = |name: &str, weight, check| {
            Criterion::new(name, weight, CriterionKind::Boolean { check })
        };
        let percentile = |name: &str, weight, percentile| {
            Criterion::new(name, weight, CriterionKind::Percentile { percentile })
        };

        Self {
            rule_sets: vec![
                RuleSet {
                    name: "all".to_string(),
                    subject: SubjectKind::Producer,
                    chains: None,
                    top_tier_only: false,
                    criteria: vec![
                        boolean("has_bp_json", 10, BooleanCheck::HasBpJson),
                        boolean("reports_producer_node", 10, BooleanCheck::ReportsProducerNode),
                        boolean("reports_seed_node", 10, BooleanCheck::ReportsSeedNode),
                        boolean("reports_query_node", 10, BooleanCheck::ReportsQueryNode),
                        boolean("runs_api_node", 20, BooleanCheck::RunsApiNode),
                        boolean("reports_latest_version", 20, BooleanCheck::ReportsLatestVersion),
                        boolean("runs_history_node", 20, BooleanCheck::RunsHistoryNode),
                        boolean("runs_hyperion_node", 20, BooleanCheck::RunsHyperionNode),
                        percentile("results_a", 10, 75),
                        percentile("results_b", 10, 50),
                        percentile("results_c", 10, 25),
                        boolean("fee_votes", 20, BooleanCheck::FeeVotes),
                        boolean("fee_voted_recently", 20, BooleanCheck::FeeVotedRecently),
                        boolean("bundle_votes", 20, BooleanCheck::BundleVotes),
                        boolean("runs_tools", 30, BooleanCheck::RunsTools),
                    ],
                },
                RuleSet {
                    name: "top21".to_string(),
                    subject: SubjectKind::Producer,
                    chains: None,
                    top_tier_only: true,
                    criteria: vec![
                        Criterion::new(
                            "signs_msigs",
                            30,
                            CriterionKind::Governance {
                                metric: GovernanceMetric::Participation,
                            },
                        ),
                        Criterion::new(
                            "signs_msigs_quickly",
                            30,
                            CriterionKind::Governance {
                                metric: GovernanceMetric::Timeliness,
                            },
                        ),
                    ],
                },
                RuleSet {
                    name: "mainnet".to_string(),
                    subject: SubjectKind::Producer,
                    chains: Some(vec![Chain::Mainnet]),
                    top_tier_only: false,
                    criteria: vec![Criterion::new(
                        "testnet_bonus",
                        20,
                        CriterionKind::CrossChainBonus,
                    )],
                },
                RuleSet {
                    name: "penalties".to_string(),
                    subject: SubjectKind::Producer,
                    chains: None,
                    top_tier_only: false,
                    criteria: vec![
                        Criterion::new(
                            "block_reliability",
                            -50,
                            CriterionKind::Penalty {
                                check: PenaltyCheck::BlockReliability,
                            },
                        ),
                        Criterion::new(
                            "reports_down_node",
                            -10,
                            CriterionKind::Penalty {
                                check: PenaltyCheck::ReportsDownNode,
                            },
                        ),
                        Criterion::new(
                            "reports_wrong_chain_node",
                            -20,
                            CriterionKind::Penalty {
                                check: PenaltyCheck::ReportsWrongChainNode,
                            },
                        ),
                    ],
                },
                RuleSet {
                    name: "nodes".to_string(),
                    subject: SubjectKind::Node,
                    chains: None,
                    top_tier_only: false,
                    criteria: vec![
                        boolean("node_active", 20, BooleanCheck::NodeActive),
                        boolean(
                            "node_reports_latest_version",
                            20,
                            BooleanCheck::NodeReportsLatestVersion,
                        ),
                        boolean("node_runs_history", 10, BooleanCheck::NodeRunsHistory),
                        boolean("node_runs_hyperion", 10, BooleanCheck::NodeRunsHyperion),
                        boolean("node_available", 20, BooleanCheck::NodeAvailable),
                        percentile("node_results_a", 10, 75),
                        percentile("node_results_b", 10, 50),
                        percentile("node_results_c", 10, 25),
                    ],
                },
            ],
            grades: GradeTable::default(),
            governance: GovernanceConfig::default(),
            reliability: ReliabilityConfig::default(),
            cross_chain: CrossChainConfig::default(),
            windows: WindowConfig::default(),
            top_tier_size: default_top_tier_size(),
            concurrency: default_concurrency(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = Catalog::default();
        catalog.validate().expect("default catalog");
        assert!(catalog.scores(SubjectKind::Producer));
        assert!(catalog.scores(SubjectKind::Node));
    }

    #[test]
    fn test_rule_set_scoping() {
        let catalog = Catalog::default();

        let names = |chain, top_tier| {
            catalog
                .rule_sets_for(SubjectKind::Producer, chain, top_tier)
                .map(|rule_set| rule_set.name.as_str())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            names(Chain::Mainnet, true),
            ["all", "top21", "mainnet", "penalties"]
        );
        assert_eq!(names(Chain::Testnet, false), ["all", "penalties"]);
        assert_eq!(
            catalog
                .rule_sets_for(SubjectKind::Node, Chain::Testnet, false)
                .count(),
            1
        );
    }

    #[test]
    fn test_yaml_catalog_round_trip() {
        let yaml = serde_yaml::to_string(&Catalog::default()).expect("serialize");
        let catalog = Catalog::from_yaml_str(&yaml).expect("parse");
        assert_eq!(catalog, Catalog::default());
    }

    #[test]
    fn test_yaml_catalog_with_defaults() {
        let yaml = r#"
rule_sets:
  - name: minimal
    subject: producer
    criteria:
      - name: has_bp_json
        weight: 10
        kind: boolean
        check: has_bp_json
grades:
  A: [50, 100]
  F: [0, 49]
"#;
        let catalog = Catalog::from_yaml_str(yaml).expect("catalog");
        assert_eq!(catalog.top_tier_size, 21);
        assert_eq!(catalog.governance, GovernanceConfig::default());
        assert_eq!(catalog.grades.lowest(), "F");
    }

    #[test]
    fn test_yaml_catalog_with_gap_fails_fast() {
        let yaml = r#"
rule_sets: []
grades:
  A: [91, 100]
  F: [0, 80]
"#;
        assert!(matches!(
            Catalog::from_yaml_str(yaml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_duplicate_criterion_in_rule_set() {
        let mut catalog = Catalog::default();
        let duplicate = catalog.rule_sets[0].criteria[0].clone();
        catalog.rule_sets[0].criteria.push(duplicate);
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::DuplicateCriterion { .. })
        ));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut catalog = Catalog::default();
        catalog.concurrency = 0;
        assert!(catalog.validate().is_err());

        let mut catalog = Catalog::default();
        catalog.cross_chain.counterpart_chain = Chain::Mainnet;
        assert!(catalog.validate().is_err());

        let mut catalog = Catalog::default();
        catalog.reliability.floor_percent = 100.0;
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_bonus_outside_the_bonus_chain_is_rejected() {
        let mut catalog = Catalog::default();
        let mainnet = catalog
            .rule_sets
            .iter_mut()
            .find(|rule_set| rule_set.name == "mainnet")
            .expect("mainnet rule set");
        mainnet.chains = None;
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::MisplacedCriterion { .. })
        ));

        let mut catalog = Catalog::default();
        catalog.cross_chain.bonus_chain = Chain::Testnet;
        catalog.cross_chain.counterpart_chain = Chain::Mainnet;
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::MisplacedCriterion { .. })
        ));
    }

    #[test]
    fn test_oversized_weight_fails_fast() {
        let yaml = r#"
rule_sets:
  - name: all
    subject: producer
    criteria:
      - { name: fee_votes, weight: 9223372036854775807, kind: boolean, check: fee_votes }
      - { name: runs_tools, weight: 10, kind: boolean, check: runs_tools }
grades:
  A: [50, 100]
  F: [0, 49]
"#;
        assert!(matches!(
            Catalog::from_yaml_str(yaml),
            Err(ConfigError::InvalidWeight { weight: i64::MAX, .. })
        ));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            serde_yaml::to_string(&Catalog::default())
                .expect("serialize")
                .as_bytes(),
        )
        .expect("write");

        let catalog = Catalog::from_yaml_file(file.path()).expect("catalog");
        assert_eq!(catalog.rule_sets.len(), 5);
    }
}
