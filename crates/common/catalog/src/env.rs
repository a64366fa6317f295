//! Builds a [`Catalog`] from deployment key/value settings.
//!
//! Weight tables are JSON objects mapping criterion names to weights, e.g.
//! `SCORING_CRITERIA='{"has_bp_json":10,"runs_api_node":20}'`. Criterion kinds are resolved
//! from the names with [`CriterionKind::for_name`]. Unset keys keep the defaults below.

use std::{collections::BTreeMap, env, fmt::Display, str::FromStr};

use bpmon_model::subject::SubjectKind;
use bpmon_network_spec::networks::Chain;
use serde::de::DeserializeOwned;

use crate::{
    catalog::{
        Catalog, CrossChainConfig, GovernanceConfig, ReliabilityConfig, RuleSet, WindowConfig,
    },
    criterion::{Criterion, CriterionKind},
    errors::ConfigError,
    grades::GradeTable,
};

pub const DEFAULT_SCORING_CRITERIA: &str = r#"{"has_bp_json":10,"reports_producer_node":10,"reports_seed_node":10,"reports_query_node":10,"runs_api_node":20,"reports_latest_version":20,"runs_history_node":20,"runs_hyperion_node":20,"results_a":10,"results_b":10,"results_c":10,"fee_votes":20,"fee_voted_recently":20,"bundle_votes":20,"runs_tools":30}"#;
pub const DEFAULT_SCORING_CRITERIA_TOP21: &str = r#"{"signs_msigs":30,"signs_msigs_quickly":30}"#;
pub const DEFAULT_SCORING_CRITERIA_MAINNET: &str = r#"{"testnet_bonus":20}"#;
pub const DEFAULT_SCORING_PENALTIES: &str =
    r#"{"block_reliability":-50,"reports_down_node":-10,"reports_wrong_chain_node":-20}"#;
pub const DEFAULT_SCORING_CRITERIA_NODES: &str = r#"{"node_active":20,"node_reports_latest_version":20,"node_runs_history":10,"node_runs_hyperion":10,"node_available":20,"node_results_a":10,"node_results_b":10,"node_results_c":10}"#;
pub const DEFAULT_RESULT_PERCENTILES: &str = r#"{"results_a":75,"results_b":50,"results_c":25}"#;

impl Catalog {
    /// Reads the catalog from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the catalog through `lookup`, so callers can supply settings from any key/value
    /// source without touching process state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let percentiles: BTreeMap<String, u8> =
            parse_json(&lookup, "RESULT_PERCENTILES", DEFAULT_RESULT_PERCENTILES)?;

        let rule_set = |key: &str, default: &str, name: &str, subject, chains, top_tier_only| {
            let weights: BTreeMap<String, i64> = parse_json(&lookup, key, default)?;
            let criteria = weights
                .into_iter()
                .map(|(criterion, weight)| {
                    let kind = CriterionKind::for_name(&criterion, &percentiles)?;
                    Ok(Criterion::new(criterion, weight, kind))
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            Ok::<_, ConfigError>(RuleSet {
                name: name.to_string(),
                subject,
                chains,
                top_tier_only,
                criteria,
            })
        };

        let rule_sets = vec![
            rule_set(
                "SCORING_CRITERIA",
                DEFAULT_SCORING_CRITERIA,
                "all",
                SubjectKind::Producer,
                None,
                false,
            )?,
            rule_set(
                "SCORING_CRITERIA_TOP21",
                DEFAULT_SCORING_CRITERIA_TOP21,
                "top21",
                SubjectKind::Producer,
                None,
                true,
            )?,
            rule_set(
                "SCORING_CRITERIA_MAINNET",
                DEFAULT_SCORING_CRITERIA_MAINNET,
                "mainnet",
                SubjectKind::Producer,
                Some(vec![Chain::Mainnet]),
                false,
            )?,
            rule_set(
                "SCORING_PENALTIES",
                DEFAULT_SCORING_PENALTIES,
                "penalties",
                SubjectKind::Producer,
                None,
                false,
            )?,
            rule_set(
                "SCORING_CRITERIA_NODES",
                DEFAULT_SCORING_CRITERIA_NODES,
                "nodes",
                SubjectKind::Node,
                None,
                false,
            )?,
        ];

        let grades = match lookup("GRADE_CHART") {
            Some(raw) => GradeTable::from_chart(
                serde_json::from_str(&raw).map_err(|err| invalid_value("GRADE_CHART", err))?,
            )?,
            None => GradeTable::default(),
        };

        let governance_defaults = GovernanceConfig::default();
        let window_defaults = WindowConfig::default();
        let catalog = Catalog {
            rule_sets,
            grades,
            governance: GovernanceConfig {
                proposal_count: parse_var(
                    &lookup,
                    "EVALUATE_MSIGS_COUNT",
                    governance_defaults.proposal_count,
                )?,
                pass_percent: parse_var(
                    &lookup,
                    "EVALUATE_MSIGS_PERCENT",
                    governance_defaults.pass_percent,
                )?,
                quick_turnaround_days: parse_var(
                    &lookup,
                    "EVALUATE_MSIGS_TIME",
                    governance_defaults.quick_turnaround_days,
                )?,
            },
            reliability: ReliabilityConfig {
                floor_percent: parse_var(
                    &lookup,
                    "RELIABILITY_FLOOR",
                    ReliabilityConfig::default().floor_percent,
                )?,
            },
            cross_chain: CrossChainConfig::default(),
            windows: WindowConfig {
                results_days: parse_var(
                    &lookup,
                    "RESULTS_WINDOW_DAYS",
                    window_defaults.results_days,
                )?,
                recent_vote_days: parse_var(
                    &lookup,
                    "RECENT_VOTE_DAYS",
                    window_defaults.recent_vote_days,
                )?,
                node_availability_percent: parse_var(
                    &lookup,
                    "NODE_AVAILABILITY_PERCENT",
                    window_defaults.node_availability_percent,
                )?,
            },
            top_tier_size: parse_var(&lookup, "TOP_TIER_SIZE", 21)?,
            concurrency: parse_var(&lookup, "SCORING_CONCURRENCY", 8)?,
            lookup_timeout_ms: parse_var(&lookup, "LOOKUP_TIMEOUT_MS", 5_000)?,
        };
        catalog.validate()?;
        Ok(catalog)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|err| invalid_value(key, err)),
        None => Ok(default),
    }
}

fn parse_json<T: DeserializeOwned>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError> {
    let raw = lookup(key);
    serde_json::from_str(raw.as_deref().unwrap_or(default)).map_err(|err| invalid_value(key, err))
}

fn invalid_value(key: &str, err: impl Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::criterion::{BooleanCheck, PenaltyCheck};

    fn lookup_from(entries: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_default_catalog_contents() {
        let catalog = Catalog::from_lookup(|_| None).expect("catalog");
        let default = Catalog::default();

        assert_eq!(catalog.rule_sets.len(), default.rule_sets.len());
        for (from_env, built_in) in catalog.rule_sets.iter().zip(&default.rule_sets) {
            let mut expected = built_in.criteria.clone();
            expected.sort_by(|a, b| a.name.cmp(&b.name));
            assert_eq!(from_env.name, built_in.name);
            assert_eq!(from_env.criteria, expected);
        }
        assert_eq!(catalog.grades, default.grades);
        assert_eq!(catalog.governance, default.governance);
    }

    #[test]
    fn test_overrides() {
        let catalog = Catalog::from_lookup(lookup_from(&[
            ("SCORING_CRITERIA", r#"{"has_bp_json":5,"results_a":7}"#),
            ("RESULT_PERCENTILES", r#"{"results_a":90}"#),
            ("SCORING_PENALTIES", r#"{"reports_down_node":-3}"#),
            ("SCORING_CRITERIA_NODES", "{}"),
            ("GRADE_CHART", r#"{"A":[91,100],"B":[81,90],"F":[0,80]}"#),
            ("EVALUATE_MSIGS_TIME", "3"),
            ("TOP_TIER_SIZE", "30"),
        ]))
        .expect("catalog");

        let all = &catalog.rule_sets[0];
        assert_eq!(
            all.criteria,
            vec![
                Criterion::new(
                    "has_bp_json",
                    5,
                    CriterionKind::Boolean {
                        check: BooleanCheck::HasBpJson
                    }
                ),
                Criterion::new("results_a", 7, CriterionKind::Percentile { percentile: 90 }),
            ]
        );
        assert_eq!(
            catalog.rule_sets[3].criteria[0].kind,
            CriterionKind::Penalty {
                check: PenaltyCheck::ReportsDownNode
            }
        );
        assert!(!catalog.scores(SubjectKind::Node));
        assert_eq!(catalog.grades.ranges().len(), 3);
        assert_eq!(catalog.governance.quick_turnaround_days, 3);
        assert_eq!(catalog.top_tier_size, 30);
    }

    #[test]
    fn test_malformed_settings_fail() {
        assert!(matches!(
            Catalog::from_lookup(lookup_from(&[("SCORING_CRITERIA", "not json")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Catalog::from_lookup(lookup_from(&[("SCORING_CRITERIA", r#"{"mystery":10}"#)])),
            Err(ConfigError::UnknownCriterion(_))
        ));
        assert!(matches!(
            Catalog::from_lookup(lookup_from(&[("SCORING_CRITERIA", r#"{"has_bp_json":0}"#)])),
            Err(ConfigError::InvalidWeight { .. })
        ));
        assert!(matches!(
            Catalog::from_lookup(lookup_from(&[("GRADE_CHART", r#"{"A":[91,100],"F":[0,80]}"#)])),
            Err(ConfigError::GradeTableGap { .. })
        ));
        assert!(matches!(
            Catalog::from_lookup(lookup_from(&[("SCORING_CONCURRENCY", "many")])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
