use std::{collections::BTreeMap, sync::Arc};

use bpmon_catalog::{
    catalog::Catalog,
    criterion::{BooleanCheck, Criterion, CriterionKind, GovernanceMetric, PenaltyCheck},
};
use bpmon_metrics::{DEGRADED_CRITERIA, inc_int_counter_vec};
use bpmon_model::{
    node::{Node, NodeStatus, NodeType},
    producer::Producer,
    score::{CriterionOutcome, ScoreCard},
    subject::{SubjectId, SubjectKind},
};
use chrono::Duration;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::{
    context::ChainContext,
    cross_chain::cross_chain_bonus,
    errors::ScoringError,
    grade::grade_for,
    reliability::reliability_penalty,
    sources::{ChainMapSource, PopulationSource, ReliabilityFeed, ScoreStore, bounded},
};

/// What is being scored. Nodes are always scored together with the producer that owns them.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Producer(&'a Producer),
    Node {
        producer: &'a Producer,
        node: &'a Node,
    },
}

impl Subject<'_> {
    pub fn id(&self) -> SubjectId {
        match self {
            Subject::Producer(producer) => SubjectId::producer(producer.chain, &producer.owner),
            Subject::Node { producer, node } => {
                SubjectId::node(producer.chain, &producer.owner, node.id)
            }
        }
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::Producer(_) => SubjectKind::Producer,
            Subject::Node { .. } => SubjectKind::Node,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            Subject::Producer(producer) | Subject::Node { producer, .. } => &producer.owner,
        }
    }
}

/// Evaluation order of a criterion. Bonuses need the maximum of everything before them and
/// penalties come last.
fn phase(criterion: &Criterion) -> u8 {
    match criterion.kind {
        CriterionKind::CrossChainBonus => 1,
        CriterionKind::Penalty { .. } => 2,
        _ => 0,
    }
}

#[derive(Debug, Default)]
struct Tally {
    details: BTreeMap<String, CriterionOutcome>,
    score: i64,
    max_score: i64,
}

impl Tally {
    /// A criterion listed in several applicable rule sets contributes once per listing.
    fn record(&mut self, name: &str, outcome: CriterionOutcome, ceiling: i64) {
        self.score = self.score.saturating_add(outcome.score);
        self.max_score = self.max_score.saturating_add(ceiling);
        let entry = self.details.entry(name.to_string()).or_default();
        entry.status = outcome.status;
        entry.score = entry.score.saturating_add(outcome.score);
    }
}

fn awarded(status: bool, points: i64) -> CriterionOutcome {
    CriterionOutcome {
        status,
        score: if status { points } else { 0 },
    }
}

fn flag_penalty(flagged: bool, points: i64) -> CriterionOutcome {
    CriterionOutcome {
        status: !flagged,
        score: if flagged { -points } else { 0 },
    }
}

/// Turns the facts collected about one subject into an itemised [`ScoreCard`].
pub struct ScoreCalculator {
    catalog: Arc<Catalog>,
    population: Arc<dyn PopulationSource>,
    chain_map: Arc<dyn ChainMapSource>,
    reliability: Arc<dyn ReliabilityFeed>,
    store: Arc<dyn ScoreStore>,
}

impl ScoreCalculator {
    pub fn new(
        catalog: Arc<Catalog>,
        population: Arc<dyn PopulationSource>,
        chain_map: Arc<dyn ChainMapSource>,
        reliability: Arc<dyn ReliabilityFeed>,
        store: Arc<dyn ScoreStore>,
    ) -> Self {
        Self {
            catalog,
            population,
            chain_map,
            reliability,
            store,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn score_producer(&self, context: &ChainContext, producer: &Producer) -> ScoreCard {
        self.score(context, Subject::Producer(producer)).await
    }

    pub async fn score_node(
        &self,
        context: &ChainContext,
        producer: &Producer,
        node: &Node,
    ) -> ScoreCard {
        self.score(context, Subject::Node { producer, node }).await
    }

    /// Scores one subject against every rule set that applies to it.
    ///
    /// Never fails: a criterion that cannot be evaluated is recorded as failed and scoring
    /// continues with the next one.
    pub async fn score(&self, context: &ChainContext, subject: Subject<'_>) -> ScoreCard {
        let subject_id = subject.id();
        let top_tier = context.is_top_tier(subject.owner());
        let criteria = self
            .catalog
            .rule_sets_for(subject.kind(), context.chain, top_tier)
            .flat_map(|rule_set| rule_set.criteria.iter())
            .sorted_by_key(|criterion| phase(criterion));

        let mut tally = Tally::default();
        let mut max_before_bonus = None;
        for criterion in criteria {
            if phase(criterion) > 0 {
                max_before_bonus.get_or_insert(tally.max_score);
            }
            let base_max = max_before_bonus.unwrap_or(tally.max_score);

            let (outcome, ceiling) = match self
                .evaluate(context, subject, criterion, base_max)
                .await
            {
                Ok(evaluated) => evaluated,
                Err(err) => {
                    warn!(
                        subject = %subject_id,
                        criterion = %criterion.name,
                        error = %err,
                        "Criterion degraded to failed"
                    );
                    inc_int_counter_vec(&DEGRADED_CRITERIA, &[criterion.name.as_str()]);
                    let ceiling = if criterion.is_penalty() {
                        0
                    } else {
                        criterion.points()
                    };
                    (CriterionOutcome::default(), ceiling)
                }
            };
            tally.record(&criterion.name, outcome, ceiling);
        }

        let score = tally.score.max(0);
        let grade = grade_for(&self.catalog.grades, score, tally.max_score);
        debug!(
            subject = %subject_id,
            raw_score = tally.score,
            score,
            max_score = tally.max_score,
            grade = %grade,
            "Scored subject"
        );
        ScoreCard {
            details: tally.details,
            score,
            max_score: tally.max_score,
            grade,
        }
    }

    /// The criterion's outcome and how much it adds to the achievable maximum.
    async fn evaluate(
        &self,
        context: &ChainContext,
        subject: Subject<'_>,
        criterion: &Criterion,
        max_before_bonus: i64,
    ) -> Result<(CriterionOutcome, i64), ScoringError> {
        let points = criterion.points();
        match criterion.kind {
            CriterionKind::Boolean { check } => {
                let status = self.boolean_check(context, subject, check)?;
                Ok((awarded(status, points), points))
            }
            CriterionKind::Percentile { percentile } => {
                let status = self.percentile_check(context, subject, percentile).await?;
                Ok((awarded(status, points), points))
            }
            CriterionKind::Governance { metric } => {
                match self.governance_check(context, subject, metric)? {
                    Some(status) => Ok((awarded(status, points), points)),
                    None => Ok((CriterionOutcome::default(), 0)),
                }
            }
            CriterionKind::CrossChainBonus => {
                if context.chain != self.catalog.cross_chain.bonus_chain {
                    return Ok((CriterionOutcome::default(), 0));
                }
                let outcome = self
                    .cross_chain_check(subject, max_before_bonus, points)
                    .await?;
                Ok((outcome, points))
            }
            CriterionKind::Penalty { check } => {
                let outcome = self.penalty_check(context, subject, check, points).await?;
                Ok((outcome, 0))
            }
        }
    }

    fn boolean_check(
        &self,
        context: &ChainContext,
        subject: Subject<'_>,
        check: BooleanCheck,
    ) -> Result<bool, ScoringError> {
        let windows = &self.catalog.windows;

        let status = match (subject, check) {
            (Subject::Producer(producer), check) => {
                let has_node = |predicate: fn(&Node) -> bool| producer.nodes.iter().any(predicate);
                match check {
                    BooleanCheck::HasBpJson => producer.extended_data.is_some(),
                    BooleanCheck::ReportsProducerNode => {
                        has_node(|node| node.node_type == NodeType::Producer)
                    }
                    BooleanCheck::ReportsSeedNode => {
                        has_node(|node| node.node_type == NodeType::Seed)
                    }
                    BooleanCheck::ReportsQueryNode => has_node(|node| node.node_type.is_query()),
                    BooleanCheck::RunsApiNode => has_node(|node| node.api && node.is_active()),
                    BooleanCheck::ReportsLatestVersion => {
                        reports_latest(context, producer.nodes.iter())
                    }
                    BooleanCheck::RunsHistoryNode => has_node(|node| node.history_v1),
                    BooleanCheck::RunsHyperionNode => has_node(|node| node.hyperion),
                    BooleanCheck::FeeVotes => {
                        producer.fee_multiplier.is_some() && !producer.fee_votes.is_empty()
                    }
                    BooleanCheck::FeeVotedRecently => {
                        let window = context.window(windows.recent_vote_days);
                        let recent = |time| window.contains(time) && time > window.start;
                        producer.fee_multiplier.as_ref().is_some_and(|multiplier| {
                            !producer.fee_votes.is_empty()
                                && (recent(multiplier.last_vote)
                                    || producer.fee_votes.iter().any(|vote| recent(vote.last_vote)))
                        })
                    }
                    BooleanCheck::BundleVotes => producer.bundle_votes.is_some(),
                    BooleanCheck::RunsTools => !producer.tools.is_empty(),
                    _ => return Err(unsupported(check.name(), subject)),
                }
            }
            (Subject::Node { node, .. }, check) => match check {
                BooleanCheck::NodeActive => node.is_active(),
                BooleanCheck::NodeReportsLatestVersion => {
                    reports_latest(context, std::iter::once(node))
                }
                BooleanCheck::NodeRunsHistory => node.history_v1,
                BooleanCheck::NodeRunsHyperion => node.hyperion,
                BooleanCheck::NodeAvailable => {
                    let window = context.window(windows.results_days);
                    let (healthy, total) = node
                        .node_checks_within(window)
                        .fold((0u64, 0u64), |(healthy, total), probe| {
                            (healthy + u64::from(probe.is_healthy()), total + 1)
                        });
                    total > 0
                        && healthy * 100 >= u64::from(windows.node_availability_percent) * total
                }
                _ => return Err(unsupported(check.name(), subject)),
            },
        };
        Ok(status)
    }

    async fn percentile_check(
        &self,
        context: &ChainContext,
        subject: Subject<'_>,
        percentile: u8,
    ) -> Result<bool, ScoringError> {
        let population = context
            .population
            .as_ref()
            .filter(|population| !population.is_empty())
            .ok_or(ScoringError::PopulationUnavailable)?;
        let window = context.window(self.catalog.windows.results_days);
        let best = bounded(
            "subject results",
            self.catalog.lookup_timeout(),
            self.population.subject_best_results(&subject.id(), window),
        )
        .await?;
        population.passes(best, percentile)
    }

    /// `None` when the producer took no part in any evaluated proposal.
    fn governance_check(
        &self,
        context: &ChainContext,
        subject: Subject<'_>,
        metric: GovernanceMetric,
    ) -> Result<Option<bool>, ScoringError> {
        let Subject::Producer(producer) = subject else {
            return Err(unsupported("governance", subject));
        };
        let book = context
            .proposals
            .as_ref()
            .ok_or_else(|| ScoringError::ExternalLookupFailure {
                lookup: "proposals",
                reason: "proposals were not loaded for this cycle".to_string(),
            })?;

        let governance = &self.catalog.governance;
        let report = book.report(
            &producer.owner,
            Duration::days(i64::from(governance.quick_turnaround_days)),
        );
        debug!(
            owner = %producer.owner,
            participation = ?report.participation_rate().map(|rate| rate.to_string()),
            timeliness = ?report.timeliness_rate().map(|rate| rate.to_string()),
            "Governance record"
        );
        Ok(report.passes(metric, governance.pass_percent))
    }

    async fn cross_chain_check(
        &self,
        subject: Subject<'_>,
        max_before_bonus: i64,
        points: i64,
    ) -> Result<CriterionOutcome, ScoringError> {
        let Subject::Producer(producer) = subject else {
            return Err(unsupported("cross_chain_bonus", subject));
        };
        let cross_chain = &self.catalog.cross_chain;
        let timeout = self.catalog.lookup_timeout();
        let counterpart = bounded(
            "chain map",
            timeout,
            self.chain_map.counterpart(
                &producer.owner,
                cross_chain.bonus_chain,
                cross_chain.counterpart_chain,
            ),
        )
        .await?;
        let Some(counterpart) = counterpart else {
            return Ok(CriterionOutcome::default());
        };

        let counterpart = SubjectId::producer(cross_chain.counterpart_chain, counterpart);
        let record = bounded("score store", timeout, self.store.latest(&counterpart)).await?;
        Ok(cross_chain_bonus(
            record.map(|record| record.score),
            max_before_bonus,
            points,
        ))
    }

    async fn penalty_check(
        &self,
        context: &ChainContext,
        subject: Subject<'_>,
        check: PenaltyCheck,
        points: i64,
    ) -> Result<CriterionOutcome, ScoringError> {
        let Subject::Producer(producer) = subject else {
            return Err(unsupported(check.name(), subject));
        };
        let has_node_with = |status: NodeStatus| producer.nodes.iter().any(|node| node.status == status);

        match check {
            PenaltyCheck::BlockReliability => {
                let reliability = bounded(
                    "reliability",
                    self.catalog.lookup_timeout(),
                    self.reliability.reliability(context.chain, &producer.owner),
                )
                .await?;
                Ok(reliability_penalty(
                    reliability,
                    points,
                    self.catalog.reliability.floor_percent,
                ))
            }
            PenaltyCheck::ReportsDownNode => {
                Ok(flag_penalty(has_node_with(NodeStatus::Down), points))
            }
            PenaltyCheck::ReportsWrongChainNode => {
                Ok(flag_penalty(has_node_with(NodeStatus::Inactive), points))
            }
        }
    }
}

fn reports_latest<'a>(context: &ChainContext, mut nodes: impl Iterator<Item = &'a Node>) -> bool {
    context
        .latest_version
        .is_some_and(|latest| nodes.any(|node| node.version() == Some(latest)))
}

fn unsupported(criterion: &str, subject: Subject<'_>) -> ScoringError {
    ScoringError::UnsupportedCriterion {
        criterion: criterion.to_string(),
        subject: subject.kind(),
    }
}
