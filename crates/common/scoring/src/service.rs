use std::sync::Arc;

use bpmon_catalog::catalog::Catalog;
use bpmon_metrics::{
    SCORING_CYCLE_TIME, SUBJECTS_SCORED, SUBJECTS_SKIPPED, set_int_gauge_vec, start_timer_vec,
    stop_timer,
};
use bpmon_model::{
    producer::{Producer, ProducerStatus, ProducerSummary},
    score::ScoreRecord,
    subject::{SubjectId, SubjectKind},
};
use bpmon_network_spec::networks::Chain;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use futures::{StreamExt, stream};
use itertools::Itertools;
use tracing::{error, info, warn};

use crate::{
    calculator::{ScoreCalculator, Subject},
    context::{ChainContext, latest_version},
    errors::ScoringError,
    governance::ProposalBook,
    percentile::Population,
    sources::{
        ChainMapSource, PopulationSource, ProducerSource, ProposalSource, ReliabilityFeed,
        ScoreStore, bounded,
    },
};

/// The collaborators a [`ScoringService`] reads from and writes to.
#[derive(Clone)]
pub struct Sources {
    pub producers: Arc<dyn ProducerSource>,
    pub population: Arc<dyn PopulationSource>,
    pub proposals: Arc<dyn ProposalSource>,
    pub chain_map: Arc<dyn ChainMapSource>,
    pub reliability: Arc<dyn ReliabilityFeed>,
    pub store: Arc<dyn ScoreStore>,
}

#[derive(Debug)]
pub struct SkippedSubject {
    pub subject: SubjectId,
    pub error: ScoringError,
}

#[derive(Debug)]
pub struct ChainReport {
    pub chain: Chain,
    /// Records appended during the cycle, ordered by subject.
    pub records: Vec<ScoreRecord>,
    pub skipped: Vec<SkippedSubject>,
    /// Proposals left out of the governance window because their payloads were malformed.
    pub malformed_proposals: usize,
    /// Set when the chain could not be scored at all.
    pub failure: Option<ScoringError>,
}

impl ChainReport {
    fn new(chain: Chain) -> Self {
        Self {
            chain,
            records: vec![],
            skipped: vec![],
            malformed_proposals: 0,
            failure: None,
        }
    }

    fn count(&self, kind: SubjectKind) -> (usize, usize) {
        (
            self.records
                .iter()
                .filter(|record| record.subject.kind() == kind)
                .count(),
            self.skipped
                .iter()
                .filter(|skipped| skipped.subject.kind() == kind)
                .count(),
        )
    }
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub chains: Vec<ChainReport>,
}

impl CycleReport {
    pub fn scored(&self) -> usize {
        self.chains.iter().map(|chain| chain.records.len()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.chains.iter().map(|chain| chain.skipped.len()).sum()
    }

    pub fn chain(&self, chain: Chain) -> Option<&ChainReport> {
        self.chains.iter().find(|report| report.chain == chain)
    }
}

/// Runs scoring cycles: every active producer of each requested chain, and every API node of
/// those producers, receives one new [`ScoreRecord`].
pub struct ScoringService {
    catalog: Arc<Catalog>,
    sources: Sources,
    calculator: ScoreCalculator,
}

impl ScoringService {
    /// Fails with [`ScoringError::Configuration`] when the catalog does not validate.
    pub fn new(catalog: Catalog, sources: Sources) -> Result<Self, ScoringError> {
        catalog.validate()?;
        let catalog = Arc::new(catalog);
        let calculator = ScoreCalculator::new(
            catalog.clone(),
            sources.population.clone(),
            sources.chain_map.clone(),
            sources.reliability.clone(),
            sources.store.clone(),
        );
        Ok(Self {
            catalog,
            sources,
            calculator,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Chains in the order a cycle visits them: the cross-chain counterpart first, so bonuses
    /// on the other chains read scores from this cycle.
    pub fn cycle_order(&self, chains: &[Chain]) -> Vec<Chain> {
        let counterpart = self.catalog.cross_chain.counterpart_chain;
        chains
            .iter()
            .copied()
            .unique()
            .sorted_by_key(|chain| *chain != counterpart)
            .collect()
    }

    pub async fn run_cycle(&self, chains: &[Chain], as_of: DateTime<Utc>) -> CycleReport {
        // Records are keyed by millisecond.
        let as_of = as_of.trunc_subsecs(3);
        let mut report = CycleReport::default();
        for chain in self.cycle_order(chains) {
            report.chains.push(self.score_chain(chain, as_of).await);
        }
        info!(
            scored = report.scored(),
            skipped = report.skipped(),
            "Scoring cycle finished"
        );
        report
    }

    pub async fn score_chain(&self, chain: Chain, as_of: DateTime<Utc>) -> ChainReport {
        let timer = start_timer_vec(&SCORING_CYCLE_TIME, &[chain.as_str()]);
        let mut report = ChainReport::new(chain);
        let timeout = self.catalog.lookup_timeout();

        let listed = bounded(
            "producers",
            timeout,
            self.sources.producers.list_producers(chain),
        )
        .await;
        let summaries = match listed {
            Ok(summaries) => summaries,
            Err(err) => {
                error!(%chain, error = %err, "Failed to list producers");
                report.failure = Some(err);
                stop_timer(timer);
                return report;
            }
        };
        let ranked = rank(chain, summaries);

        let mut producers = vec![];
        let mut loads = stream::iter(&ranked)
            .map(|summary| self.load_producer(chain, &summary.owner))
            .buffer_unordered(self.catalog.concurrency);
        while let Some(loaded) = loads.next().await {
            match loaded {
                Ok(producer) => producers.push(producer),
                Err(skipped) => {
                    warn!(subject = %skipped.subject, error = %skipped.error, "Skipping subject");
                    report.skipped.push(skipped);
                }
            }
        }
        producers.sort_by(|a, b| a.owner.cmp(&b.owner));

        let context = self.chain_context(chain, as_of, &ranked, &producers).await;
        report.malformed_proposals = context
            .proposals
            .as_ref()
            .map_or(0, |book| book.skipped().len());

        let mut subjects = vec![];
        let score_producers = self.catalog.scores(SubjectKind::Producer);
        let score_nodes = self.catalog.scores(SubjectKind::Node);
        for producer in &producers {
            if score_producers {
                subjects.push(Subject::Producer(producer));
            }
            if score_nodes {
                subjects.extend(
                    producer
                        .api_nodes()
                        .map(|node| Subject::Node { producer, node }),
                );
            }
        }

        let mut scored = stream::iter(subjects)
            .map(|subject| self.score_and_store(&context, subject))
            .buffer_unordered(self.catalog.concurrency);
        while let Some(outcome) = scored.next().await {
            match outcome {
                Ok(record) => report.records.push(record),
                Err(skipped) => {
                    warn!(subject = %skipped.subject, error = %skipped.error, "Skipping subject");
                    report.skipped.push(skipped);
                }
            }
        }
        report.records.sort_by(|a, b| a.subject.cmp(&b.subject));
        report.skipped.sort_by(|a, b| a.subject.cmp(&b.subject));

        for kind in [SubjectKind::Producer, SubjectKind::Node] {
            let (scored, skipped) = report.count(kind);
            let kind = kind.to_string();
            let labels = [chain.as_str(), kind.as_str()];
            set_int_gauge_vec(&SUBJECTS_SCORED, scored as i64, &labels);
            set_int_gauge_vec(&SUBJECTS_SKIPPED, skipped as i64, &labels);
        }
        stop_timer(timer);
        info!(
            %chain,
            scored = report.records.len(),
            skipped = report.skipped.len(),
            "Scored chain"
        );
        report
    }

    async fn load_producer(&self, chain: Chain, owner: &str) -> Result<Producer, SkippedSubject> {
        let subject = SubjectId::producer(chain, owner);
        let loaded = bounded(
            "producer",
            self.catalog.lookup_timeout(),
            self.sources.producers.load_producer(chain, owner),
        )
        .await;
        let reason = match loaded {
            Ok(Some(producer)) => return Ok(producer),
            Ok(None) => "producer not found".to_string(),
            Err(err) => err.to_string(),
        };
        Err(SkippedSubject {
            error: ScoringError::SubjectLoadFailure {
                subject: subject.clone(),
                reason,
            },
            subject,
        })
    }

    async fn chain_context(
        &self,
        chain: Chain,
        as_of: DateTime<Utc>,
        ranked: &[ProducerSummary],
        producers: &[Producer],
    ) -> ChainContext {
        let timeout = self.catalog.lookup_timeout();
        let mut context = ChainContext::new(chain, as_of);
        context.top_tier = ranked
            .iter()
            .take(self.catalog.top_tier_size)
            .map(|summary| summary.owner.clone())
            .collect();
        context.latest_version = latest_version(producers);

        let window = context.window(self.catalog.windows.results_days);
        context.population = match bounded(
            "population",
            timeout,
            self.sources.population.best_results(chain, window),
        )
        .await
        {
            Ok(values) => Some(Population::new(values)),
            Err(err) => {
                warn!(%chain, error = %err, "Population unavailable, percentile criteria will fail");
                None
            }
        };

        let proposal_count = self.catalog.governance.proposal_count;
        context.proposals = match bounded(
            "proposals",
            timeout,
            self.sources.proposals.recent_proposals(chain, proposal_count),
        )
        .await
        {
            Ok(proposals) => Some(ProposalBook::new(proposals, proposal_count)),
            Err(err) => {
                warn!(%chain, error = %err, "Proposals unavailable, governance criteria will fail");
                None
            }
        };
        context
    }

    async fn score_and_store(
        &self,
        context: &ChainContext,
        subject: Subject<'_>,
    ) -> Result<ScoreRecord, SkippedSubject> {
        let subject_id = subject.id();
        let card = self.calculator.score(context, subject).await;
        let timeout = self.catalog.lookup_timeout();
        let store = &self.sources.store;

        let stored = async {
            let previous = bounded("score store", timeout, store.latest(&subject_id)).await?;
            let time_stamp = next_time_stamp(
                context.as_of,
                previous.map(|record| record.time_stamp),
            );
            let record = ScoreRecord::new(subject_id.clone(), time_stamp, card);
            bounded("score store", timeout, store.append(record.clone())).await?;
            Ok::<_, ScoringError>(record)
        }
        .await;

        match stored {
            Ok(record) => {
                info!(
                    subject = %record.subject,
                    score = record.score,
                    max_score = record.max_score,
                    grade = %record.grade,
                    "Saved score"
                );
                Ok(record)
            }
            Err(err) => Err(SkippedSubject {
                error: ScoringError::StoreFailure {
                    subject: subject_id.clone(),
                    reason: err.to_string(),
                },
                subject: subject_id,
            }),
        }
    }
}

/// Active producers of `chain`, most votes first. Ties go to the lower owner name.
fn rank(chain: Chain, summaries: Vec<ProducerSummary>) -> Vec<ProducerSummary> {
    summaries
        .into_iter()
        .filter(|summary| summary.chain == chain && summary.status == ProducerStatus::Active)
        .sorted_by(|a, b| {
            b.total_votes
                .cmp(&a.total_votes)
                .then_with(|| a.owner.cmp(&b.owner))
        })
        .collect()
}

/// `as_of`, or one millisecond past the subject's latest record if that is not older.
fn next_time_stamp(as_of: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous {
        Some(previous) if previous >= as_of => previous + Duration::milliseconds(1),
        _ => as_of,
    }
}
