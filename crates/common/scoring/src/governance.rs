use std::fmt;

use bpmon_catalog::criterion::GovernanceMetric;
use bpmon_model::proposal::{Proposal, SignerSet};
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::errors::ScoringError;

/// An exact, reduced fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rate {
    numerator: u64,
    denominator: u64,
}

impl Rate {
    /// `None` when the denominator is zero.
    pub fn new(numerator: u64, denominator: u64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let divisor = gcd(numerator, denominator);
        Some(Self {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        })
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    pub fn halved(&self) -> Self {
        Self::new(self.numerator, self.denominator * 2).unwrap_or(*self)
    }

    /// `self * 100 >= percent`, compared without rounding.
    pub fn meets_percent(&self, percent: u8) -> bool {
        u128::from(self.numerator) * 100 >= u128::from(percent) * u128::from(self.denominator)
    }

    pub fn as_percent(&self) -> f64 {
        self.numerator as f64 * 100.0 / self.denominator as f64
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

/// A producer's multisig record over the evaluated proposals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GovernanceReport {
    /// Proposals that requested the producer or received its approval.
    pub involved: u64,
    pub signed: u64,
    pub signed_quickly: u64,
}

impl GovernanceReport {
    pub fn participation_rate(&self) -> Option<Rate> {
        Rate::new(self.signed, self.involved)
    }

    pub fn timeliness_rate(&self) -> Option<Rate> {
        Rate::new(self.signed_quickly, self.involved)
    }

    /// Whether the producer passes `metric`, `None` when it was never involved.
    ///
    /// Participation is halved when timeliness falls below the pass percentage.
    pub fn passes(&self, metric: GovernanceMetric, pass_percent: u8) -> Option<bool> {
        let timeliness = self.timeliness_rate()?;
        match metric {
            GovernanceMetric::Timeliness => Some(timeliness.meets_percent(pass_percent)),
            GovernanceMetric::Participation => {
                let participation = self.participation_rate()?;
                let effective = if timeliness.meets_percent(pass_percent) {
                    participation
                } else {
                    participation.halved()
                };
                Some(effective.meets_percent(pass_percent))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ParsedProposal {
    time_stamp: DateTime<Utc>,
    requested: SignerSet,
    received: SignerSet,
}

/// The most recent proposals of a chain with their signer payloads parsed once, shared by
/// every producer scored in the same cycle.
#[derive(Debug, Default)]
pub struct ProposalBook {
    proposals: Vec<ParsedProposal>,
    skipped: Vec<ScoringError>,
}

impl ProposalBook {
    /// Keeps the `limit` most recent proposals. Proposals whose payloads cannot be parsed are
    /// skipped and reported through [`ProposalBook::skipped`]; they still take up a slot of the
    /// window.
    pub fn new(mut proposals: Vec<Proposal>, limit: usize) -> Self {
        proposals.sort_by(|a, b| {
            b.time_stamp
                .cmp(&a.time_stamp)
                .then(b.block_num.cmp(&a.block_num))
        });
        proposals.truncate(limit);

        let mut book = ProposalBook::default();
        for proposal in proposals {
            let parsed = SignerSet::from_payload(&proposal.requested).and_then(|requested| {
                SignerSet::from_payload(&proposal.received).map(|received| (requested, received))
            });
            match parsed {
                Ok((requested, received)) => book.proposals.push(ParsedProposal {
                    time_stamp: proposal.time_stamp,
                    requested,
                    received,
                }),
                Err(source) => {
                    let err = ScoringError::MalformedGovernanceRecord {
                        proposal: proposal.proposal_name,
                        block_num: proposal.block_num,
                        source,
                    };
                    warn!(error = %err, "Skipping proposal");
                    book.skipped.push(err);
                }
            }
        }
        book
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn skipped(&self) -> &[ScoringError] {
        &self.skipped
    }

    /// Signing within `quick_window` of the proposal's creation counts as quick. Approvals
    /// without a readable time are signed but not quick.
    pub fn report(&self, owner: &str, quick_window: Duration) -> GovernanceReport {
        let mut report = GovernanceReport::default();
        for proposal in &self.proposals {
            let approval = proposal.received.find(owner);
            if approval.is_none() && !proposal.requested.contains(owner) {
                continue;
            }
            report.involved += 1;

            let Some(approval) = approval else {
                continue;
            };
            report.signed += 1;
            if approval
                .time
                .is_some_and(|time| time - proposal.time_stamp <= quick_window)
            {
                report.signed_quickly += 1;
            }
        }
        report
    }
}
