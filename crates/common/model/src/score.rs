use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subject::SubjectId;

/// Outcome of one criterion for one subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionOutcome {
    pub status: bool,
    pub score: i64,
}

/// The itemised result of scoring one subject, before it is stamped and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub details: BTreeMap<String, CriterionOutcome>,
    pub score: i64,
    pub max_score: i64,
    pub grade: String,
}

impl ScoreCard {
    /// Share of the achievable score, rounded to a whole percent. Zero when nothing was
    /// achievable.
    pub fn percentage(&self) -> i64 {
        percentage(self.score, self.max_score)
    }
}

/// One immutable, timestamped scoring result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub subject: SubjectId,
    pub time_stamp: DateTime<Utc>,
    pub details: BTreeMap<String, CriterionOutcome>,
    pub score: i64,
    pub max_score: i64,
    pub grade: String,
}

impl ScoreRecord {
    pub fn new(subject: SubjectId, time_stamp: DateTime<Utc>, card: ScoreCard) -> Self {
        Self {
            subject,
            time_stamp,
            details: card.details,
            score: card.score,
            max_score: card.max_score,
            grade: card.grade,
        }
    }

    pub fn card(&self) -> ScoreCard {
        ScoreCard {
            details: self.details.clone(),
            score: self.score,
            max_score: self.max_score,
            grade: self.grade.clone(),
        }
    }
}

/// `round(score / max_score * 100)` with halves rounded away from zero, 0 when `max_score` is
/// not positive.
pub fn percentage(score: i64, max_score: i64) -> i64 {
    if max_score <= 0 {
        return 0;
    }
    (score * 100 * 2 + max_score).div_euclid(max_score * 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(percentage(91, 100), 91);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(10, 0), 0);
    }
}
