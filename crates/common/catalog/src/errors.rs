use std::io;

use thiserror::Error;

/// A catalog that cannot be used. Raised before any subject is scored.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Unknown criterion: {0}")]
    UnknownCriterion(String),

    #[error("Criterion {criterion} has invalid weight {weight}")]
    InvalidWeight { criterion: String, weight: i64 },

    #[error("Criterion {criterion} has percentile {percentile}, expected 0..=100")]
    InvalidPercentile { criterion: String, percentile: u8 },

    #[error("Criterion {criterion} cannot be used in {rule_set}: {reason}")]
    MisplacedCriterion {
        criterion: String,
        rule_set: String,
        reason: &'static str,
    },

    #[error("Criterion {criterion} appears more than once in {rule_set}")]
    DuplicateCriterion { criterion: String, rule_set: String },

    #[error("Grade table is empty")]
    EmptyGradeTable,

    #[error("Grade {grade} has min {min} above max {max}")]
    InvertedGradeRange { grade: String, min: u8, max: u8 },

    #[error("Grade table must span 0..=100, found {min}..={max}")]
    GradeTableBounds { min: u8, max: u8 },

    #[error("Grades {lower} and {upper} overlap")]
    OverlappingGrades { lower: String, upper: String },

    #[error("Gap between grades {lower} and {upper}")]
    GradeTableGap { lower: String, upper: String },
}
