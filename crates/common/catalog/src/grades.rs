use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeRange {
    pub grade: String,
    pub min: u8,
    pub max: u8,
}

impl GradeRange {
    pub fn contains(&self, percentage: i64) -> bool {
        i64::from(self.min) <= percentage && percentage <= i64::from(self.max)
    }
}

/// Letter grades keyed by inclusive percentage ranges.
///
/// A table can only be built through [`GradeTable::from_chart`], which rejects tables that
/// do not tile 0..=100 exactly, so a constructed table never misgrades silently. Ranges are
/// kept sorted by descending lower bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, (u8, u8)>", into = "BTreeMap<String, (u8, u8)>")]
pub struct GradeTable {
    ranges: Vec<GradeRange>,
}

impl GradeTable {
    pub fn from_chart(chart: BTreeMap<String, (u8, u8)>) -> Result<Self, ConfigError> {
        let mut ranges = chart
            .into_iter()
            .map(|(grade, (min, max))| {
                if min > max {
                    return Err(ConfigError::InvertedGradeRange { grade, min, max });
                }
                Ok(GradeRange { grade, min, max })
            })
            .collect::<Result<Vec<_>, _>>()?;
        ranges.sort_by_key(|range| range.min);

        let (Some(lowest), Some(highest)) = (ranges.first(), ranges.last()) else {
            return Err(ConfigError::EmptyGradeTable);
        };
        if lowest.min != 0 || highest.max != 100 {
            return Err(ConfigError::GradeTableBounds {
                min: lowest.min,
                max: highest.max,
            });
        }

        for pair in ranges.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.min <= lower.max {
                return Err(ConfigError::OverlappingGrades {
                    lower: lower.grade.clone(),
                    upper: upper.grade.clone(),
                });
            }
            if u16::from(upper.min) != u16::from(lower.max) + 1 {
                return Err(ConfigError::GradeTableGap {
                    lower: lower.grade.clone(),
                    upper: upper.grade.clone(),
                });
            }
        }

        ranges.reverse();
        Ok(Self { ranges })
    }

    /// Ranges sorted by descending lower bound.
    pub fn ranges(&self) -> &[GradeRange] {
        &self.ranges
    }

    /// The grade of the range starting at 0.
    pub fn lowest(&self) -> &str {
        self.ranges
            .last()
            .map(|range| range.grade.as_str())
            .unwrap_or_default()
    }

    pub fn chart(&self) -> BTreeMap<String, (u8, u8)> {
        self.ranges
            .iter()
            .map(|range| (range.grade.clone(), (range.min, range.max)))
            .collect()
    }
}

impl Default for GradeTable {
    fn default() -> Self {
        Self {
            ranges: [
                ("A+", 96, 100),
                ("A", 91, 95),
                ("A-", 86, 90),
                ("B+", 81, 85),
                ("B", 76, 80),
                ("B-", 71, 75),
                ("C+", 66, 70),
                ("C", 61, 65),
                ("C-", 56, 60),
                ("D+", 51, 55),
                ("D", 46, 50),
                ("D-", 41, 45),
                ("F", 0, 40),
            ]
            .into_iter()
            .map(|(grade, min, max)| GradeRange {
                grade: grade.to_string(),
                min,
                max,
            })
            .collect(),
        }
    }
}

impl TryFrom<BTreeMap<String, (u8, u8)>> for GradeTable {
    type Error = ConfigError;

    fn try_from(chart: BTreeMap<String, (u8, u8)>) -> Result<Self, Self::Error> {
        Self::from_chart(chart)
    }
}

impl From<GradeTable> for BTreeMap<String, (u8, u8)> {
    fn from(table: GradeTable) -> Self {
        table.chart()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(entries: &[(&str, u8, u8)]) -> BTreeMap<String, (u8, u8)> {
        entries
            .iter()
            .map(|(grade, min, max)| (grade.to_string(), (*min, *max)))
            .collect()
    }

    #[test]
    fn test_valid_chart_is_sorted_descending() {
        let table = GradeTable::from_chart(chart(&[("F", 0, 80), ("A", 91, 100), ("B", 81, 90)]))
            .expect("valid table");

        let grades: Vec<&str> = table.ranges().iter().map(|r| r.grade.as_str()).collect();
        assert_eq!(grades, ["A", "B", "F"]);
        assert_eq!(table.lowest(), "F");
    }

    #[test]
    fn test_default_chart_is_valid() {
        let table = GradeTable::default();
        assert_eq!(GradeTable::from_chart(table.chart()).expect("valid"), table);
        assert_eq!(table.lowest(), "F");
    }

    #[test]
    fn test_gap_is_rejected() {
        let result = GradeTable::from_chart(chart(&[("A", 91, 100), ("F", 0, 80)]));
        assert!(matches!(result, Err(ConfigError::GradeTableGap { .. })));
    }

    #[test]
    fn test_overlap_is_rejected() {
        let result = GradeTable::from_chart(chart(&[("A", 85, 100), ("F", 0, 90)]));
        assert!(matches!(result, Err(ConfigError::OverlappingGrades { .. })));
    }

    #[test]
    fn test_bounds_and_inversion_are_rejected() {
        assert!(matches!(
            GradeTable::from_chart(chart(&[("A", 50, 100)])),
            Err(ConfigError::GradeTableBounds { .. })
        ));
        assert!(matches!(
            GradeTable::from_chart(chart(&[("A", 90, 10)])),
            Err(ConfigError::InvertedGradeRange { .. })
        ));
        assert!(matches!(
            GradeTable::from_chart(BTreeMap::new()),
            Err(ConfigError::EmptyGradeTable)
        ));
    }

    #[test]
    fn test_deserialize_rejects_invalid_chart() {
        let result = serde_json::from_str::<GradeTable>(r#"{"A": [91, 100], "F": [0, 80]}"#);
        assert!(result.is_err());

        let table = serde_json::from_str::<GradeTable>(r#"{"A": [81, 100], "F": [0, 80]}"#)
            .expect("valid table");
        assert_eq!(table.ranges().len(), 2);
    }
}
