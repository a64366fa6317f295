use crate::errors::ScoringError;

/// The "best recent measurement per entity" values of one chain, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Population {
    sorted: Vec<u64>,
}

impl Population {
    pub fn new(mut values: Vec<u64>) -> Self {
        values.sort_unstable();
        Self { sorted: values }
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Nearest-rank threshold: the value at `floor(n * p / 100)`, clamped to the last element so
    /// that `p = 100` selects the maximum.
    pub fn threshold(&self, percentile: u8) -> Result<u64, ScoringError> {
        let last = self
            .sorted
            .len()
            .checked_sub(1)
            .ok_or(ScoringError::PopulationUnavailable)?;
        let index = (self.sorted.len() * usize::from(percentile.min(100)) / 100).min(last);
        Ok(self.sorted[index])
    }

    /// Whether `best` reaches the threshold. A subject without measurements counts as 0.
    pub fn passes(&self, best: Option<u64>, percentile: u8) -> Result<bool, ScoringError> {
        Ok(best.unwrap_or_default() >= self.threshold(percentile)?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 10)]
    #[case(25, 20)]
    #[case(50, 30)]
    #[case(75, 40)]
    #[case(99, 50)]
    #[case(100, 50)]
    fn test_threshold(#[case] percentile: u8, #[case] expected: u64) {
        let population = Population::new(vec![50, 10, 40, 20, 30]);
        assert_eq!(population.threshold(percentile).expect("threshold"), expected);
    }

    #[test]
    fn test_subject_at_threshold_passes() {
        let population = Population::new(vec![10, 20, 30, 40, 50]);
        assert!(population.passes(Some(40), 75).expect("passes"));
        assert!(!population.passes(Some(39), 75).expect("passes"));
        assert!(!population.passes(None, 75).expect("passes"));
    }

    #[test]
    fn test_missing_measurement_counts_as_zero() {
        let population = Population::new(vec![0, 0, 5]);
        assert!(population.passes(None, 50).expect("passes"));
    }

    #[test]
    fn test_empty_population_is_unavailable() {
        let population = Population::default();
        assert!(matches!(
            population.passes(Some(100), 50),
            Err(ScoringError::PopulationUnavailable)
        ));
    }

    #[test]
    fn test_single_value() {
        let population = Population::new(vec![7]);
        assert_eq!(population.threshold(100).expect("threshold"), 7);
        assert_eq!(population.threshold(0).expect("threshold"), 7);
    }
}
