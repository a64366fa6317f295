use bpmon_model::score::CriterionOutcome;

/// Reliability percentages are compared in units of 1/100000 of a percent.
const SCALE: f64 = 100_000.0;
const FULL: i64 = 100 * 100_000;

fn to_fixed(percent: f64) -> i64 {
    (percent * SCALE).round() as i64
}

/// Penalty for block production reliability `reliability` (percent).
///
/// - 100% or no data: no penalty
/// - below `floor_percent`: the full `max_penalty`
/// - otherwise the penalty grows linearly and reaches `max_penalty` halfway down to the floor;
///   any miss costs at least one point
pub fn reliability_penalty(
    reliability: Option<f64>,
    max_penalty: i64,
    floor_percent: f64,
) -> CriterionOutcome {
    let max_penalty = max_penalty.abs();
    let Some(reliability) = reliability.filter(|value| value.is_finite()) else {
        return CriterionOutcome {
            status: true,
            score: 0,
        };
    };

    let reliability = to_fixed(reliability);
    if reliability >= FULL {
        return CriterionOutcome {
            status: true,
            score: 0,
        };
    }

    let floor = to_fixed(floor_percent).clamp(0, FULL - 1);
    if reliability < floor {
        return CriterionOutcome {
            status: false,
            score: -max_penalty,
        };
    }

    let miss = i128::from(FULL - reliability);
    let span = i128::from(FULL - floor);
    let scaled = (2 * i128::from(max_penalty) * miss + span - 1) / span;
    let magnitude = i64::try_from(scaled).map_or(max_penalty, |value| value.min(max_penalty));
    CriterionOutcome {
        status: magnitude == 0,
        score: -magnitude,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Some(100.0), 0)]
    #[case(Some(100.5), 0)]
    #[case(Some(94.0), -50)]
    #[case(Some(94.99999), -50)]
    #[case(Some(95.0), -50)]
    #[case(Some(97.5), -50)]
    #[case(Some(99.0), -20)]
    #[case(Some(99.9), -2)]
    #[case(Some(99.99999), -1)]
    #[case(None, 0)]
    #[case(Some(f64::NAN), 0)]
    fn test_reliability_penalty(#[case] reliability: Option<f64>, #[case] expected: i64) {
        assert_eq!(reliability_penalty(reliability, 50, 95.0).score, expected);
    }

    #[test]
    fn test_negative_weight_is_a_magnitude() {
        assert_eq!(reliability_penalty(Some(90.0), -50, 95.0).score, -50);
    }

    #[test]
    fn test_status_reports_penalty() {
        assert!(reliability_penalty(None, 50, 95.0).status);
        assert!(reliability_penalty(Some(100.0), 50, 95.0).status);
        assert!(!reliability_penalty(Some(99.9), 50, 95.0).status);
    }

    #[test]
    fn test_floor_is_configurable() {
        assert_eq!(reliability_penalty(Some(95.0), 10, 80.0).score, -5);
        assert_eq!(reliability_penalty(Some(90.0), 10, 80.0).score, -10);
        assert_eq!(reliability_penalty(Some(79.0), 10, 80.0).score, -10);
    }
}
