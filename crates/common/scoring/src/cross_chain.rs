use bpmon_model::score::CriterionOutcome;

/// Bonus awarded for the counterpart's score on the secondary chain.
///
/// The counterpart's score is taken relative to `max_score_so_far`, the subject's maximum
/// before any bonus, capped at 1, and scaled to `weight` with halves rounded up. A subject
/// with nothing achievable yet receives the full weight for any positive counterpart score.
pub fn cross_chain_bonus(
    counterpart_score: Option<i64>,
    max_score_so_far: i64,
    weight: i64,
) -> CriterionOutcome {
    let counterpart_score = counterpart_score.unwrap_or_default().max(0);
    if counterpart_score == 0 {
        return CriterionOutcome::default();
    }

    let score = if max_score_so_far <= 0 || counterpart_score >= max_score_so_far {
        weight
    } else {
        let numerator = i128::from(counterpart_score) * i128::from(weight) * 2
            + i128::from(max_score_so_far);
        let bonus = numerator / (i128::from(max_score_so_far) * 2);
        i64::try_from(bonus).unwrap_or(weight)
    };
    CriterionOutcome {
        status: true,
        score,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, 200, 0, false)]
    #[case(Some(0), 200, 0, false)]
    #[case(Some(200), 200, 20, true)]
    #[case(Some(400), 200, 20, true)]
    #[case(Some(100), 200, 10, true)]
    #[case(Some(15), 200, 2, true)]
    #[case(Some(5), 200, 1, true)]
    #[case(Some(10), 0, 20, true)]
    fn test_cross_chain_bonus(
        #[case] counterpart_score: Option<i64>,
        #[case] max_score_so_far: i64,
        #[case] expected_score: i64,
        #[case] expected_status: bool,
    ) {
        assert_eq!(
            cross_chain_bonus(counterpart_score, max_score_so_far, 20),
            CriterionOutcome {
                status: expected_status,
                score: expected_score,
            }
        );
    }
}
