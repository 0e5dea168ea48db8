//! # Property-Based Tests
//!
//! Determinism and correctness invariants of ranking, staleness and the
//! calendar, checked with proptest.

use assignwise_core::{
    Candidate, CandidateId, CandidatePool, CounterStep, Direction, PriorityRule,
    business_days_between, rank, staleness::counter_sum, sum_changed,
};
use chrono::{Duration, NaiveDate};
use proptest::collection::vec;
use proptest::prelude::*;

const METRICS: [&str; 3] = ["load", "skill", "age"];

fn build_pool(rows: &[(u8, u8, u8)]) -> CandidatePool {
    rows.iter()
        .enumerate()
        .map(|(i, (load, skill, age))| {
            Candidate::new(CandidateId::new(format!("c{i}")), format!("Candidate {i}"))
                .with_metric("load", f64::from(*load))
                .with_metric("skill", f64::from(*skill))
                .with_metric("age", f64::from(*age))
        })
        .collect()
}

fn build_rules(rule_rows: &[(usize, i64, bool)]) -> Vec<PriorityRule> {
    rule_rows.iter()
        .map(|(metric, rank, maximize)| {
            let direction = if *maximize {
                Direction::Maximize
            } else {
                Direction::Minimize
            };
            PriorityRule::new(METRICS[metric % METRICS.len()], *rank, direction)
        })
        .collect()
}

proptest! {
    /// Ranking the same pool under the same rules gives the same selection.
    #[test]
    fn ranking_is_deterministic(
        rows in vec((0u8..4, 0u8..4, 0u8..4), 0..20),
        rule_rows in vec((0usize..3, 0i64..5, any::<bool>()), 0..4)
    ) {
        let pool = build_pool(&rows);
        let rules = build_rules(&rule_rows);

        prop_assert_eq!(rank(&pool, &rules), rank(&pool, &rules));
    }

    /// Selection is empty iff the pool is empty, and always a subset of it.
    #[test]
    fn selection_is_nonempty_subset(
        rows in vec((0u8..4, 0u8..4, 0u8..4), 0..20),
        rule_rows in vec((0usize..3, 0i64..5, any::<bool>()), 0..4)
    ) {
        let pool = build_pool(&rows);
        let selection = rank(&pool, &build_rules(&rule_rows));

        prop_assert_eq!(selection.is_empty(), pool.is_empty());
        for candidate in selection.candidates() {
            prop_assert!(pool.find(&candidate.id).is_some());
        }
    }

    /// Survivors of a tie all hold the same value for every rule applied.
    #[test]
    fn tied_survivors_agree_on_every_rule(
        rows in vec((0u8..3, 0u8..3, 0u8..3), 2..20),
        rule_rows in vec((0usize..3, 0i64..5, any::<bool>()), 1..4)
    ) {
        let pool = build_pool(&rows);
        let rules = build_rules(&rule_rows);
        let selection = rank(&pool, &rules);

        if selection.is_tie() {
            for rule in &rules {
                let first = selection.candidates()[0].metric(&rule.field);
                for candidate in selection.candidates() {
                    prop_assert_eq!(candidate.metric(&rule.field), first);
                }
            }
        }
    }

    /// Identical candidates are never separated.
    #[test]
    fn identical_candidates_tie(
        count in 1usize..15,
        value in (0u8..10, 0u8..10, 0u8..10),
        rule_rows in vec((0usize..3, 0i64..5, any::<bool>()), 0..4)
    ) {
        let pool = build_pool(&vec![value; count]);
        prop_assert_eq!(rank(&pool, &build_rules(&rule_rows)).len(), count);
    }

    /// Swapping two candidates' counters never changes the sum.
    #[test]
    fn counter_swap_keeps_sum(
        rows in vec((0u8..50, 0u8..4, 0u8..4), 2..20),
        i in any::<prop::sample::Index>(),
        j in any::<prop::sample::Index>()
    ) {
        let before = build_pool(&rows);
        let mut swapped = rows.clone();
        let (a, b) = (i.index(rows.len()), j.index(rows.len()));
        let tmp = swapped[a].0;
        swapped[a].0 = swapped[b].0;
        swapped[b].0 = tmp;
        let after = build_pool(&swapped);

        prop_assert_eq!(counter_sum(&before, "load"), counter_sum(&after, "load"));
        prop_assert!(!sum_changed(&before, &after, "load"));
    }

    /// Increment followed by decrement restores any counter value.
    #[test]
    fn counter_steps_are_inverse(value in -1000i32..1000) {
        let v = f64::from(value);
        prop_assert_eq!(CounterStep::Decrement.apply(CounterStep::Increment.apply(v)), v);
    }

    /// Business days never exceed calendar days and are never negative
    /// for ordered ranges.
    #[test]
    fn business_days_bounded(offset in 0i64..3650, span in 0i64..400) {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).expect("base date");
        let start = base + Duration::days(offset);
        let end = start + Duration::days(span);
        let days = business_days_between(start, end);

        prop_assert!(days >= 0);
        prop_assert!(days <= span + 1);
    }

    /// Extending a range by a full week always adds five business days.
    #[test]
    fn week_adds_five(offset in 0i64..3650, span in 0i64..60) {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).expect("base date");
        let start = base + Duration::days(offset);
        let end = start + Duration::days(span);

        prop_assert_eq!(
            business_days_between(start, end + Duration::days(7)),
            business_days_between(start, end) + 5
        );
    }
}
