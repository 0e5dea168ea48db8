//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Calendar durations
//! - T1: Candidate ranking
//! - T2: Staleness detection
//! - T3: Counter arithmetic and stage classification

use assignwise_core::{
    Candidate, CandidateId, CandidatePool, Direction, PriorityRule, SelectionResult,
};

fn candidate(id: &str, metrics: &[(&str, f64)]) -> Candidate {
    metrics
        .iter()
        .fold(Candidate::new(CandidateId::new(id), id), |c, (key, value)| {
            c.with_metric(*key, *value)
        })
}

fn ids(selection: &SelectionResult) -> Vec<&str> {
    selection.candidates().iter().map(|c| c.id.as_str()).collect()
}

// =============================================================================
// TIER T0: CALENDAR DURATIONS
// =============================================================================

mod t0_calendar {
    use assignwise_core::{business_days_between, parse_iso_date};

    /// T0.1: Monday to Friday of the same week is five days.
    #[test]
    fn monday_to_friday() {
        let start = parse_iso_date("2024-01-01").expect("start");
        let end = parse_iso_date("2024-01-05").expect("end");
        assert_eq!(business_days_between(start, end), 5);
    }

    /// T0.2: Friday to the next Monday is two days.
    #[test]
    fn friday_to_monday() {
        let start = parse_iso_date("2024-01-05").expect("start");
        let end = parse_iso_date("2024-01-08").expect("end");
        assert_eq!(business_days_between(start, end), 2);
    }

    /// T0.3: Chronologically valid ranges never yield a negative count.
    #[test]
    fn valid_ranges_are_non_negative() {
        let start = parse_iso_date("2024-03-02").expect("start");
        for offset in 0..30 {
            let end = start + chrono::Duration::days(offset);
            assert!(business_days_between(start, end) >= 0);
        }
    }
}

// =============================================================================
// TIER T1: CANDIDATE RANKING
// =============================================================================

mod t1_ranking {
    use super::*;
    use assignwise_core::rank;

    /// T1.1: A is minimized first, then B maximized: Z falls on A, X on B.
    #[test]
    fn cascading_rules_pick_y() {
        let pool = CandidatePool::new(vec![
            candidate("X", &[("A", 1.0), ("B", 5.0)]),
            candidate("Y", &[("A", 1.0), ("B", 9.0)]),
            candidate("Z", &[("A", 2.0), ("B", 9.0)]),
        ]);
        let rules = vec![
            PriorityRule::new("A", 1, Direction::Minimize),
            PriorityRule::new("B", 2, Direction::Maximize),
        ];

        assert_eq!(ids(&rank(&pool, &rules)), vec!["Y"]);
    }

    /// T1.2: Ranking is idempotent for unchanged inputs.
    #[test]
    fn ranking_is_deterministic() {
        let pool = CandidatePool::new(vec![
            candidate("a", &[("load", 2.0)]),
            candidate("b", &[("load", 1.0)]),
        ]);
        let rules = vec![PriorityRule::new("load", 1, Direction::Minimize)];

        let first = rank(&pool, &rules);
        for _ in 0..10 {
            assert_eq!(rank(&pool, &rules), first);
        }
    }

    /// T1.3: Identical candidates across every rule tie as the full pool.
    #[test]
    fn total_tie_is_full_pool() {
        let pool = CandidatePool::new(vec![
            candidate("a", &[("A", 1.0), ("B", 1.0)]),
            candidate("b", &[("A", 1.0), ("B", 1.0)]),
        ]);
        let rules = vec![
            PriorityRule::new("A", 1, Direction::Minimize),
            PriorityRule::new("B", 2, Direction::Maximize),
        ];

        let selection = rank(&pool, &rules);
        assert_eq!(selection.candidates(), pool.candidates());
        assert!(selection.winner().is_none());
    }

    /// T1.4: An empty pool yields an empty selection.
    #[test]
    fn empty_pool() {
        let rules = vec![PriorityRule::new("A", 1, Direction::Minimize)];
        assert!(rank(&CandidatePool::default(), &rules).is_empty());
    }
}

// =============================================================================
// TIER T2: STALENESS DETECTION
// =============================================================================

mod t2_staleness {
    use super::*;
    use assignwise_core::{StalenessCheck, detect_drift, sum_changed};

    const LOAD: &str = "Load";

    fn pool(values: &[(&str, f64)]) -> CandidatePool {
        values
            .iter()
            .map(|(id, load)| candidate(id, &[(LOAD, *load)]))
            .collect()
    }

    /// T2.1: An unchanged re-query is not stale.
    #[test]
    fn unchanged_store() {
        let initial = pool(&[("a", 1.0), ("b", 2.0)]);
        assert!(!sum_changed(&initial, &initial.clone(), LOAD));
    }

    /// T2.2: Any shift of the sum is detected.
    #[test]
    fn sum_shift_detected() {
        let initial = pool(&[("a", 1.0), ("b", 2.0)]);
        let current = pool(&[("a", 1.0), ("b", 3.0)]);
        assert!(sum_changed(&initial, &current, LOAD));
    }

    /// T2.3: Equal and opposite shifts are the documented blind spot of
    /// the aggregate check; the per-candidate check sees them.
    #[test]
    fn equal_and_opposite_shift() {
        let initial = pool(&[("a", 1.0), ("b", 2.0)]);
        let current = pool(&[("a", 2.0), ("b", 1.0)]);

        assert!(!sum_changed(&initial, &current, LOAD));
        assert!(
            detect_drift(StalenessCheck::AggregateSum, &initial, &current, LOAD, []).is_none()
        );
        assert!(
            detect_drift(StalenessCheck::PerCandidate, &initial, &current, LOAD, []).is_some()
        );
    }
}

// =============================================================================
// TIER T3: COUNTER ARITHMETIC AND STAGES
// =============================================================================

mod t3_counter_and_stages {
    use assignwise_core::{
        CandidateId, CounterChange, CounterStep, FieldValue, ProceedPlan, ProcessGraph,
        StageStamp, StageTracker, TransitionAction, parse_counter_value,
    };

    /// T3.1: Increment then decrement is the identity.
    #[test]
    fn increment_decrement_inverse() {
        let id = CandidateId::new("u1");
        let up = CounterChange::plan(id.clone(), "Load", CounterStep::Increment, 4.0);
        let down = CounterChange::plan(id, "Load", CounterStep::Decrement, up.current);
        assert_eq!(down.current, 4.0);
    }

    /// T3.2: Counter parsing is strict where ranking is lenient.
    #[test]
    fn counter_parse_is_strict() {
        let id = CandidateId::new("u1");
        let raw = FieldValue::Text("four".into());

        assert!(parse_counter_value(&id, "Load", Some(&raw)).is_err());
        assert_eq!(assignwise_core::parse_metric(Some(&raw)), 0.0);
    }

    /// T3.3: Only the highest-index stage is terminal.
    #[test]
    fn terminal_detection() {
        let graph = ProcessGraph::linear(["Open", "Working", "Done"])
            .with_action(TransitionAction::new("Assign", "Open", "Working"));
        let stamps = StageStamp::defaults();
        let tracker = StageTracker::new(&graph, &stamps);

        assert_eq!(tracker.on_proceed("Done"), ProceedPlan::Terminal);
        assert!(matches!(
            tracker.on_proceed("Working"),
            ProceedPlan::Intermediate { .. }
        ));
    }
}
