//! # Optimistic Staleness Check
//!
//! Detects whether the candidate pool changed between selection and commit.
//!
//! Two detectors are provided:
//!
//! | Mode | Compares | Blind spot |
//! |------|----------|------------|
//! | [`StalenessCheck::AggregateSum`] | sum of the counter field over the pool | equal and opposite shifts cancel out |
//! | [`StalenessCheck::PerCandidate`] | every tracked field of every candidate, bit for bit | none for tracked fields |
//!
//! Both are advisory: nothing locks the pool between the re-check and the
//! commit that follows it.

use crate::{CandidateId, CandidatePool};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// AGGREGATE SUM
// =============================================================================

/// Sum of `counter_key` over the pool, in pool order.
#[must_use]
pub fn counter_sum(pool: &CandidatePool, counter_key: &str) -> f64 {
    pool.iter().map(|c| c.metric(counter_key)).sum()
}

/// The aggregate check: true when the counter sums differ.
///
/// Not sensitive to redistributions that leave the sum unchanged.
#[must_use]
pub fn sum_changed(initial: &CandidatePool, current: &CandidatePool, counter_key: &str) -> bool {
    counter_sum(initial, counter_key) != counter_sum(current, counter_key)
}

// =============================================================================
// PER-CANDIDATE FINGERPRINT
// =============================================================================

/// Tracked field values of one pool, keyed by candidate.
///
/// Values are stored as raw `f64` bits. A candidate listed more than once
/// keeps one entry per occurrence, in pool order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolFingerprint {
    entries: BTreeMap<CandidateId, Vec<BTreeMap<String, u64>>>,
    digest: blake3::Hash,
}

impl PoolFingerprint {
    /// Capture `keys` for every candidate in `pool`.
    #[must_use]
    pub fn capture<'a>(pool: &CandidatePool, keys: impl IntoIterator<Item = &'a str>) -> Self {
        let keys: BTreeSet<&str> = keys.into_iter().collect();
        let mut entries: BTreeMap<CandidateId, Vec<BTreeMap<String, u64>>> = BTreeMap::new();

        for candidate in pool {
            let fields = keys
                .iter()
                .map(|key| (key.to_string(), candidate.metric(key).to_bits()))
                .collect();
            entries.entry(candidate.id.clone()).or_default().push(fields);
        }

        let digest = digest_entries(&entries);
        Self { entries, digest }
    }

    /// Hex digest over the canonical encoding of the tracked fields.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        self.digest.to_hex().to_string()
    }

    /// Field-by-field comparison against a later capture.
    #[must_use]
    pub fn diff(&self, current: &PoolFingerprint) -> PoolDrift {
        let mut drift = PoolDrift::default();

        for (id, before) in &self.entries {
            match current.entries.get(id) {
                None => drift.vanished.push(id.clone()),
                Some(after) if after != before => drift.changed.push(id.clone()),
                Some(_) => {}
            }
        }
        for id in current.entries.keys() {
            if !self.entries.contains_key(id) {
                drift.appeared.push(id.clone());
            }
        }

        drift
    }
}

/// Length-prefixed canonical encoding: ids and keys in `BTreeMap` order,
/// values as little-endian bits.
fn digest_entries(entries: &BTreeMap<CandidateId, Vec<BTreeMap<String, u64>>>) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for (id, occurrences) in entries {
        hash_str(&mut hasher, id.as_str());
        hasher.update(&(occurrences.len() as u64).to_le_bytes());
        for fields in occurrences {
            hasher.update(&(fields.len() as u64).to_le_bytes());
            for (key, bits) in fields {
                hash_str(&mut hasher, key);
                hasher.update(&bits.to_le_bytes());
            }
        }
    }
    hasher.finalize()
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

/// Candidates that differ between two captures.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolDrift {
    pub appeared: Vec<CandidateId>,
    pub vanished: Vec<CandidateId>,
    pub changed: Vec<CandidateId>,
}

impl PoolDrift {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.appeared.is_empty() && self.vanished.is_empty() && self.changed.is_empty()
    }

    /// Number of candidates involved in the drift.
    #[must_use]
    pub fn len(&self) -> usize {
        self.appeared.len() + self.vanished.len() + self.changed.len()
    }
}

// =============================================================================
// CHECK SELECTION
// =============================================================================

/// Which detector guards the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StalenessCheck {
    /// Compare counter sums only.
    AggregateSum,
    /// Compare every tracked field of every candidate.
    #[default]
    PerCandidate,
}

/// Compare `initial` against `current` under `mode`.
///
/// `tracked_keys` are the priority metric keys; the counter key is always
/// tracked. Returns the drift when the pool is considered changed.
#[must_use]
pub fn detect_drift<'a>(
    mode: StalenessCheck,
    initial: &CandidatePool,
    current: &CandidatePool,
    counter_key: &'a str,
    tracked_keys: impl IntoIterator<Item = &'a str>,
) -> Option<PoolDrift> {
    match mode {
        StalenessCheck::AggregateSum => {
            if !sum_changed(initial, current, counter_key) {
                return None;
            }
            let before = PoolFingerprint::capture(initial, [counter_key]);
            let after = PoolFingerprint::capture(current, [counter_key]);
            Some(before.diff(&after))
        }
        StalenessCheck::PerCandidate => {
            let keys: Vec<&str> = std::iter::once(counter_key).chain(tracked_keys).collect();
            let before = PoolFingerprint::capture(initial, keys.iter().copied());
            let after = PoolFingerprint::capture(current, keys.iter().copied());
            if before.digest == after.digest {
                return None;
            }
            Some(before.diff(&after)).filter(|drift| !drift.is_empty())
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candidate;

    const LOAD: &str = "Open_Tickets";

    fn pool(loads: &[(&str, f64)]) -> CandidatePool {
        loads
            .iter()
            .map(|(id, load)| Candidate::new(CandidateId::new(*id), *id).with_metric(LOAD, *load))
            .collect()
    }

    #[test]
    fn unchanged_pool_is_not_stale() {
        let a = pool(&[("x", 1.0), ("y", 2.0)]);
        let b = a.clone();

        assert!(!sum_changed(&a, &b, LOAD));
        assert!(detect_drift(StalenessCheck::PerCandidate, &a, &b, LOAD, []).is_none());
        assert!(detect_drift(StalenessCheck::AggregateSum, &a, &b, LOAD, []).is_none());
    }

    #[test]
    fn sum_shift_is_detected_by_both() {
        let a = pool(&[("x", 1.0), ("y", 2.0)]);
        let b = pool(&[("x", 2.0), ("y", 2.0)]);

        let sum = detect_drift(StalenessCheck::AggregateSum, &a, &b, LOAD, []).expect("stale");
        assert_eq!(sum.changed, vec![CandidateId::new("x")]);

        let per = detect_drift(StalenessCheck::PerCandidate, &a, &b, LOAD, []).expect("stale");
        assert_eq!(per.len(), 1);
    }

    #[test]
    fn equal_and_opposite_shift_is_the_sum_blind_spot() {
        let a = pool(&[("x", 1.0), ("y", 2.0)]);
        let b = pool(&[("x", 2.0), ("y", 1.0)]);

        assert!(!sum_changed(&a, &b, LOAD));
        assert!(detect_drift(StalenessCheck::AggregateSum, &a, &b, LOAD, []).is_none());

        let drift = detect_drift(StalenessCheck::PerCandidate, &a, &b, LOAD, []).expect("stale");
        assert_eq!(drift.changed.len(), 2);
    }

    #[test]
    fn membership_changes_are_reported() {
        let a = pool(&[("x", 1.0), ("y", 2.0)]);
        let b = pool(&[("x", 1.0), ("z", 2.0)]);

        let drift = detect_drift(StalenessCheck::PerCandidate, &a, &b, LOAD, []).expect("stale");
        assert_eq!(drift.vanished, vec![CandidateId::new("y")]);
        assert_eq!(drift.appeared, vec![CandidateId::new("z")]);
    }

    #[test]
    fn tracked_priority_fields_are_compared() {
        let a: CandidatePool = vec![
            Candidate::new(CandidateId::new("x"), "x")
                .with_metric(LOAD, 1.0)
                .with_metric("Skill", 3.0),
        ]
        .into_iter()
        .collect();
        let b: CandidatePool = vec![
            Candidate::new(CandidateId::new("x"), "x")
                .with_metric(LOAD, 1.0)
                .with_metric("Skill", 4.0),
        ]
        .into_iter()
        .collect();

        assert!(detect_drift(StalenessCheck::PerCandidate, &a, &b, LOAD, []).is_none());
        assert!(detect_drift(StalenessCheck::PerCandidate, &a, &b, LOAD, ["Skill"]).is_some());
    }

    #[test]
    fn digest_is_order_independent_and_stable() {
        let a = pool(&[("x", 1.0), ("y", 2.0)]);
        let b = pool(&[("y", 2.0), ("x", 1.0)]);

        let fa = PoolFingerprint::capture(&a, [LOAD]);
        let fb = PoolFingerprint::capture(&b, [LOAD]);
        assert_eq!(fa.digest_hex(), fb.digest_hex());
        assert_eq!(fa.digest_hex().len(), 64);
    }

    #[test]
    fn staleness_mode_parses_kebab_case() {
        let mode: StalenessCheck = serde_json::from_str("\"aggregate-sum\"").expect("parse");
        assert_eq!(mode, StalenessCheck::AggregateSum);
        assert_eq!(StalenessCheck::default(), StalenessCheck::PerCandidate);
    }
}
