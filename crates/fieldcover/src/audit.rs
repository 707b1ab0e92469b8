//! End-of-run aggregate checks: bulk-clear completeness and hash
//! diversity.
//!
//! The diversity bound is deliberately loose: up to four hash codes are
//! recorded per field, and the audit only demands at least one distinct
//! code per field, so it fires only when the hash function is degenerate
//! (constant, or blind to most fields). Kept as a coarse sanity check,
//! not a hash-quality proof.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::binding::PropertyBag;
use crate::report::Outcome;

/// Hash codes observed across one run. Cleared at run start by virtue of
/// being constructed fresh per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashRegistry {
    codes: BTreeSet<u64>,
}

impl HashRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, code: u64) -> bool {
        self.codes.insert(code)
    }

    pub fn distinct(&self) -> usize {
        self.codes.len()
    }
}

/// Result of the bulk-clear completeness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCheck {
    pub outcome: Outcome,
    /// The two instances diverged before `clear()`, as the per-field
    /// seeding guarantees when samplers are non-degenerate.
    pub diverged_before_clear: bool,
    /// `clear()` brought the two independently mutated instances back to
    /// equality.
    pub equal_after_clear: bool,
    /// The cleared state equals the default-constructed state.
    pub matches_default: bool,
    pub detail: Option<String>,
}

/// Result of the hash diversity audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashAudit {
    pub outcome: Outcome,
    pub distinct_hashes: usize,
    /// Upper bound on codes recorded this run (four per field).
    pub observed_ceiling: usize,
    pub required: usize,
}

/// Clear both instances and check that every field was reset.
///
/// A field left out of `clear()` keeps the divergent seed-3/seed-4 values
/// loaded during verification, so the instances stay unequal here.
pub fn audit_clear<P: PropertyBag>(p3: &mut P, p4: &mut P) -> ClearCheck {
    let diverged_before_clear = p3 != p4;
    p3.clear();
    p4.clear();
    let equal_after_clear = p3 == p4;
    let matches_default = *p3 == P::default();

    let detail = if !equal_after_clear {
        Some("a field is missing from clear()".to_string())
    } else if !matches_default {
        Some("clear() did not restore the default state".to_string())
    } else if !diverged_before_clear {
        Some("instances were expected to diverge before clear()".to_string())
    } else {
        None
    };

    ClearCheck {
        outcome: Outcome::from_bool(
            diverged_before_clear && equal_after_clear && matches_default,
        ),
        diverged_before_clear,
        equal_after_clear,
        matches_default,
        detail,
    }
}

/// Demand at least `field_count` distinct codes out of at most
/// `4 * field_count` observations.
pub fn audit_diversity(registry: &HashRegistry, field_count: usize) -> HashAudit {
    let distinct = registry.distinct();
    HashAudit {
        outcome: Outcome::from_bool(distinct >= field_count),
        distinct_hashes: distinct,
        observed_ceiling: field_count * 4,
        required: field_count,
    }
}
