//! The field-coverage verification sequence.
//!
//! Each discovered field is driven through a fixed mutate/compare
//! protocol across two instance pairs plus one clone scratch:
//! - p1/p2 carry the equality, side-effect, clone, and bulk-copy probes,
//! - p3/p4 accumulate divergent seed-3/seed-4 state for the end-of-run
//!   clear check and the hash diversity audit.
//!
//! Steps within one field are causally ordered (every assertion assumes
//! the exact state left by the previous step), so a field stops at its
//! first failure. The run itself never stops: the failure is recorded,
//! p1/p2 are cleared of residue, and the next field proceeds.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::{HashRegistry, audit_clear, audit_diversity};
use crate::binding::{DiscoverError, FieldBinding, PropertyBag, discover, hash_code};
use crate::report::{
    COVERAGE_REPORT_SCHEMA_VERSION, CoverageReport, ERROR_ASSERTION_FAILURE,
    ERROR_CLEAR_INCOMPLETE, ERROR_CONTRACT_VIOLATION, ERROR_HASH_DEGENERATE,
    ERROR_UNSUPPORTED_TYPE, EventLog, FieldReport, Outcome, derive_trace_id, render_timestamp,
};
use crate::sample::{SampleError, SampleValue, SamplerRegistry};

pub const VERIFIER_COMPONENT: &str = "field_coverage_verifier";
pub const AUDITOR_COMPONENT: &str = "hash_quality_auditor";

// ---------------------------------------------------------------------------
// VerifyStep
// ---------------------------------------------------------------------------

/// The nine checkpoints of the per-field sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStep {
    /// Seeds 0 and 1 must synthesize distinct values.
    SamplerDistinct,
    /// Both instances set to v0 must compare equal with equal hashes.
    BaselineEquality,
    /// Diverging only this field must break equality.
    EqualityCoverage,
    /// Restoring the field must re-converge the instances.
    RestoreProbe,
    /// Equality must also hold with both instances at v1.
    SymmetricEquality,
    /// A v2-then-v1 transition must land in the same state as v1 alone.
    TransitionProbe,
    /// The clone must equal its source on this field.
    CloneCoverage,
    /// Bulk-copy must carry this field across.
    CopyCoverage,
    /// Seed-3/seed-4 values load p3/p4 and feed the hash registry.
    HashSeeding,
}

impl VerifyStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SamplerDistinct => "sampler_distinct",
            Self::BaselineEquality => "baseline_equality",
            Self::EqualityCoverage => "equality_coverage",
            Self::RestoreProbe => "restore_probe",
            Self::SymmetricEquality => "symmetric_equality",
            Self::TransitionProbe => "transition_probe",
            Self::CloneCoverage => "clone_coverage",
            Self::CopyCoverage => "copy_coverage",
            Self::HashSeeding => "hash_seeding",
        }
    }

    /// Human-readable intent, surfaced verbatim in failure details.
    pub const fn intent(self) -> &'static str {
        match self {
            Self::SamplerDistinct => "sampler is degenerate for this type",
            Self::BaselineEquality => "equal field values must yield equal bags",
            Self::EqualityCoverage => "field missing from equals()",
            Self::RestoreProbe => "setter might have side effects",
            Self::SymmetricEquality => "equality must hold in both value directions",
            Self::TransitionProbe => "setter might have side effects",
            Self::CloneCoverage => "field did not get copied in clone",
            Self::CopyCoverage => "field missing from copy_from()",
            Self::HashSeeding => "seed values must load into spare instances",
        }
    }
}

impl fmt::Display for VerifyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

// ---------------------------------------------------------------------------
// FieldFailure
// ---------------------------------------------------------------------------

/// One collected per-field failure. Fatal for its field only; the run
/// continues with the remaining fields.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "failure")]
pub enum FieldFailure {
    /// A binding rejected a sample value: the accessor pair does not
    /// match the declared field type.
    #[error("field `{field}` accessor contract violated at {step}: {source}")]
    ContractViolation {
        field: String,
        step: VerifyStep,
        #[source]
        source: crate::sample::AccessError,
    },
    /// A mutate/compare assertion did not hold.
    #[error("field `{field}` failed {step}: {detail}")]
    AssertionFailure {
        field: String,
        step: VerifyStep,
        detail: String,
    },
    /// The sampler registry has no rule for this field's type. A
    /// configuration gap, not a target-object bug.
    #[error("field `{field}`: {source}")]
    UnsupportedType {
        field: String,
        #[source]
        source: SampleError,
    },
}

impl FieldFailure {
    pub fn field(&self) -> &str {
        match self {
            Self::ContractViolation { field, .. }
            | Self::AssertionFailure { field, .. }
            | Self::UnsupportedType { field, .. } => field,
        }
    }

    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ContractViolation { .. } => ERROR_CONTRACT_VIOLATION,
            Self::AssertionFailure { .. } => ERROR_ASSERTION_FAILURE,
            Self::UnsupportedType { .. } => ERROR_UNSUPPORTED_TYPE,
        }
    }
}

fn check(
    condition: bool,
    field: &str,
    step: VerifyStep,
    detail: &str,
) -> Result<(), FieldFailure> {
    if condition {
        return Ok(());
    }
    Err(FieldFailure::AssertionFailure {
        field: field.to_string(),
        step,
        detail: format!("{}: {detail}", step.intent()),
    })
}

// ---------------------------------------------------------------------------
// CoverageHarness
// ---------------------------------------------------------------------------

/// Drives the full verification protocol over a [`PropertyBag`] type.
#[derive(Debug, Clone)]
pub struct CoverageHarness {
    registry: SamplerRegistry,
}

impl Default for CoverageHarness {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CoverageHarness {
    /// A harness over a custom sampler registry.
    pub fn new(registry: SamplerRegistry) -> Self {
        Self { registry }
    }

    /// A harness over the builtin type table.
    pub fn with_builtins() -> Self {
        Self::new(SamplerRegistry::with_builtins())
    }

    pub fn registry_mut(&mut self) -> &mut SamplerRegistry {
        &mut self.registry
    }

    /// Run the whole protocol over `P`, collecting every failure.
    ///
    /// Only registry validation aborts the run; every per-field and
    /// aggregate finding lands in the report instead.
    pub fn verify<P: PropertyBag>(
        &self,
        generated_at: DateTime<Utc>,
    ) -> Result<CoverageReport, DiscoverError> {
        let bindings = discover::<P>(&self.registry)?;
        let trace_id = derive_trace_id(P::TYPE_NAME);
        let mut events = EventLog::new(trace_id.clone());
        events.push(VERIFIER_COMPONENT, "fields_discovered", Outcome::Pass, None, None);

        let mut p1 = P::default();
        let mut p2 = P::default();
        let mut p3 = P::default();
        let mut p4 = P::default();
        let mut hashes = HashRegistry::new();
        let mut fields = Vec::with_capacity(bindings.len());

        for binding in &bindings {
            let verdict = self.verify_field(binding, &mut p1, &mut p2, &mut p3, &mut p4, &mut hashes);
            match verdict {
                Ok(()) => {
                    events.push(
                        VERIFIER_COMPONENT,
                        "field_verified",
                        Outcome::Pass,
                        Some(binding.name),
                        None,
                    );
                    fields.push(FieldReport {
                        field: binding.name.to_string(),
                        type_tag: binding.type_tag.to_string(),
                        outcome: Outcome::Pass,
                        failure: None,
                    });
                }
                Err(failure) => {
                    events.push(
                        VERIFIER_COMPONENT,
                        "field_verified",
                        Outcome::Fail,
                        Some(binding.name),
                        Some(failure.error_code()),
                    );
                    fields.push(FieldReport {
                        field: binding.name.to_string(),
                        type_tag: binding.type_tag.to_string(),
                        outcome: Outcome::Fail,
                        failure: Some(failure),
                    });
                    // Drop any residue the aborted sequence left behind so
                    // the next field starts from a converged pair.
                    p1.clear();
                    p2.clear();
                }
            }
        }

        let clear_check = audit_clear(&mut p3, &mut p4);
        events.push(
            AUDITOR_COMPONENT,
            "clear_verified",
            clear_check.outcome,
            None,
            (!clear_check.outcome.is_pass()).then_some(ERROR_CLEAR_INCOMPLETE),
        );

        let hash_audit = audit_diversity(&hashes, bindings.len());
        events.push(
            AUDITOR_COMPONENT,
            "hash_diversity_audited",
            hash_audit.outcome,
            None,
            (!hash_audit.outcome.is_pass()).then_some(ERROR_HASH_DEGENERATE),
        );

        Ok(CoverageReport {
            schema_version: COVERAGE_REPORT_SCHEMA_VERSION.to_string(),
            target: P::TYPE_NAME.to_string(),
            trace_id,
            generated_at_utc: render_timestamp(generated_at),
            field_count: bindings.len(),
            fields,
            clear_check,
            hash_audit,
            events: events.into_events(),
        })
    }

    fn synthesize_for(
        &self,
        binding_field: &str,
        type_tag: &str,
        seed: u32,
    ) -> Result<SampleValue, FieldFailure> {
        self.registry
            .synthesize(type_tag, seed)
            .map_err(|source| FieldFailure::UnsupportedType {
                field: binding_field.to_string(),
                source,
            })
    }

    #[allow(clippy::too_many_lines)]
    fn verify_field<P: PropertyBag>(
        &self,
        binding: &FieldBinding<P>,
        p1: &mut P,
        p2: &mut P,
        p3: &mut P,
        p4: &mut P,
        hashes: &mut HashRegistry,
    ) -> Result<(), FieldFailure> {
        let field = binding.name;
        let set = |bag: &mut P, value: &SampleValue, step: VerifyStep| {
            (binding.set)(bag, value).map_err(|source| FieldFailure::ContractViolation {
                field: field.to_string(),
                step,
                source,
            })
        };
        let get = binding.get;

        let v0 = self.synthesize_for(field, binding.type_tag, 0)?;
        let v1 = self.synthesize_for(field, binding.type_tag, 1)?;
        let v2 = self.synthesize_for(field, binding.type_tag, 2)?;

        // Step 1: the sampler must tell v0 and v1 apart, or every later
        // assertion is vacuous.
        check(
            v0 != v1,
            field,
            VerifyStep::SamplerDistinct,
            "seeds 0 and 1 synthesized equal values",
        )?;

        // Step 2: baseline convergence at v0.
        let step = VerifyStep::BaselineEquality;
        set(p1, &v0, step)?;
        set(p2, &v0, step)?;
        check(p1 == p2, field, step, "bags differ after identical sets")?;
        check(
            hash_code(p1) == hash_code(p2),
            field,
            step,
            "hash codes differ for equal bags",
        )?;
        check(get(p1) == get(p2), field, step, "getters disagree")?;
        check(get(p1) == v0, field, step, "getter did not return the set value")?;
        check(get(p1) != v1, field, step, "getter already reports the unset value")?;
        hashes.record(hash_code(p1));

        // Step 3: the critical equality-coverage divergence.
        let step = VerifyStep::EqualityCoverage;
        set(p1, &v1, step)?;
        check(p1 != p2, field, step, "bags compare equal after diverging")?;
        check(get(p1) != get(p2), field, step, "getters agree after diverging")?;
        check(get(p1) != v0, field, step, "getter still reports the old value")?;
        check(get(p1) == v1, field, step, "getter did not return the set value")?;

        // Step 4: restore and re-converge.
        let step = VerifyStep::RestoreProbe;
        set(p1, &v0, step)?;
        check(p1 == p2, field, step, "bags differ after restoring the field")?;
        check(
            hash_code(p1) == hash_code(p2),
            field,
            step,
            "hash codes differ after restoring the field",
        )?;
        check(get(p1) == get(p2), field, step, "getters disagree")?;

        // Step 5: same check with both instances at v1.
        let step = VerifyStep::SymmetricEquality;
        set(p1, &v1, step)?;
        set(p2, &v1, step)?;
        check(p1 == p2, field, step, "bags differ after identical sets")?;
        check(
            hash_code(p1) == hash_code(p2),
            field,
            step,
            "hash codes differ for equal bags",
        )?;
        check(get(p1) == get(p2), field, step, "getters disagree")?;

        // Step 6: a second side-effect probe through a third value.
        let step = VerifyStep::TransitionProbe;
        set(p1, &v2, step)?;
        set(p1, &v1, step)?;
        check(p1 == p2, field, step, "v2-then-v1 differs from v1 alone")?;
        check(
            hash_code(p1) == hash_code(p2),
            field,
            step,
            "hash codes differ after the transition",
        )?;
        check(get(p1) == get(p2), field, step, "getters disagree")?;
        hashes.record(hash_code(p1));

        // Step 7: duplication.
        let step = VerifyStep::CloneCoverage;
        let copy = p1.clone();
        check(copy == *p1, field, step, "clone differs from its source")?;
        check(
            hash_code(&copy) == hash_code(p1),
            field,
            step,
            "clone hash differs from its source",
        )?;
        check(get(&copy) == get(p1), field, step, "clone getter disagrees")?;

        // Step 8: bulk-copy.
        let step = VerifyStep::CopyCoverage;
        set(p1, &v0, step)?;
        check(p1 != p2, field, step, "bags expected to diverge before copy_from")?;
        check(
            get(p1) != get(p2),
            field,
            step,
            "getters expected to diverge before copy_from",
        )?;
        p2.copy_from(p1);
        check(p1 == p2, field, step, "bags differ after copy_from")?;
        check(
            hash_code(p1) == hash_code(p2),
            field,
            step,
            "hash codes differ after copy_from",
        )?;
        check(get(p1) == get(p2), field, step, "getters disagree after copy_from")?;

        // Step 9: load the clear-check pair and feed the hash registry.
        let step = VerifyStep::HashSeeding;
        let v3 = self.synthesize_for(field, binding.type_tag, 3)?;
        let v4 = self.synthesize_for(field, binding.type_tag, 4)?;
        set(p3, &v3, step)?;
        hashes.record(hash_code(p3));
        set(p4, &v4, step)?;
        hashes.record(hash_code(p4));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::FieldBinding;
    use crate::sample::{TAG_INT, TAG_TEXT};
    use chrono::TimeZone;

    #[derive(Debug, Clone, Default, PartialEq, Hash)]
    struct Extent {
        width: i64,
        prefix: Option<String>,
    }

    impl PropertyBag for Extent {
        const TYPE_NAME: &'static str = "Extent";

        fn copy_from(&mut self, other: &Self) -> &mut Self {
            self.width = other.width;
            self.prefix = other.prefix.clone();
            self
        }

        fn clear(&mut self) -> &mut Self {
            *self = Self::default();
            self
        }

        fn bindings() -> Vec<FieldBinding<Self>> {
            vec![
                FieldBinding {
                    name: "width",
                    type_tag: TAG_INT,
                    get: |bag| SampleValue::Int(bag.width),
                    set: |bag, value| {
                        bag.width = value.as_int()?;
                        Ok(())
                    },
                },
                FieldBinding {
                    name: "prefix",
                    type_tag: TAG_TEXT,
                    get: |bag| match &bag.prefix {
                        None => SampleValue::Absent,
                        Some(text) => SampleValue::Text(text.clone()),
                    },
                    set: |bag, value| {
                        bag.prefix = value.as_text()?.map(str::to_string);
                        Ok(())
                    },
                },
            ]
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 22, 0, 0, 0).unwrap()
    }

    #[test]
    fn well_behaved_bag_passes_every_check() {
        let report = CoverageHarness::with_builtins()
            .verify::<Extent>(at())
            .expect("valid registry");
        assert!(report.passed(), "failures: {:?}", report.failures().collect::<Vec<_>>());
        assert_eq!(report.field_count, 2);
        assert!(report.fields.iter().all(|f| f.outcome.is_pass()));
        assert_eq!(report.clear_check.outcome, Outcome::Pass);
        assert_eq!(report.hash_audit.outcome, Outcome::Pass);
        // One discovery event, one per field, two aggregate events.
        assert_eq!(report.events.len(), 5);
    }

    #[test]
    fn unsupported_type_is_fatal_for_that_field_only() {
        #[derive(Debug, Clone, Default, PartialEq, Hash)]
        struct Odd {
            width: i64,
            badge: i64,
        }

        impl PropertyBag for Odd {
            const TYPE_NAME: &'static str = "Odd";

            fn copy_from(&mut self, other: &Self) -> &mut Self {
                *self = other.clone();
                self
            }

            fn clear(&mut self) -> &mut Self {
                *self = Self::default();
                self
            }

            fn bindings() -> Vec<FieldBinding<Self>> {
                vec![
                    FieldBinding {
                        name: "width",
                        type_tag: TAG_INT,
                        get: |bag| SampleValue::Int(bag.width),
                        set: |bag, value| {
                            bag.width = value.as_int()?;
                            Ok(())
                        },
                    },
                    FieldBinding {
                        name: "badge",
                        type_tag: "badge-kind",
                        get: |bag| SampleValue::Int(bag.badge),
                        set: |bag, value| {
                            bag.badge = value.as_int()?;
                            Ok(())
                        },
                    },
                ]
            }
        }

        // Unknown tags are rejected at discovery, before any field runs.
        let err = CoverageHarness::with_builtins()
            .verify::<Odd>(at())
            .unwrap_err();
        assert_eq!(
            err,
            DiscoverError::UnregisteredType {
                target: "Odd".to_string(),
                field: "badge".to_string(),
                type_tag: "badge-kind".to_string(),
            }
        );

        // A registered-but-unusable sampler (empty enumeration) surfaces
        // mid-run as an UnsupportedType failure for that field alone.
        let mut harness = CoverageHarness::with_builtins();
        harness.registry_mut().register_enumerated("badge-kind", &[]);
        let report = harness.verify::<Odd>(at()).expect("registry now validates");
        assert!(!report.passed());
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field(), "badge");
        assert_eq!(failures[0].error_code(), ERROR_UNSUPPORTED_TYPE);
        assert!(failures[0].to_string().contains("`badge-kind`"));
        assert!(report.fields[0].outcome.is_pass(), "width is unaffected");
    }

    #[test]
    fn mistyped_binding_is_a_contract_violation() {
        #[derive(Debug, Clone, Default, PartialEq, Hash)]
        struct Mistyped {
            width: i64,
        }

        impl PropertyBag for Mistyped {
            const TYPE_NAME: &'static str = "Mistyped";

            fn copy_from(&mut self, other: &Self) -> &mut Self {
                *self = other.clone();
                self
            }

            fn clear(&mut self) -> &mut Self {
                *self = Self::default();
                self
            }

            fn bindings() -> Vec<FieldBinding<Self>> {
                // Declared as text, but the setter demands an int sample.
                vec![FieldBinding {
                    name: "width",
                    type_tag: TAG_TEXT,
                    get: |bag| SampleValue::Int(bag.width),
                    set: |bag, value| {
                        bag.width = value.as_int()?;
                        Ok(())
                    },
                }]
            }
        }

        let report = CoverageHarness::with_builtins()
            .verify::<Mistyped>(at())
            .expect("registry is valid; the binding itself is broken");
        assert!(!report.passed());
        let failure = report.failures().next().expect("one failure");
        assert_eq!(failure.error_code(), ERROR_CONTRACT_VIOLATION);
        assert_eq!(failure.field(), "width");
    }

    #[test]
    fn step_metadata_is_stable() {
        assert_eq!(VerifyStep::EqualityCoverage.as_str(), "equality_coverage");
        assert_eq!(
            VerifyStep::EqualityCoverage.intent(),
            "field missing from equals()"
        );
        assert_eq!(VerifyStep::CopyCoverage.intent(), "field missing from copy_from()");
        assert_eq!(VerifyStep::TransitionProbe.to_string(), "transition_probe");
    }
}
