//! Deterministic sample-value synthesis for property-bag fields.
//!
//! Every field type the harness understands maps to a sampler: a pure
//! function from a small integer seed to a concrete value. Seed 0 is the
//! "absence" representation for nullable types; seeds 1..=4 produce
//! pairwise-distinct values for the unbounded types. Bounded types
//! (enumerations, booleans) wrap around instead, which is acceptable
//! because the verifier only exercises seeds 0..=4 and only relies on
//! v0 != v1 and v1 != v2.
//!
//! Samplers are looked up by type tag in a registry extensible by
//! registration, so adding a domain type never means editing a
//! conditional chain.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest seed the verifier ever requests.
pub const SAMPLE_SEED_MAX: u32 = 4;

/// Multipliers keep small seeds far apart so typos in bag accessors
/// (truncation, off-by-one scaling) surface as inequality.
const INT_STEP: i64 = 1_000_001;
const DECIMAL_STEP: i64 = 1_000_002;
const TEXT_STEP: i64 = 1_000_003;

/// Builtin type tags.
pub const TAG_INT: &str = "int";
pub const TAG_BOOL: &str = "bool";
pub const TAG_DECIMAL: &str = "decimal";
pub const TAG_TEXT: &str = "text";
pub const TAG_ROUNDING_MODE: &str = "rounding-mode";
pub const TAG_NUMERIC_CONTEXT: &str = "numeric-context";

/// Member labels of the builtin `rounding-mode` enumeration.
pub const ROUNDING_MODE_LABELS: &[&str] = &[
    "up",
    "down",
    "ceiling",
    "floor",
    "half_up",
    "half_down",
    "half_even",
    "unnecessary",
];

// ---------------------------------------------------------------------------
// SampleValue
// ---------------------------------------------------------------------------

/// A dynamically typed sample value produced by a sampler and consumed by
/// field bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SampleValue {
    /// The "no value" representation of a nullable field.
    Absent,
    Int(i64),
    Bool(bool),
    /// Fixed-point decimal payload; the binding decides the scale.
    Decimal(i64),
    Text(String),
    /// A member of a bounded enumeration, identified by ordinal and label.
    Enum {
        type_tag: String,
        ordinal: u32,
        label: String,
    },
    /// An aggregate of simpler samples (e.g. precision plus rounding mode).
    Composite(Vec<SampleValue>),
}

/// Discriminant of a [`SampleValue`], used for accessor type checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Absent,
    Int,
    Bool,
    Decimal,
    Text,
    Enum,
    Composite,
}

impl SampleKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Decimal => "decimal",
            Self::Text => "text",
            Self::Enum => "enum",
            Self::Composite => "composite",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// A sample value could not be converted to the shape a binding expects.
///
/// This is the static analog of a getter/setter whose type does not match
/// the declared field type: the binding asked for one kind, the value in
/// hand is another.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("expected a {expected} sample, got {actual}")]
pub struct AccessError {
    pub expected: SampleKind,
    pub actual: SampleKind,
}

impl SampleValue {
    pub fn kind(&self) -> SampleKind {
        match self {
            Self::Absent => SampleKind::Absent,
            Self::Int(_) => SampleKind::Int,
            Self::Bool(_) => SampleKind::Bool,
            Self::Decimal(_) => SampleKind::Decimal,
            Self::Text(_) => SampleKind::Text,
            Self::Enum { .. } => SampleKind::Enum,
            Self::Composite(_) => SampleKind::Composite,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    fn mismatch(&self, expected: SampleKind) -> AccessError {
        AccessError {
            expected,
            actual: self.kind(),
        }
    }

    pub fn as_int(&self) -> Result<i64, AccessError> {
        match self {
            Self::Int(v) => Ok(*v),
            other => Err(other.mismatch(SampleKind::Int)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, AccessError> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(other.mismatch(SampleKind::Bool)),
        }
    }

    /// Nullable decimal: `Absent` maps to `None`.
    pub fn as_decimal(&self) -> Result<Option<i64>, AccessError> {
        match self {
            Self::Absent => Ok(None),
            Self::Decimal(v) => Ok(Some(*v)),
            other => Err(other.mismatch(SampleKind::Decimal)),
        }
    }

    /// Nullable text: `Absent` maps to `None`.
    pub fn as_text(&self) -> Result<Option<&str>, AccessError> {
        match self {
            Self::Absent => Ok(None),
            Self::Text(v) => Ok(Some(v.as_str())),
            other => Err(other.mismatch(SampleKind::Text)),
        }
    }

    /// Nullable enumeration member: `Absent` maps to `None`, otherwise the
    /// member's ordinal.
    pub fn as_enum_ordinal(&self) -> Result<Option<u32>, AccessError> {
        match self {
            Self::Absent => Ok(None),
            Self::Enum { ordinal, .. } => Ok(Some(*ordinal)),
            other => Err(other.mismatch(SampleKind::Enum)),
        }
    }

    pub fn as_composite(&self) -> Result<Option<&[SampleValue]>, AccessError> {
        match self {
            Self::Absent => Ok(None),
            Self::Composite(parts) => Ok(Some(parts.as_slice())),
            other => Err(other.mismatch(SampleKind::Composite)),
        }
    }
}

// ---------------------------------------------------------------------------
// SampleError
// ---------------------------------------------------------------------------

/// Errors from the sampler registry.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleError {
    /// No sampler is registered for the given tag. This is a configuration
    /// gap in the registry, not a defect in the object under test, and it
    /// must surface as a hard failure naming the tag so the table can be
    /// extended.
    #[error("no sampler registered for type `{type_tag}`; register it on the SamplerRegistry")]
    UnsupportedType { type_tag: String },
    /// An enumeration was registered with an empty member set.
    #[error("enumerated type `{type_tag}` has no members")]
    EmptyEnumeration { type_tag: String },
}

// ---------------------------------------------------------------------------
// SamplerRegistry
// ---------------------------------------------------------------------------

/// A pure sampler: seed in, value out. Must be deterministic.
pub type SamplerFn = fn(u32) -> SampleValue;

#[derive(Clone)]
enum Sampler {
    Free(SamplerFn),
    Enumerated { labels: Vec<&'static str> },
}

/// Lookup table from field type tag to sampler, extensible by
/// registration.
#[derive(Clone, Default)]
pub struct SamplerRegistry {
    table: BTreeMap<&'static str, Sampler>,
}

impl SamplerRegistry {
    /// An empty registry with no samplers at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the builtin type table.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(TAG_INT, sample_int);
        registry.register(TAG_BOOL, sample_bool);
        registry.register(TAG_DECIMAL, sample_decimal);
        registry.register(TAG_TEXT, sample_text);
        registry.register_enumerated(TAG_ROUNDING_MODE, ROUNDING_MODE_LABELS);
        registry.register(TAG_NUMERIC_CONTEXT, sample_numeric_context);
        registry
    }

    /// Register (or replace) a free-form sampler for `type_tag`.
    pub fn register(&mut self, type_tag: &'static str, sampler: SamplerFn) -> &mut Self {
        self.table.insert(type_tag, Sampler::Free(sampler));
        self
    }

    /// Register a bounded enumeration. Seed 0 synthesizes `Absent`; any
    /// other seed selects the `(seed mod cardinality)`-th member, so the
    /// sampler is total even when the seed exceeds the member count.
    pub fn register_enumerated(
        &mut self,
        type_tag: &'static str,
        labels: &[&'static str],
    ) -> &mut Self {
        self.table.insert(
            type_tag,
            Sampler::Enumerated {
                labels: labels.to_vec(),
            },
        );
        self
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.table.contains_key(type_tag)
    }

    /// Synthesize the seed-th canonical sample of `type_tag`.
    pub fn synthesize(&self, type_tag: &str, seed: u32) -> Result<SampleValue, SampleError> {
        match self.table.get(type_tag) {
            None => Err(SampleError::UnsupportedType {
                type_tag: type_tag.to_string(),
            }),
            Some(Sampler::Free(f)) => Ok(f(seed)),
            Some(Sampler::Enumerated { labels }) => {
                if labels.is_empty() {
                    return Err(SampleError::EmptyEnumeration {
                        type_tag: type_tag.to_string(),
                    });
                }
                Ok(enumerated_member(type_tag, labels, seed))
            }
        }
    }
}

impl fmt::Debug for SamplerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplerRegistry")
            .field("type_tags", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builtin samplers
// ---------------------------------------------------------------------------

fn sample_int(seed: u32) -> SampleValue {
    SampleValue::Int(i64::from(seed) * INT_STEP)
}

fn sample_bool(seed: u32) -> SampleValue {
    SampleValue::Bool(seed % 2 == 0)
}

fn sample_decimal(seed: u32) -> SampleValue {
    if seed == 0 {
        return SampleValue::Absent;
    }
    SampleValue::Decimal(i64::from(seed) * DECIMAL_STEP)
}

fn sample_text(seed: u32) -> SampleValue {
    if seed == 0 {
        return SampleValue::Absent;
    }
    SampleValue::Text(to_base32(i64::from(seed) * TEXT_STEP))
}

fn sample_numeric_context(seed: u32) -> SampleValue {
    if seed == 0 {
        return SampleValue::Absent;
    }
    let mode = enumerated_member(TAG_ROUNDING_MODE, ROUNDING_MODE_LABELS, seed);
    SampleValue::Composite(vec![SampleValue::Int(i64::from(seed)), mode])
}

fn enumerated_member(type_tag: &str, labels: &[&'static str], seed: u32) -> SampleValue {
    if seed == 0 {
        return SampleValue::Absent;
    }
    let ordinal = seed % labels.len() as u32;
    SampleValue::Enum {
        type_tag: type_tag.to_string(),
        ordinal,
        label: labels[ordinal as usize].to_string(),
    }
}

/// Lowercase base-32 rendering (digits `0-9a-v`), matching the text
/// sampler's canonical form for derived strings.
fn to_base32(mut n: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuv";
    if n == 0 {
        return "0".to_string();
    }
    let negative = n < 0;
    if negative {
        n = -n;
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 32) as usize]);
        n /= 32;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
