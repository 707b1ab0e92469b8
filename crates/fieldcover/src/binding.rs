//! Field bindings: the static registry that replaces reflection.
//!
//! A verified bag publishes one [`FieldBinding`] per field — name, type
//! tag, and a getter/setter pair speaking [`SampleValue`]. Building the
//! registry is the one per-type cost; everything after it is generic.
//! [`discover`] validates the registry up front so a configuration gap
//! (duplicate name, type tag with no sampler) fails loudly before any
//! field is exercised.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sample::{AccessError, SampleValue, SamplerRegistry};

// ---------------------------------------------------------------------------
// PropertyBag contract
// ---------------------------------------------------------------------------

/// The capability contract a target type must satisfy to be verified.
///
/// `Clone` is the duplication operation, `Default` the zero-argument
/// constructor, `PartialEq`/`Hash` the structural equality and hash
/// derivation (hash must be consistent with equality). `copy_from` and
/// `clear` return `&mut Self` for fluent chaining.
pub trait PropertyBag: Clone + Default + PartialEq + Hash {
    const TYPE_NAME: &'static str;

    /// Replace all own field state with `other`'s.
    fn copy_from(&mut self, other: &Self) -> &mut Self;

    /// Reset every field to its default/absent representation.
    fn clear(&mut self) -> &mut Self;

    /// One binding per declared field, in a fixed order.
    fn bindings() -> Vec<FieldBinding<Self>>
    where
        Self: Sized;
}

/// Derive the bag's hash code from its `Hash` impl with a fixed-key
/// hasher, so equal bags always report equal codes within a run.
pub fn hash_code<P: Hash>(bag: &P) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bag.hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// FieldBinding
// ---------------------------------------------------------------------------

/// Accessor pair for one field, plus the type tag its sampler is looked
/// up under.
pub struct FieldBinding<P> {
    pub name: &'static str,
    pub type_tag: &'static str,
    pub get: fn(&P) -> SampleValue,
    pub set: fn(&mut P, &SampleValue) -> Result<(), AccessError>,
}

impl<P> Clone for FieldBinding<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for FieldBinding<P> {}

impl<P> fmt::Debug for FieldBinding<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("type_tag", &self.type_tag)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Registry validation failures. Each one is a hard failure naming the
/// offending field; none is ever skipped over.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoverError {
    #[error("`{target}` declares no field bindings")]
    NoFields { target: String },
    #[error("`{target}` declares field `{field}` more than once")]
    DuplicateField { target: String, field: String },
    #[error(
        "`{target}` field `{field}` uses type tag `{type_tag}` with no registered sampler"
    )]
    UnregisteredType {
        target: String,
        field: String,
        type_tag: String,
    },
}

/// Enumerate and validate the target type's field bindings.
pub fn discover<P: PropertyBag>(
    registry: &SamplerRegistry,
) -> Result<Vec<FieldBinding<P>>, DiscoverError> {
    let bindings = P::bindings();
    validate_bindings(P::TYPE_NAME, &bindings, registry)?;
    Ok(bindings)
}

/// Validation core, split out so ad-hoc binding sets can be checked.
pub fn validate_bindings<P>(
    target: &str,
    bindings: &[FieldBinding<P>],
    registry: &SamplerRegistry,
) -> Result<(), DiscoverError> {
    if bindings.is_empty() {
        return Err(DiscoverError::NoFields {
            target: target.to_string(),
        });
    }
    let mut seen = BTreeSet::new();
    for binding in bindings {
        if !seen.insert(binding.name) {
            return Err(DiscoverError::DuplicateField {
                target: target.to_string(),
                field: binding.name.to_string(),
            });
        }
        if !registry.contains(binding.type_tag) {
            return Err(DiscoverError::UnregisteredType {
                target: target.to_string(),
                field: binding.name.to_string(),
                type_tag: binding.type_tag.to_string(),
            });
        }
    }
    Ok(())
}
