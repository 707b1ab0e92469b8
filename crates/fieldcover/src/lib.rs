//! fieldcover: a field-coverage contract harness for property-bag value
//! objects.
//!
//! A property bag is a value object whose identity is the aggregate of
//! its named fields, exposed through paired accessors plus bulk
//! operations (equality, hashing, clone, copy-from, clear). This crate
//! proves, without one bespoke test per field, that every field is wired
//! into all five of those semantics:
//! - [`sample`] synthesizes deterministic seeded sample values per field
//!   type, through a registry extensible by registration,
//! - [`binding`] declares the per-type accessor registry and validates it,
//! - [`verify`] drives the nine-step mutate/compare sequence per field,
//! - [`audit`] closes the run with the bulk-clear and hash-diversity
//!   checks,
//! - [`report`] carries the structured per-field verdicts and log events.
//!
//! ```
//! use chrono::Utc;
//! use fieldcover::{CoverageHarness, FieldBinding, PropertyBag, SampleValue, TAG_INT};
//!
//! #[derive(Debug, Clone, Default, PartialEq, Hash)]
//! struct Size {
//!     width: i64,
//! }
//!
//! impl PropertyBag for Size {
//!     const TYPE_NAME: &'static str = "Size";
//!
//!     fn copy_from(&mut self, other: &Self) -> &mut Self {
//!         self.width = other.width;
//!         self
//!     }
//!
//!     fn clear(&mut self) -> &mut Self {
//!         self.width = 0;
//!         self
//!     }
//!
//!     fn bindings() -> Vec<FieldBinding<Self>> {
//!         vec![FieldBinding {
//!             name: "width",
//!             type_tag: TAG_INT,
//!             get: |bag| SampleValue::Int(bag.width),
//!             set: |bag, value| {
//!                 bag.width = value.as_int()?;
//!                 Ok(())
//!             },
//!         }]
//!     }
//! }
//!
//! let report = CoverageHarness::with_builtins()
//!     .verify::<Size>(Utc::now())
//!     .expect("bindings validate");
//! assert!(report.passed());
//! ```

#![forbid(unsafe_code)]

pub mod audit;
pub mod binding;
pub mod report;
pub mod sample;
pub mod verify;

pub use audit::{ClearCheck, HashAudit, HashRegistry};
pub use binding::{DiscoverError, FieldBinding, PropertyBag, discover, hash_code};
pub use report::{
    COVERAGE_REPORT_SCHEMA_VERSION, CoverageLogEvent, CoverageReport, FieldReport, Outcome,
};
pub use sample::{
    AccessError, SampleError, SampleKind, SampleValue, SamplerRegistry, TAG_BOOL, TAG_DECIMAL,
    TAG_INT, TAG_NUMERIC_CONTEXT, TAG_ROUNDING_MODE, TAG_TEXT,
};
pub use verify::{CoverageHarness, FieldFailure, VerifyStep};
