//! Coverage report envelope and structured log events with stable keys.
//!
//! The report is the harness's only output: per-field verdicts, the two
//! aggregate checks, and an append-only event stream. Timestamps are
//! supplied by the caller so library output stays deterministic.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::audit::{ClearCheck, HashAudit};
use crate::verify::FieldFailure;

pub const COVERAGE_REPORT_SCHEMA_VERSION: &str = "fieldcover.coverage-report.v1";
pub const COVERAGE_EVENT_SCHEMA_VERSION: &str = "fieldcover.coverage-event.v1";

pub const ERROR_CONTRACT_VIOLATION: &str = "FC-COV-1001";
pub const ERROR_ASSERTION_FAILURE: &str = "FC-COV-1002";
pub const ERROR_UNSUPPORTED_TYPE: &str = "FC-COV-1003";
pub const ERROR_CLEAR_INCOMPLETE: &str = "FC-COV-1004";
pub const ERROR_HASH_DEGENERATE: &str = "FC-COV-1005";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn from_bool(pass: bool) -> Self {
        if pass { Self::Pass } else { Self::Fail }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

// ---------------------------------------------------------------------------
// Structured log events
// ---------------------------------------------------------------------------

/// One structured event with stable keys, appended per checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageLogEvent {
    pub schema_version: String,
    pub trace_id: String,
    pub component: String,
    pub event: String,
    pub outcome: Outcome,
    pub field: Option<String>,
    pub error_code: Option<String>,
    pub sequence: u64,
}

/// Append-only event collector carrying the run's trace id.
#[derive(Debug, Clone)]
pub struct EventLog {
    trace_id: String,
    events: Vec<CoverageLogEvent>,
}

impl EventLog {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            events: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        component: &str,
        event: &str,
        outcome: Outcome,
        field: Option<&str>,
        error_code: Option<&str>,
    ) {
        let sequence = self.events.len() as u64;
        self.events.push(CoverageLogEvent {
            schema_version: COVERAGE_EVENT_SCHEMA_VERSION.to_string(),
            trace_id: self.trace_id.clone(),
            component: component.to_string(),
            event: event.to_string(),
            outcome,
            field: field.map(str::to_string),
            error_code: error_code.map(str::to_string),
            sequence,
        });
    }

    pub fn into_events(self) -> Vec<CoverageLogEvent> {
        self.events
    }
}

/// Deterministic run identity derived from the schema version and target
/// type name.
pub fn derive_trace_id(target: &str) -> String {
    let material = format!("{COVERAGE_REPORT_SCHEMA_VERSION}|{target}");
    let digest = hex::encode(Sha256::digest(material.as_bytes()));
    format!("trace-fieldcover-{}", &digest[..16])
}

// ---------------------------------------------------------------------------
// CoverageReport
// ---------------------------------------------------------------------------

/// Per-field verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReport {
    pub field: String,
    pub type_tag: String,
    pub outcome: Outcome,
    pub failure: Option<FieldFailure>,
}

/// The complete outcome of one harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub schema_version: String,
    pub target: String,
    pub trace_id: String,
    pub generated_at_utc: String,
    pub field_count: usize,
    pub fields: Vec<FieldReport>,
    pub clear_check: ClearCheck,
    pub hash_audit: HashAudit,
    pub events: Vec<CoverageLogEvent>,
}

impl CoverageReport {
    pub fn passed(&self) -> bool {
        self.fields.iter().all(|f| f.outcome.is_pass())
            && self.clear_check.outcome.is_pass()
            && self.hash_audit.outcome.is_pass()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FieldFailure> {
        self.fields.iter().filter_map(|f| f.failure.as_ref())
    }
}

/// Render a caller-supplied timestamp in the report's canonical form.
pub fn render_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
