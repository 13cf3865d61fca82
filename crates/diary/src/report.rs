//! Step-level outcome reporting.
//!
//! Dispatch and acknowledgment are best-effort pipelines: a failed store or
//! gateway call is logged and the remaining steps still run. Each failure is
//! recorded here so the webhook handler can report a partial result.

use serde::Serialize;
use std::fmt;
use tracing::warn;

/// A sub-step of dispatch or acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    LookupIncident,
    InsertIncident,
    ReloadIncident,
    PostRootMessage,
    InsertThreadRecord,
    UpdateIncidentStatus,
    UpdateRootMessage,
    PostThreadReply,
    UpdateThreadRecord,
    LookupThreadRecord,
    OpenModal,
    ReplaceMessage,
    UpdateRootCause,
}

impl Step {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LookupIncident => "lookup_incident",
            Self::InsertIncident => "insert_incident",
            Self::ReloadIncident => "reload_incident",
            Self::PostRootMessage => "post_root_message",
            Self::InsertThreadRecord => "insert_thread_record",
            Self::UpdateIncidentStatus => "update_incident_status",
            Self::UpdateRootMessage => "update_root_message",
            Self::PostThreadReply => "post_thread_reply",
            Self::UpdateThreadRecord => "update_thread_record",
            Self::LookupThreadRecord => "lookup_thread_record",
            Self::OpenModal => "open_modal",
            Self::ReplaceMessage => "replace_message",
            Self::UpdateRootCause => "update_root_cause",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: Step,
    pub error: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

/// Failures collected while running a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepFailures(Vec<StepFailure>);

impl StepFailures {
    /// Log a failed step and keep it for the report.
    pub fn record(&mut self, step: Step, error: impl fmt::Display) {
        let error = error.to_string();
        warn!(step = %step, error = %error, "Step failed, continuing");
        self.0.push(StepFailure { step, error });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn contains(&self, step: Step) -> bool {
        self.0.iter().any(|f| f.step == step)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepFailure> {
        self.0.iter()
    }
}
