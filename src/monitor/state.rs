use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{SafetyAnalysis, VitalSigns};
use crate::pipeline::safety::{AnalysisRequest, ErrorCategory};

/// One input snapshot from the chat/form layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorInput {
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub vitals: VitalSigns,
    #[serde(default, alias = "patient_id")]
    pub patient_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Why a snapshot is not sent to the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputIssue {
    Disabled,
    NoSymptoms,
    MissingPatient,
}

/// The input as of one `submit`, stamped with its request id.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSnapshot {
    pub request_id: u64,
    pub symptoms: Vec<String>,
    pub vitals: VitalSigns,
    pub patient_id: String,
    pub enabled: bool,
}

impl RequestSnapshot {
    /// Blank symptom entries are dropped and the patient id trimmed.
    pub fn new(request_id: u64, input: MonitorInput) -> Self {
        Self {
            request_id,
            symptoms: input
                .symptoms
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            vitals: input.vitals,
            patient_id: input.patient_id.trim().to_string(),
            enabled: input.enabled,
        }
    }

    pub fn check(&self) -> Result<(), InputIssue> {
        if !self.enabled {
            Err(InputIssue::Disabled)
        } else if self.symptoms.is_empty() {
            Err(InputIssue::NoSymptoms)
        } else if self.patient_id.is_empty() {
            Err(InputIssue::MissingPatient)
        } else {
            Ok(())
        }
    }

    pub fn to_request(&self) -> AnalysisRequest {
        AnalysisRequest {
            symptoms: self.symptoms.clone(),
            vitals: self.vitals.clone(),
            patient_id: self.patient_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettledOutcome {
    Success,
    Error,
}

/// Monitor lifecycle: any new snapshot moves back to `Scheduled` (or `Idle`
/// when the input is not actionable).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "outcome")]
pub enum MonitorPhase {
    #[default]
    Idle,
    Scheduled,
    InFlight,
    Settled(SettledOutcome),
}

/// What the caller observes. Replaced wholesale on every transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorState {
    pub last_analysis: Option<SafetyAnalysis>,
    /// Model prose accompanying `last_analysis`, when the model wrote any.
    pub last_message: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub error_category: Option<ErrorCategory>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub phase: MonitorPhase,
}

impl MonitorState {
    pub fn is_emergency(&self) -> bool {
        self.last_analysis.as_ref().is_some_and(|a| a.is_emergency)
    }
}
