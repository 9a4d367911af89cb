use serde::{Deserialize, Serialize};

use super::extraction::PatientExtraction;

/// Final safety judgment for one analysis request.
///
/// The shape is consumed downstream (referral summaries), keep it stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyAnalysis {
    pub is_emergency: bool,
    #[serde(default, alias = "red_flags")]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub recommendation: String,
}

/// What a model said about one request, regardless of which request path
/// produced it. The safety-check path fills `asserts_emergency` and
/// `recommendation`; the chat path fills `extraction` and `message`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReport {
    pub extraction: PatientExtraction,
    pub asserts_emergency: bool,
    pub recommendation: Option<String>,
    /// Prose shown to the user alongside the analysis (chat path only).
    pub message: Option<String>,
}

impl From<PatientExtraction> for ModelReport {
    fn from(extraction: PatientExtraction) -> Self {
        Self {
            extraction,
            ..Default::default()
        }
    }
}

impl From<SafetyAnalysis> for ModelReport {
    fn from(analysis: SafetyAnalysis) -> Self {
        let recommendation = Some(analysis.recommendation).filter(|r| !r.trim().is_empty());
        Self {
            extraction: PatientExtraction {
                red_flags: analysis.red_flags,
                ..Default::default()
            },
            asserts_emergency: analysis.is_emergency,
            recommendation,
            message: None,
        }
    }
}
