use serde::{Deserialize, Serialize};

use super::enums::RiskLevel;
use super::vital_sign::VitalSigns;

/// Structured record recovered from a model response.
///
/// Arrays are never absent (empty when nothing was reported) and `risk_level`
/// always carries a value; `Default` is the fallback used whenever decoding
/// fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientExtraction {
    pub symptoms: Vec<String>,
    pub vitals: VitalSigns,
    pub risk_level: RiskLevel,
    pub red_flags: Vec<String>,
}

impl PatientExtraction {
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty() && self.red_flags.is_empty() && self.vitals.is_empty()
    }
}
