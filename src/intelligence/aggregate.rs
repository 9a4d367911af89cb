//! Risk aggregation: merge what the model reported with locally computed
//! vital statuses into one `SafetyAnalysis`.
//!
//! Local thresholds only ever raise the alarm. A model that under-reports
//! cannot lower an emergency derived from vitals.

use super::keywords::emergency_categories;
use crate::models::{ModelReport, PatientExtraction, RiskLevel, SafetyAnalysis, VitalStatuses};

pub const FALLBACK_RECOMMENDATION: &str =
    "Please consult a qualified health professional to review these symptoms.";

pub const EMERGENCY_FALLBACK_RECOMMENDATION: &str =
    "Seek emergency medical care now. Refer the patient to the nearest health facility without delay.";

/// Aggregate an extraction with vital statuses.
pub fn aggregate(extraction: &PatientExtraction, statuses: &VitalStatuses) -> SafetyAnalysis {
    aggregate_report(&ModelReport::from(extraction.clone()), statuses)
}

/// Aggregate a full model report, honouring an explicit emergency assertion
/// and model-provided recommendation.
pub fn aggregate_report(report: &ModelReport, statuses: &VitalStatuses) -> SafetyAnalysis {
    let extraction = &report.extraction;

    let critical_vitals: Vec<&str> = statuses
        .values()
        .filter(|s| s.is_critical())
        .filter_map(|s| s.message.as_deref())
        .collect();
    let any_critical_vital = statuses.values().any(|s| s.is_critical());
    let categories = emergency_categories(&extraction.red_flags);

    let model_says_emergency =
        report.asserts_emergency || extraction.risk_level == RiskLevel::Critical;
    let is_emergency = model_says_emergency || any_critical_vital || !categories.is_empty();

    if is_emergency && !model_says_emergency {
        tracing::warn!(
            critical_vital_flags = critical_vitals.len(),
            categories = ?categories,
            model_risk = %extraction.risk_level,
            "Local safety net raised emergency above model assessment"
        );
    }

    let red_flags = merge_flags(
        extraction.red_flags.iter().map(String::as_str),
        critical_vitals.iter().copied(),
    );

    let recommendation = match report.recommendation.as_deref().map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ if is_emergency => EMERGENCY_FALLBACK_RECOMMENDATION.to_string(),
        _ => FALLBACK_RECOMMENDATION.to_string(),
    };

    SafetyAnalysis {
        is_emergency,
        red_flags,
        recommendation,
    }
}

/// Union of model flags then local flags. Duplicates (ignoring case and
/// surrounding whitespace) and blank entries are dropped; first occurrence
/// keeps its position.
fn merge_flags<'a>(
    model: impl Iterator<Item = &'a str>,
    local: impl Iterator<Item = &'a str>,
) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut merged = Vec::new();
    for flag in model.chain(local) {
        let trimmed = flag.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        merged.push(trimmed.to_string());
    }
    merged
}
