use crate::intelligence::DEFAULT_CELSIUS_CEILING;
use crate::models::VitalSigns;

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are a clinical support assistant helping a community health worker during a
patient visit. You describe what the reported findings may mean and when the
patient needs to be referred. You do NOT diagnose disease.

RULES, NO EXCEPTIONS:
1. Use ONLY the symptoms and vital signs provided.
2. NEVER name a diagnosis as certain.
3. List every finding that on its own warrants escalation as a red flag
   (e.g. difficulty breathing, chest pain, altered mental status).
4. riskLevel MUST be one of: low, moderate, high, critical.

OUTPUT FORMAT:
First, a short plain-language message for the health worker.
Then, exactly ONE JSON block wrapped in ```json``` fences.
"#;

/// Build the user prompt for one analysis request.
pub fn build_extraction_prompt(symptoms: &[String], vitals: &VitalSigns) -> String {
    let symptom_lines = if symptoms.is_empty() {
        "- none reported".to_string()
    } else {
        symptoms
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut vital_lines = Vec::new();
    if let Some(t) = vitals.temperature {
        let unit = if t <= DEFAULT_CELSIUS_CEILING { "°C" } else { "°F" };
        vital_lines.push(format!("- Temperature: {t} {unit}"));
    }
    if let Some(bp) = vitals.blood_pressure.as_deref() {
        vital_lines.push(format!("- Blood pressure: {bp} mmHg"));
    }
    if let Some(hr) = vitals.heart_rate {
        vital_lines.push(format!("- Heart rate: {hr} bpm"));
    }
    let vital_lines = if vital_lines.is_empty() {
        "- not yet measured".to_string()
    } else {
        vital_lines.join("\n")
    };

    format!(
        r#"<symptoms>
{symptom_lines}
</symptoms>

<vitals>
{vital_lines}
</vitals>

Write your message, then summarize the findings in the following JSON structure.
Use [] for empty lists and omit vitals that were not measured.

```json
{{
  "symptoms": ["symptom"],
  "vitals": {{"temperature": 0.0, "bloodPressure": "systolic/diastolic", "heartRate": 0}},
  "riskLevel": "low | moderate | high | critical",
  "redFlags": ["finding that requires escalation"]
}}
```"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_symptoms_and_vitals() {
        let vitals = VitalSigns {
            temperature: Some(104.0),
            blood_pressure: Some("150/95".into()),
            heart_rate: None,
        };
        let prompt = build_extraction_prompt(&["fever".into(), "cough".into()], &vitals);
        assert!(prompt.contains("- fever\n- cough"));
        assert!(prompt.contains("Temperature: 104 °F"));
        assert!(prompt.contains("Blood pressure: 150/95 mmHg"));
        assert!(!prompt.contains("Heart rate"));
    }

    #[test]
    fn celsius_temperature_is_labelled_celsius() {
        let vitals = VitalSigns {
            temperature: Some(40.0),
            ..Default::default()
        };
        let prompt = build_extraction_prompt(&["fever".into()], &vitals);
        assert!(prompt.contains("Temperature: 40 °C"));
        assert!(!prompt.contains("°F"));
    }

    #[test]
    fn prompt_marks_missing_vitals() {
        let prompt = build_extraction_prompt(&["rash".into()], &VitalSigns::default());
        assert!(prompt.contains("not yet measured"));
    }

    #[test]
    fn prompt_template_uses_fence_the_parser_reads() {
        let prompt = build_extraction_prompt(&[], &VitalSigns::default());
        assert!(prompt.contains(super::super::parser::FENCE_OPEN));
        assert!(prompt.contains("none reported"));
    }

    #[test]
    fn system_prompt_forbids_diagnosis() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("do NOT diagnose"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("low, moderate, high, critical"));
    }
}
