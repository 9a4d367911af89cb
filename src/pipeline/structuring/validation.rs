//! Schema validation for the structured block embedded in a model response.
//!
//! Decoding is two-stage: the JSON must be an object, then every field is
//! looked up by name and coerced to its typed form. A field of the wrong
//! shape is replaced by its empty default, so the result is always a fully
//! valid `PatientExtraction`.

use serde_json::{Map, Value};

use super::StructuringError;
use crate::intelligence::extract_number;
use crate::models::{PatientExtraction, RiskLevel, VitalSigns};

/// Decode a JSON document into a `PatientExtraction`.
///
/// Fails only when the text is not JSON or not a JSON object; everything
/// inside a valid object is coerced. Each field is read from its camelCase key
/// or its snake_case alias, first key wins, and unknown fields are ignored.
pub fn decode_extraction(json: &str) -> Result<PatientExtraction, StructuringError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| StructuringError::JsonParsing(e.to_string()))?;
    let obj = match value {
        Value::Object(obj) => obj,
        other => {
            return Err(StructuringError::MalformedResponse(format!(
                "expected a JSON object, found {}",
                json_type(&other)
            )))
        }
    };

    Ok(PatientExtraction {
        symptoms: coerce_string_list("symptoms", lookup(&obj, &["symptoms"])),
        vitals: coerce_vitals(lookup(&obj, &["vitals"])),
        risk_level: coerce_risk_level(lookup(&obj, &["riskLevel", "risk_level"])),
        red_flags: coerce_string_list("redFlags", lookup(&obj, &["redFlags", "red_flags"])),
    })
}

/// Keep the string members of an array, trimmed and non-blank. Anything that
/// is not an array becomes empty.
fn coerce_string_list(field: &str, value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => vec![],
        Some(other) => {
            tracing::warn!(field, found = json_type(other), "Expected array in extraction, using empty");
            vec![]
        }
    }
}

fn coerce_vitals(value: Option<&Value>) -> VitalSigns {
    let obj = match value {
        Some(Value::Object(obj)) => obj,
        None => return VitalSigns::default(),
        Some(other) => {
            tracing::warn!(found = json_type(other), "Expected vitals object in extraction, using empty");
            return VitalSigns::default();
        }
    };

    VitalSigns {
        temperature: lookup(obj, &["temperature", "temp"]).and_then(coerce_number),
        blood_pressure: lookup(obj, &["bloodPressure", "blood_pressure", "bp"])
            .and_then(coerce_blood_pressure),
        heart_rate: lookup(obj, &["heartRate", "heart_rate", "pulse"]).and_then(coerce_number),
    }
}

fn coerce_risk_level(value: Option<&Value>) -> RiskLevel {
    match value {
        Some(Value::String(s)) => RiskLevel::parse_lenient(s),
        None => RiskLevel::Low,
        Some(other) => {
            tracing::warn!(found = json_type(other), "Non-string risk level in extraction, defaulting to low");
            RiskLevel::Low
        }
    }
}

fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

/// Numbers, or strings carrying one (`"104"`, `"approx 104 F"`, `"39,5 C"`).
fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => extract_number(s),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

/// Strings pass through; a bare number is a systolic-only reading; an object
/// with `systolic`/`diastolic` is rendered as `"sys/dia"`.
fn coerce_blood_pressure(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => {
            let systolic = obj.get("systolic").and_then(coerce_number);
            let diastolic = obj.get("diastolic").and_then(coerce_number);
            match (systolic, diastolic) {
                (None, None) => None,
                (s, d) => Some(format!(
                    "{}/{}",
                    s.map(|v| v.to_string()).unwrap_or_default(),
                    d.map(|v| v.to_string()).unwrap_or_default()
                )),
            }
        }
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
