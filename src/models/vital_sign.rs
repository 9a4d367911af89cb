use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::{VitalKind, VitalLevel};

/// Vital signs observed for a patient. `None` means "not yet observed",
/// which is distinct from a value that fails to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, alias = "blood_pressure", skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, alias = "heart_rate", skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
}

impl VitalSigns {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.blood_pressure.is_none() && self.heart_rate.is_none()
    }

    /// Fill gaps in `self` from `other`. Values already present in `self` win.
    pub fn merged_with(&self, other: &VitalSigns) -> VitalSigns {
        VitalSigns {
            temperature: self.temperature.or(other.temperature),
            blood_pressure: self
                .blood_pressure
                .clone()
                .or_else(|| other.blood_pressure.clone()),
            heart_rate: self.heart_rate.or(other.heart_rate),
        }
    }
}

/// Classification of a single vital reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalStatus {
    pub kind: VitalKind,
    pub level: VitalLevel,
    /// Advisory text. Always present for Warning/Critical, absent for Normal.
    pub message: Option<String>,
}

impl VitalStatus {
    pub fn normal(kind: VitalKind) -> Self {
        Self {
            kind,
            level: VitalLevel::Normal,
            message: None,
        }
    }

    pub fn warning(kind: VitalKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            level: VitalLevel::Warning,
            message: Some(message.into()),
        }
    }

    pub fn critical(kind: VitalKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            level: VitalLevel::Critical,
            message: Some(message.into()),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.level == VitalLevel::Critical
    }
}

/// Per-vital statuses, ordered by kind so iteration is deterministic.
pub type VitalStatuses = BTreeMap<VitalKind, VitalStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_and_snake_case() {
        let camel: VitalSigns =
            serde_json::from_str(r#"{"temperature": 101.2, "bloodPressure": "120/80", "heartRate": 88}"#)
                .unwrap();
        let snake: VitalSigns =
            serde_json::from_str(r#"{"temperature": 101.2, "blood_pressure": "120/80", "heart_rate": 88}"#)
                .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.heart_rate, Some(88.0));
    }

    #[test]
    fn empty_object_is_all_unobserved() {
        let vitals: VitalSigns = serde_json::from_str("{}").unwrap();
        assert!(vitals.is_empty());
    }

    #[test]
    fn serialization_skips_unobserved() {
        let vitals = VitalSigns {
            temperature: Some(98.6),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&vitals).unwrap(), r#"{"temperature":98.6}"#);
    }

    #[test]
    fn merge_prefers_self_and_fills_gaps() {
        let observed = VitalSigns {
            temperature: Some(99.0),
            blood_pressure: None,
            heart_rate: None,
        };
        let extracted = VitalSigns {
            temperature: Some(104.0),
            blood_pressure: Some("150/95".into()),
            heart_rate: None,
        };
        let merged = observed.merged_with(&extracted);
        assert_eq!(merged.temperature, Some(99.0));
        assert_eq!(merged.blood_pressure.as_deref(), Some("150/95"));
        assert_eq!(merged.heart_rate, None);
    }
}
