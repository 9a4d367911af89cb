//! Vital classifier: raw readings + `ThresholdTable` → `VitalStatus`.
//!
//! Every entry point is total. Input that cannot be read as a measurement
//! resolves to Normal with no message; parsing is lenient enough that a
//! formatting quirk never hides a critical value.

use std::sync::LazyLock;

use regex::Regex;

use super::reference::ThresholdTable;
use crate::models::{VitalKind, VitalSigns, VitalStatus, VitalStatuses};

// Decimal point or decimal comma.
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid number regex"));

static BP_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/|\\|-|\bover\b").expect("valid separator regex"));

/// Classify one vital given as free text (e.g. `"104 F"`, `"150 over 95"`).
pub fn classify(kind: VitalKind, raw: &str, table: &ThresholdTable) -> VitalStatus {
    match kind {
        VitalKind::Temperature => match extract_number(raw) {
            Some(value) => classify_temperature(value, table),
            None => VitalStatus::normal(kind),
        },
        VitalKind::HeartRate => match extract_number(raw) {
            Some(value) => classify_heart_rate(value, table),
            None => VitalStatus::normal(kind),
        },
        VitalKind::BloodPressure => classify_blood_pressure(raw, table),
    }
}

/// Classify every observed vital. Unobserved vitals get no entry.
pub fn classify_vitals(vitals: &VitalSigns, table: &ThresholdTable) -> VitalStatuses {
    let mut statuses = VitalStatuses::new();
    if let Some(t) = vitals.temperature {
        statuses.insert(VitalKind::Temperature, classify_temperature(t, table));
    }
    if let Some(hr) = vitals.heart_rate {
        statuses.insert(VitalKind::HeartRate, classify_heart_rate(hr, table));
    }
    if let Some(bp) = vitals.blood_pressure.as_deref() {
        statuses.insert(VitalKind::BloodPressure, classify_blood_pressure(bp, table));
    }
    statuses
}

pub fn classify_temperature(value: f64, table: &ThresholdTable) -> VitalStatus {
    let kind = VitalKind::Temperature;
    // Zero/negative is a placeholder, not a measurement.
    if !value.is_finite() || value <= 0.0 {
        return VitalStatus::normal(kind);
    }

    let t = &table.temperature;
    let f = if value <= t.celsius_ceiling {
        value * 9.0 / 5.0 + 32.0
    } else {
        value
    };

    if f > t.critical_above {
        VitalStatus::critical(kind, format!("High fever ({f:.1}°F)"))
    } else if f < t.critical_below {
        VitalStatus::critical(kind, format!("Dangerously low temperature ({f:.1}°F)"))
    } else if t.normal.contains(f) {
        VitalStatus::normal(kind)
    } else if f > t.fever_above {
        VitalStatus::warning(kind, format!("Fever ({f:.1}°F)"))
    } else if f > t.normal.high {
        VitalStatus::warning(kind, format!("Slightly elevated temperature ({f:.1}°F)"))
    } else {
        VitalStatus::warning(kind, format!("Low temperature ({f:.1}°F)"))
    }
}

pub fn classify_heart_rate(value: f64, table: &ThresholdTable) -> VitalStatus {
    let kind = VitalKind::HeartRate;
    if !value.is_finite() || value <= 0.0 {
        return VitalStatus::normal(kind);
    }

    let hr = &table.heart_rate;
    let shown = format_number(value);
    if value > hr.critical_above {
        VitalStatus::critical(kind, format!("Very high heart rate ({shown} bpm)"))
    } else if value < hr.critical_below {
        VitalStatus::critical(kind, format!("Very low heart rate ({shown} bpm)"))
    } else if hr.normal.contains(value) {
        VitalStatus::normal(kind)
    } else if value > hr.normal.high {
        VitalStatus::warning(kind, format!("Elevated heart rate ({shown} bpm)"))
    } else {
        VitalStatus::warning(kind, format!("Low heart rate ({shown} bpm)"))
    }
}

pub fn classify_blood_pressure(raw: &str, table: &ThresholdTable) -> VitalStatus {
    let kind = VitalKind::BloodPressure;
    let Some(reading) = parse_blood_pressure(raw) else {
        return VitalStatus::normal(kind);
    };

    let bp = &table.blood_pressure;
    let at_least = |value: Option<f64>, threshold: f64| value.is_some_and(|v| v >= threshold);

    if at_least(reading.systolic, bp.critical_systolic)
        || at_least(reading.diastolic, bp.critical_diastolic)
    {
        VitalStatus::critical(kind, format!("High blood pressure ({reading} mmHg)"))
    } else if at_least(reading.systolic, bp.warning_systolic)
        || at_least(reading.diastolic, bp.warning_diastolic)
    {
        VitalStatus::warning(kind, format!("Elevated blood pressure ({reading} mmHg)"))
    } else {
        VitalStatus::normal(kind)
    }
}

/// A blood pressure reading where either half may be missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloodPressureReading {
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
}

impl std::fmt::Display for BloodPressureReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let part = |v: Option<f64>| v.map(format_number).unwrap_or_else(|| "?".into());
        write!(f, "{}/{}", part(self.systolic), part(self.diastolic))
    }
}

/// Parse `"systolic/diastolic"` leniently. Accepts `/`, `\`, `-`, `over` or
/// plain whitespace between the values, labels and trailing units, and partial
/// input such as `"150/"` or `"/95"`. The values read are the ones adjacent to
/// the separator, so digits in a label (`"BP1 150/80"`) are skipped.
pub fn parse_blood_pressure(raw: &str) -> Option<BloodPressureReading> {
    let (systolic, diastolic) = match BP_SEPARATOR.find(raw) {
        Some(sep) => (
            numbers(&raw[..sep.start()]).last(),
            numbers(&raw[sep.end()..]).next(),
        ),
        None => {
            let found: Vec<f64> = numbers(raw).collect();
            match found.as_slice() {
                [] => (None, None),
                [only] => (Some(*only), None),
                [.., sys, dia] => (Some(*sys), Some(*dia)),
            }
        }
    };

    if systolic.is_none() && diastolic.is_none() {
        return None;
    }
    Some(BloodPressureReading {
        systolic,
        diastolic,
    })
}

/// First number in free text, ignoring any label or unit around it.
/// `"approx 104 F"` reads as 104 and `"39,5 C"` as 39.5.
pub fn extract_number(raw: &str) -> Option<f64> {
    numbers(raw).next()
}

fn numbers(raw: &str) -> impl Iterator<Item = f64> + '_ {
    NUMBER
        .find_iter(raw)
        .filter_map(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}
