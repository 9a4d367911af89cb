use serde::{Deserialize, Serialize};

use super::IntelligenceError;

/// Closed numeric range, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Temperatures at or below this are read as °C unless a table says otherwise.
pub const DEFAULT_CELSIUS_CEILING: f64 = 45.0;

/// Temperature reference values, °F.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureThresholds {
    pub normal: Range,
    /// Above this the reading is reported as a fever rather than "elevated".
    pub fever_above: f64,
    pub critical_above: f64,
    pub critical_below: f64,
    /// Readings at or below this are taken to be °C and converted.
    pub celsius_ceiling: f64,
}

/// Heart rate reference values, bpm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateThresholds {
    pub normal: Range,
    pub critical_above: f64,
    pub critical_below: f64,
}

/// Blood pressure reference values, mmHg. A reading crosses a tier when
/// either the systolic or the diastolic value reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureThresholds {
    pub critical_systolic: f64,
    pub critical_diastolic: f64,
    pub warning_systolic: f64,
    pub warning_diastolic: f64,
}

/// Static clinical reference ranges used by the vital classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub temperature: TemperatureThresholds,
    pub heart_rate: HeartRateThresholds,
    pub blood_pressure: BloodPressureThresholds,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            temperature: TemperatureThresholds {
                normal: Range::new(97.0, 99.5),
                fever_above: 100.4,
                critical_above: 103.0,
                critical_below: 95.0,
                celsius_ceiling: DEFAULT_CELSIUS_CEILING,
            },
            heart_rate: HeartRateThresholds {
                normal: Range::new(60.0, 100.0),
                critical_above: 120.0,
                critical_below: 40.0,
            },
            blood_pressure: BloodPressureThresholds {
                critical_systolic: 140.0,
                critical_diastolic: 90.0,
                warning_systolic: 130.0,
                warning_diastolic: 85.0,
            },
        }
    }
}

impl ThresholdTable {
    /// Load a threshold table from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, IntelligenceError> {
        let table: Self = serde_json::from_str(json)
            .map_err(|e| IntelligenceError::ThresholdParse(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Load a threshold table from a JSON file on disk.
    pub fn load(path: &std::path::Path) -> Result<Self, IntelligenceError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            IntelligenceError::ThresholdLoad(path.display().to_string(), e.to_string())
        })?;
        Self::from_json(&json)
    }

    /// Reject tables whose tiers are out of order; a misordered table could
    /// hide a critical reading behind a normal range.
    pub fn validate(&self) -> Result<(), IntelligenceError> {
        let t = &self.temperature;
        if !(t.critical_below <= t.normal.low
            && t.normal.low <= t.normal.high
            && t.normal.high <= t.fever_above
            && t.fever_above <= t.critical_above)
        {
            return Err(IntelligenceError::InvalidThresholds("temperature".into()));
        }

        let hr = &self.heart_rate;
        if !(hr.critical_below <= hr.normal.low
            && hr.normal.low <= hr.normal.high
            && hr.normal.high <= hr.critical_above)
        {
            return Err(IntelligenceError::InvalidThresholds("heart_rate".into()));
        }

        let bp = &self.blood_pressure;
        if bp.warning_systolic > bp.critical_systolic || bp.warning_diastolic > bp.critical_diastolic {
            return Err(IntelligenceError::InvalidThresholds("blood_pressure".into()));
        }

        Ok(())
    }
}
