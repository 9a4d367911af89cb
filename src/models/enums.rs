use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid value '{value}' for {field}")]
    InvalidEnum { field: String, value: String },
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Variant order doubles as severity order (derived Ord).
str_enum!(RiskLevel {
    Low => "low",
    Moderate => "moderate",
    High => "high",
    Critical => "critical",
});

str_enum!(VitalLevel {
    Normal => "normal",
    Warning => "warning",
    Critical => "critical",
});

str_enum!(VitalKind {
    Temperature => "temperature",
    HeartRate => "heartRate",
    BloodPressure => "bloodPressure",
});

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Low
    }
}

impl RiskLevel {
    /// Parse a model-reported risk level. Anything unrecognized resolves to
    /// `Low` so a typo never escalates on its own; the anomaly is logged.
    pub fn parse_lenient(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.parse::<Self>() {
            Ok(level) => level,
            Err(_) => {
                tracing::warn!(
                    value_len = raw.len(),
                    "Unrecognized risk level in model output, defaulting to low"
                );
                Self::Low
            }
        }
    }
}

impl VitalKind {
    pub const ALL: [VitalKind; 3] = [Self::Temperature, Self::HeartRate, Self::BloodPressure];
}
