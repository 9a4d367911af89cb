use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{SafetyAnalysis, VitalSigns};

/// Body of one remote safety-check call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub symptoms: Vec<String>,
    pub vitals: VitalSigns,
    #[serde(alias = "patient_id")]
    pub patient_id: String,
}

/// Success envelope returned by the safety-check service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyCheckResponse {
    pub success: bool,
    #[serde(default)]
    pub analysis: Option<SafetyAnalysis>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Error body the service sends with a non-2xx status. Both
/// `{"error": {"code": ..}}` and a flat `{"code": ..}` are accepted.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    pub(crate) fn code(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.code.as_deref())
            .or(self.code.as_deref())
    }

    pub(crate) fn message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .or(self.message.as_deref())
    }
}

/// The user-facing buckets a failed analysis is sorted into. Exactly one is
/// surfaced per failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    AuthenticationRequired,
    PermissionDenied,
    NotFound,
    IncompleteInput,
    Transient,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyCheckError {
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    FailedPrecondition(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("No response within {}", describe_ceiling(.0))]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Could not decode response: {0}")]
    Decode(String),
}

/// A zero ceiling means the service reported its own deadline.
fn describe_ceiling(ceiling: &Duration) -> String {
    if ceiling.is_zero() {
        "the service deadline".to_string()
    } else {
        format!("{ceiling:?}")
    }
}

impl SafetyCheckError {
    /// Map a service error code. Accepts the kebab-case codes and their
    /// upper-snake spellings; anything unrecognized is `Internal`.
    pub fn from_code(code: &str, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let normalized = code.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "unauthenticated" => Self::Unauthenticated(detail),
            "permission-denied" => Self::PermissionDenied(detail),
            "not-found" => Self::NotFound(detail),
            "failed-precondition" => Self::FailedPrecondition(detail),
            "internal" => Self::Internal(detail),
            "deadline-exceeded" => Self::Timeout(Duration::ZERO),
            _ => Self::Internal(format!("{code}: {detail}")),
        }
    }

    /// Map an HTTP status when the body carries no usable code.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 => Self::Unauthenticated(detail),
            403 => Self::PermissionDenied(detail),
            404 => Self::NotFound(detail),
            400 | 412 => Self::FailedPrecondition(detail),
            _ => Self::Internal(format!("status {status}: {detail}")),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthenticated(_) => ErrorCategory::AuthenticationRequired,
            Self::PermissionDenied(_) => ErrorCategory::PermissionDenied,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::FailedPrecondition(_) => ErrorCategory::IncompleteInput,
            Self::Internal(_) | Self::Timeout(_) | Self::Transport(_) | Self::Decode(_) => {
                ErrorCategory::Transient
            }
        }
    }

    /// Fixed string shown to the health worker. Details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "Please sign in to run safety checks.",
            Self::PermissionDenied(_) => "You do not have permission to run safety checks.",
            Self::NotFound(_) => "The safety check service is not available.",
            Self::FailedPrecondition(_) => {
                "Patient information is incomplete. Add symptoms and vitals, then try again."
            }
            Self::Timeout(_) => "The safety check is taking too long. Please try again.",
            Self::Internal(_) | Self::Transport(_) | Self::Decode(_) => {
                "Unable to check for safety alerts right now. Please try again."
            }
        }
    }
}
