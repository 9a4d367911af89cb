use std::time::Duration;

use async_trait::async_trait;

use super::client::AnalysisClient;
use super::types::{AnalysisRequest, SafetyCheckError};
use crate::config::OllamaConfig;
use crate::models::ModelReport;
use crate::pipeline::structuring::{
    build_extraction_prompt, parse_extraction_response, ExtractionOutcome, LlmClient,
    OllamaClient, StructuringError, EXTRACTION_SYSTEM_PROMPT,
};

/// Chat-extraction variant of the analysis client: asks a local LLM for
/// prose plus a fenced JSON block, then recovers the structured part.
pub struct ChatExtractionClient<L: LlmClient> {
    llm: L,
    model: String,
}

impl<L: LlmClient> ChatExtractionClient<L> {
    pub fn new(llm: L, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    pub fn llm(&self) -> &L {
        &self.llm
    }
}

impl ChatExtractionClient<OllamaClient> {
    pub fn from_config(config: &OllamaConfig) -> Result<Self, SafetyCheckError> {
        let llm = OllamaClient::from_config(config)?;
        Ok(Self::new(llm, config.model.clone()))
    }
}

impl From<StructuringError> for SafetyCheckError {
    fn from(err: StructuringError) -> Self {
        match err {
            StructuringError::Timeout(secs) => SafetyCheckError::Timeout(Duration::from_secs(secs)),
            StructuringError::OllamaConnection(_) | StructuringError::HttpClient(_) => {
                SafetyCheckError::Transport(err.to_string())
            }
            StructuringError::OllamaError { status: 404, .. } => {
                SafetyCheckError::NotFound(err.to_string())
            }
            StructuringError::OllamaError { .. } => SafetyCheckError::Internal(err.to_string()),
            StructuringError::MalformedResponse(_)
            | StructuringError::JsonParsing(_)
            | StructuringError::ResponseParsing(_) => SafetyCheckError::Decode(err.to_string()),
        }
    }
}

#[async_trait]
impl<L: LlmClient> AnalysisClient for ChatExtractionClient<L> {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<ModelReport, SafetyCheckError> {
        let prompt = build_extraction_prompt(&request.symptoms, &request.vitals);
        let response = self
            .llm
            .generate(&self.model, &prompt, EXTRACTION_SYSTEM_PROMPT)
            .await?;

        let parsed = parse_extraction_response(&response);
        tracing::debug!(
            outcome = ?parsed.outcome,
            symptoms = parsed.extraction.symptoms.len(),
            red_flags = parsed.extraction.red_flags.len(),
            "Chat extraction parsed"
        );
        if parsed.outcome != ExtractionOutcome::Extracted {
            tracing::info!("Chat extraction fell back to defaults, local safety net still applies");
        }

        Ok(ModelReport {
            extraction: parsed.extraction,
            asserts_emergency: false,
            recommendation: None,
            message: Some(parsed.message).filter(|m| !m.is_empty()),
        })
    }
}
