use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{AnalysisRequest, ErrorEnvelope, SafetyCheckError, SafetyCheckResponse};
use crate::config::SafetyServiceConfig;
use crate::models::ModelReport;

/// One remote analysis per call. Implementations carry their own transport
/// timeout; the monitor adds an outer ceiling.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<ModelReport, SafetyCheckError>;
}

/// JSON-over-HTTP client for the safety-check service.
pub struct HttpSafetyClient {
    endpoint: String,
    auth_token: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSafetyClient {
    pub fn new(config: &SafetyServiceConfig) -> Result<Self, SafetyCheckError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SafetyCheckError::Transport(e.to_string()))?;

        let path = config.path.trim_start_matches('/');
        Ok(Self {
            endpoint: format!("{}/{}", config.base_url.trim_end_matches('/'), path),
            auth_token: config.auth_token.clone(),
            client,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisClient for HttpSafetyClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<ModelReport, SafetyCheckError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SafetyCheckError::Timeout(self.timeout)
            } else {
                SafetyCheckError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => {
                    let detail = envelope.message().unwrap_or_default().to_string();
                    match envelope.code() {
                        Some(code) => SafetyCheckError::from_code(code, detail),
                        None => SafetyCheckError::from_status(status.as_u16(), detail),
                    }
                }
                Err(_) => SafetyCheckError::from_status(status.as_u16(), ""),
            };
            tracing::warn!(status = status.as_u16(), category = ?err.category(), "Safety check rejected");
            return Err(err);
        }

        let body: SafetyCheckResponse = response
            .json()
            .await
            .map_err(|e| SafetyCheckError::Decode(e.to_string()))?;

        match body {
            SafetyCheckResponse {
                success: true,
                analysis: Some(analysis),
                ..
            } => Ok(ModelReport::from(analysis)),
            SafetyCheckResponse { success: true, analysis: None, .. } => Err(
                SafetyCheckError::Decode("success response without analysis".into()),
            ),
            SafetyCheckResponse { success: false, .. } => Err(SafetyCheckError::Internal(
                "service reported failure".into(),
            )),
        }
    }
}

/// One scripted reply of a `MockAnalysisClient`.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub result: Result<ModelReport, SafetyCheckError>,
    pub delay: Duration,
}

/// A call observed by a `MockAnalysisClient`.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: AnalysisRequest,
    pub at: tokio::time::Instant,
}

/// Mock analysis client: plays back scripted replies in order, then repeats
/// the fallback. Every call is recorded with the (tokio) time it arrived.
pub struct MockAnalysisClient {
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: ScriptedResponse,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockAnalysisClient {
    pub fn new() -> Self {
        Self::returning(ModelReport::default())
    }

    pub fn returning(report: ModelReport) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ScriptedResponse {
                result: Ok(report),
                delay: Duration::ZERO,
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: SafetyCheckError) -> Self {
        let mut mock = Self::new();
        mock.fallback.result = Err(err);
        mock
    }

    pub fn then_ok(self, report: ModelReport, delay: Duration) -> Self {
        self.push(Ok(report), delay)
    }

    pub fn then_err(self, err: SafetyCheckError, delay: Duration) -> Self {
        self.push(Err(err), delay)
    }

    fn push(self, result: Result<ModelReport, SafetyCheckError>, delay: Duration) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(ScriptedResponse { result, delay });
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for MockAnalysisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisClient for MockAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<ModelReport, SafetyCheckError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                request: request.clone(),
                at: tokio::time::Instant::now(),
            });
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        if !next.delay.is_zero() {
            tokio::time::sleep(next.delay).await;
        }
        next.result
    }
}
