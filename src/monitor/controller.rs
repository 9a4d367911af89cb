//! Debounced, staleness-aware safety monitor.
//!
//! One `SafetyMonitor` per patient-input context. Every `submit` stamps the
//! input with a fresh request id from the monitor's own ledger, restarts the
//! debounce timer and, once input has been quiet for the debounce window,
//! sends exactly one analysis request. Results are applied only if their
//! request id is still the latest issued; the check and the state update
//! happen under the ledger lock.
//!
//! Requires a Tokio runtime: `submit` spawns the debounce timer.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::cancel::CancellationToken;
use super::state::{MonitorInput, MonitorPhase, MonitorState, RequestSnapshot, SettledOutcome};
use crate::config::MonitorConfig;
use crate::intelligence::{aggregate_report, classify_vitals, ThresholdTable};
use crate::models::ModelReport;
use crate::pipeline::safety::{AnalysisClient, SafetyCheckError};

/// Per-monitor request counter. `latest` is the id of the most recent
/// snapshot, whether it was dispatched or cleared the state.
#[derive(Debug, Default)]
struct RequestLedger {
    latest: u64,
}

impl RequestLedger {
    fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    fn is_stale(&self, request_id: u64) -> bool {
        self.latest > request_id
    }
}

struct MonitorInner {
    session_id: Uuid,
    client: Arc<dyn AnalysisClient>,
    config: MonitorConfig,
    thresholds: ThresholdTable,
    ledger: Mutex<RequestLedger>,
    state: watch::Sender<MonitorState>,
    token: CancellationToken,
}

pub struct SafetyMonitor {
    inner: Arc<MonitorInner>,
    debounce: Mutex<Option<JoinHandle<()>>>,
}

impl SafetyMonitor {
    pub fn new(
        client: Arc<dyn AnalysisClient>,
        config: MonitorConfig,
        thresholds: ThresholdTable,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::default());
        let session_id = Uuid::new_v4();
        tracing::debug!(session = %session_id, debounce_ms = config.debounce.as_millis() as u64, "Safety monitor created");
        Self {
            inner: Arc::new(MonitorInner {
                session_id,
                client,
                config,
                thresholds,
                ledger: Mutex::new(RequestLedger::default()),
                state,
                token: CancellationToken::new(),
            }),
            debounce: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    /// Feed a new input snapshot. Returns the request id assigned to it, or
    /// 0 once the monitor has been disposed.
    pub fn submit(&self, input: MonitorInput) -> u64 {
        let inner = &self.inner;
        let Ok(mut ledger) = inner.ledger.lock() else {
            return 0;
        };
        if inner.token.is_cancelled() {
            tracing::debug!(session = %inner.session_id, "Submit after dispose ignored");
            return 0;
        }

        self.cancel_debounce();
        let snapshot = RequestSnapshot::new(ledger.issue(), input);
        let request_id = snapshot.request_id;

        if let Err(issue) = snapshot.check() {
            tracing::debug!(session = %inner.session_id, request_id, ?issue, "Input not actionable, clearing analysis");
            inner.state.send_modify(|state| {
                *state = MonitorState {
                    last_checked_at: state.last_checked_at,
                    ..MonitorState::default()
                };
            });
            return request_id;
        }

        inner.state.send_modify(|state| {
            state.phase = MonitorPhase::Scheduled;
            state.loading = false;
        });
        drop(ledger);

        let task_inner = Arc::clone(inner);
        let delay = inner.config.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Dispatch runs detached so a later submit cannot abort a call
            // already on the wire; its result is dropped as stale instead.
            tokio::spawn(task_inner.dispatch(snapshot));
        });
        if let Ok(mut slot) = self.debounce.lock() {
            *slot = Some(handle);
        }

        request_id
    }

    /// Current state, cloned.
    pub fn state(&self) -> MonitorState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.inner.state.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// End the session. Once this returns no further state change is
    /// published, even if a request is still outstanding.
    pub fn dispose(&self) {
        if self.inner.token.is_cancelled() {
            return;
        }
        self.inner.token.cancel();
        self.cancel_debounce();
        // Waits out a mutation that passed its liveness check before cancel.
        drop(self.inner.ledger.lock());
        tracing::debug!(session = %self.inner.session_id, "Safety monitor disposed");
    }

    fn cancel_debounce(&self) {
        if let Ok(mut slot) = self.debounce.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for SafetyMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl MonitorInner {
    async fn dispatch(self: Arc<Self>, snapshot: RequestSnapshot) {
        let request_id = snapshot.request_id;
        {
            let Ok(ledger) = self.ledger.lock() else {
                return;
            };
            if self.token.is_cancelled() || ledger.is_stale(request_id) {
                return;
            }
            self.state.send_modify(|state| {
                state.phase = MonitorPhase::InFlight;
                state.loading = true;
            });
        }

        tracing::info!(
            session = %self.session_id,
            request_id,
            symptoms = snapshot.symptoms.len(),
            "Dispatching safety analysis"
        );

        let request = snapshot.to_request();
        let ceiling = self.config.response_timeout;
        let result = match tokio::time::timeout(ceiling, self.client.analyze(&request)).await {
            Ok(result) => result,
            Err(_) => Err(SafetyCheckError::Timeout(ceiling)),
        };

        let Ok(ledger) = self.ledger.lock() else {
            return;
        };
        if self.token.is_cancelled() {
            tracing::debug!(session = %self.session_id, request_id, "Result after dispose dropped");
            return;
        }
        if ledger.is_stale(request_id) {
            tracing::debug!(
                session = %self.session_id,
                request_id,
                latest = ledger.latest,
                "Discarding stale safety analysis"
            );
            return;
        }

        match result {
            Ok(report) => self.apply_success(&snapshot, &report),
            Err(err) => self.apply_error(request_id, &err),
        }
    }

    fn apply_success(&self, snapshot: &RequestSnapshot, report: &ModelReport) {
        let vitals = snapshot.vitals.merged_with(&report.extraction.vitals);
        let statuses = classify_vitals(&vitals, &self.thresholds);
        let analysis = aggregate_report(report, &statuses);

        tracing::info!(
            session = %self.session_id,
            request_id = snapshot.request_id,
            is_emergency = analysis.is_emergency,
            red_flags = analysis.red_flags.len(),
            "Safety analysis settled"
        );

        self.state.send_modify(|state| {
            *state = MonitorState {
                last_analysis: Some(analysis),
                last_message: report.message.clone(),
                loading: false,
                error: None,
                error_category: None,
                last_checked_at: Some(Utc::now()),
                phase: MonitorPhase::Settled(SettledOutcome::Success),
            };
        });
    }

    fn apply_error(&self, request_id: u64, err: &SafetyCheckError) {
        tracing::warn!(
            session = %self.session_id,
            request_id,
            category = ?err.category(),
            error = %err,
            "Safety analysis failed"
        );

        self.state.send_modify(|state| {
            *state = MonitorState {
                last_analysis: None,
                last_message: None,
                loading: false,
                error: Some(err.user_message().to_string()),
                error_category: Some(err.category()),
                last_checked_at: Some(Utc::now()),
                phase: MonitorPhase::Settled(SettledOutcome::Error),
            };
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::{PatientExtraction, RiskLevel, SafetyAnalysis, VitalSigns};
    use crate::pipeline::safety::{ErrorCategory, MockAnalysisClient};

    fn input(symptoms: &[&str]) -> MonitorInput {
        MonitorInput {
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            vitals: VitalSigns::default(),
            patient_id: "p1".into(),
            enabled: true,
        }
    }

    fn monitor(client: Arc<MockAnalysisClient>) -> SafetyMonitor {
        SafetyMonitor::new(client, MonitorConfig::default(), ThresholdTable::default())
    }

    fn report_with_flag(flag: &str) -> ModelReport {
        ModelReport::from(PatientExtraction {
            red_flags: vec![flag.to_string()],
            risk_level: RiskLevel::Moderate,
            ..Default::default()
        })
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_coalesces_rapid_snapshots() {
        let client = Arc::new(MockAnalysisClient::new());
        let monitor = monitor(client.clone());
        let start = tokio::time::Instant::now();

        monitor.submit(input(&["fever"]));
        sleep_ms(100).await;
        monitor.submit(input(&["fever", "cough"]));
        sleep_ms(200).await;
        monitor.submit(input(&["fever", "cough", "rash"]));
        assert_eq!(monitor.state().phase, MonitorPhase::Scheduled);

        sleep_ms(499).await;
        assert_eq!(client.call_count(), 0);

        sleep_ms(10).await;
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].request.symptoms, vec!["fever", "cough", "rash"]);
        let fired = calls[0].at.duration_since(start);
        assert!(fired >= Duration::from_millis(800) && fired < Duration::from_millis(805));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_is_discarded() {
        let client = Arc::new(
            MockAnalysisClient::new()
                .then_ok(report_with_flag("from A"), Duration::from_millis(1000))
                .then_ok(report_with_flag("from B"), Duration::from_millis(100)),
        );
        let monitor = monitor(client.clone());

        let a = monitor.submit(input(&["fever"]));
        sleep_ms(600).await; // A in flight until t=1500
        assert!(monitor.state().loading);

        let b = monitor.submit(input(&["cough"]));
        assert!(b > a);
        sleep_ms(700).await; // B dispatched at 1100, settled at 1200
        let state = monitor.state();
        assert_eq!(state.last_analysis.unwrap().red_flags, vec!["from B"]);

        sleep_ms(1000).await; // A resolves at 1500 and must be ignored
        let state = monitor.state();
        assert_eq!(state.last_analysis.unwrap().red_flags, vec!["from B"]);
        assert_eq!(state.phase, MonitorPhase::Settled(SettledOutcome::Success));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_input_clears_analysis_immediately() {
        let client = Arc::new(MockAnalysisClient::returning(report_with_flag("chest pain")));
        let monitor = monitor(client.clone());

        monitor.submit(input(&["chest pain"]));
        sleep_ms(600).await;
        assert!(monitor.state().is_emergency());

        monitor.submit(input(&[]));
        let state = monitor.state();
        assert_eq!(state.last_analysis, None);
        assert_eq!(state.error, None);
        assert_eq!(state.phase, MonitorPhase::Idle);
        assert!(!state.loading);

        sleep_ms(1000).await;
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_input_discards_in_flight_result() {
        let client = Arc::new(
            MockAnalysisClient::new()
                .then_ok(report_with_flag("late"), Duration::from_millis(1000)),
        );
        let monitor = monitor(client.clone());

        monitor.submit(input(&["fever"]));
        sleep_ms(600).await;
        monitor.submit(MonitorInput {
            enabled: false,
            ..input(&["fever"])
        });
        sleep_ms(2000).await;

        let state = monitor.state();
        assert_eq!(state.last_analysis, None);
        assert_eq!(state.phase, MonitorPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_patient_is_not_sent() {
        let client = Arc::new(MockAnalysisClient::new());
        let monitor = monitor(client.clone());
        monitor.submit(MonitorInput {
            patient_id: "  ".into(),
            ..input(&["fever"])
        });
        sleep_ms(1000).await;
        assert_eq!(client.call_count(), 0);
        assert_eq!(monitor.state().phase, MonitorPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn service_errors_map_to_one_category() {
        for (err, category) in [
            (SafetyCheckError::Unauthenticated("x".into()), ErrorCategory::AuthenticationRequired),
            (SafetyCheckError::PermissionDenied("x".into()), ErrorCategory::PermissionDenied),
            (SafetyCheckError::NotFound("x".into()), ErrorCategory::NotFound),
            (SafetyCheckError::FailedPrecondition("x".into()), ErrorCategory::IncompleteInput),
            (SafetyCheckError::Internal("x".into()), ErrorCategory::Transient),
        ] {
            let message = err.user_message();
            let client = Arc::new(MockAnalysisClient::failing(err));
            let monitor = monitor(client.clone());

            monitor.submit(input(&["fever"]));
            sleep_ms(600).await;

            let state = monitor.state();
            assert_eq!(state.error_category, Some(category));
            assert_eq!(state.error.as_deref(), Some(message));
            assert_eq!(state.last_analysis, None);
            assert!(!state.loading);
            assert_eq!(state.phase, MonitorPhase::Settled(SettledOutcome::Error));

            sleep_ms(5000).await;
            assert_eq!(client.call_count(), 1, "no automatic retry");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn error_clears_previous_analysis() {
        let client = Arc::new(
            MockAnalysisClient::new()
                .then_ok(report_with_flag("first"), Duration::ZERO)
                .then_err(SafetyCheckError::Internal("down".into()), Duration::ZERO),
        );
        let monitor = monitor(client.clone());

        monitor.submit(input(&["fever"]));
        sleep_ms(600).await;
        assert!(monitor.state().last_analysis.is_some());

        monitor.submit(input(&["fever", "cough"]));
        sleep_ms(600).await;
        let state = monitor.state();
        assert_eq!(state.last_analysis, None);
        assert_eq!(state.error_category, Some(ErrorCategory::Transient));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_service_times_out_as_transient() {
        let client = Arc::new(
            MockAnalysisClient::new().then_ok(ModelReport::default(), Duration::from_secs(60)),
        );
        let config = MonitorConfig {
            debounce: Duration::from_millis(500),
            response_timeout: Duration::from_secs(5),
        };
        let monitor = SafetyMonitor::new(client.clone(), config, ThresholdTable::default());

        monitor.submit(input(&["fever"]));
        sleep_ms(5000).await;
        assert!(monitor.state().loading);

        sleep_ms(1000).await;
        let state = monitor.state();
        assert_eq!(state.error_category, Some(ErrorCategory::Transient));
        assert_eq!(
            state.error.as_deref(),
            Some(SafetyCheckError::Timeout(Duration::from_secs(5)).user_message())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_before_debounce_sends_nothing() {
        let client = Arc::new(MockAnalysisClient::new());
        let monitor = monitor(client.clone());
        monitor.submit(input(&["fever"]));
        monitor.dispose();
        sleep_ms(1000).await;
        assert_eq!(client.call_count(), 0);
        assert!(monitor.is_disposed());
        assert_eq!(monitor.submit(input(&["cough"])), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_freezes_state_with_request_outstanding() {
        let client = Arc::new(
            MockAnalysisClient::new().then_ok(report_with_flag("late"), Duration::from_secs(1)),
        );
        let monitor = monitor(client.clone());
        let mut rx = monitor.subscribe();

        monitor.submit(input(&["fever"]));
        sleep_ms(600).await;
        let frozen = monitor.state();
        assert_eq!(frozen.phase, MonitorPhase::InFlight);

        monitor.dispose();
        rx.borrow_and_update();
        sleep_ms(2000).await;

        assert_eq!(monitor.state(), frozen);
        assert!(!rx.has_changed().unwrap_or(false));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_monitor_cancels_pending_timer() {
        let client = Arc::new(MockAnalysisClient::new());
        {
            let monitor = monitor(client.clone());
            monitor.submit(input(&["fever"]));
        }
        sleep_ms(1000).await;
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_settled_state() {
        let client = Arc::new(MockAnalysisClient::returning(report_with_flag("stiff neck")));
        let monitor = monitor(client);
        let mut rx = monitor.subscribe();

        monitor.submit(input(&["headache"]));
        let settled = loop {
            rx.changed().await.unwrap();
            let state = rx.borrow_and_update().clone();
            if matches!(state.phase, MonitorPhase::Settled(_)) {
                break state;
            }
        };
        assert_eq!(settled.last_analysis.unwrap().red_flags, vec!["stiff neck"]);
        assert!(settled.last_checked_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_vitals_escalate_silent_model() {
        let client = Arc::new(MockAnalysisClient::new());
        let monitor = monitor(client.clone());

        monitor.submit(MonitorInput {
            symptoms: vec!["fever".into(), "cough".into()],
            vitals: VitalSigns {
                temperature: Some(104.0),
                blood_pressure: Some("150/95".into()),
                heart_rate: Some(110.0),
            },
            patient_id: "p1".into(),
            enabled: true,
        });
        sleep_ms(600).await;

        let analysis = monitor.state().last_analysis.unwrap();
        assert!(analysis.is_emergency);
        assert!(analysis.red_flags.iter().any(|f| f.to_lowercase().contains("fever")));
        assert!(analysis.red_flags.iter().any(|f| f.to_lowercase().contains("blood pressure")));
        assert!(!analysis.recommendation.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn model_extracted_vitals_fill_gaps_only() {
        let report = ModelReport::from(PatientExtraction {
            vitals: VitalSigns {
                temperature: Some(104.0),
                heart_rate: Some(130.0),
                ..Default::default()
            },
            ..Default::default()
        });
        let client = Arc::new(MockAnalysisClient::returning(report));
        let monitor = monitor(client);

        // Snapshot temperature wins over the model's 104; heart rate is a gap.
        monitor.submit(MonitorInput {
            vitals: VitalSigns {
                temperature: Some(98.6),
                ..Default::default()
            },
            ..input(&["palpitations"])
        });
        sleep_ms(600).await;

        let analysis = monitor.state().last_analysis.unwrap();
        assert!(analysis.is_emergency);
        assert!(analysis.red_flags.iter().any(|f| f.contains("heart rate")));
        assert!(!analysis.red_flags.iter().any(|f| f.contains("fever")));
    }

    #[tokio::test(start_paused = true)]
    async fn model_emergency_assertion_is_kept() {
        let client = Arc::new(MockAnalysisClient::returning(ModelReport::from(SafetyAnalysis {
            is_emergency: true,
            red_flags: vec![],
            recommendation: "Refer today".into(),
        })));
        let monitor = monitor(client);
        monitor.submit(input(&["dizziness"]));
        sleep_ms(600).await;

        let analysis = monitor.state().last_analysis.unwrap();
        assert!(analysis.is_emergency);
        assert_eq!(analysis.recommendation, "Refer today");
    }

    #[tokio::test(start_paused = true)]
    async fn model_message_reaches_state_until_next_error() {
        let client = Arc::new(
            MockAnalysisClient::new()
                .then_ok(
                    ModelReport {
                        message: Some("High fever with cough.".into()),
                        ..report_with_flag("fever for 5 days")
                    },
                    Duration::ZERO,
                )
                .then_err(SafetyCheckError::Internal("down".into()), Duration::ZERO),
        );
        let monitor = monitor(client);

        monitor.submit(input(&["fever"]));
        sleep_ms(600).await;
        assert_eq!(monitor.state().last_message.as_deref(), Some("High fever with cough."));

        monitor.submit(input(&["fever", "cough"]));
        sleep_ms(600).await;
        assert_eq!(monitor.state().last_message, None);
    }

    #[test]
    fn ledger_staleness_is_strictly_greater() {
        let mut ledger = RequestLedger::default();
        let first = ledger.issue();
        assert!(!ledger.is_stale(first));
        let second = ledger.issue();
        assert!(ledger.is_stale(first));
        assert!(!ledger.is_stale(second));
    }
}
