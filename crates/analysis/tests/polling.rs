use analysis::{AnalysisMachine, AnalysisSnapshot, AnalysisState, AnalysisStep, Notice, PollConfig};
use async_trait::async_trait;
use client::{ApiError, JobStatus, ScarfApi, UploadFile, UploadReceipt};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{Instant, sleep};

#[derive(Clone)]
enum Reply {
    Status(Value),
    NotFound,
    ServerError,
}

/// Scripted backend. Status replies are served in order; once the script
/// runs out, `fallback` is returned forever.
struct FakeScarf {
    upload_error: Option<(u16, &'static str)>,
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    status_delay: Duration,
    report: Option<Value>,
    uploads: AtomicUsize,
    status_calls: AtomicUsize,
    report_calls: AtomicUsize,
}

impl FakeScarf {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            upload_error: None,
            replies: Mutex::new(replies.into()),
            fallback: running(),
            status_delay: Duration::ZERO,
            report: Some(small_report()),
            uploads: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            report_calls: AtomicUsize::new(0),
        }
    }

    fn fallback(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    fn report(mut self, report: Option<Value>) -> Self {
        self.report = report;
        self
    }

    fn status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    fn rejecting_uploads(mut self, status: u16, detail: &'static str) -> Self {
        self.upload_error = Some((status, detail));
        self
    }

    fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScarfApi for FakeScarf {
    async fn upload(&self, _file: &UploadFile) -> Result<UploadReceipt, ApiError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((status, detail)) = self.upload_error {
            return Err(ApiError::Status {
                endpoint: "POST /upload".to_string(),
                status,
                detail: Some(detail.to_string()),
            });
        }
        Ok(UploadReceipt {
            job_id: format!("job-{}", n),
            message: Some("Upload successful, processing started".to_string()),
        })
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            sleep(self.status_delay).await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Status(body) => Ok(serde_json::from_value(body).unwrap()),
            Reply::NotFound => Err(ApiError::Status {
                endpoint: format!("GET /status/{}", job_id),
                status: 404,
                detail: Some("Job not found".to_string()),
            }),
            Reply::ServerError => Err(ApiError::Status {
                endpoint: format!("GET /status/{}", job_id),
                status: 502,
                detail: None,
            }),
        }
    }

    async fn report(&self, job_id: &str) -> Result<Value, ApiError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        self.report.clone().ok_or_else(|| ApiError::Status {
            endpoint: format!("GET /report/{}", job_id),
            status: 500,
            detail: None,
        })
    }
}

fn running() -> Reply {
    Reply::Status(json!({"status": "PROCESSING_OCR"}))
}

fn progress(value: f64, message: &str) -> Reply {
    Reply::Status(json!({"status": "PROCESSING", "progress": value, "message": message}))
}

fn completed() -> Reply {
    Reply::Status(json!({"status": "COMPLETED", "progress": 100, "message": "Analysis complete"}))
}

fn small_report() -> Value {
    json!({
        "doc": {"sections": [{"section_id": "S1", "title": "Results", "page_range": [4, 5]}]},
        "rhetoric": {"roles": [{"section_id": "S1", "role": "results"}]},
        "claims": {"claims": [
            {"claim_id": "C1", "statement": "The method halves latency", "confidence": 0.9}
        ]},
        "evidence": {"links": [
            {"claim_id": "C1", "evidence": [{"section_id": "S1", "snippet": "Figure 2"}]}
        ]},
        "gaps": {"analysis": []},
        "validation": {"report": []}
    })
}

fn paper() -> UploadFile {
    UploadFile::new("paper.pdf", b"%PDF-1.7".to_vec())
}

fn machine(fake: &Arc<FakeScarf>) -> AnalysisMachine<FakeScarf> {
    AnalysisMachine::with_shared(Arc::clone(fake), PollConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_completed_job_loads_report() {
    let fake = Arc::new(FakeScarf::new(vec![
        progress(30.0, "Detecting structure"),
        progress(55.0, "Linking evidence"),
        completed(),
    ]));
    let mut machine = machine(&fake);

    let job_id = machine.start_analysis(paper()).await.unwrap();
    assert_eq!(job_id, "job-1");

    let snap = machine.wait_for_settled().await;
    assert_eq!(snap.state, AnalysisState::Complete);
    assert_eq!(snap.progress, 100);
    assert_eq!(snap.current_step, AnalysisStep::GeneratingQuestions);
    assert_eq!(snap.message, "Analysis complete");
    assert_eq!(snap.job_id.as_deref(), Some("job-1"));
    assert_eq!(snap.error, None);
    assert_eq!(snap.notice, None);

    let report = snap.report.unwrap();
    assert_eq!(report.claims.len(), 1);
    assert_eq!(report.claims[0].evidence[0].page, 4);

    assert_eq!(fake.status_calls(), 3);
    assert_eq!(fake.report_calls(), 1);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(fake.status_calls(), 3);
    assert!(!machine.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_start_shows_initial_progress() {
    let fake = Arc::new(FakeScarf::new(vec![]));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();

    let snap = machine.snapshot();
    assert_eq!(snap.state, AnalysisState::Analyzing);
    assert_eq!(snap.progress, 5);
    assert_eq!(snap.current_step, AnalysisStep::ExtractingText);
    assert_eq!(snap.file_name, "paper.pdf");
    assert_eq!(snap.message, "Initializing...");
    assert!(machine.is_polling());
    assert_eq!(fake.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_partial_results_show_while_analyzing() {
    let partial = Reply::Status(json!({
        "status": "PROCESSING_OCR",
        "progress": 55,
        "message": "Extracting claims",
        "partial_results": {
            "stage": "extraction_complete",
            "doc": {"sections": []},
            "rhetoric": {"roles": []},
            "claims": {"claims": [{"claim_id": "C1", "statement": "Early claim", "confidence": 0.7}]}
        }
    }));
    let fake = Arc::new(FakeScarf::new(vec![partial]));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    sleep(Duration::from_millis(2500)).await;

    let snap = machine.snapshot();
    assert_eq!(snap.state, AnalysisState::Analyzing);
    assert_eq!(snap.progress, 55);
    assert_eq!(snap.current_step, AnalysisStep::LinkingEvidence);
    assert_eq!(snap.message, "Extracting claims");
    assert_eq!(snap.stage.as_deref(), Some("extraction_complete"));
    assert_eq!(snap.claim_count(), 1);
    assert_eq!(machine.metrics().partial_updates, 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_progress_and_empty_message_are_ignored() {
    let fake = Arc::new(FakeScarf::new(vec![
        progress(40.0, "Finding claims"),
        Reply::Status(json!({"status": "PENDING", "progress": 0, "message": ""})),
    ]));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    sleep(Duration::from_millis(2500)).await;

    let snap = machine.snapshot();
    assert_eq!(fake.status_calls(), 2);
    assert_eq!(snap.progress, 40);
    assert_eq!(snap.current_step, AnalysisStep::FindingClaims);
    assert_eq!(snap.message, "Finding claims");
}

#[tokio::test(start_paused = true)]
async fn test_five_not_found_responses_fail_the_job() {
    let fake = Arc::new(FakeScarf::new(vec![]).fallback(Reply::NotFound));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.state, AnalysisState::Error);
    assert_eq!(
        snap.error.as_deref(),
        Some("Analysis job not found. The server may have restarted.")
    );
    assert_eq!(fake.status_calls(), 5);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(fake.status_calls(), 5);
    assert!(!machine.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_ok_response_resets_not_found_count() {
    let mut script = vec![Reply::NotFound; 4];
    script.push(progress(20.0, "Detecting structure"));
    script.extend(vec![Reply::NotFound; 4]);
    script.push(completed());

    let fake = Arc::new(FakeScarf::new(script));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.state, AnalysisState::Complete);
    let metrics = machine.metrics();
    assert_eq!(metrics.not_found_responses, 8);
    assert_eq!(metrics.ok_responses, 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_do_not_reset_not_found_count() {
    let script = vec![
        Reply::NotFound,
        Reply::NotFound,
        Reply::ServerError,
        Reply::NotFound,
        Reply::NotFound,
        Reply::ServerError,
        Reply::NotFound,
    ];
    let fake = Arc::new(FakeScarf::new(script));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.state, AnalysisState::Error);
    assert_eq!(fake.status_calls(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_job_times_out() {
    let fake = Arc::new(FakeScarf::new(vec![]));
    let mut machine = machine(&fake);
    let started = Instant::now();

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.state, AnalysisState::Error);
    assert_eq!(
        snap.error.as_deref(),
        Some("Analysis timed out after 20 minutes. The document may be too large or complex.")
    );
    assert!(started.elapsed() > Duration::from_secs(20 * 60));
    assert_eq!(fake.report_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_short_timeout_is_reported_in_seconds() {
    let fake = Arc::new(FakeScarf::new(vec![]));
    let config = PollConfig {
        timeout_secs: 90,
        ..PollConfig::default()
    };
    let mut machine = AnalysisMachine::with_shared(Arc::clone(&fake), config);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(
        snap.error.as_deref(),
        Some("Analysis timed out after 90 seconds. The document may be too large or complex.")
    );
}

#[tokio::test(start_paused = true)]
async fn test_backend_failure_uses_server_text() {
    let fake = Arc::new(FakeScarf::new(vec![Reply::Status(json!({
        "status": "FAILED",
        "progress": 35,
        "error": "OCR engine crashed on page 3"
    }))]));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.state, AnalysisState::Error);
    assert_eq!(snap.error.as_deref(), Some("OCR engine crashed on page 3"));
    assert_eq!(fake.report_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_backend_failure_without_text() {
    let fake = Arc::new(FakeScarf::new(vec![Reply::Status(json!({"status": "FAILED"}))]));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.error.as_deref(), Some("Analysis failed on backend"));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let fake = Arc::new(FakeScarf::new(vec![
        Reply::ServerError,
        Reply::ServerError,
        Reply::ServerError,
        completed(),
    ]));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.state, AnalysisState::Complete);
    assert_eq!(machine.metrics().transient_failures, 3);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_cap() {
    let fake = Arc::new(FakeScarf::new(vec![]).fallback(Reply::ServerError));
    let config = PollConfig {
        max_transient_failures: Some(3),
        ..PollConfig::default()
    };
    let mut machine = AnalysisMachine::with_shared(Arc::clone(&fake), config);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.state, AnalysisState::Error);
    assert_eq!(
        snap.error.as_deref(),
        Some("Status polling gave up after 3 consecutive failures")
    );
    assert_eq!(fake.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure() {
    let fake = Arc::new(
        FakeScarf::new(vec![]).rejecting_uploads(400, "Only PDF files are supported"),
    );
    let mut machine = machine(&fake);

    let err = machine.start_analysis(paper()).await.unwrap_err();
    assert_eq!(err.to_string(), "Upload failed: Only PDF files are supported");

    let snap = machine.snapshot();
    assert_eq!(snap.state, AnalysisState::Error);
    assert_eq!(snap.error.as_deref(), Some("Upload failed: Only PDF files are supported"));
    assert!(!machine.is_polling());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(fake.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_report_fetch_failure() {
    let fake = Arc::new(FakeScarf::new(vec![completed()]).report(None));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.state, AnalysisState::Error);
    assert_eq!(
        snap.error.as_deref(),
        Some("Failed to fetch report: GET /report/job-1 returned HTTP 500")
    );
    assert_eq!(fake.report_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_report_without_claims_completes_with_notice() {
    let fake = Arc::new(FakeScarf::new(vec![completed()]).report(Some(json!({}))));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    let snap = machine.wait_for_settled().await;

    assert_eq!(snap.state, AnalysisState::Complete);
    assert_eq!(snap.notice, Some(Notice::NoClaimsFound));
    assert_eq!(snap.claim_count(), 0);
    assert!(!snap.defaults.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_while_analyzing_stops_polling() {
    let fake = Arc::new(FakeScarf::new(vec![progress(30.0, "Detecting structure")]));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(machine.snapshot().progress, 30);

    machine.reset();
    assert_eq!(machine.snapshot(), AnalysisSnapshot::default());
    assert!(!machine.is_polling());

    let calls = fake.status_calls();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(fake.status_calls(), calls);
    assert_eq!(machine.snapshot().state, AnalysisState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_reset_from_terminal_states() {
    let fake = Arc::new(FakeScarf::new(vec![completed()]));
    let mut machine = machine(&fake);
    machine.start_analysis(paper()).await.unwrap();
    assert_eq!(machine.wait_for_settled().await.state, AnalysisState::Complete);
    machine.reset();
    assert_eq!(machine.snapshot(), AnalysisSnapshot::default());

    let fake = Arc::new(FakeScarf::new(vec![]).fallback(Reply::NotFound));
    let mut machine = self::machine(&fake);
    machine.start_analysis(paper()).await.unwrap();
    assert_eq!(machine.wait_for_settled().await.state, AnalysisState::Error);
    machine.reset();
    assert_eq!(machine.snapshot(), AnalysisSnapshot::default());
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_response_after_reset_is_dropped() {
    let fake = Arc::new(
        FakeScarf::new(vec![completed()]).status_delay(Duration::from_secs(5)),
    );
    let mut machine = machine(&fake);
    let mut updates = machine.subscribe();

    machine.start_analysis(paper()).await.unwrap();
    // first request goes out at 1s and would answer at 6s
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(fake.status_calls(), 1);

    machine.reset();
    let _ = updates.borrow_and_update();

    sleep(Duration::from_secs(30)).await;
    assert!(!updates.has_changed().unwrap());
    assert_eq!(machine.snapshot(), AnalysisSnapshot::default());
    assert_eq!(fake.report_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_replaces_previous_run() {
    let fake = Arc::new(FakeScarf::new(vec![progress(60.0, "Linking evidence")]));
    let mut machine = machine(&fake);

    machine.start_analysis(paper()).await.unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(machine.snapshot().progress, 60);

    let job_id = machine
        .start_analysis(UploadFile::new("second.pdf", b"%PDF-1.4".to_vec()))
        .await
        .unwrap();

    let snap = machine.snapshot();
    assert_eq!(job_id, "job-2");
    assert_eq!(snap.file_name, "second.pdf");
    assert_eq!(snap.progress, 5);
    assert_eq!(snap.job_id.as_deref(), Some("job-2"));
    assert_eq!(machine.metrics().ticks, 0);
}
