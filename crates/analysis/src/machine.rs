use client::{JobState, JobStatus, ScarfApi, UploadFile};
use report::map_report;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::config::PollConfig;
use crate::error::{AnalysisError, BACKEND_FAILED_FALLBACK};
use crate::metrics::{PollMetrics, PollMetricsSnapshot};
use crate::state::{AnalysisSnapshot, AnalysisState, Notice};
use crate::step::AnalysisStep;

/// Drives one document through upload, status polling and report retrieval.
///
/// States move `idle -> analyzing -> complete | error`; only [`reset`] goes
/// back to idle. The machine owns at most one poll task. That task is aborted
/// on `reset`, on a new `start_analysis`, on every terminal transition and
/// when the machine is dropped. Each write it makes is checked against the
/// current poll generation, so a response that lands after a reset is ignored.
///
/// [`reset`]: AnalysisMachine::reset
pub struct AnalysisMachine<B: ScarfApi + 'static> {
    backend: Arc<B>,
    config: PollConfig,
    snapshot: Arc<watch::Sender<AnalysisSnapshot>>,
    generation: Arc<AtomicU64>,
    metrics: Arc<PollMetrics>,
    poller: Option<PollTask>,
}

impl<B: ScarfApi + 'static> AnalysisMachine<B> {
    pub fn new(backend: B, config: PollConfig) -> Self {
        Self::with_shared(Arc::new(backend), config)
    }

    pub fn with_shared(backend: Arc<B>, config: PollConfig) -> Self {
        let (snapshot, _) = watch::channel(AnalysisSnapshot::default());
        Self {
            backend,
            config,
            snapshot: Arc::new(snapshot),
            generation: Arc::new(AtomicU64::new(0)),
            metrics: PollMetrics::new(),
            poller: None,
        }
    }

    /// Upload `file` and start polling its job. Returns the backend job id.
    ///
    /// Upload failure moves the machine to `error` and is also returned.
    /// Later failures only show up in the snapshot.
    pub async fn start_analysis(&mut self, file: UploadFile) -> Result<String, AnalysisError> {
        let publisher = self.begin(&file.name);
        info!(file = %file.name, bytes = file.bytes.len(), "Uploading document for analysis");

        let receipt = match self.backend.upload(&file).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(file = %file.name, error = %e, "Upload failed");
                let err = AnalysisError::Upload(e);
                publisher.fail(&err);
                return Err(err);
            }
        };

        let job_id = receipt.job_id;
        info!(job_id = %job_id, "Upload accepted, polling job status");
        publisher.apply(|snap| snap.job_id = Some(job_id.clone()));

        let job = PollJob {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            job_id: job_id.clone(),
            publisher,
        };
        self.poller = Some(PollTask(tokio::spawn(job.run())));

        Ok(job_id)
    }

    /// Stop polling and restore the initial snapshot, from any state.
    pub fn reset(&mut self) {
        self.cancel_polling();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.snapshot.send_replace(AnalysisSnapshot::default());
        debug!("Analysis reset");
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn metrics(&self) -> PollMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(PollTask::is_running)
    }

    /// Resolves once the machine is no longer analyzing.
    pub async fn wait_for_settled(&self) -> AnalysisSnapshot {
        let mut updates = self.subscribe();
        match updates
            .wait_for(|snap| snap.state != AnalysisState::Analyzing)
            .await
        {
            Ok(snap) => snap.clone(),
            Err(_) => self.snapshot(),
        }
    }

    fn begin(&mut self, file_name: &str) -> Publisher {
        self.cancel_polling();
        let epoch = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics = PollMetrics::new();
        self.snapshot.send_replace(AnalysisSnapshot::starting(file_name));

        Publisher {
            snapshot: Arc::clone(&self.snapshot),
            generation: Arc::clone(&self.generation),
            epoch,
            metrics: Arc::clone(&self.metrics),
        }
    }

    fn cancel_polling(&mut self) {
        // dropping the handle aborts the task
        self.poller = None;
    }
}

/// Abort-on-drop handle for the poll task.
struct PollTask(JoinHandle<()>);

impl PollTask {
    fn is_running(&self) -> bool {
        !self.0.is_finished()
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Write access to the snapshot for one poll generation.
struct Publisher {
    snapshot: Arc<watch::Sender<AnalysisSnapshot>>,
    generation: Arc<AtomicU64>,
    epoch: u64,
    metrics: Arc<PollMetrics>,
}

impl Publisher {
    fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.epoch
    }

    /// Applies `update` only while this generation is current and the
    /// snapshot is still analyzing. Returns whether it was applied.
    fn apply(&self, update: impl FnOnce(&mut AnalysisSnapshot)) -> bool {
        let applied = self.snapshot.send_if_modified(|snap| {
            if !self.is_current() || snap.state != AnalysisState::Analyzing {
                return false;
            }
            update(snap);
            true
        });

        if !applied {
            self.metrics.record_stale_write();
            debug!(epoch = self.epoch, "Discarded stale analysis update");
        }
        applied
    }

    fn fail(&self, err: &AnalysisError) -> bool {
        let message = err.to_string();
        self.apply(|snap| {
            snap.state = AnalysisState::Error;
            snap.error = Some(message);
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct PollJob<B> {
    backend: Arc<B>,
    config: PollConfig,
    job_id: String,
    publisher: Publisher,
}

impl<B: ScarfApi> PollJob<B> {
    async fn run(self) {
        let started = Instant::now();
        let period = self.config.interval();
        let mut ticker = interval_at(started + period, period);
        // fetches are sequential, so a slow response delays the next tick instead of stacking
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut not_found = 0u32;
        let mut failures = 0u32;

        loop {
            ticker.tick().await;
            if !self.publisher.is_current() {
                return;
            }

            if started.elapsed() > self.config.timeout() {
                warn!(
                    job_id = %self.job_id,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Analysis timed out"
                );
                self.publisher.fail(&AnalysisError::TimedOut {
                    after: self.config.timeout_label(),
                });
                return;
            }

            self.publisher.metrics.record_tick();
            match self.backend.status(&self.job_id).await {
                Ok(status) => {
                    not_found = 0;
                    failures = 0;
                    self.publisher.metrics.record_ok();
                    if self.on_status(status).await == Flow::Stop {
                        return;
                    }
                }
                Err(e) if e.is_not_found() => {
                    not_found += 1;
                    self.publisher.metrics.record_not_found();
                    warn!(
                        job_id = %self.job_id,
                        attempt = not_found,
                        max_attempts = self.config.max_not_found,
                        "Analysis job not found"
                    );
                    if not_found >= self.config.max_not_found {
                        self.publisher.fail(&AnalysisError::JobNotFound);
                        return;
                    }
                }
                Err(e) => {
                    failures += 1;
                    self.publisher.metrics.record_transient_failure();
                    warn!(
                        job_id = %self.job_id,
                        consecutive = failures,
                        error = %e,
                        "Status poll failed, retrying next tick"
                    );
                    if self
                        .config
                        .max_transient_failures
                        .is_some_and(|cap| failures >= cap)
                    {
                        self.publisher
                            .fail(&AnalysisError::Unreachable { attempts: failures });
                        return;
                    }
                }
            }
        }
    }

    async fn on_status(&self, status: JobStatus) -> Flow {
        let state = status.state();
        let JobStatus {
            progress,
            message,
            partial_results,
            error,
            ..
        } = status;

        let progress = progress.filter(|p| p.is_finite() && *p != 0.0);
        let message = message.filter(|m| !m.is_empty());
        let partial = partial_results.as_ref().filter(|p| has_claims(p)).map(|p| {
            let stage = p.get("stage").and_then(Value::as_str).map(str::to_string);
            (map_report(p), stage)
        });

        if let Some((mapped, stage)) = &partial {
            info!(
                job_id = %self.job_id,
                stage = stage.as_deref().unwrap_or("unknown"),
                claims = mapped.data.claims.len(),
                "Partial results available"
            );
            self.publisher.metrics.record_partial_update();
        }

        let applied = self.publisher.apply(|snap| {
            if let Some(progress) = progress {
                snap.progress = progress.clamp(0.0, 100.0).round() as u8;
                snap.current_step = AnalysisStep::from_progress(progress);
            }
            if let Some(message) = message {
                snap.message = message;
            }
            if let Some((mapped, stage)) = partial {
                snap.report = Some(mapped.data);
                snap.defaults = mapped.defaults;
                snap.stage = stage;
            }
        });
        if !applied {
            return Flow::Stop;
        }

        match state {
            JobState::Completed => {
                self.finish().await;
                Flow::Stop
            }
            JobState::Failed => {
                let reason = error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| BACKEND_FAILED_FALLBACK.to_string());
                warn!(job_id = %self.job_id, reason = %reason, "Backend reported analysis failure");
                self.publisher.fail(&AnalysisError::BackendFailed(reason));
                Flow::Stop
            }
            JobState::Pending | JobState::Running(_) => Flow::Continue,
        }
    }

    async fn finish(&self) {
        info!(job_id = %self.job_id, "Fetching analysis report");
        let payload = match self.backend.report(&self.job_id).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = %self.job_id, error = %e, "Report fetch failed");
                self.publisher.fail(&AnalysisError::Report(e));
                return;
            }
        };

        let mapped = map_report(&payload);
        if !mapped.defaults.is_empty() {
            debug!(
                job_id = %self.job_id,
                defaults = mapped.defaults.len(),
                "Report mapping substituted defaults"
            );
        }

        let claims = mapped.data.claims.len();
        let notice = if claims == 0 {
            warn!(job_id = %self.job_id, "No claims found in report");
            Some(Notice::NoClaimsFound)
        } else {
            None
        };

        let applied = self.publisher.apply(|snap| {
            snap.report = Some(mapped.data);
            snap.defaults = mapped.defaults;
            snap.notice = notice;
            snap.state = AnalysisState::Complete;
        });
        if applied {
            info!(job_id = %self.job_id, claims, "Analysis complete");
        }
    }
}

fn has_claims(partial: &Value) -> bool {
    partial.get("claims").is_some_and(|claims| !claims.is_null())
}
