//! Client state container and its transitions

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::config::BackendOrigin;
use crate::exercise::ExerciseType;
use crate::gateway::{AnalysisGateway, ProgressSink};
use crate::input::{InputManager, PreviewRegistry, SelectionOutcome, SelectionSource, VideoFile};
use crate::models::AnalysisResult;
use crate::report::ReportView;

/// User-visible notification raised by the client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    AnalysisFailed,
}

/// What a call to [`FormAnalysisClient::analyze`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// No video selected; nothing was sent and no state changed
    NoSelection,
    Completed,
    Failed,
}

#[derive(Debug, Default)]
struct ProgressSlot {
    /// Bumped whenever a request starts or settles so stale updates are dropped
    generation: u64,
    percent: u8,
}

#[derive(Debug, Default)]
struct Status {
    loading: AtomicBool,
    progress: Mutex<ProgressSlot>,
}

/// Shared, read-only view of the loading flag and upload progress.
///
/// Cheap to clone; can be polled from another task while a request runs.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<Status>,
}

impl StatusHandle {
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> u8 {
        self.inner.progress.lock().map(|slot| slot.percent).unwrap_or(0)
    }

    /// Start a request: progress to 0, loading on. Returns the new generation.
    fn begin(&self) -> u64 {
        let generation = self.reset_progress();
        self.inner.loading.store(true, Ordering::SeqCst);
        generation
    }

    fn settle(&self) {
        self.reset_progress();
        self.inner.loading.store(false, Ordering::SeqCst);
    }

    fn reset_progress(&self) -> u64 {
        match self.inner.progress.lock() {
            Ok(mut slot) => {
                slot.generation += 1;
                slot.percent = 0;
                slot.generation
            }
            Err(poisoned) => {
                let mut slot = poisoned.into_inner();
                slot.generation += 1;
                slot.percent = 0;
                slot.generation
            }
        }
    }

    fn record(&self, generation: u64, percent: u8) -> bool {
        match self.inner.progress.lock() {
            Ok(mut slot) if slot.generation == generation => {
                slot.percent = percent.min(100);
                true
            }
            _ => false,
        }
    }
}

/// Progress sink bound to one request
struct RequestProgress {
    status: StatusHandle,
    generation: u64,
    observer: Option<Arc<dyn ProgressSink>>,
}

impl ProgressSink for RequestProgress {
    fn on_progress(&self, percent: u8) {
        if self.status.record(self.generation, percent) {
            if let Some(observer) = &self.observer {
                observer.on_progress(percent);
            }
        }
    }
}

/// Clears loading and progress however the request ends, including when
/// the analyze future is dropped mid-flight.
struct SettleGuard<'a>(&'a StatusHandle);

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        self.0.settle();
    }
}

/// Exercise form analysis client: selection, upload and report state.
///
/// `analyze` takes `&mut self`, so a second request cannot start while one
/// is outstanding.
pub struct FormAnalysisClient<G: AnalysisGateway, R: PreviewRegistry> {
    input: InputManager<R>,
    gateway: G,
    origin: BackendOrigin,
    status: StatusHandle,
    result: Option<AnalysisResult>,
    notifications: Vec<Notification>,
    observer: Option<Arc<dyn ProgressSink>>,
}

impl<G: AnalysisGateway, R: PreviewRegistry> FormAnalysisClient<G, R> {
    pub fn new(gateway: G, registry: R, origin: BackendOrigin) -> Self {
        Self {
            input: InputManager::new(registry),
            gateway,
            origin,
            status: StatusHandle::default(),
            result: None,
            notifications: Vec::new(),
            observer: None,
        }
    }

    /// Also forward every accepted progress update to `observer`
    pub fn with_progress_observer(mut self, observer: Arc<dyn ProgressSink>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn input(&self) -> &InputManager<R> {
        &self.input
    }

    /// Drag-state and other input transitions
    pub fn input_mut(&mut self) -> &mut InputManager<R> {
        &mut self.input
    }

    pub fn select_file(&mut self, file: VideoFile, source: SelectionSource) -> SelectionOutcome {
        self.input.select_file(file, source)
    }

    pub fn drop_file(&mut self, file: VideoFile) -> SelectionOutcome {
        self.input.drop_file(file)
    }

    pub fn select_exercise_type(&mut self, exercise_type: ExerciseType) {
        self.input.select_exercise_type(exercise_type);
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    pub fn progress(&self) -> u8 {
        self.status.progress()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn report(&self) -> Option<ReportView> {
        self.result
            .as_ref()
            .map(|result| ReportView::from_result(result, &self.origin))
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Upload the current selection and publish the returned report.
    ///
    /// Without a selection this does nothing at all. Otherwise the previous
    /// result is cleared, and on failure exactly one notification is raised
    /// and no result is published.
    pub async fn analyze(&mut self) -> AnalyzeOutcome {
        let request = match self.input.snapshot() {
            Some(request) => request,
            None => return AnalyzeOutcome::NoSelection,
        };

        self.result = None;
        let generation = self.status.begin();
        let _settle = SettleGuard(&self.status);

        let progress: Arc<dyn ProgressSink> = Arc::new(RequestProgress {
            status: self.status.clone(),
            generation,
            observer: self.observer.clone(),
        });

        match self.gateway.analyze(&request, progress).await {
            Ok(result) => {
                info!(
                    "Published {} report for {}: score {}",
                    request.exercise_type,
                    request.video.file_name(),
                    result.overall_score
                );
                self.result = Some(result);
                AnalyzeOutcome::Completed
            }
            Err(e) => {
                warn!("Analysis of {} failed: {}", request.video.file_name(), e);
                self.notifications.push(Notification {
                    kind: NotificationKind::AnalysisFailed,
                    message: e.to_string(),
                    raised_at: Utc::now(),
                });
                AnalyzeOutcome::Failed
            }
        }
    }
}
