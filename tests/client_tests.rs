use async_trait::async_trait;
use form_analyzer::error::Result as AnalysisResultOf;
use form_analyzer::{
    AnalysisError, AnalysisGateway, AnalysisRequest, AnalysisResult, AnalyzeOutcome, BackendOrigin, ExerciseType,
    FormAnalysisClient, LocalPreviewRegistry, NotificationKind, PreviewHandle, PreviewRegistry, ProgressSink,
    ScoreBand, SelectionSource, SeverityClass, StatusHandle, VideoFile,
};
use serde_json::json;
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

enum Reply {
    Report(serde_json::Value),
    Status(u16),
}

/// Gateway double: replays a canned reply, emits a few progress steps and
/// records what it saw while "in flight"
struct MockGateway {
    reply: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<AnalysisRequest>>,
    watch: Mutex<Option<StatusHandle>>,
    seen_loading: Mutex<Vec<bool>>,
}

impl MockGateway {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            watch: Mutex::new(None),
            seen_loading: Mutex::new(Vec::new()),
        }
    }

    fn observe(&self, status: StatusHandle) {
        *self.watch.lock().unwrap() = Some(status);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisGateway for MockGateway {
    async fn analyze(&self, request: &AnalysisRequest, progress: Arc<dyn ProgressSink>) -> AnalysisResultOf<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        for percent in [0, 33, 66, 100] {
            progress.on_progress(percent);
        }
        if let Some(status) = self.watch.lock().unwrap().as_ref() {
            self.seen_loading.lock().unwrap().push(status.is_loading());
            assert_eq!(status.progress(), 100);
        }

        match &self.reply {
            Reply::Report(body) => form_analyzer::models::parse_analysis_body(body.to_string().as_bytes()),
            Reply::Status(code) => Err(AnalysisError::Status {
                status: *code,
                message: "Internal server error".to_string(),
            }),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Counts create/release calls across clones
#[derive(Clone, Default)]
struct CountingRegistry {
    created: Rc<Cell<i64>>,
    released: Rc<Cell<i64>>,
}

impl CountingRegistry {
    fn live(&self) -> i64 {
        self.created.get() - self.released.get()
    }
}

impl PreviewRegistry for CountingRegistry {
    fn create(&mut self, file: &VideoFile) -> PreviewHandle {
        self.created.set(self.created.get() + 1);
        PreviewHandle::new(self.created.get() as u64, format!("blob:{}", file.file_name()))
    }

    fn release(&mut self, _handle: PreviewHandle) {
        self.released.set(self.released.get() + 1);
    }
}

fn origin() -> BackendOrigin {
    BackendOrigin::parse("http://localhost:5000").unwrap()
}

fn video(name: &str) -> VideoFile {
    VideoFile::new(PathBuf::from(name), "video/mp4", 2048)
}

fn pushup_report() -> serde_json::Value {
    json!({
        "overall_score": 72,
        "whats_right": ["good depth"],
        "corrections_needed": [{
            "issue": "elbow flare",
            "severity": "warning",
            "feedback": "elbows too wide",
            "correction_instruction": "tuck elbows to 45°"
        }],
        "detailed_breakdown": {},
        "improvement_tips": ["slow the descent"]
    })
}

#[test]
fn test_non_video_drop_changes_nothing() {
    let registry = CountingRegistry::default();
    let mut client = FormAnalysisClient::new(MockGateway::new(Reply::Status(500)), registry.clone(), origin());

    for (name, media_type) in [("a.txt", "text/plain"), ("b.png", "image/png"), ("c", ""), ("d.mp4", "audio/mp4")] {
        let outcome = client.drop_file(VideoFile::new(PathBuf::from(name), media_type, 1));
        assert!(!outcome.is_accepted());
    }

    assert!(client.input().selection().is_none());
    assert_eq!(registry.created.get(), 0);

    client.select_file(video("keep.mp4"), SelectionSource::Picker);
    client.drop_file(VideoFile::new(PathBuf::from("x.gif"), "image/gif", 1));
    assert_eq!(client.input().selection().unwrap().file().file_name(), "keep.mp4");
    assert_eq!(registry.created.get(), 1);
}

#[test]
fn test_at_most_one_preview_handle_is_live() {
    let registry = CountingRegistry::default();
    {
        let mut client = FormAnalysisClient::new(MockGateway::new(Reply::Status(500)), registry.clone(), origin());

        client.select_file(video("1.mp4"), SelectionSource::Picker);
        assert_eq!(registry.live(), 1);
        client.drop_file(video("2.webm"));
        assert_eq!(registry.live(), 1);
        client.drop_file(VideoFile::new(PathBuf::from("3.doc"), "application/msword", 1));
        assert_eq!(registry.live(), 1);
        client.select_file(video("4.mov"), SelectionSource::Picker);
        assert_eq!(registry.live(), 1);
        assert_eq!(registry.released.get(), 2);
    }
    assert_eq!(registry.live(), 0);
}

#[tokio::test]
async fn test_end_to_end_pushup_report() {
    let mut client = FormAnalysisClient::new(
        MockGateway::new(Reply::Report(pushup_report())),
        LocalPreviewRegistry::new(),
        origin(),
    );
    client.gateway().observe(client.status());

    client.select_exercise_type(ExerciseType::Pushup);
    assert!(client.select_file(video("pushups.mp4"), SelectionSource::Picker).is_accepted());

    assert_eq!(client.analyze().await, AnalyzeOutcome::Completed);

    assert!(!client.is_loading());
    assert_eq!(client.progress(), 0);
    assert!(client.notifications().is_empty());
    assert_eq!(*client.gateway().seen_loading.lock().unwrap(), vec![true]);

    let sent = client.gateway().requests.lock().unwrap()[0].clone();
    assert_eq!(sent.exercise_type, ExerciseType::Pushup);
    assert_eq!(sent.video.file_name(), "pushups.mp4");

    let report = client.report().unwrap();
    assert_eq!(report.overall_score, 72);
    assert_eq!(report.overall_band, ScoreBand::Medium);
    assert_eq!(report.strengths.as_ref().unwrap().len(), 1);
    let corrections = report.corrections.as_ref().unwrap();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].class, SeverityClass::Warning);
    assert_eq!(report.tips.as_ref().unwrap(), &vec!["slow the descent".to_string()]);
    assert!(report.breakdown.is_none());
    assert!(!report.render_text().contains("Detailed breakdown"));
}

#[tokio::test]
async fn test_backend_error_raises_one_notification_per_attempt() {
    let mut client = FormAnalysisClient::new(MockGateway::new(Reply::Status(500)), LocalPreviewRegistry::new(), origin());
    client.select_file(video("squat.mp4"), SelectionSource::Picker);

    for attempt in 1..=2 {
        assert_eq!(client.analyze().await, AnalyzeOutcome::Failed);
        assert!(client.result().is_none());
        assert!(!client.is_loading());
        assert_eq!(client.progress(), 0);
        assert_eq!(client.notifications().len(), attempt);
    }

    let notifications = client.take_notifications();
    assert!(notifications.iter().all(|n| n.kind == NotificationKind::AnalysisFailed));
    assert!(notifications[0].message.contains("500"));
    assert!(client.notifications().is_empty());
    assert_eq!(client.gateway().calls(), 2);
}

#[tokio::test]
async fn test_failure_does_not_publish_stale_result() {
    let mut ok_client = FormAnalysisClient::new(
        MockGateway::new(Reply::Report(pushup_report())),
        LocalPreviewRegistry::new(),
        origin(),
    );
    ok_client.select_file(video("a.mp4"), SelectionSource::Picker);
    ok_client.analyze().await;
    assert!(ok_client.result().is_some());

    let mut client = FormAnalysisClient::new(
        MockGateway::new(Reply::Report(json!({"success": false, "error": "No pose data detected in video"}))),
        LocalPreviewRegistry::new(),
        origin(),
    );
    client.select_file(video("dark.mp4"), SelectionSource::Picker);
    assert_eq!(client.analyze().await, AnalyzeOutcome::Failed);
    assert!(client.result().is_none());
    assert!(client.notifications()[0].message.contains("No pose data detected"));
}

#[tokio::test]
async fn test_analyze_without_selection_is_a_noop() {
    let mut client = FormAnalysisClient::new(
        MockGateway::new(Reply::Report(pushup_report())),
        LocalPreviewRegistry::new(),
        origin(),
    );

    assert_eq!(client.analyze().await, AnalyzeOutcome::NoSelection);
    assert_eq!(client.gateway().calls(), 0);
    assert!(!client.is_loading());
    assert_eq!(client.progress(), 0);
    assert!(client.result().is_none());
    assert!(client.notifications().is_empty());
}

#[tokio::test]
async fn test_progress_observer_sees_every_step() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut client = FormAnalysisClient::new(
        MockGateway::new(Reply::Report(pushup_report())),
        LocalPreviewRegistry::new(),
        origin(),
    )
    .with_progress_observer(Arc::new(move |p: u8| sink.lock().unwrap().push(p)));

    client.select_file(video("a.mp4"), SelectionSource::Picker);
    client.analyze().await;

    assert_eq!(*seen.lock().unwrap(), vec![0, 33, 66, 100]);
    assert_eq!(client.progress(), 0);
}
