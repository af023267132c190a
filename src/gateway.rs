//! Upload/analyze gateway: multipart POST to the analysis backend

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::config::{BackendConfig, BackendOrigin};
use crate::error::{AnalysisError, Result};
use crate::input::AnalysisRequest;
use crate::models::{parse_analysis_body, AnalysisResult};

pub const ANALYZE_PATH: &str = "/api/analyze";
pub const HEALTH_PATH: &str = "/api/health";

/// Multipart field carrying the video bytes
pub const VIDEO_FIELD: &str = "video";
/// Multipart field carrying the exercise type
pub const EXERCISE_FIELD: &str = "exercise_type";

/// Longest slice of a non-JSON error body kept in messages
const MAX_ERROR_TEXT: usize = 200;

/// Receives upload progress as a whole percentage
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, percent: u8);
}

/// Discards progress updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _percent: u8) {}
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        self(percent)
    }
}

/// Turns byte counts into `floor(sent * 100 / total)`, yielding only changes
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    sent: u64,
    total: u64,
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            sent: 0,
            total,
            last: None,
        }
    }

    /// Record `bytes` more sent. Returns the new percentage if it moved.
    /// With an unknown (zero) total nothing is ever reported.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        if self.total == 0 {
            return None;
        }

        self.sent = self.sent.saturating_add(bytes).min(self.total);
        let percent = (self.sent as u128 * 100 / self.total as u128) as u8;

        if self.last == Some(percent) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }
}

/// Backend able to score an exercise video
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest, progress: Arc<dyn ProgressSink>) -> Result<AnalysisResult>;
    async fn is_available(&self) -> bool;
}

/// Gateway speaking to the HTTP analysis backend
pub struct HttpGateway {
    origin: BackendOrigin,
    client: reqwest::Client,
    request_timeout: Option<Duration>,
}

impl HttpGateway {
    pub fn new(origin: BackendOrigin, config: &BackendConfig) -> AnyResult<Self> {
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            origin,
            client: builder.build()?,
            request_timeout: config.request_timeout(),
        })
    }

    pub fn origin(&self) -> &BackendOrigin {
        &self.origin
    }

    fn transport_error(&self, e: reqwest::Error) -> AnalysisError {
        match self.request_timeout {
            Some(limit) if e.is_timeout() => AnalysisError::Timeout(limit),
            _ => AnalysisError::Transport(e),
        }
    }

    async fn build_form(&self, request: &AnalysisRequest, progress: Arc<dyn ProgressSink>) -> Result<reqwest::multipart::Form> {
        let file = tokio::fs::File::open(request.video.path()).await?;
        let total = file.metadata().await?.len();

        let mut tracker = ProgressTracker::new(total);
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                if let Some(percent) = tracker.advance(bytes.len() as u64) {
                    debug!("Upload progress: {}%", percent);
                    progress.on_progress(percent);
                }
            }
            chunk
        });

        let video = reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(request.video.file_name().to_string())
            .mime_str(request.video.media_type())?;

        Ok(reqwest::multipart::Form::new()
            .part(VIDEO_FIELD, video)
            .text(EXERCISE_FIELD, request.exercise_type.as_str()))
    }
}

#[async_trait]
impl AnalysisGateway for HttpGateway {
    async fn analyze(&self, request: &AnalysisRequest, progress: Arc<dyn ProgressSink>) -> Result<AnalysisResult> {
        let endpoint = self.origin.join(ANALYZE_PATH);
        info!(
            "Submitting {} ({} bytes) for {} analysis to {}",
            request.video.file_name(),
            request.video.size(),
            request.exercise_type,
            endpoint
        );

        let form = self.build_form(request, progress).await?;
        let started = Instant::now();

        let response = self
            .client
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!("Analysis backend returned {}: {}", status, message);
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let result = parse_analysis_body(&body)?;
        info!(
            "Analysis completed in {:.2}s: score {}, {} corrections",
            started.elapsed().as_secs_f64(),
            result.overall_score,
            result.corrections_needed.len()
        );
        Ok(result)
    }

    async fn is_available(&self) -> bool {
        match self.client.get(self.origin.join(HEALTH_PATH)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }
}

/// Best human-readable message from an error body: its JSON `error` field,
/// otherwise the leading text
fn error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return message.to_string();
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "no response body".to_string();
    }
    text.chars().take(MAX_ERROR_TEXT).collect()
}
