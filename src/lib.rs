//! Exercise Form Analyzer - client library
//!
//! Selects an exercise and a workout video, uploads them to the form
//! analysis backend with progress reporting, and turns the returned JSON
//! report into a colour-banded view model.

pub mod config;
pub mod error;
pub mod exercise;
pub mod gateway;
pub mod input;
pub mod models;
pub mod report;
pub mod state;

// Re-export main types for easy access
pub use crate::config::{BackendOrigin, Config, ConfigBuilder};
pub use crate::error::{AnalysisError, InvalidFileRejected};
pub use crate::exercise::ExerciseType;
pub use crate::gateway::{AnalysisGateway, HttpGateway, NoProgress, ProgressSink};
pub use crate::input::{
    AnalysisRequest, InputManager, LocalPreviewRegistry, PreviewHandle, PreviewRegistry, SelectionOutcome,
    SelectionSource, VideoFile, VideoSelection,
};
pub use crate::models::{AnalysisResult, AspectScore, Correction, Severity};
pub use crate::report::{score_band, severity_class, ReportView, ScoreBand, SeverityClass};
pub use crate::state::{AnalyzeOutcome, FormAnalysisClient, Notification, NotificationKind, StatusHandle};
