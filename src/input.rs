//! Video selection, preview handles and drag state

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::InvalidFileRejected;
use crate::exercise::ExerciseType;

/// A locally selected video file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    path: PathBuf,
    file_name: String,
    media_type: String,
    size: u64,
}

impl VideoFile {
    pub fn new(path: PathBuf, media_type: impl Into<String>, size: u64) -> Self {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("video")
            .to_string();

        Self {
            path,
            file_name,
            media_type: media_type.into(),
            size,
        }
    }

    /// Stat a file on disk and declare its media type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a file: {}", path.display()),
            ));
        }

        Ok(Self::new(path.to_path_buf(), media_type_for(path), metadata.len()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_video(&self) -> bool {
        self.media_type.starts_with("video/")
    }
}

/// Media type declared for a file, by extension
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "m4v" => "video/x-m4v",
        _ => "application/octet-stream",
    }
}

/// Revocable reference used to play back a selection before upload
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: u64,
    uri: String,
}

impl PreviewHandle {
    pub fn new(id: u64, uri: String) -> Self {
        Self { id, uri }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Creates and releases preview handles
pub trait PreviewRegistry {
    fn create(&mut self, file: &VideoFile) -> PreviewHandle;
    fn release(&mut self, handle: PreviewHandle);
}

/// In-process registry handing out `preview://` URIs
#[derive(Debug, Default)]
pub struct LocalPreviewRegistry {
    next_id: u64,
    live: HashSet<u64>,
}

impl LocalPreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.live.contains(&handle.id)
    }
}

impl PreviewRegistry for LocalPreviewRegistry {
    fn create(&mut self, file: &VideoFile) -> PreviewHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.live.insert(id);
        PreviewHandle::new(id, format!("preview://{}/{}", id, file.file_name()))
    }

    fn release(&mut self, handle: PreviewHandle) {
        if !self.live.remove(&handle.id) {
            debug!("Preview handle {} was already released", handle.id);
        }
    }
}

/// The current file together with its live preview handle
#[derive(Debug)]
pub struct VideoSelection {
    file: VideoFile,
    preview: PreviewHandle,
}

impl VideoSelection {
    pub fn file(&self) -> &VideoFile {
        &self.file
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }
}

/// Snapshot taken when analyze is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub video: VideoFile,
    pub exercise_type: ExerciseType,
}

/// Where a file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// File picker. The platform's video filter is advisory, anything is accepted.
    Picker,
    /// Drag and drop. Only `video/*` media types are accepted.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Accepted,
    Rejected(InvalidFileRejected),
}

impl SelectionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SelectionOutcome::Accepted)
    }
}

/// Tracks the selected exercise and video.
///
/// At most one preview handle is live at a time: a new selection releases
/// the previous handle before creating its own, and dropping the manager
/// releases whatever is left.
pub struct InputManager<R: PreviewRegistry> {
    registry: R,
    selection: Option<VideoSelection>,
    exercise_type: ExerciseType,
    dragging: bool,
}

impl<R: PreviewRegistry> InputManager<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            selection: None,
            exercise_type: ExerciseType::default(),
            dragging: false,
        }
    }

    pub fn select_file(&mut self, file: VideoFile, source: SelectionSource) -> SelectionOutcome {
        if source == SelectionSource::Drop && !file.is_video() {
            let rejection = InvalidFileRejected {
                file_name: file.file_name().to_string(),
                media_type: file.media_type().to_string(),
            };
            debug!("{}", rejection);
            return SelectionOutcome::Rejected(rejection);
        }

        if let Some(previous) = self.selection.take() {
            self.registry.release(previous.preview);
        }

        let preview = self.registry.create(&file);
        info!("Selected {} ({} bytes, {})", file.file_name(), file.size(), file.media_type());
        self.selection = Some(VideoSelection { file, preview });

        SelectionOutcome::Accepted
    }

    pub fn select_exercise_type(&mut self, exercise_type: ExerciseType) {
        self.exercise_type = exercise_type;
    }

    pub fn drag_enter(&mut self) {
        self.dragging = true;
    }

    pub fn drag_over(&mut self) {
        self.dragging = true;
    }

    pub fn drag_leave(&mut self) {
        self.dragging = false;
    }

    pub fn drop_file(&mut self, file: VideoFile) -> SelectionOutcome {
        self.dragging = false;
        self.select_file(file, SelectionSource::Drop)
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn selection(&self) -> Option<&VideoSelection> {
        self.selection.as_ref()
    }

    pub fn exercise_type(&self) -> ExerciseType {
        self.exercise_type
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Immutable request for the current selection, if any
    pub fn snapshot(&self) -> Option<AnalysisRequest> {
        self.selection.as_ref().map(|s| AnalysisRequest {
            video: s.file.clone(),
            exercise_type: self.exercise_type,
        })
    }
}

impl<R: PreviewRegistry> Drop for InputManager<R> {
    fn drop(&mut self) {
        if let Some(selection) = self.selection.take() {
            self.registry.release(selection.preview);
        }
    }
}
