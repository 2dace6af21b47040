use std::path::Path;
use vision_core::interfaces::CaptureError;

pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// The three input modes of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Image,
    Video,
    Camera,
}

impl SourceKind {
    /// Classify an uploaded file by extension.
    pub fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(SourceKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(SourceKind::Video)
        } else {
            Err(CaptureError::UnsupportedUpload(path.display().to_string()))
        }
    }

    /// Whether a report from this mode must carry a captured frame.
    pub fn requires_frame(&self) -> bool {
        matches!(self, SourceKind::Image | SourceKind::Camera)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Image => "image",
            SourceKind::Video => "video",
            SourceKind::Camera => "camera",
        }
    }
}
