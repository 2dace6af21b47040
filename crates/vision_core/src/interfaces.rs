use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A decoded RGB8 frame and its position within the source.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based index within the source (counts skipped frames too).
    pub index: u64,
    /// Seconds since the source was opened.
    pub timestamp: f64,
    pub pixels: RgbImage,
}

impl Frame {
    pub fn new(index: u64, timestamp: f64, pixels: RgbImage) -> Self {
        Self {
            index,
            timestamp,
            pixels,
        }
    }

    /// Image dimensions (width, height).
    pub fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Axis-aligned box in pixel coordinates, anchored at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Corners as \[x0,y0,x1,y1\].
    pub fn corners(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let [ax0, ay0, ax1, ay1] = self.corners();
        let [bx0, by0, bx1, by1] = other.corners();
        let iw = (ax1.min(bx1) - ax0.max(bx0)).max(0.0);
        let ih = (ay1.min(by1) - ay0.max(by0)).max(0.0);
        let inter = iw * ih;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// One detected hazard on a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub label: String,
    /// Score in 0..=1.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// A frame with its detections rendered onto the pixels.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub detections: Vec<Detection>,
}

impl AnnotatedFrame {
    pub fn index(&self) -> u64 {
        self.frame.index
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.frame.pixels
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to load detector weights from {path}: {msg}")]
    ModelLoad { path: PathBuf, msg: String },
    #[error("inference failed on frame {frame}: {msg}")]
    Frame { frame: u64, msg: String },
}

/// Runs a loaded model on a frame. Implementations are shared read-only after load.
pub trait Detector: Send + Sync {
    /// Raw candidates; callers apply confidence filtering and suppression.
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, InferenceError>;
    fn label_for(&self, class_id: usize) -> &str;
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("capture device error: {0}")]
    Device(String),
    #[error("decoder process error: {0}")]
    Process(String),
    #[error("unsupported upload {0}")]
    UnsupportedUpload(String),
}

/// What a frame source produced on a pull.
#[derive(Debug)]
pub enum SourceEvent {
    Frame(Frame),
    /// Frame consumed but not selected for detection (video stride).
    Skipped { index: u64 },
    End,
}

/// Pulls frames from an image, a video file or a live camera.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<SourceEvent, CaptureError>;
    /// Total frame count when knowable; `None` for live sources.
    fn total_frames(&self) -> Option<u64>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<SourceEvent, CaptureError> {
        (**self).next_frame()
    }

    fn total_frames(&self) -> Option<u64> {
        (**self).total_frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BoundingBox::from_corners(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::from_corners(20.0, 20.0, 30.0, 30.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn from_corners_orders_coordinates() {
        let b = BoundingBox::from_corners(10.0, 8.0, 2.0, 4.0);
        assert_eq!(b.corners(), [2.0, 4.0, 10.0, 8.0]);
    }
}
