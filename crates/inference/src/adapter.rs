use crate::postprocess::{filter_confidence, nms};
use std::sync::Arc;
use tracing::debug;
use vision_core::interfaces::{AnnotatedFrame, Detector, Frame, InferenceError};
use vision_core::overlay::annotate;

/// Minimum confidence for a detection to reach callers. Fixed policy, not user-tunable.
pub const DEFAULT_CONFIDENCE: f32 = 0.3;
/// IoU above which a lower-scored box of the same class is suppressed.
pub const DEFAULT_IOU: f32 = 0.45;

/// Wraps a loaded detector: filters candidates and renders the annotated frame.
#[derive(Clone)]
pub struct DetectorAdapter {
    detector: Arc<dyn Detector>,
}

impl DetectorAdapter {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self { detector }
    }

    /// Run detection on `frame`, consuming it into an annotated frame.
    ///
    /// An error here concerns this frame only; callers skip it and keep going.
    pub fn infer(&self, frame: Frame) -> Result<AnnotatedFrame, InferenceError> {
        let candidates = self.detector.detect(&frame)?;
        let detections = nms(
            filter_confidence(candidates, DEFAULT_CONFIDENCE),
            DEFAULT_IOU,
        );
        for det in &detections {
            debug!(
                frame = frame.index,
                "detected label={} confidence={:.2}",
                det.label,
                det.confidence
            );
        }
        Ok(annotate(frame, detections))
    }
}
