use image::RgbImage;
use std::collections::VecDeque;
use vision_core::interfaces::CaptureError;

/// Sequential decoder of raw RGB frames (video file or camera device).
pub trait RawFrameReader: Send {
    /// Next decoded frame, or `None` once the input is exhausted.
    fn read_frame(&mut self) -> Result<Option<RgbImage>, CaptureError>;
    /// Frame count when the container reports one.
    fn frame_count(&self) -> Option<u64> {
        None
    }
}

/// Reader over already-decoded frames, optionally failing after the queue drains.
#[derive(Debug, Default)]
pub struct MemoryReader {
    frames: VecDeque<RgbImage>,
    known_count: Option<u64>,
    fail_at_end: Option<String>,
}

impl MemoryReader {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        let known_count = Some(frames.len() as u64);
        Self {
            frames: frames.into(),
            known_count,
            fail_at_end: None,
        }
    }

    /// Behave like a live device: no known frame count.
    pub fn unbounded(mut self) -> Self {
        self.known_count = None;
        self
    }

    /// Report a device error instead of end-of-stream once frames run out.
    pub fn failing_at_end(mut self, msg: impl Into<String>) -> Self {
        self.fail_at_end = Some(msg.into());
        self
    }
}

impl RawFrameReader for MemoryReader {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => match &self.fail_at_end {
                Some(msg) => Err(CaptureError::Device(msg.clone())),
                None => Ok(None),
            },
        }
    }

    fn frame_count(&self) -> Option<u64> {
        self.known_count
    }
}
