use image::{ImageReader, RgbImage};
use std::path::Path;
use tracing::debug;
use vision_core::interfaces::{CaptureError, Frame, FrameSource, SourceEvent};

/// A source yielding exactly one frame.
#[derive(Debug)]
pub struct ImageSource {
    frame: Option<Frame>,
}

impl ImageSource {
    pub fn from_image(pixels: RgbImage) -> Self {
        Self {
            frame: Some(Frame::new(0, 0.0, pixels)),
        }
    }

    /// Decode an image file (any format enabled on the `image` crate).
    pub fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let io_err = |source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        };
        let pixels = ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?
            .decode()?
            .to_rgb8();
        debug!(
            path = %path.display(),
            width = pixels.width(),
            height = pixels.height(),
            "image decoded"
        );
        Ok(Self::from_image(pixels))
    }

    /// Decode uploaded image bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CaptureError> {
        let pixels = image::load_from_memory(bytes)?.to_rgb8();
        Ok(Self::from_image(pixels))
    }
}

impl FrameSource for ImageSource {
    fn next_frame(&mut self) -> Result<SourceEvent, CaptureError> {
        Ok(match self.frame.take() {
            Some(frame) => SourceEvent::Frame(frame),
            None => SourceEvent::End,
        })
    }

    fn total_frames(&self) -> Option<u64> {
        Some(1)
    }
}
