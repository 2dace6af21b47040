use crate::ffmpeg::{FfmpegConfig, FfmpegReader};
use crate::reader::RawFrameReader;
use crate::stop::StopSignal;
use std::time::Instant;
use tracing::info;
use vision_core::interfaces::{CaptureError, Frame, FrameSource, SourceEvent};

/// Live camera feed. Runs until the stop signal is raised or the device fails.
/// Dropping the source releases the device.
pub struct CameraSource {
    device: Box<dyn RawFrameReader>,
    stop: StopSignal,
    next_index: u64,
    opened: Instant,
}

impl CameraSource {
    pub fn new(device: Box<dyn RawFrameReader>, stop: StopSignal) -> Self {
        Self {
            device,
            stop,
            next_index: 0,
            opened: Instant::now(),
        }
    }

    pub fn open(
        device_index: u32,
        cfg: &FfmpegConfig,
        stop: StopSignal,
    ) -> Result<Self, CaptureError> {
        let reader = FfmpegReader::open_camera(device_index, cfg)?;
        info!(device_index, "camera opened");
        Ok(Self::new(Box::new(reader), stop))
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<SourceEvent, CaptureError> {
        if self.stop.is_stopped() {
            return Ok(SourceEvent::End);
        }
        let read = match self.device.read_frame() {
            Err(_) | Ok(None) if self.stop.is_stopped() => return Ok(SourceEvent::End),
            read => read?,
        };
        match read {
            Some(pixels) => {
                let index = self.next_index;
                self.next_index += 1;
                let timestamp = self.opened.elapsed().as_secs_f64();
                Ok(SourceEvent::Frame(Frame::new(index, timestamp, pixels)))
            }
            None => Err(CaptureError::Device("camera feed closed".into())),
        }
    }

    fn total_frames(&self) -> Option<u64> {
        None
    }
}
