use crate::ffmpeg::{FfmpegConfig, FfmpegReader};
use crate::reader::RawFrameReader;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::debug;
use vision_core::interfaces::{CaptureError, Frame, FrameSource, SourceEvent};

/// Finite, non-restartable video source. Only every `stride`-th frame is surfaced for
/// detection; the rest are reported as skipped so progress still counts them.
pub struct VideoSource {
    reader: Box<dyn RawFrameReader>,
    stride: u64,
    next_index: u64,
    opened: Instant,
    // Keeps an uploaded video on disk while the reader decodes it.
    spool: Option<NamedTempFile>,
}

impl VideoSource {
    pub fn new(reader: Box<dyn RawFrameReader>, stride: u64) -> Self {
        Self {
            reader,
            stride: stride.max(1),
            next_index: 0,
            opened: Instant::now(),
            spool: None,
        }
    }

    pub fn from_path(path: &Path, stride: u64, cfg: &FfmpegConfig) -> Result<Self, CaptureError> {
        let reader = FfmpegReader::open_file(path, cfg)?;
        Ok(Self::new(Box::new(reader), stride))
    }

    /// Spool uploaded bytes to a temporary file and decode it with ffmpeg.
    pub fn from_upload(
        bytes: &[u8],
        extension: &str,
        stride: u64,
        cfg: &FfmpegConfig,
    ) -> Result<Self, CaptureError> {
        Self::from_upload_with(bytes, extension, stride, |path| {
            let reader = FfmpegReader::open_file(path, cfg)?;
            Ok(Box::new(reader) as Box<dyn RawFrameReader>)
        })
    }

    /// Spool uploaded bytes and hand the spool path to `open`. The spool is deleted when
    /// the source is dropped, or right away if `open` fails.
    pub fn from_upload_with<F>(
        bytes: &[u8],
        extension: &str,
        stride: u64,
        open: F,
    ) -> Result<Self, CaptureError>
    where
        F: FnOnce(&Path) -> Result<Box<dyn RawFrameReader>, CaptureError>,
    {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let io_err = |source| CaptureError::Io {
            path: std::env::temp_dir(),
            source,
        };
        let mut spool = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile()
            .map_err(io_err)?;
        spool.write_all(bytes).map_err(io_err)?;
        spool.flush().map_err(io_err)?;
        debug!(path = %spool.path().display(), bytes = bytes.len(), "video upload spooled");
        let reader = open(spool.path())?;
        let mut source = Self::new(reader, stride);
        source.spool = Some(spool);
        Ok(source)
    }

    /// Location of the spooled upload, for sources built from uploaded bytes.
    pub fn spool_path(&self) -> Option<&Path> {
        self.spool.as_ref().map(NamedTempFile::path)
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<SourceEvent, CaptureError> {
        let Some(pixels) = self.reader.read_frame()? else {
            return Ok(SourceEvent::End);
        };
        let index = self.next_index;
        self.next_index += 1;
        if index % self.stride != 0 {
            return Ok(SourceEvent::Skipped { index });
        }
        let timestamp = self.opened.elapsed().as_secs_f64();
        Ok(SourceEvent::Frame(Frame::new(index, timestamp, pixels)))
    }

    fn total_frames(&self) -> Option<u64> {
        self.reader.frame_count()
    }
}
