//! Frame sources for the hazard pipeline.
//!
//! Every source implements `vision_core::interfaces::FrameSource`: a lazy pull of one
//! frame at a time. Decoding of video files and camera devices is delegated to a
//! `RawFrameReader`; the default reader drives an external `ffmpeg` process.

pub mod camera;
pub mod ffmpeg;
pub mod image_source;
pub mod kind;
pub mod reader;
pub mod stop;
pub mod video;

pub use camera::CameraSource;
pub use ffmpeg::{FfmpegConfig, FfmpegReader};
pub use image_source::ImageSource;
pub use kind::SourceKind;
pub use reader::{MemoryReader, RawFrameReader};
pub use stop::StopSignal;
pub use video::VideoSource;

pub mod prelude {
    pub use crate::{
        CameraSource, FfmpegConfig, FfmpegReader, ImageSource, MemoryReader, RawFrameReader,
        SourceKind, StopSignal, VideoSource,
    };
    pub use vision_core::interfaces::{CaptureError, FrameSource, SourceEvent};
}
