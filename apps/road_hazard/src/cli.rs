use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cli_support::{ReportArgs, RuntimeArgs};

#[derive(Debug, Parser)]
#[command(
    name = "road_hazard",
    about = "Detect potholes, speed bumps and patched road, then file a citizen report"
)]
pub struct AppArgs {
    #[command(flatten)]
    pub runtime: RuntimeArgs,
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Debug, Subcommand)]
pub enum Mode {
    /// Detect hazards in a single uploaded image (jpg, jpeg, png).
    Image {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Detect hazards in a video file (mp4, avi, mov).
    Video {
        path: PathBuf,
        /// Run detection on every Nth frame; defaults to the config value.
        #[arg(long)]
        stride: Option<u64>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Detect hazards on a live camera feed.
    Camera {
        /// Capture device index; defaults to the config value.
        #[arg(long)]
        device: Option<u32>,
        /// Stop after this many processed frames.
        #[arg(long)]
        max_frames: Option<u64>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

impl Mode {
    pub fn output(&self) -> &OutputArgs {
        match self {
            Mode::Image { output, .. }
            | Mode::Video { output, .. }
            | Mode::Camera { output, .. } => output,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct OutputArgs {
    /// Write the last annotated frame to this path.
    #[arg(long)]
    pub preview_out: Option<PathBuf>,
    #[command(flatten)]
    pub report: ReportArgs,
}
