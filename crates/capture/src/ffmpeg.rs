use crate::reader::RawFrameReader;
use image::RgbImage;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, warn};
use vision_core::interfaces::CaptureError;

/// Locations of the external decoder binaries and camera capture size.
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    pub camera_size: (u32, u32),
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            camera_size: (640, 480),
        }
    }
}

/// Reads `rgb24` raw frames from an `ffmpeg` child process.
///
/// The child is killed and reaped on drop, releasing the file or device it holds.
pub struct FfmpegReader {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    frame_count: Option<u64>,
}

#[derive(Debug, PartialEq, Eq)]
struct ProbeInfo {
    width: u32,
    height: u32,
    frames: Option<u64>,
}

impl FfmpegReader {
    pub fn open_file(path: &Path, cfg: &FfmpegConfig) -> Result<Self, CaptureError> {
        if !path.exists() {
            return Err(CaptureError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(ErrorKind::NotFound, "video file missing"),
            });
        }
        let probe = probe(path, cfg)?;
        debug!(path = %path.display(), ?probe, "video probed");
        let cmd = file_command(path, probe.width, probe.height, cfg);
        Self::spawn(cmd, probe.width, probe.height, probe.frames)
    }

    pub fn open_camera(device_index: u32, cfg: &FfmpegConfig) -> Result<Self, CaptureError> {
        let (w, h) = cfg.camera_size;
        let (format, input) = camera_input(device_index);
        let mut cmd = Command::new(&cfg.ffmpeg_bin);
        cmd.args(["-v", "error", "-nostdin", "-f", format])
            .args(["-video_size", &format!("{w}x{h}")])
            .args(["-i", &input])
            .args(["-vf", &format!("scale={w}:{h}")])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]);
        Self::spawn(cmd, w, h, None)
    }

    fn spawn(
        mut cmd: Command,
        width: u32,
        height: u32,
        frame_count: Option<u64>,
    ) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::Process(format!(
                "invalid frame size {width}x{height}"
            )));
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        // Keep terminal Ctrl-C away from the decoder; the caller decides when it stops.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let program = cmd.get_program().to_string_lossy().into_owned();
        let mut child = cmd
            .spawn()
            .map_err(|e| CaptureError::Process(format!("failed to launch {program}: {e}")))?;
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CaptureError::Process("decoder stdout unavailable".into()));
        };
        Ok(Self {
            child,
            stdout,
            width,
            height,
            frame_count,
        })
    }
}

impl RawFrameReader for FfmpegReader {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        let len = self.width as usize * self.height as usize * 3;
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CaptureError::Process(format!("decoder read failed: {e}"))),
            }
        }
        if filled == 0 {
            let status = self
                .child
                .wait()
                .map_err(|e| CaptureError::Process(format!("decoder wait failed: {e}")))?;
            if !status.success() {
                return Err(CaptureError::Process(format!("decoder exited with {status}")));
            }
            return Ok(None);
        }
        if filled < len {
            warn!(filled, expected = len, "truncated frame from decoder");
            return Err(CaptureError::Process("truncated frame".into()));
        }
        RgbImage::from_raw(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| CaptureError::Process("frame buffer size mismatch".into()))
    }

    fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Decode at the coded size reported by ffprobe. Display-matrix rotation is ignored so the output
/// geometry always matches `width` x `height`.
fn file_command(path: &Path, width: u32, height: u32, cfg: &FfmpegConfig) -> Command {
    let mut cmd = Command::new(&cfg.ffmpeg_bin);
    cmd.args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
        .arg(path)
        .args(["-vf", &format!("scale={width}:{height}")])
        .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]);
    cmd
}

fn camera_input(device_index: u32) -> (&'static str, String) {
    if cfg!(target_os = "macos") {
        ("avfoundation", device_index.to_string())
    } else if cfg!(target_os = "windows") {
        ("vfwcap", device_index.to_string())
    } else {
        ("v4l2", format!("/dev/video{device_index}"))
    }
}

fn probe(path: &Path, cfg: &FfmpegConfig) -> Result<ProbeInfo, CaptureError> {
    let output = Command::new(&cfg.ffprobe_bin)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=width,height,nb_read_packets",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            CaptureError::Process(format!(
                "failed to launch {}: {e}",
                cfg.ffprobe_bin.display()
            ))
        })?;
    if !output.status.success() {
        return Err(CaptureError::Process(format!(
            "ffprobe exited with {} for {}",
            output.status,
            path.display()
        )));
    }
    parse_probe(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| CaptureError::Process(format!("no video stream in {}", path.display())))
}

/// Parse `width,height[,frames]` as printed by ffprobe's csv writer.
fn parse_probe(raw: &str) -> Option<ProbeInfo> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let mut parts = line.split(',').map(str::trim);
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    let frames = parts.next().and_then(|v| v.parse().ok());
    Some(ProbeInfo {
        width,
        height,
        frames,
    })
}
