use std::path::{Path, PathBuf};

use anyhow::Context;
use capture::FfmpegConfig;
use serde::Deserialize;

pub const CONFIG_ENV: &str = "ROAD_HAZARD_CONFIG";
pub const DEFAULT_CONFIG_NAME: &str = "road-hazard.toml";
pub const DEFAULT_VIDEO_STRIDE: u64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct HazardConfig {
    pub weights: PathBuf,
    pub reports_root: PathBuf,
    pub video_stride: u64,
    pub camera_device: u32,
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    pub log_filter: Option<String>,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            weights: PathBuf::from("best.bin"),
            reports_root: PathBuf::from("laporan"),
            video_stride: DEFAULT_VIDEO_STRIDE,
            camera_device: 0,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            log_filter: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct HazardConfigFile {
    weights: Option<String>,
    reports_root: Option<String>,
    video_stride: Option<u64>,
    camera_device: Option<u32>,
    ffmpeg_bin: Option<String>,
    ffprobe_bin: Option<String>,
    log_filter: Option<String>,
}

impl HazardConfig {
    /// `$ROAD_HAZARD_CONFIG` if set, else `road-hazard.toml` when present, else defaults.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_path(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_NAME);
        if local.exists() {
            return Self::from_path(local);
        }
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let file: HazardConfigFile = toml::from_str(raw)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: HazardConfigFile) -> Self {
        let defaults = Self::default();
        HazardConfig {
            weights: file
                .weights
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.weights),
            reports_root: file
                .reports_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.reports_root),
            video_stride: file.video_stride.unwrap_or(defaults.video_stride),
            camera_device: file.camera_device.unwrap_or(defaults.camera_device),
            ffmpeg_bin: file
                .ffmpeg_bin
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: file
                .ffprobe_bin
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.ffprobe_bin),
            log_filter: file.log_filter.filter(|f| !f.trim().is_empty()),
        }
    }

    pub fn ffmpeg(&self) -> FfmpegConfig {
        FfmpegConfig {
            ffmpeg_bin: self.ffmpeg_bin.clone(),
            ffprobe_bin: self.ffprobe_bin.clone(),
            ..FfmpegConfig::default()
        }
    }

    /// Problems worth reporting once logging is up.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.video_stride == 0 {
            out.push("video_stride is 0; treating it as 1".to_string());
        }
        if self.ffmpeg_bin.as_os_str().is_empty() {
            out.push("ffmpeg_bin is empty; video and camera input will fail".to_string());
        }
        if self.reports_root.as_os_str().is_empty() {
            out.push("reports_root is empty; reports go to the working directory".to_string());
        }
        out
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

/// Substitute `${VAR}` from the environment; unknown variables are left as written.
pub fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = &rest[start + 2..start + 2 + len];
        match std::env::var(key) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&rest[start..start + len + 3]),
        }
        rest = &rest[start + len + 3..];
    }
    out.push_str(rest);
    out
}
