use anyhow::Context;
use capture::{CameraSource, ImageSource, SourceKind, StopSignal, VideoSource};
use cli_support::{init_tracing, HazardConfig};
use inference::{DetectorAdapter, InferenceFactory};
use pipeline::{Session, StreamEnd, SubmitError, TickOutcome};
use report_store::ReportStore;
use std::future::Future;
use std::thread::JoinHandle;
use tracing::{error, info, warn};
use vision_core::interfaces::{CaptureError, FrameSource};

use crate::cli::{AppArgs, Mode, OutputArgs};

type BoxedSource = Box<dyn FrameSource + Send>;

/// Run one mode end to end. Only configuration and model loading are fatal.
pub fn run_app(args: AppArgs) -> anyhow::Result<()> {
    let mut cfg = HazardConfig::load()?;
    args.runtime.apply(&mut cfg);
    init_tracing(cfg.log_filter.as_deref());
    for warning in cfg.warnings() {
        warn!("config: {warning}");
    }

    let detector = InferenceFactory
        .load(&cfg.weights)
        .with_context(|| format!("loading detector weights {}", cfg.weights.display()))?;
    let mut session = Session::new(DetectorAdapter::new(detector));

    let (source, kind) = match open_source(&args.mode, &cfg, session.stop_signal()) {
        Ok(opened) => opened,
        Err(err) => {
            error!("{err}");
            println!("Could not open input: {err}");
            return Ok(());
        }
    };
    if let Err(err) = session.start(source, kind) {
        println!("{err}");
        return Ok(());
    }
    if let Err(err) = watch_interrupt(session.stop_signal()) {
        warn!(error = %err, "Ctrl-C will not stop the stream");
    }

    let max_frames = match &args.mode {
        Mode::Camera { max_frames, .. } => *max_frames,
        _ => None,
    };
    drive(&mut session, max_frames);
    finish(&mut session, args.mode.output(), &cfg);
    Ok(())
}

/// Raise the stop signal on the first Ctrl-C. A second one aborts the process.
fn watch_interrupt(stop: StopSignal) -> std::io::Result<JoinHandle<()>> {
    spawn_stop_watcher(stop, tokio::signal::ctrl_c, || std::process::exit(130))
}

fn spawn_stop_watcher<F, Fut, A>(
    stop: StopSignal,
    mut interrupt: F,
    abort: A,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = std::io::Result<()>>,
    A: FnOnce() + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(std::thread::spawn(move || {
        runtime.block_on(async move {
            if let Err(err) = interrupt().await {
                warn!(error = %err, "interrupt listener unavailable");
                return;
            }
            info!("interrupt received, stopping stream");
            stop.stop();
            if interrupt().await.is_ok() {
                warn!("second interrupt, aborting");
                abort();
            }
        })
    }))
}

fn open_source(
    mode: &Mode,
    cfg: &HazardConfig,
    stop: StopSignal,
) -> Result<(BoxedSource, SourceKind), CaptureError> {
    match mode {
        Mode::Image { path, .. } => {
            expect_kind(path, SourceKind::Image)?;
            Ok((Box::new(ImageSource::from_path(path)?), SourceKind::Image))
        }
        Mode::Video { path, stride, .. } => {
            expect_kind(path, SourceKind::Video)?;
            let stride = stride.unwrap_or(cfg.video_stride);
            let source = VideoSource::from_path(path, stride, &cfg.ffmpeg())?;
            Ok((Box::new(source), SourceKind::Video))
        }
        Mode::Camera { device, .. } => {
            let device = device.unwrap_or(cfg.camera_device);
            let source = CameraSource::open(device, &cfg.ffmpeg(), stop)?;
            Ok((Box::new(source), SourceKind::Camera))
        }
    }
}

fn expect_kind(path: &std::path::Path, wanted: SourceKind) -> Result<(), CaptureError> {
    if SourceKind::from_path(path)? == wanted {
        Ok(())
    } else {
        Err(CaptureError::UnsupportedUpload(format!(
            "{} is not a {} file",
            path.display(),
            wanted.as_str()
        )))
    }
}

fn drive(session: &mut Session, max_frames: Option<u64>) {
    let mut processed = 0u64;
    loop {
        match session.tick() {
            TickOutcome::Processed { index, detections } => {
                processed += 1;
                let pct = session
                    .progress()
                    .fraction()
                    .map(|f| format!("{:>3.0}%", f * 100.0))
                    .unwrap_or_else(|| "live".to_string());
                println!("[{pct}] frame {index}: {detections} hazard(s)");
                for det in session.last_detections() {
                    println!("    {} {:.2}", det.label, det.confidence);
                }
                if max_frames.is_some_and(|max| processed >= max) {
                    session.stop();
                }
            }
            TickOutcome::Skipped { .. } => {}
            TickOutcome::InferenceFailed { index } => {
                println!("frame {index}: skipped, detection failed");
            }
            TickOutcome::Ended(end) => {
                match end {
                    StreamEnd::Exhausted => info!(processed, "stream finished"),
                    StreamEnd::Stopped => info!(processed, "stream stopped"),
                    StreamEnd::Error(msg) => println!("Stream ended early: {msg}"),
                }
                return;
            }
            TickOutcome::Idle => return,
        }
    }
}

fn finish(session: &mut Session, output: &OutputArgs, cfg: &HazardConfig) {
    if let (Some(path), Some(frame)) = (&output.preview_out, session.retained_frame()) {
        match frame.pixels().save(path) {
            Ok(()) => println!("Annotated frame written to {}", path.display()),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to write preview"),
        }
    }

    let Some(fields) = output.report.to_fields() else {
        return;
    };
    let mut store = match ReportStore::open(&cfg.reports_root) {
        Ok(store) => store,
        Err(err) => {
            println!("Report store unavailable: {err}");
            return;
        }
    };
    match session.submit(&fields, &mut store) {
        Ok(receipt) => {
            println!("Report saved ({})", receipt.image_path);
            if let Ok(rows) = store.read_rows() {
                println!("{} report(s) in {}", rows.len(), receipt.log_path.display());
            }
        }
        Err(SubmitError::Validation(errors)) => {
            println!("Report not saved, please correct:");
            for err in errors {
                println!("  - {err}");
            }
        }
        Err(err) => println!("Report not saved: {err}"),
    }
}
