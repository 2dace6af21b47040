use capture::{SourceKind, StopSignal};
use chrono::{DateTime, Local};
use data_contracts::{validate_at, FieldError, ReportFields};
use inference::DetectorAdapter;
use report_store::{ReportSink, StoreError, StoreReceipt};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};
use vision_core::interfaces::{AnnotatedFrame, Detection, FrameSource, SourceEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Stopped,
    Persisted,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Streaming => "streaming",
            SessionState::Stopped => "stopped",
            SessionState::Persisted => "persisted",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stream stopped producing frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The source ran out of frames.
    Exhausted,
    /// An explicit stop was requested.
    Stopped,
    /// A read failed mid-stream; whatever was retained is kept.
    Error(String),
}

/// Result of a single `Session::tick`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Processed { index: u64, detections: usize },
    Skipped { index: u64 },
    InferenceFailed { index: u64 },
    Ended(StreamEnd),
    /// Nothing is streaming.
    Idle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Frames consumed from the source, including stride skips.
    pub pulled: u64,
    pub total: Option<u64>,
}

impl Progress {
    /// Completed share in `[0, 1]`, or `None` when the total is unknown.
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(total) if total > 0 => Some((self.pulled as f32 / total as f32).min(1.0)),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("a stream is already running; stop it first")]
    AlreadyStreaming,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("cannot submit a report while the session is {0}")]
    InvalidState(SessionState),
    #[error("no captured frame to attach; capture or upload a frame first")]
    NoCapturedFrame,
    #[error("report has {} invalid field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One reporting session.
pub struct Session {
    adapter: DetectorAdapter,
    stop: StopSignal,
    state: SessionState,
    source: Option<Box<dyn FrameSource + Send>>,
    kind: Option<SourceKind>,
    retained: Option<AnnotatedFrame>,
    last_detections: Vec<Detection>,
    progress: Progress,
    warning: Option<String>,
}

impl Session {
    pub fn new(adapter: DetectorAdapter) -> Self {
        Self {
            adapter,
            stop: StopSignal::new(),
            state: SessionState::Idle,
            source: None,
            kind: None,
            retained: None,
            last_detections: Vec::new(),
            progress: Progress::default(),
            warning: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The latest annotated frame, available for reporting.
    pub fn retained_frame(&self) -> Option<&AnnotatedFrame> {
        self.retained.as_ref()
    }

    pub fn last_detections(&self) -> &[Detection] {
        &self.last_detections
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Message of the read error that ended the last stream, if any.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Handle for requesting a stop from elsewhere; honored at the next frame boundary.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Begin streaming from `source`. Clears the retained frame and progress.
    pub fn start(
        &mut self,
        source: Box<dyn FrameSource + Send>,
        kind: SourceKind,
    ) -> Result<(), StartError> {
        if self.state == SessionState::Streaming {
            return Err(StartError::AlreadyStreaming);
        }
        self.stop.reset();
        self.progress = Progress {
            pulled: 0,
            total: source.total_frames(),
        };
        self.source = Some(source);
        self.kind = Some(kind);
        self.retained = None;
        self.last_detections.clear();
        self.warning = None;
        self.state = SessionState::Streaming;
        info!(kind = kind.as_str(), total = ?self.progress.total, "stream started");
        Ok(())
    }

    /// Pull and process one frame. A no-op outside `Streaming`.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != SessionState::Streaming {
            return TickOutcome::Idle;
        }
        if self.stop.is_stopped() {
            return self.finish(StreamEnd::Stopped);
        }
        let Some(source) = self.source.as_mut() else {
            return self.finish(StreamEnd::Exhausted);
        };
        match source.next_frame() {
            Ok(SourceEvent::Frame(frame)) => {
                let index = frame.index;
                self.progress.pulled += 1;
                match self.adapter.infer(frame) {
                    Ok(annotated) => {
                        let detections = annotated.detections.len();
                        self.last_detections = annotated.detections.clone();
                        self.retained = Some(annotated);
                        TickOutcome::Processed { index, detections }
                    }
                    Err(err) => {
                        warn!(frame = index, error = %err, "skipping frame");
                        TickOutcome::InferenceFailed { index }
                    }
                }
            }
            Ok(SourceEvent::Skipped { index }) => {
                self.progress.pulled += 1;
                TickOutcome::Skipped { index }
            }
            Ok(SourceEvent::End) if self.stop.is_stopped() => self.finish(StreamEnd::Stopped),
            Ok(SourceEvent::End) => self.finish(StreamEnd::Exhausted),
            Err(err) => {
                warn!(error = %err, "stream ended early");
                self.warning = Some(err.to_string());
                self.finish(StreamEnd::Error(err.to_string()))
            }
        }
    }

    /// Tick until the stream ends. Returns `None` when nothing was streaming.
    pub fn run_to_end(&mut self) -> Option<StreamEnd> {
        loop {
            match self.tick() {
                TickOutcome::Ended(end) => return Some(end),
                TickOutcome::Idle => return None,
                _ => {}
            }
        }
    }

    /// End the active stream and release its source. A no-op outside `Streaming`.
    pub fn stop(&mut self) {
        if self.state == SessionState::Streaming {
            self.stop.stop();
            self.finish(StreamEnd::Stopped);
        }
    }

    /// Validate and persist a report with the retained frame. Only valid once stopped.
    pub fn submit<S: ReportSink + ?Sized>(
        &mut self,
        fields: &ReportFields,
        sink: &mut S,
    ) -> Result<StoreReceipt, SubmitError> {
        self.submit_at(fields, Local::now(), sink)
    }

    /// `submit` with an explicit submission time.
    pub fn submit_at<S: ReportSink + ?Sized>(
        &mut self,
        fields: &ReportFields,
        at: DateTime<Local>,
        sink: &mut S,
    ) -> Result<StoreReceipt, SubmitError> {
        if self.state != SessionState::Stopped {
            return Err(SubmitError::InvalidState(self.state));
        }
        let needs_frame = self.kind.map_or(true, |k| k.requires_frame());
        if needs_frame && self.retained.is_none() {
            return Err(SubmitError::NoCapturedFrame);
        }
        let report = validate_at(fields, at).map_err(SubmitError::Validation)?;
        let receipt = sink.persist(&report, self.retained.as_ref())?;
        self.state = SessionState::Persisted;
        info!(
            category = %report.category,
            image = %receipt.image_path,
            "report submitted"
        );
        Ok(receipt)
    }

    /// Drop everything and return to `Idle`.
    pub fn reset(&mut self) {
        if self.state == SessionState::Streaming {
            self.stop.stop();
        }
        self.source = None;
        self.kind = None;
        self.retained = None;
        self.last_detections.clear();
        self.progress = Progress::default();
        self.warning = None;
        self.stop.reset();
        self.state = SessionState::Idle;
    }

    fn finish(&mut self, end: StreamEnd) -> TickOutcome {
        self.source = None;
        self.state = SessionState::Stopped;
        debug!(
            pulled = self.progress.pulled,
            retained = self.retained.is_some(),
            "stream closed: {end:?}"
        );
        TickOutcome::Ended(end)
    }
}
