use crate::artifact::{artifact_file_name, commit, publish_mode, stage_jpeg};
use crate::csv_log::{encode_record, parse_records};
use data_contracts::{
    check_header, LogRow, Report, SchemaError, IMAGE_PATH_SENTINEL, LOG_COLUMNS,
};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use vision_core::interfaces::AnnotatedFrame;

pub const DEFAULT_ROOT: &str = "laporan";
pub const LOG_FILE: &str = "database_laporan.csv";
pub const IMAGES_DIR: &str = "gambar";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to prepare report directory {path}: {source}")]
    Layout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write image artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append report log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("report log {path} does not match the expected schema: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
    #[error("report log {path} is malformed: {msg}")]
    Malformed { path: PathBuf, msg: String },
}

/// What a successful persist committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReceipt {
    /// Artifact path as written to the log, or the no-image sentinel.
    pub image_path: String,
    pub log_path: PathBuf,
    pub row: LogRow,
}

impl StoreReceipt {
    pub fn has_image(&self) -> bool {
        self.row.has_image()
    }
}

/// Destination for validated reports.
pub trait ReportSink {
    fn persist(
        &mut self,
        report: &Report,
        frame: Option<&AnnotatedFrame>,
    ) -> Result<StoreReceipt, StoreError>;
}

/// File-backed report store rooted at a reports directory.
#[derive(Debug)]
pub struct ReportStore {
    root: PathBuf,
    // Last timestamp used in an artifact name; names never go back in time.
    last_stamp: i64,
}

impl ReportStore {
    /// Create the directory tree if absent and check any existing log's header.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            root: root.into(),
            last_stamp: i64::MIN,
        };
        let images = store.images_dir();
        fs::create_dir_all(&images).map_err(|source| StoreError::Layout {
            path: images.clone(),
            source,
        })?;
        if store.log_path().exists() {
            let rows = store.read_rows()?;
            debug!(
                log = %store.log_path().display(),
                rows = rows.len(),
                "existing report log verified"
            );
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    /// All committed rows in submission order. A missing log has no rows.
    pub fn read_rows(&self) -> Result<Vec<LogRow>, StoreError> {
        let path = self.log_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Log { path, source }),
        };
        let schema_err = |source| StoreError::Schema {
            path: path.clone(),
            source,
        };
        let mut records = parse_records(&raw)
            .map_err(|msg| StoreError::Malformed {
                path: path.clone(),
                msg,
            })?
            .into_iter();
        let header = records.next().unwrap_or_default();
        check_header(&header).map_err(schema_err)?;
        records
            .map(|values| LogRow::from_values(values).map_err(schema_err))
            .collect()
    }

    fn next_stamp(&mut self, report: &Report) -> i64 {
        let stamp = report.submitted_at.timestamp().max(self.last_stamp);
        self.last_stamp = stamp;
        stamp
    }

    fn write_artifact(
        &mut self,
        report: &Report,
        frame: &AnnotatedFrame,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.images_dir();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Layout {
            path: dir.clone(),
            source,
        })?;
        let stamp = self.next_stamp(report);
        let target = dir.join(artifact_file_name(
            &report.reporter_name,
            report.category,
            stamp,
        ));
        let artifact_err = |source| StoreError::Artifact {
            path: target.clone(),
            source,
        };
        let staged = stage_jpeg(&dir, frame).map_err(artifact_err)?;
        commit(staged, &target).map_err(artifact_err)
    }

    /// Append one encoded row. The first row creates the log together with its header.
    fn append(&self, line: &str) -> Result<(), StoreError> {
        let log_path = self.log_path();
        let log_err = |source| StoreError::Log {
            path: log_path.clone(),
            source,
        };
        if !log_path.exists() {
            let mut staged = tempfile::Builder::new()
                .prefix(".pending-")
                .suffix(".csv")
                .tempfile_in(&self.root)
                .map_err(log_err)?;
            let mut first = encode_record(LOG_COLUMNS);
            first.push_str(line);
            staged.write_all(first.as_bytes()).map_err(log_err)?;
            publish_mode(staged.as_file()).map_err(log_err)?;
            staged.as_file().sync_all().map_err(log_err)?;
            match staged.persist_noclobber(&log_path) {
                Ok(_) => return Ok(()),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!(
                        log = %log_path.display(),
                        "report log created concurrently; appending"
                    );
                }
                Err(e) => return Err(log_err(e.error)),
            }
        }
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&log_path)
            .map_err(log_err)?;
        let len = file.metadata().map_err(log_err)?.len();
        let mut record = String::with_capacity(line.len() + 1);
        if !ends_with_newline(&mut file, len).map_err(log_err)? {
            record.push('\n');
        }
        record.push_str(line);
        if let Err(err) = file.write_all(record.as_bytes()) {
            // Drop a partial row so the next append starts on a clean record.
            if let Err(e) = file.set_len(len) {
                warn!(log = %log_path.display(), error = %e, "failed to roll back partial row");
            }
            return Err(log_err(err));
        }
        file.sync_data().map_err(log_err)
    }
}

/// An empty log counts as terminated.
fn ends_with_newline(file: &mut File, len: u64) -> std::io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

impl ReportSink for ReportStore {
    fn persist(
        &mut self,
        report: &Report,
        frame: Option<&AnnotatedFrame>,
    ) -> Result<StoreReceipt, StoreError> {
        let artifact = match frame {
            Some(frame) => Some(self.write_artifact(report, frame)?),
            None => None,
        };
        let image_path = artifact
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| IMAGE_PATH_SENTINEL.to_string());
        let row = LogRow::from_report(report, &image_path);

        if let Err(err) = self.append(&encode_record(row.values())) {
            if let Some(path) = &artifact {
                if let Err(e) = fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to remove orphaned artifact");
                }
            }
            return Err(err);
        }

        info!(
            category = %report.category,
            image = %image_path,
            "report stored"
        );
        Ok(StoreReceipt {
            image_path,
            log_path: self.log_path(),
            row,
        })
    }
}
