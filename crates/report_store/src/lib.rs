//! Report store: annotated image artifacts plus an append-only CSV log.
//!
//! Layout under the reports root (default `laporan/`):
//! - `database_laporan.csv`: header row, then one row per report.
//! - `gambar/`: JPEG artifacts referenced from the `Path_Gambar` column.

pub mod artifact;
pub mod csv_log;
pub mod store;

pub use store::{
    ReportSink, ReportStore, StoreError, StoreReceipt, DEFAULT_ROOT, IMAGES_DIR, LOG_FILE,
};

pub mod prelude {
    pub use crate::store::{ReportSink, ReportStore, StoreError, StoreReceipt};
}
