use crate::report::Report;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Report log columns, in file order.
pub const LOG_COLUMNS: [&str; 7] = [
    "Waktu",
    "Nama",
    "Alamat",
    "Link_Lokasi",
    "Deskripsi",
    "Kategori",
    "Path_Gambar",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `Path_Gambar` value for reports persisted without an image.
pub const IMAGE_PATH_SENTINEL: &str = "video_upload";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("unexpected header {found:?}")]
    Header { found: Vec<String> },
}

/// One row of the report log, as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    pub submitted_at: String,
    pub reporter_name: String,
    pub location_text: String,
    pub map_link: String,
    pub description: String,
    pub category: String,
    pub image_path: String,
}

impl LogRow {
    pub fn from_report(report: &Report, image_path: &str) -> Self {
        Self {
            submitted_at: report.submitted_at.format(TIMESTAMP_FORMAT).to_string(),
            reporter_name: report.reporter_name.clone(),
            location_text: report.location_text.clone(),
            map_link: report.map_link.clone(),
            description: report.description.clone(),
            category: report.category.label().to_string(),
            image_path: image_path.to_string(),
        }
    }

    /// Values in `LOG_COLUMNS` order.
    pub fn values(&self) -> [&str; 7] {
        [
            &self.submitted_at,
            &self.reporter_name,
            &self.location_text,
            &self.map_link,
            &self.description,
            &self.category,
            &self.image_path,
        ]
    }

    pub fn from_values(values: Vec<String>) -> Result<Self, SchemaError> {
        let found = values.len();
        let Ok(columns) = <[String; 7]>::try_from(values) else {
            return Err(SchemaError::ColumnCount {
                expected: LOG_COLUMNS.len(),
                found,
            });
        };
        let [
            submitted_at,
            reporter_name,
            location_text,
            map_link,
            description,
            category,
            image_path,
        ] = columns;
        Ok(Self {
            submitted_at,
            reporter_name,
            location_text,
            map_link,
            description,
            category,
            image_path,
        })
    }

    pub fn has_image(&self) -> bool {
        self.image_path != IMAGE_PATH_SENTINEL
    }
}

/// Check a parsed header against `LOG_COLUMNS`.
pub fn check_header(values: &[String]) -> Result<(), SchemaError> {
    if values.iter().map(String::as_str).eq(LOG_COLUMNS) {
        Ok(())
    } else {
        Err(SchemaError::Header {
            found: values.to_vec(),
        })
    }
}
