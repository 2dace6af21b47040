//! Shared data contracts for citizen reports and the report log.

pub mod record;
pub mod report;
pub mod validation;

pub use record::{
    check_header, LogRow, SchemaError, IMAGE_PATH_SENTINEL, LOG_COLUMNS, TIMESTAMP_FORMAT,
};
pub use report::{Category, Report, ReportFields};
pub use validation::{
    validate, validate_at, Field, FieldError, MAP_LINK_MARKERS, MIN_DESCRIPTION_CHARS,
};
