//! Report form validation.
//!
//! Rule classes run in order (required fields, map link, description, category) and
//! stop at the first failing class; errors within a class are all reported.

use crate::report::{Category, Report, ReportFields};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Substrings identifying a map share link. Matched case-insensitively; never fetched.
pub const MAP_LINK_MARKERS: [&str; 2] = ["maps", "goo.gl"];
pub const MIN_DESCRIPTION_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    ReporterName,
    LocationText,
    MapLink,
    Description,
    Category,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ReporterName => "name",
            Field::LocationText => "location",
            Field::MapLink => "map link",
            Field::Description => "description",
            Field::Category => "category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} is required")]
    Missing(Field),
    #[error("map link is not a map share link (expected one of: maps, goo.gl)")]
    NotAMapLink,
    #[error("description too short: {len} characters, at least {min} required")]
    DescriptionTooShort { len: usize, min: usize },
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
}

impl FieldError {
    pub fn field(&self) -> Field {
        match self {
            FieldError::Missing(field) => *field,
            FieldError::NotAMapLink => Field::MapLink,
            FieldError::DescriptionTooShort { .. } => Field::Description,
            FieldError::UnknownCategory(_) => Field::Category,
        }
    }
}

pub fn is_map_link(link: &str) -> bool {
    let lower = link.to_lowercase();
    MAP_LINK_MARKERS.iter().any(|m| lower.contains(m))
}

/// Validate form input, stamping the report with the current local time.
pub fn validate(fields: &ReportFields) -> Result<Report, Vec<FieldError>> {
    validate_at(fields, Local::now())
}

pub fn validate_at(
    fields: &ReportFields,
    submitted_at: DateTime<Local>,
) -> Result<Report, Vec<FieldError>> {
    let reporter_name = fields.reporter_name.trim();
    let location_text = fields.location_text.trim();
    let map_link = fields.map_link.trim();
    let description = fields.description.trim();

    let missing: Vec<FieldError> = [
        (Field::ReporterName, reporter_name),
        (Field::LocationText, location_text),
        (Field::MapLink, map_link),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(field, _)| FieldError::Missing(field))
    .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    if !is_map_link(map_link) {
        return Err(vec![FieldError::NotAMapLink]);
    }

    let len = description.chars().count();
    if len < MIN_DESCRIPTION_CHARS {
        return Err(vec![FieldError::DescriptionTooShort {
            len,
            min: MIN_DESCRIPTION_CHARS,
        }]);
    }

    let Some(category) = Category::parse(&fields.category) else {
        return Err(vec![FieldError::UnknownCategory(
            fields.category.trim().to_string(),
        )]);
    };

    Ok(Report {
        submitted_at,
        reporter_name: reporter_name.to_string(),
        location_text: location_text.to_string(),
        map_link: map_link.to_string(),
        description: description.to_string(),
        category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_link_markers_are_case_insensitive() {
        assert!(is_map_link("https://MAPS.app.goo.gl/xyz"));
        assert!(is_map_link("https://GOO.GL/abc"));
        assert!(!is_map_link("http://example.com"));
    }

    #[test]
    fn field_error_names_its_field() {
        assert_eq!(FieldError::NotAMapLink.field(), Field::MapLink);
        assert_eq!(
            FieldError::Missing(Field::LocationText).to_string(),
            "location is required"
        );
    }
}
