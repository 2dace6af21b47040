use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hazard category selectable on the report form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Pothole,
    SpeedBump,
    PatchedRoad,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Pothole,
        Category::SpeedBump,
        Category::PatchedRoad,
        Category::Other,
    ];

    /// Label written to the `Kategori` column and shown on the form.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Pothole => "Pothole",
            Category::SpeedBump => "Speed Bump",
            Category::PatchedRoad => "Patched Road",
            Category::Other => "Lainnya",
        }
    }

    /// Filename-safe form of the label.
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Pothole => "Pothole",
            Category::SpeedBump => "Speed_Bump",
            Category::PatchedRoad => "Patched_Road",
            Category::Other => "Lainnya",
        }
    }

    /// Parse a form value. Case, spaces, underscores and hyphens are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "pothole" => Some(Category::Pothole),
            "speedbump" => Some(Category::SpeedBump),
            "patchedroad" => Some(Category::PatchedRoad),
            "other" | "lainnya" => Some(Category::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw report form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFields {
    pub reporter_name: String,
    pub location_text: String,
    pub map_link: String,
    pub description: String,
    pub category: String,
}

/// A validated citizen report, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Set when validation succeeded.
    pub submitted_at: DateTime<Local>,
    pub reporter_name: String,
    pub location_text: String,
    pub map_link: String,
    pub description: String,
    pub category: Category,
}

impl Report {
    /// Project back to form input.
    pub fn to_fields(&self) -> ReportFields {
        ReportFields {
            reporter_name: self.reporter_name.clone(),
            location_text: self.location_text.clone(),
            map_link: self.map_link.clone(),
            description: self.description.clone(),
            category: self.category.label().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_accepts_form_spellings() {
        assert_eq!(Category::parse("Speed Bump"), Some(Category::SpeedBump));
        assert_eq!(Category::parse("speed_bump"), Some(Category::SpeedBump));
        assert_eq!(Category::parse("PatchedRoad"), Some(Category::PatchedRoad));
        assert_eq!(Category::parse("Lainnya"), Some(Category::Other));
        assert_eq!(Category::parse("other"), Some(Category::Other));
        assert_eq!(Category::parse("crack"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn labels_parse_back() {
        for cat in Category::ALL {
            assert_eq!(Category::parse(cat.label()), Some(cat));
            assert_eq!(Category::parse(cat.slug()), Some(cat));
        }
    }
}
