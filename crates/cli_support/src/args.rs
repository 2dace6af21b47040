use clap::Args;
use data_contracts::ReportFields;
use std::path::PathBuf;

use crate::config::HazardConfig;

/// Report form flags. Supplying any of them requests a submission after the stream ends.
#[derive(Debug, Clone, Default, Args)]
pub struct ReportArgs {
    /// Reporter name (Nama).
    #[arg(long)]
    pub name: Option<String>,
    /// Street address or landmark (Alamat).
    #[arg(long)]
    pub location: Option<String>,
    /// Map share link, e.g. a Google Maps URL (Link_Lokasi).
    #[arg(long = "map-link")]
    pub map_link: Option<String>,
    /// What was found, at least 10 characters (Deskripsi).
    #[arg(long)]
    pub description: Option<String>,
    /// Pothole, "Speed Bump", "Patched Road" or Lainnya (Kategori).
    #[arg(long)]
    pub category: Option<String>,
}

impl ReportArgs {
    pub fn is_requested(&self) -> bool {
        [
            &self.name,
            &self.location,
            &self.map_link,
            &self.description,
            &self.category,
        ]
        .iter()
        .any(|v| v.is_some())
    }

    /// Form fields as typed; absent flags become empty strings for the validator to reject.
    pub fn to_fields(&self) -> Option<ReportFields> {
        if !self.is_requested() {
            return None;
        }
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        Some(ReportFields {
            reporter_name: field(&self.name),
            location_text: field(&self.location),
            map_link: field(&self.map_link),
            description: field(&self.description),
            category: field(&self.category),
        })
    }
}

/// Overrides for config-file paths shared by every mode.
#[derive(Debug, Clone, Default, Args)]
pub struct RuntimeArgs {
    /// Detector checkpoint (`.bin`), overriding the config file.
    #[arg(long)]
    pub weights: Option<PathBuf>,
    /// Reports root holding the log and the `gambar/` directory.
    #[arg(long)]
    pub reports_root: Option<PathBuf>,
}

impl RuntimeArgs {
    pub fn apply(&self, cfg: &mut HazardConfig) {
        if let Some(weights) = &self.weights {
            cfg.weights = weights.clone();
        }
        if let Some(root) = &self.reports_root {
            cfg.reports_root = root.clone();
        }
    }
}
