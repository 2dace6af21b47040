use data_contracts::Category;
use image::codecs::jpeg::JpegEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use vision_core::interfaces::AnnotatedFrame;

pub const JPEG_QUALITY: u8 = 90;

/// Committed reports are world-readable, like files created through `File::create`.
#[cfg(unix)]
pub(crate) fn publish_mode(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
pub(crate) fn publish_mode(_file: &File) -> std::io::Result<()> {
    Ok(())
}

/// `<name>_<category>_<unix seconds>.jpg`, with the name reduced to filename-safe characters.
pub fn artifact_file_name(reporter_name: &str, category: Category, unix_secs: i64) -> String {
    let name: String = reporter_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = if name.is_empty() { "anon".to_string() } else { name };
    format!("{name}_{}_{unix_secs}.jpg", category.slug())
}

/// Encode the frame into a temporary file inside `dir`, fully synced, not yet visible
/// under its final name.
pub fn stage_jpeg(dir: &Path, frame: &AnnotatedFrame) -> std::io::Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(".pending-")
        .suffix(".jpg")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        frame
            .pixels()
            .write_with_encoder(encoder)
            .map_err(std::io::Error::other)?;
        writer.flush()?;
    }
    publish_mode(staged.as_file())?;
    staged.as_file().sync_all()?;
    Ok(staged)
}

/// Move a staged artifact to `target`, refusing to replace an existing file.
pub fn commit(staged: NamedTempFile, target: &Path) -> std::io::Result<PathBuf> {
    staged.persist_noclobber(target).map_err(|e| e.error)?;
    Ok(target.to_path_buf())
}
