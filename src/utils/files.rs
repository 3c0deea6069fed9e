//! Upload storage helpers
//!
//! Saves uploaded bills into a per-request directory, rasterises PDFs and
//! loads the resulting pages as image payloads.

use crate::models::ImagePayload;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// Accepted upload extensions
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// Lower-cased extension of `filename` if it is an accepted upload type
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// MIME type for an image or PDF path, by extension
pub fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Remove every file and directory inside `folder`, keeping the folder
///
/// Individual failures are logged and skipped.
pub async fn delete_files_in_folder(folder: &Path) -> Result<()> {
    let mut entries = fs::read_dir(folder)
        .await
        .with_context(|| format!("Failed to read {}", folder.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let result = match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => fs::remove_dir_all(&path).await,
            Ok(_) => fs::remove_file(&path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("Failed to delete {}: {}", path.display(), e);
        }
    }
    Ok(())
}

/// Render each page of a PDF to PNG next to it with `pdftoppm`
///
/// Returns page image paths in page order.
pub async fn convert_pdf_to_images(pdf_path: &Path) -> Result<Vec<PathBuf>> {
    let parent = pdf_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = pdf_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("PDF path has no file name")?;
    let prefix = format!("{}_page", stem);

    let output = Command::new("pdftoppm")
        .arg("-png")
        .arg(pdf_path)
        .arg(parent.join(&prefix))
        .output()
        .await
        .context("Failed to run pdftoppm (is poppler-utils installed?)")?;

    if !output.status.success() {
        bail!(
            "pdftoppm failed for {}: {}",
            pdf_path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    // pdftoppm writes {prefix}-N.png, zero-padding N to the page count width
    let mut pages = Vec::new();
    let mut entries = fs::read_dir(parent).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&format!("{}-", prefix)) && name.ends_with(".png") {
            pages.push(entry.path());
        }
    }
    pages.sort();

    debug!(pdf = %pdf_path.display(), pages = pages.len(), "Converted PDF to images");
    Ok(pages)
}

/// Load an uploaded file as images: PDFs page by page, images as-is
pub async fn load_images(path: &Path) -> Result<Vec<ImagePayload>> {
    let pages = if mime_type_for(path) == "application/pdf" {
        convert_pdf_to_images(path).await?
    } else {
        vec![path.to_path_buf()]
    };

    let mut images = Vec::with_capacity(pages.len());
    for page in pages {
        let bytes = fs::read(&page)
            .await
            .with_context(|| format!("Failed to read {}", page.display()))?;
        images.push(ImagePayload::from_bytes(mime_type_for(&page), &bytes));
    }
    Ok(images)
}

/// Directory holding one request's uploads
///
/// Removed by `remove`, or on drop if the request never got that far.
#[derive(Debug)]
pub struct UploadDir {
    path: PathBuf,
    removed: bool,
}

impl UploadDir {
    /// Create a fresh uniquely named directory under `root`
    pub async fn create(root: &Path) -> Result<Self> {
        let path = root.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self { path, removed: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save an upload as `{field}.{extension}`
    pub async fn save(&self, field: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path.join(format!("{}.{}", field, extension));
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to save {}", path.display()))?;
        debug!(file = %path.display(), size = bytes.len(), "Saved upload");
        Ok(path)
    }

    /// Delete the directory and everything in it
    pub async fn remove(mut self) -> Result<()> {
        fs::remove_dir_all(&self.path)
            .await
            .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        self.removed = true;
        Ok(())
    }
}

impl Drop for UploadDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(dir = %self.path.display(), "Removed abandoned upload directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clean up {}: {}", self.path.display(), e),
        }
    }
}
