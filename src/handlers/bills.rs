//! Bill upload form handlers
//!
//! GET / renders the form, POST / accepts `invoice` and `receipt` uploads and
//! renders the extracted bill details.

use crate::handlers::AppState;
use crate::models::ImagePayload;
use crate::utils::error::{AppError, AppResult, ErrorContext};
use crate::utils::files::{allowed_extension, load_images, UploadDir};
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use minijinja::context;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Multipart fields accepted by the form
pub const BILL_FIELDS: &[&str] = &["invoice", "receipt"];

/// Data shown on the rendered page
#[derive(Debug, Default)]
pub struct BillPage {
    pub errors: Vec<String>,
    pub bill_details: Option<String>,
}

/// GET /
pub async fn show_form(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    render(&state, &BillPage::default())
}

/// POST /
pub async fn upload_bills(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> AppResult<Html<String>> {
    let dir = UploadDir::create(&state.settings.server.upload_folder)
        .await
        .storage_context("Failed to prepare upload directory")?;

    let result = process_uploads(&state, &dir, &mut multipart).await;

    let path = dir.path().to_path_buf();
    if let Err(e) = dir.remove().await {
        warn!("Failed to clean up {}: {:#}", path.display(), e);
    }

    render(&state, &result?)
}

async fn process_uploads(state: &AppState, dir: &UploadDir, multipart: &mut Multipart) -> AppResult<BillPage> {
    let mut page = BillPage::default();
    let mut saved: Vec<(String, PathBuf)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = match field.name() {
            Some(name) if BILL_FIELDS.contains(&name) => name.to_string(),
            _ => continue,
        };

        // only the first file of each field is used
        if !seen.insert(name.clone()) {
            debug!(field = %name, "Ignoring repeated upload field");
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            page.errors.push(format!("No file selected for {}", name));
            continue;
        }

        let Some(extension) = allowed_extension(&filename) else {
            page.errors.push(format!("File type not allowed for {}", name));
            continue;
        };

        let bytes = field.bytes().await.map_err(multipart_error)?;
        let path = dir
            .save(&name, &extension, &bytes)
            .await
            .storage_context("Failed to save upload")?;
        saved.push((name, path));
    }

    if saved.is_empty() {
        page.errors.push("No invoice or receipt".to_string());
        return Ok(page);
    }

    let mut invoice: Vec<ImagePayload> = Vec::new();
    let mut receipt: Vec<ImagePayload> = Vec::new();
    for (name, path) in saved {
        let images = match load_images(&path).await {
            Ok(images) => images,
            Err(e) => {
                warn!("Skipping unreadable {}: {:#}", name, e);
                page.errors.push(format!("Could not read {}", name));
                continue;
            }
        };
        if name == "invoice" {
            invoice.extend(images);
        } else {
            receipt.extend(images);
        }
    }

    if invoice.is_empty() && receipt.is_empty() {
        return Ok(page);
    }

    info!(invoice_pages = invoice.len(), receipt_pages = receipt.len(), "Bill uploads accepted");
    page.bill_details = Some(state.extractor.extract(&invoice, &receipt).await?);
    Ok(page)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(err.body_text())
    }
}

fn render(state: &AppState, page: &BillPage) -> AppResult<Html<String>> {
    let template = state
        .templates
        .get_template("index.html")
        .map_err(|e| AppError::Render(e.to_string()))?;

    template
        .render(context! {
            errors => page.errors,
            bill_details => page.bill_details,
        })
        .map(Html)
        .map_err(|e| AppError::Render(e.to_string()))
}
