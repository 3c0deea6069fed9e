//! HTTP handlers module
//!
//! Bill upload form and health endpoints

pub mod bills;
pub mod health;

use crate::config::Settings;
use crate::models::ImagePayload;
use crate::providers::CompletionBackend;
use crate::services::{BillExtractor, ModelCatalog};
use crate::utils::files::mime_type_for;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::{routing::get, Router};
use minijinja::Environment;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Application state
pub struct AppState {
    pub settings: Settings,
    pub extractor: BillExtractor,
    pub templates: Environment<'static>,
}

/// Create application router
pub async fn create_router(
    settings: Settings,
    backend: Arc<dyn CompletionBackend>,
    catalog: Arc<ModelCatalog>,
) -> Result<Router> {
    let mut extractor = BillExtractor::new(backend, settings.session.default_model.clone())
        .with_catalog(catalog)
        .with_timeout(Duration::from_secs(settings.openai.timeout));

    if let Some(path) = &settings.server.bill_form_image {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read bill form image {}", path.display()))?;
        extractor = extractor.with_form_image(ImagePayload::from_bytes(mime_type_for(path), &bytes));
        info!("Bill form image loaded from {}", path.display());
    }

    let mut templates = Environment::new();
    templates
        .add_template("index.html", INDEX_TEMPLATE)
        .context("Failed to load page template")?;

    let max_upload_size = settings.server.max_upload_size;
    let app_state = Arc::new(AppState {
        settings,
        extractor,
        templates,
    });

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_size));

    let router = Router::new()
        .route("/", get(bills::show_form).post(bills::upload_bills))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .with_state(app_state)
        .layer(middleware_stack);

    Ok(router)
}
