//! Health check handlers
//!
//! Reports service status for the bill upload server

use crate::handlers::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::debug;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service name
    pub service: String,
    /// Version information
    pub version: String,
    /// Timestamp
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

/// Check result
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDetails {
    /// Model used for bill extraction
    pub model: String,
    /// Completion backend name
    pub backend: String,
    /// Whether a bill form screenshot is configured
    pub form_image: bool,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Resident memory in bytes (Linux only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_bytes: Option<u64>,
}

static START: OnceLock<Instant> = OnceLock::new();

/// Record the process start for uptime reporting
pub fn mark_started() {
    START.get_or_init(Instant::now);
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Executing health check");

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: Some(HealthDetails {
            model: state.extractor.model_id().to_string(),
            backend: state.extractor.backend_name().to_string(),
            form_image: state.extractor.has_form_image(),
            uptime_seconds: uptime_seconds(),
            resident_bytes: resident_bytes(),
        }),
    })
}

/// GET /health/live
pub async fn liveness_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive".to_string(),
        service: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: None,
    })
}

fn uptime_seconds() -> u64 {
    START.get_or_init(Instant::now).elapsed().as_secs()
}

fn resident_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        status
            .lines()
            .find(|line| line.starts_with("VmRSS:"))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb * 1024)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
