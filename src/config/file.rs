//! File-based configuration loading
//!
//! Loads the model price table from a JSON file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Model catalog file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Models in display order
    pub models: Vec<ModelEntry>,
}

/// One priced model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model identifier sent to the API
    pub id: String,

    /// Human readable name (defaults to the id)
    #[serde(default)]
    pub name: Option<String>,

    /// US dollars per one million prompt tokens
    #[serde(rename = "inputPerMillion")]
    pub input_per_million: f64,

    /// US dollars per one million completion tokens
    #[serde(rename = "outputPerMillion")]
    pub output_per_million: f64,
}

impl CatalogFile {
    /// Load catalog from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading model catalog from: {:?}", path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {:?}", path))?;

        let catalog: CatalogFile = serde_json::from_str(&content)
            .with_context(|| "Failed to parse catalog JSON")?;

        catalog.validate()?;

        debug!("Loaded {} models", catalog.models.len());
        Ok(catalog)
    }

    /// Load catalog from default locations
    /// Searches in order:
    /// 1. ~/.config/aichat/models.json
    /// 2. ./models.json
    ///
    /// Returns `None` when neither file exists.
    pub fn load_default() -> Result<Option<Self>> {
        for path in Self::default_paths() {
            if path.exists() {
                return Self::load(&path).map(Some);
            }
        }
        Ok(None)
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("aichat").join("models.json"));
        }
        paths.push(PathBuf::from("models.json"));
        paths
    }

    /// Validate catalog
    fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("At least one model must be configured");
        }

        let mut seen = HashSet::new();
        for entry in &self.models {
            if entry.id.trim().is_empty() {
                anyhow::bail!("Model id cannot be empty");
            }
            if !seen.insert(entry.id.as_str()) {
                anyhow::bail!("Duplicate model id '{}'", entry.id);
            }
            for (label, price) in [("input", entry.input_per_million), ("output", entry.output_per_million)] {
                if !price.is_finite() || price < 0.0 {
                    anyhow::bail!("Invalid {} price for model '{}': {}", label, entry.id, price);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_catalog() {
        let file = write_config(
            r#"{
                "models": [
                    {"id": "gpt-4o-mini", "name": "GPT-4o Mini", "inputPerMillion": 0.15, "outputPerMillion": 0.60},
                    {"id": "local-llama", "inputPerMillion": 0, "outputPerMillion": 0}
                ]
            }"#,
        );

        let catalog = CatalogFile::load(file.path()).unwrap();
        assert_eq!(catalog.models.len(), 2);
        assert_eq!(catalog.models[0].name.as_deref(), Some("GPT-4o Mini"));
        assert!(catalog.models[1].name.is_none());
    }

    #[test]
    fn test_validation_empty_models() {
        let file = write_config(r#"{"models": []}"#);
        assert!(CatalogFile::load(file.path()).is_err());
    }

    #[test]
    fn test_validation_duplicate_ids() {
        let file = write_config(
            r#"{"models": [
                {"id": "gpt-4o", "inputPerMillion": 2.5, "outputPerMillion": 10},
                {"id": "gpt-4o", "inputPerMillion": 2.5, "outputPerMillion": 10}
            ]}"#,
        );
        assert!(CatalogFile::load(file.path()).is_err());
    }

    #[test]
    fn test_validation_negative_price() {
        let file = write_config(
            r#"{"models": [{"id": "gpt-4o", "inputPerMillion": -1, "outputPerMillion": 10}]}"#,
        );
        let err = CatalogFile::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid input price"));
    }
}
