//! Model catalog
//!
//! Fixed table of model identifiers and per-token prices

use crate::config::CatalogFile;
use crate::utils::error::{SessionError, SessionResult};
use anyhow::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::info;

const PER_MILLION: f64 = 1_000_000.0;

/// A model identifier with its pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: String,
    pub name: String,
    /// US dollars per prompt token
    pub input_price: f64,
    /// US dollars per completion token
    pub output_price: f64,
}

impl ModelProfile {
    /// Build a profile from per-million-token prices
    pub fn per_million(id: &str, name: &str, input: f64, output: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            input_price: input / PER_MILLION,
            output_price: output / PER_MILLION,
        }
    }

    /// Cost of the given token counts
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        self.input_price * prompt_tokens as f64 + self.output_price * completion_tokens as f64
    }
}

static BUILTIN_PROFILES: Lazy<Vec<ModelProfile>> = Lazy::new(|| {
    vec![
        ModelProfile::per_million("gpt-4o-mini", "GPT-4o Mini", 0.15, 0.60),
        ModelProfile::per_million("gpt-4o", "GPT-4o", 2.50, 10.00),
        ModelProfile::per_million("gpt-4o-2024-08-06", "GPT-4o 2024-08-06", 2.50, 10.00),
        ModelProfile::per_million("o1-mini", "o1 Mini", 3.00, 12.00),
    ]
});

/// Queryable set of model profiles, immutable once built
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    profiles: Vec<ModelProfile>,
}

impl ModelCatalog {
    /// Catalog with the built-in OpenAI prices
    pub fn builtin() -> Self {
        Self {
            profiles: BUILTIN_PROFILES.clone(),
        }
    }

    pub fn from_profiles(profiles: Vec<ModelProfile>) -> Self {
        Self { profiles }
    }

    pub fn from_file(file: CatalogFile) -> Self {
        let profiles = file
            .models
            .into_iter()
            .map(|entry| {
                let name = entry.name.unwrap_or_else(|| entry.id.clone());
                ModelProfile::per_million(&entry.id, &name, entry.input_per_million, entry.output_per_million)
            })
            .collect();
        Self { profiles }
    }

    /// Catalog file from the default locations, or the built-in table
    pub fn load_default() -> Result<Self> {
        match CatalogFile::load_default()? {
            Some(file) => Ok(Self::from_file(file)),
            None => {
                info!("No model catalog file found, using built-in prices");
                Ok(Self::builtin())
            }
        }
    }

    /// Look up a profile
    pub fn get(&self, model_id: &str) -> SessionResult<&ModelProfile> {
        self.profiles
            .iter()
            .find(|profile| profile.id == model_id)
            .ok_or_else(|| SessionError::UnknownModel(model_id.to_string()))
    }

    /// Profile by 1-based menu number
    pub fn select(&self, number: usize) -> SessionResult<&ModelProfile> {
        number
            .checked_sub(1)
            .and_then(|index| self.profiles.get(index))
            .ok_or_else(|| SessionError::UnknownModel(format!("#{}", number)))
    }

    /// Price of the given usage for a model
    pub fn price_of(&self, model_id: &str, prompt_tokens: u64, completion_tokens: u64) -> SessionResult<f64> {
        Ok(self.get(model_id)?.cost(prompt_tokens, completion_tokens))
    }

    /// Profiles in display order
    pub fn profiles(&self) -> &[ModelProfile] {
        &self.profiles
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.get(model_id).is_ok()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
