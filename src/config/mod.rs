//! Configuration management module
//!
//! Responsible for loading and managing application configuration, including environment variables and the model catalog file.

pub mod file;
pub mod settings;

pub use file::{CatalogFile, ModelEntry};
pub use settings::Settings;
