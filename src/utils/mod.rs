//! Utilities module
//!
//! Contains error handling, logging helpers and upload storage

pub mod error;
pub mod files;
pub mod logging;
