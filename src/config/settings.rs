//! Application configuration settings
//!
//! Defines all configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// OpenAI API configuration
    pub openai: OpenAIConfig,
    /// Session configuration
    pub session: SessionConfig,
    /// Weather service configuration
    pub weather: WeatherConfig,
    /// Upload form server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// OpenAI API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Retries performed by the backend client
    pub max_retries: u32,
}

/// Conversation session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Default model identifier
    pub default_model: String,
    /// Maximum tool-call rounds per submission
    pub max_tool_rounds: u32,
}

/// OpenWeather configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API key, weather tool is unavailable without it
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
}

/// Upload form server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Directory receiving uploaded files
    pub upload_folder: PathBuf,
    /// Maximum upload body size in bytes
    pub max_upload_size: usize,
    /// Screenshot of the accounting bill form (optional)
    pub bill_form_image: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Settings {
    /// Create a new configuration instance
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let settings = Self {
            openai: OpenAIConfig {
                api_key: std::env::var("OPENAI_API_KEY")
                    .context("OPENAI_API_KEY environment variable not set")?,
                base_url: get_env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                timeout: get_env_or_default("REQUEST_TIMEOUT", "30")
                    .parse()
                    .context("Invalid timeout value")?,
                max_retries: get_env_or_default("MAX_RETRIES", "0")
                    .parse()
                    .context("Invalid retry count")?,
            },
            session: SessionConfig {
                default_model: get_env_or_default("DEFAULT_MODEL", "gpt-4o-mini"),
                max_tool_rounds: get_env_or_default("MAX_TOOL_ROUNDS", "8")
                    .parse()
                    .context("Invalid maximum tool rounds")?,
            },
            weather: WeatherConfig {
                api_key: std::env::var("OPEN_WEATHER_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                base_url: get_env_or_default(
                    "OPEN_WEATHER_BASE_URL",
                    "https://api.openweathermap.org/data/2.5",
                ),
            },
            server: ServerConfig {
                host: get_env_or_default("SERVER_HOST", "127.0.0.1"),
                port: get_env_or_default("SERVER_PORT", "5000")
                    .parse()
                    .context("Invalid port number")?,
                upload_folder: PathBuf::from(get_env_or_default("UPLOAD_FOLDER", "uploads")),
                max_upload_size: get_env_or_default("MAX_UPLOAD_SIZE", "20971520")
                    .parse()
                    .context("Invalid maximum upload size")?,
                bill_form_image: std::env::var("BILL_FORM_IMAGE").ok().map(PathBuf::from),
            },
            logging: LoggingConfig {
                level: get_env_or_default("RUST_LOG", "info"),
                format: get_env_or_default("LOG_FORMAT", "text"),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.is_empty() {
            anyhow::bail!("OpenAI API key cannot be empty");
        }

        if self.openai.api_key.contains(char::is_whitespace) {
            anyhow::bail!("OpenAI API key cannot contain whitespace characters");
        }

        if self.openai.api_key.len() < 8 {
            anyhow::bail!("OpenAI API key must be at least 8 characters long");
        }

        if !self.openai.base_url.starts_with("http") {
            anyhow::bail!("Invalid OpenAI base URL format, should start with 'http'");
        }

        if !self.weather.base_url.starts_with("http") {
            anyhow::bail!("Invalid OpenWeather base URL format, should start with 'http'");
        }

        if self.openai.timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        if self.session.max_tool_rounds == 0 {
            anyhow::bail!("Maximum tool rounds cannot be 0");
        }

        if self.server.port == 0 {
            anyhow::bail!("Port number cannot be 0");
        }

        if self.server.max_upload_size == 0 {
            anyhow::bail!("Maximum upload size cannot be 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Server listen address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get environment variable or default value
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
