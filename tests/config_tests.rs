//! Configuration module unit tests

use aichat::config::settings::{LoggingConfig, OpenAIConfig, ServerConfig, SessionConfig, Settings, WeatherConfig};
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;

// environment variables are process-wide
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "REQUEST_TIMEOUT",
    "MAX_RETRIES",
    "DEFAULT_MODEL",
    "MAX_TOOL_ROUNDS",
    "OPEN_WEATHER_API_KEY",
    "OPEN_WEATHER_BASE_URL",
    "SERVER_HOST",
    "SERVER_PORT",
    "UPLOAD_FOLDER",
    "MAX_UPLOAD_SIZE",
    "BILL_FORM_IMAGE",
    "RUST_LOG",
    "LOG_FORMAT",
];

/// Setup test environment variables
fn setup_test_env() {
    cleanup_test_env();
    env::set_var("OPENAI_API_KEY", "sk-test-key-12345678901234567890");
}

/// Clean up test environment variables
fn cleanup_test_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    setup_test_env();
    for (key, value) in vars {
        env::set_var(key, value);
    }
    let result = f();
    cleanup_test_env();
    result
}

fn valid_settings() -> Settings {
    Settings {
        openai: OpenAIConfig {
            api_key: "sk-test-key-12345678901234567890".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: 30,
            max_retries: 0,
        },
        session: SessionConfig {
            default_model: "gpt-4o-mini".to_string(),
            max_tool_rounds: 8,
        },
        weather: WeatherConfig {
            api_key: None,
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            upload_folder: PathBuf::from("uploads"),
            max_upload_size: 20 * 1024 * 1024,
            bill_form_image: None,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: "text".to_string(),
        },
    }
}

#[test]
fn test_default_values() {
    let settings = with_env(&[], Settings::new).unwrap();

    assert_eq!(settings.openai.base_url, "https://api.openai.com/v1");
    assert_eq!(settings.openai.timeout, 30);
    assert_eq!(settings.openai.max_retries, 0);
    assert_eq!(settings.session.default_model, "gpt-4o-mini");
    assert_eq!(settings.session.max_tool_rounds, 8);
    assert!(settings.weather.api_key.is_none());
    assert_eq!(settings.server_addr(), "127.0.0.1:5000");
    assert_eq!(settings.server.upload_folder, PathBuf::from("uploads"));
    assert_eq!(settings.server.max_upload_size, 20 * 1024 * 1024);
    assert_eq!(settings.logging.level, "info");
    assert_eq!(settings.logging.format, "text");
}

#[test]
fn test_settings_from_env() {
    let settings = with_env(
        &[
            ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
            ("REQUEST_TIMEOUT", "12"),
            ("MAX_RETRIES", "2"),
            ("MAX_TOOL_ROUNDS", "4"),
            ("OPEN_WEATHER_API_KEY", "weather-key"),
            ("SERVER_PORT", "8081"),
            ("BILL_FORM_IMAGE", "assets/bill-screen.png"),
            ("LOG_FORMAT", "json"),
        ],
        Settings::new,
    )
    .unwrap();

    assert_eq!(settings.openai.base_url, "http://localhost:8080/v1");
    assert_eq!(settings.openai.timeout, 12);
    assert_eq!(settings.openai.max_retries, 2);
    assert_eq!(settings.session.max_tool_rounds, 4);
    assert_eq!(settings.weather.api_key.as_deref(), Some("weather-key"));
    assert_eq!(settings.server.port, 8081);
    assert_eq!(settings.server.bill_form_image, Some(PathBuf::from("assets/bill-screen.png")));
    assert_eq!(settings.logging.format, "json");
}

#[test]
fn test_settings_creation_missing_api_key() {
    let result = with_env(&[], || {
        env::remove_var("OPENAI_API_KEY");
        Settings::new()
    });
    assert!(result.unwrap_err().to_string().contains("OPENAI_API_KEY"));
}

#[test]
fn test_blank_weather_key_is_ignored() {
    let settings = with_env(&[("OPEN_WEATHER_API_KEY", "  ")], Settings::new).unwrap();
    assert!(settings.weather.api_key.is_none());
}

#[test]
fn test_parse_errors() {
    for (key, value) in [
        ("REQUEST_TIMEOUT", "soon"),
        ("SERVER_PORT", "99999"),
        ("MAX_TOOL_ROUNDS", "-1"),
        ("MAX_UPLOAD_SIZE", "big"),
    ] {
        assert!(with_env(&[(key, value)], Settings::new).is_err(), "{}={} accepted", key, value);
    }
}

#[test]
fn test_settings_validation() {
    assert!(valid_settings().validate().is_ok());

    let mut settings = valid_settings();
    settings.openai.api_key = "sk test key with spaces".to_string();
    assert!(settings.validate().is_err());

    let mut settings = valid_settings();
    settings.openai.base_url = "api.openai.com".to_string();
    assert!(settings.validate().is_err());

    let mut settings = valid_settings();
    settings.openai.timeout = 0;
    assert!(settings.validate().is_err());

    let mut settings = valid_settings();
    settings.session.max_tool_rounds = 0;
    assert!(settings.validate().is_err());

    let mut settings = valid_settings();
    settings.server.max_upload_size = 0;
    assert!(settings.validate().is_err());

    let mut settings = valid_settings();
    settings.logging.level = "verbose".to_string();
    assert!(settings.validate().is_err());

    let mut settings = valid_settings();
    settings.logging.format = "xml".to_string();
    assert!(settings.validate().is_err());
}
