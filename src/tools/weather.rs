//! OpenWeather current-weather lookup tool

use super::{ParamType, ToolContext, ToolDeclaration, ToolHandler};
use crate::config::settings::WeatherConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Subset of the OpenWeather current weather document
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherReport {
    pub name: String,
    pub sys: WeatherSys,
    pub main: WeatherMain,
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSys {
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
}

/// OpenWeather HTTP client
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Client from settings, `None` when no API key is configured
    pub fn from_config(config: &WeatherConfig) -> Result<Option<Self>> {
        config
            .api_key
            .as_deref()
            .map(|key| Self::new(&config.base_url, key))
            .transpose()
    }

    /// Fetch current weather in metric units
    pub async fn current_weather(&self, location: &str) -> Result<WeatherReport> {
        debug!(%location, "Fetching current weather");

        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "en"),
            ])
            .send()
            .await
            .context("Failed to reach weather service")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Error fetching weather data: {}", status.as_u16());
        }

        response.json().await.context("Failed to parse weather data")
    }
}

/// Render a report as readable text
pub fn format_weather_data(report: &WeatherReport) -> String {
    let description = report
        .weather
        .first()
        .map(|condition| capitalize(&condition.description))
        .unwrap_or_default();

    format!(
        "Current weather in {}, {}:\nTemperature: {}°C\nHumidity: {}%\nDescription: {}",
        report.name, report.sys.country, report.main.temp, report.main.humidity, description
    )
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

struct CurrentWeather {
    client: WeatherClient,
}

#[async_trait]
impl ToolHandler for CurrentWeather {
    async fn call(&self, arguments: &Value, _ctx: &mut ToolContext<'_>) -> Result<String> {
        let location = arguments["location"]
            .as_str()
            .context("location must be a string")?;
        let report = self.client.current_weather(location).await?;
        Ok(format_weather_data(&report))
    }
}

/// `get_current_weather` declaration and handler
pub fn weather_tool(client: WeatherClient) -> (ToolDeclaration, Arc<dyn ToolHandler>) {
    (
        ToolDeclaration::new("get_current_weather", "Get the current weather for a given location.")
            .parameter("location", ParamType::String, "City and country e.g. Bogotá, Colombia", true)
            .strict(true),
        Arc::new(CurrentWeather { client }),
    )
}
