// libs/diet-chart-cell/src/services/weather.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::models::{ClimateContext, DietChartError};
use crate::services::climate::derive_season;

pub const MODERATE_TEMPERATURE: f64 = 25.0;
pub const MODERATE_HUMIDITY: f64 = 60.0;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather service is not configured")]
    NotConfigured,
    #[error("invalid weather service URL: {0}")]
    InvalidUrl(String),
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("weather service returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl From<WeatherError> for DietChartError {
    fn from(err: WeatherError) -> Self {
        DietChartError::Weather(err.to_string())
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_climate(&self, city: &str) -> Result<ClimateContext, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    #[serde(default)]
    name: String,
    main: OpenWeatherMain,
    #[serde(default)]
    weather: Vec<OpenWeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherCondition {
    description: String,
}

/// Current conditions from the OpenWeather `weather` endpoint, in metric units.
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &AppConfig) -> Result<Self, WeatherError> {
        if !config.is_weather_configured() {
            return Err(WeatherError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.openweather_api_key.clone(),
            base_url: config.openweather_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current_climate(&self, city: &str) -> Result<ClimateContext, WeatherError> {
        let url = Url::parse_with_params(
            &format!("{}/weather", self.base_url),
            &[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")],
        )
        .map_err(|e| WeatherError::InvalidUrl(e.to_string()))?;

        debug!("Fetching weather for {}", city);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Weather lookup for {} failed with {}: {}", city, status, message);
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: OpenWeatherResponse = response.json().await?;
        let month = Utc::now().month();

        Ok(ClimateContext {
            temperature: body.main.temp,
            humidity: body.main.humidity,
            season: derive_season(month, body.main.temp),
            city: if body.name.is_empty() { city.to_string() } else { body.name },
            description: body
                .weather
                .into_iter()
                .next()
                .map(|w| w.description)
                .unwrap_or_default(),
        })
    }
}

/// Fixed moderate climate, used when no weather service is configured or as
/// a fallback after a failed lookup.
#[derive(Debug, Clone)]
pub struct StaticWeatherProvider {
    pub temperature: f64,
    pub humidity: f64,
}

impl Default for StaticWeatherProvider {
    fn default() -> Self {
        Self {
            temperature: MODERATE_TEMPERATURE,
            humidity: MODERATE_HUMIDITY,
        }
    }
}

impl StaticWeatherProvider {
    pub fn climate_for(&self, city: &str, month: u32) -> ClimateContext {
        ClimateContext {
            temperature: self.temperature,
            humidity: self.humidity,
            season: derive_season(month, self.temperature),
            city: city.to_string(),
            description: "moderate climate".to_string(),
        }
    }
}

#[async_trait]
impl WeatherProvider for StaticWeatherProvider {
    async fn current_climate(&self, city: &str) -> Result<ClimateContext, WeatherError> {
        Ok(self.climate_for(city, Utc::now().month()))
    }
}

/// OpenWeather when an API key is configured, otherwise the static climate.
pub fn provider_from_config(config: &AppConfig) -> Arc<dyn WeatherProvider> {
    match OpenWeatherClient::new(config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("Using static weather provider: {}", e);
            Arc::new(StaticWeatherProvider::default())
        }
    }
}
