// OpenWeatherMap sampler implementation
use crate::application::sampler::Sampler;
use crate::domain::error::{Result, TelemetryError};
use crate::domain::record::sample_time;
use crate::domain::weather::{Coordinates, WeatherReading};
use crate::infrastructure::config::prepare_query;
use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenWeatherSampler {
    client: reqwest::Client,
    url_template: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: MainBlock,
    #[serde(default)]
    wind: Option<WindBlock>,
    #[serde(default)]
    clouds: Option<CloudsBlock>,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CloudsBlock {
    #[serde(default)]
    all: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

impl WeatherResponse {
    fn into_reading(self, location: &str, coordinates: Coordinates, time: NaiveDateTime) -> WeatherReading {
        let mut reading = WeatherReading::new(location, coordinates, time, self.main.temp);
        reading.feels_like_temp_f = self.main.feels_like;
        reading.humidity = self.main.humidity;
        reading.wind_speed = self.wind.and_then(|w| w.speed);
        reading.cloud_cover = self.clouds.and_then(|c| c.all);
        reading.weather_description = self.weather.into_iter().next().map(|c| c.description);
        reading
    }
}

impl OpenWeatherSampler {
    pub fn new(url_template: String, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build OpenWeatherMap client")?;
        Ok(Self {
            client,
            url_template,
            api_key,
        })
    }

    fn build_url(&self, coordinates: Coordinates) -> String {
        let mut vars = HashMap::new();
        vars.insert("lat".to_string(), coordinates.latitude.to_string());
        vars.insert("lon".to_string(), coordinates.longitude.to_string());
        vars.insert("api_key".to_string(), urlencoding::encode(&self.api_key).into_owned());
        prepare_query(&self.url_template, &vars)
    }

    async fn fetch(&self, coordinates: Coordinates) -> anyhow::Result<WeatherResponse> {
        let response = self
            .client
            .get(self.build_url(coordinates))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to OpenWeatherMap")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenWeatherMap request failed with status {}: {}", status, body);
        }

        response
            .json::<WeatherResponse>()
            .await
            .context("Failed to parse OpenWeatherMap response")
    }
}

#[async_trait]
impl Sampler for OpenWeatherSampler {
    type Params = Coordinates;
    type Record = WeatherReading;

    async fn sample(&self, key: &str, params: &Coordinates) -> Result<WeatherReading> {
        tracing::debug!(key, lat = params.latitude, lon = params.longitude, "fetching weather");
        let response = self
            .fetch(*params)
            .await
            .map_err(|e| TelemetryError::SampleUnavailable {
                key: key.to_string(),
                cause: format!("{e:#}"),
            })?;
        Ok(response.into_reading(key, *params, sample_time()))
    }
}
