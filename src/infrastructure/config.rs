use crate::application::view_spec::ViewConfig;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    Weather,
    Stock,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub domain: DomainKind,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub stock: StockConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_readings_per_key")]
    pub readings_per_key: usize,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// In-memory snapshot when unset
    #[serde(default)]
    pub snapshot_path: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            readings_per_key: default_readings_per_key(),
            max_rounds: default_max_rounds(),
            snapshot_path: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub url_template: String,
    /// Filled from OPEN_WEATHER_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub default_selection: Option<String>,
    #[serde(default)]
    pub beaches: Vec<BeachConfig>,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            url_template: default_weather_url(),
            api_key: None,
            default_selection: None,
            beaches: Vec::new(),
            views: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BeachConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StockConfig {
    #[serde(default = "default_stock_url")]
    pub url_template: String,
    #[serde(default)]
    pub default_selection: Option<String>,
    #[serde(default)]
    pub companies: Vec<CompanyConfig>,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            url_template: default_stock_url(),
            default_selection: None,
            companies: Vec::new(),
            views: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompanyConfig {
    pub name: String,
    pub ticker: String,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_readings_per_key() -> usize {
    10
}

fn default_max_rounds() -> u32 {
    15
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather?lat=${lat}&lon=${lon}&appid=${api_key}&units=imperial"
        .to_string()
}

fn default_stock_url() -> String {
    "https://query1.finance.yahoo.com/v7/finance/options/${ticker}".to_string()
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/shoreline"))
        .add_source(
            config::Environment::with_prefix("SHORELINE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("weather.api_key", std::env::var("OPEN_WEATHER_API_KEY").ok())?
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace template variables in a URL or query string
pub fn prepare_query(query: &str, vars: &HashMap<String, String>) -> String {
    let mut result = query.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
