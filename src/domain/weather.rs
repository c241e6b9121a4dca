// Beach weather domain model
use super::record::{MetricSpec, SeriesRecord, display_or_dash, time_format};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Fetch parameters for one beach
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Time", with = "time_format")]
    pub time: NaiveDateTime,
    #[serde(rename = "Temp_F")]
    pub temp_f: f64,
    #[serde(rename = "Feels_Like_Temp_F", default)]
    pub feels_like_temp_f: Option<f64>,
    #[serde(rename = "Humidity", default)]
    pub humidity: Option<f64>,
    #[serde(rename = "Wind_Speed", default)]
    pub wind_speed: Option<f64>,
    #[serde(rename = "Cloud_Cover", default)]
    pub cloud_cover: Option<f64>,
    #[serde(rename = "Weather_Description", default)]
    pub weather_description: Option<String>,
}

impl WeatherReading {
    pub fn new(location: &str, coordinates: Coordinates, time: NaiveDateTime, temp_f: f64) -> Self {
        Self {
            location: location.to_string(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            time,
            temp_f,
            feels_like_temp_f: None,
            humidity: None,
            wind_speed: None,
            cloud_cover: None,
            weather_description: None,
        }
    }

    fn description_line(&self) -> String {
        // "light rain" -> "Light rain"
        let description = self.weather_description.as_deref().unwrap_or("No description");
        let mut chars = description.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl SeriesRecord for WeatherReading {
    const COLUMNS: &'static [&'static str] = &[
        "Location",
        "Latitude",
        "Longitude",
        "Time",
        "Temp_F",
        "Feels_Like_Temp_F",
        "Humidity",
        "Wind_Speed",
        "Cloud_Cover",
        "Weather_Description",
    ];

    const REQUIRED_COLUMNS: &'static [&'static str] =
        &["Location", "Latitude", "Longitude", "Time", "Temp_F"];

    const METRICS: &'static [MetricSpec] = &[
        MetricSpec { name: "Temp_F", title: "Temperature", unit: "°F" },
        MetricSpec { name: "Feels_Like_Temp_F", title: "Feels Like Temperature", unit: "°F" },
        MetricSpec { name: "Humidity", title: "Humidity", unit: "%" },
        MetricSpec { name: "Wind_Speed", title: "Wind Speed", unit: "mph" },
        MetricSpec { name: "Cloud_Cover", title: "Cloud Cover", unit: "%" },
    ];

    fn key(&self) -> &str {
        &self.location
    }

    fn time(&self) -> NaiveDateTime {
        self.time
    }

    fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "Temp_F" => Some(self.temp_f),
            "Feels_Like_Temp_F" => self.feels_like_temp_f,
            "Humidity" => self.humidity,
            "Wind_Speed" => self.wind_speed,
            "Cloud_Cover" => self.cloud_cover,
            _ => None,
        }
    }

    fn summary_text(&self) -> String {
        format!(
            "{}\n\n{}\n\n\
             • Current Temperature:  {}°F\n\
             • Feels Like:           {}°F\n\
             • Humidity:             {}%\n\
             • Wind Speed:           {} mph\n\
             • Cloud Cover:          {}%\n",
            self.location,
            self.description_line(),
            self.temp_f,
            display_or_dash(self.feels_like_temp_f),
            display_or_dash(self.humidity),
            display_or_dash(self.wind_speed),
            display_or_dash(self.cloud_cover),
        )
    }
}
