//! Daily forecasts from Open-Meteo.

use anyhow::Result;
use serde::Deserialize;

use super::{fetch_json, join_url};
use crate::datekey::DateKey;
use crate::prefs::CityInfo;

const DAILY_FIELDS: &str =
    "weathercode,temperature_2m_max,temperature_2m_min,precipitation_probability_max";

/// The `daily` block of an Open-Meteo forecast; arrays are parallel to `time`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyForecast {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    pub weathercode: Vec<Option<i32>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailyForecast,
}

/// One day picked out of a forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct DayWeather {
    pub date: String,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub rain_probability: Option<f64>,
    pub code: Option<i32>,
}

impl DayWeather {
    pub fn description(&self) -> &'static str {
        describe_weather(self.code)
    }
}

impl DailyForecast {
    /// The entry for `key`, or the first entry when the forecast does not
    /// cover that day.
    pub fn select(&self, key: DateKey) -> Option<DayWeather> {
        let wanted = key.to_string();
        let idx = self.time.iter().position(|t| *t == wanted).unwrap_or(0);
        let date = self.time.get(idx)?.clone();
        let at = |v: &Vec<Option<f64>>| v.get(idx).copied().flatten();
        Some(DayWeather {
            date,
            max_temp: at(&self.temperature_2m_max),
            min_temp: at(&self.temperature_2m_min),
            rain_probability: at(&self.precipitation_probability_max),
            code: self.weathercode.get(idx).copied().flatten(),
        })
    }
}

/// Human-readable description of a WMO weather code.
pub fn describe_weather(code: Option<i32>) -> &'static str {
    match code {
        Some(0) => "☀️ Clear sky",
        Some(1 | 2) => "⛅ Partly cloudy",
        Some(3) => "☁️ Overcast",
        Some(45 | 48) => "🌫 Fog or haze",
        Some(51 | 53 | 55) => "🌦 Drizzle",
        Some(61 | 63 | 65) => "🌧 Rain",
        Some(71 | 73 | 75 | 77) => "❄️ Snow or ice pellets",
        Some(80..=82) => "🌧️ Heavy showers",
        Some(95 | 96 | 99) => "⛈️ Thunderstorms",
        _ => "🌤 Mixed weather",
    }
}

#[derive(Clone, Debug)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Daily forecast for the city's coordinates.
    pub async fn fetch_daily(&self, city: &CityInfo) -> Result<DailyForecast> {
        let request = self
            .client
            .get(join_url(&self.base_url, "v1/forecast"))
            .query(&[
                ("latitude", city.lat.to_string()),
                ("longitude", city.lon.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", "auto".to_string()),
            ]);
        let data: ForecastResponse = fetch_json(request, "Open-Meteo").await?;
        Ok(data.daily)
    }
}
