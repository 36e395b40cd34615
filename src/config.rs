use std::path::PathBuf;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::prefs::CityInfo;

pub const APP_DIR: &str = "bnapp-calendar";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub network: NetworkConfig,
    pub store: StoreConfig,
    pub city: DefaultCityConfig,
    pub storage: StorageConfig,
}

/// Base URLs of the lookup services.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub hebcal_url: String,
    pub nominatim_url: String,
    pub open_meteo_url: String,
    /// Nominatim rejects requests without an identifying agent.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            hebcal_url: "https://www.hebcal.com".to_string(),
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            open_meteo_url: "https://api.open-meteo.com".to_string(),
            user_agent: "BNAPP-Calendar".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Firebase Realtime Database holding the shared events.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// e.g. `https://my-calendar-default-rtdb.firebaseio.com`. Sync is
    /// disabled when unset.
    pub url: Option<String>,
    pub auth_token: Option<String>,
    /// Pause before reopening a dropped live subscription.
    pub reconnect_delay_secs: u64,
}

/// City used until the user picks one.
#[derive(Debug, Deserialize, Clone)]
pub struct DefaultCityConfig {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country_code: String,
}

impl Default for DefaultCityConfig {
    fn default() -> Self {
        Self {
            name: "Yavne, Israel".to_string(),
            lat: 31.8928,
            lon: 34.8209,
            country_code: "IL".to_string(),
        }
    }
}

impl From<&DefaultCityConfig> for CityInfo {
    fn from(city: &DefaultCityConfig) -> Self {
        CityInfo {
            name: city.name.clone(),
            lat: city.lat,
            lon: city.lon,
            country_code: city.country_code.clone(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            auth_token: None,
            reconnect_delay_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Directory for saved preferences; defaults to the user config dir.
    pub dir: Option<String>,
}

impl StorageConfig {
    pub fn prefs_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => PathBuf::from(dir),
            None => user_config_dir(),
        }
    }
}

fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::default();
        let network = NetworkConfig::default();
        let city = DefaultCityConfig::default();

        let builder = Config::builder()
            // 1. Defaults
            // Lookup services
            .set_default("api.hebcal_url", api.hebcal_url)?
            .set_default("api.nominatim_url", api.nominatim_url)?
            .set_default("api.open_meteo_url", api.open_meteo_url)?
            .set_default("api.user_agent", api.user_agent)?
            // Network
            .set_default("network.request_timeout_secs", network.request_timeout_secs as i64)?
            .set_default("network.connect_timeout_secs", network.connect_timeout_secs as i64)?
            // Event store
            .set_default("store.url", None::<String>)?
            .set_default("store.auth_token", None::<String>)?
            .set_default("store.reconnect_delay_secs", 5)?
            // City
            .set_default("city.name", city.name)?
            .set_default("city.lat", city.lat)?
            .set_default("city.lon", city.lon)?
            .set_default("city.country_code", city.country_code)?
            // Storage
            .set_default("storage.dir", None::<String>)?

            // 2. Local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))

            // 3. User config directory (optional, overrides local)
            .add_source(File::from(user_config_dir().join("config.toml")).required(false))

            // 4. Environment variables (BNAPP__STORE__URL=...)
            .add_source(Environment::with_prefix("BNAPP").separator("__"));

        let s = builder.build()?;
        Ok(s.try_deserialize()?)
    }
}
