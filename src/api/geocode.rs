//! City search through OpenStreetMap Nominatim.

use anyhow::Result;
use serde::Deserialize;

use super::{fetch_json, join_url};
use crate::prefs::CityInfo;

pub const MAX_RESULTS: usize = 5;

#[derive(Debug, Deserialize)]
struct Place {
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(default)]
    country_code: Option<String>,
}

impl Place {
    fn into_city(self) -> Option<CityInfo> {
        let (Ok(lat), Ok(lon)) = (self.lat.parse::<f64>(), self.lon.parse::<f64>()) else {
            tracing::debug!("Skipping place with bad coordinates: {}", self.display_name);
            return None;
        };
        let country_code = self
            .address
            .and_then(|a| a.country_code)
            .map(|c| c.to_uppercase())
            .unwrap_or_default();
        Some(CityInfo {
            name: self.display_name,
            lat,
            lon,
            country_code,
        })
    }
}

#[derive(Clone, Debug)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Up to five places matching a free-text query.
    pub async fn search(&self, query: &str) -> Result<Vec<CityInfo>> {
        let limit = MAX_RESULTS.to_string();
        let request = self
            .client
            .get(join_url(&self.base_url, "search"))
            .query(&[
                ("format", "json"),
                ("q", query),
                ("limit", limit.as_str()),
                ("addressdetails", "1"),
                ("accept-language", "he,en"),
            ]);
        let places: Vec<Place> = fetch_json(request, "Nominatim").await?;
        Ok(places
            .into_iter()
            .filter_map(Place::into_city)
            .take(MAX_RESULTS)
            .collect())
    }
}
