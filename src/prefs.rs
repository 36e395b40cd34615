//! Locally persisted preferences: the selected city and the colour theme.
//!
//! Each preference is a small JSON document in the preferences directory.
//! Read and write failures are logged and otherwise ignored; callers fall
//! back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

const CITY_FILE: &str = "city.json";
const THEME_FILE: &str = "theme.json";

/// A geocoded place used for Shabbat times, holidays and weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityInfo {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country_code: String,
}

impl CityInfo {
    pub fn is_israel(&self) -> bool {
        self.country_code.eq_ignore_ascii_case("IL")
    }

    /// Both coordinates set; lookups are skipped otherwise.
    pub fn has_coordinates(&self) -> bool {
        self.lat != 0.0 && self.lon != 0.0 && self.lat.is_finite() && self.lon.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// File-backed preference storage.
#[derive(Debug, Clone)]
pub struct Preferences {
    dir: PathBuf,
}

impl Preferences {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_city(&self) -> Option<CityInfo> {
        self.load(CITY_FILE)
    }

    pub fn save_city(&self, city: &CityInfo) -> Result<()> {
        self.save(CITY_FILE, city)
    }

    pub fn load_theme(&self) -> Theme {
        self.load(THEME_FILE).unwrap_or_default()
    }

    pub fn save_theme(&self, theme: Theme) -> Result<()> {
        self.save(THEME_FILE, &theme)
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Option<T> {
        let path = self.dir.join(file);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("No stored preference at {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Ignoring unreadable preference {}: {}", path.display(), e);
                None
            }
        }
    }

    fn save<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(file);
        let json = serde_json::to_string(value).context("Failed to serialize preference")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn haifa() -> CityInfo {
        CityInfo {
            name: "Haifa, Israel".to_string(),
            lat: 32.794,
            lon: 34.9896,
            country_code: "IL".to_string(),
        }
    }

    #[test]
    fn test_city_save_and_load() {
        let dir = tempdir().unwrap();
        let prefs = Preferences::new(dir.path().join("nested"));

        assert_eq!(prefs.load_city(), None);
        prefs.save_city(&haifa()).unwrap();
        assert_eq!(prefs.load_city(), Some(haifa()));
    }

    #[test]
    fn test_city_json_shape() {
        let json = serde_json::to_value(haifa()).unwrap();
        assert_eq!(json["countryCode"], "IL");
        assert_eq!(json["name"], "Haifa, Israel");
    }

    #[test]
    fn test_corrupt_city_is_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CITY_FILE), "{not json").unwrap();
        let prefs = Preferences::new(dir.path());
        assert_eq!(prefs.load_city(), None);
    }

    #[test]
    fn test_theme_defaults_to_light() {
        let dir = tempdir().unwrap();
        let prefs = Preferences::new(dir.path());
        assert_eq!(prefs.load_theme(), Theme::Light);

        prefs.save_theme(Theme::Dark).unwrap();
        assert_eq!(prefs.load_theme(), Theme::Dark);
        assert_eq!(
            fs::read_to_string(dir.path().join(THEME_FILE)).unwrap(),
            "\"dark\""
        );
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let prefs = Preferences::new(blocker.join("sub"));
        assert!(prefs.save_theme(Theme::Dark).is_err());
    }

    #[test]
    fn test_city_helpers() {
        let mut city = haifa();
        assert!(city.is_israel());
        assert!(city.has_coordinates());
        city.country_code = "us".to_string();
        assert!(!city.is_israel());
        city.lat = 0.0;
        assert!(!city.has_coordinates());
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
    }
}
