//! Hebcal lookups: Hebrew dates, Shabbat times and holidays.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;
use serde::Deserialize;
use tokio::task::JoinSet;

use super::{fetch_json, join_url};
use crate::datekey::{DateKey, to_key};
use crate::grid::YearMonth;
use crate::hebrew::HebrewDate;
use crate::prefs::CityInfo;

static CLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*([ap]m)?").expect("clock pattern is valid")
});

/// Extract the first `H:MM` / `HH:MM` clock time from a free-text title.
///
/// A trailing `am`/`pm` marker converts the time to 24-hour form. Returns
/// `None` when no valid time is present.
pub fn parse_clock_time(title: &str) -> Option<NaiveTime> {
    let caps = CLOCK_PATTERN.captures(title)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;

    if let Some(marker) = caps.get(3) {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = marker.as_str().eq_ignore_ascii_case("pm");
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Candle-lighting and havdalah times for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShabbatTimes {
    pub candles: Option<NaiveTime>,
    pub havdalah: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub name: String,
    pub hebrew: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConverterResponse {
    hy: i32,
    hm: String,
    hd: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<HebcalItem>,
}

#[derive(Debug, Deserialize)]
struct HebcalItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    hebrew: Option<String>,
}

impl HebcalItem {
    fn date_key(&self) -> Option<DateKey> {
        let raw = self.date.as_deref()?;
        match raw.get(..10).map(str::parse::<DateKey>) {
            Some(Ok(key)) => Some(key),
            _ => {
                tracing::debug!("Skipping Hebcal item with unusable date {:?}", raw);
                None
            }
        }
    }
}

/// Client for the Hebcal REST API.
#[derive(Clone, Debug)]
pub struct HebcalClient {
    client: reqwest::Client,
    base_url: String,
}

impl HebcalClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Hebrew date of a single Gregorian day.
    pub async fn fetch_hebrew_date(&self, date: NaiveDate) -> Result<HebrewDate> {
        let request = self
            .client
            .get(join_url(&self.base_url, "converter"))
            .query(&[
                ("cfg", "json".to_string()),
                ("gy", date.year().to_string()),
                ("gm", date.month().to_string()),
                ("gd", date.day().to_string()),
                ("g2h", "1".to_string()),
                ("strict", "1".to_string()),
            ]);
        let data: ConverterResponse = fetch_json(request, "Hebcal converter").await?;
        Ok(HebrewDate::new(data.hd, data.hm, data.hy))
    }

    /// Hebrew dates for every day of `month`, fetched concurrently.
    ///
    /// Days whose lookup fails are left out of the result.
    pub async fn fetch_hebrew_month(&self, month: YearMonth) -> BTreeMap<DateKey, HebrewDate> {
        let mut tasks = JoinSet::new();
        for day in month.days() {
            let client = self.clone();
            tasks.spawn(async move { (day, client.fetch_hebrew_date(day).await) });
        }

        let mut dates = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((day, Ok(hebrew))) => {
                    dates.insert(DateKey::new(day), hebrew);
                }
                Ok((day, Err(e))) => {
                    tracing::debug!("Hebrew date lookup failed for {}: {:#}", to_key(&day), e);
                }
                Err(e) => tracing::warn!("Hebrew date task failed: {}", e),
            }
        }
        dates
    }

    /// Candle-lighting and havdalah times for `month` at `city`.
    pub async fn fetch_shabbat(
        &self,
        city: &CityInfo,
        month: YearMonth,
    ) -> Result<BTreeMap<DateKey, ShabbatTimes>> {
        let request = self
            .client
            .get(join_url(&self.base_url, "shabbat"))
            .query(&[
                ("cfg", "json".to_string()),
                ("geo", "pos".to_string()),
                ("latitude", city.lat.to_string()),
                ("longitude", city.lon.to_string()),
                ("start", to_key(&month.first_day())),
                ("end", to_key(&month.last_day())),
            ]);
        let data: ItemsResponse = fetch_json(request, "Hebcal shabbat").await?;
        Ok(shabbat_map(&data.items))
    }

    /// Holidays of the Gregorian `year`, using the Israeli schedule when the
    /// city is in Israel and the diaspora one elsewhere.
    ///
    /// The schedule is chosen with Hebcal's `i` flag. Candle-lighting
    /// (`c=on`) and Hebrew-date (`d=1`) items are not requested since the
    /// holiday map ignores them.
    pub async fn fetch_holidays(
        &self,
        city: &CityInfo,
        year: i32,
    ) -> Result<BTreeMap<DateKey, Holiday>> {
        let israel = if city.is_israel() { "on" } else { "off" };
        let request = self
            .client
            .get(join_url(&self.base_url, "hebcal"))
            .query(&[
                ("v", "1".to_string()),
                ("cfg", "json".to_string()),
                ("maj", "on".to_string()),
                ("min", "on".to_string()),
                ("mod", "on".to_string()),
                ("year", year.to_string()),
                ("geo", "pos".to_string()),
                ("latitude", city.lat.to_string()),
                ("longitude", city.lon.to_string()),
                ("i", israel.to_string()),
            ]);
        let data: ItemsResponse = fetch_json(request, "Hebcal holidays").await?;
        Ok(holiday_map(&data.items))
    }
}

fn shabbat_map(items: &[HebcalItem]) -> BTreeMap<DateKey, ShabbatTimes> {
    let mut map: BTreeMap<DateKey, ShabbatTimes> = BTreeMap::new();
    for item in items {
        let category = item.category.as_deref().unwrap_or_default();
        if category != "candles" && category != "havdalah" {
            continue;
        }
        let Some(key) = item.date_key() else {
            continue;
        };
        let time = item.title.as_deref().and_then(parse_clock_time);
        let entry = map.entry(key).or_default();
        if category == "candles" {
            entry.candles = time;
        } else {
            entry.havdalah = time;
        }
    }
    map
}

fn holiday_map(items: &[HebcalItem]) -> BTreeMap<DateKey, Holiday> {
    let mut map = BTreeMap::new();
    for item in items {
        if matches!(item.category.as_deref(), Some("candles" | "havdalah")) {
            continue;
        }
        let Some(name) = item.title.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        let Some(key) = item.date_key() else {
            continue;
        };
        map.insert(
            key,
            Holiday {
                name: name.to_string(),
                hebrew: item.hebrew.clone().filter(|h| !h.is_empty()),
            },
        );
    }
    map
}
