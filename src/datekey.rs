//! Canonical `YYYY-MM-DD` keys.
//!
//! Every per-day lookup in the calendar (stored events, holidays, Shabbat
//! times, Hebrew annotations) is indexed by the same key, computed from the
//! local calendar date without any timezone conversion.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing a date key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateKeyError {
    #[error("date key must look like YYYY-MM-DD, got {0:?}")]
    Shape(String),
    #[error("date key {0:?} contains a non-numeric field")]
    NotNumeric(String),
    #[error("date key {0:?} does not name a real day")]
    NoSuchDay(String),
}

/// Format the local year/month/day of `date` as `YYYY-MM-DD`.
///
/// Any time-of-day component is ignored.
pub fn to_key<D: Datelike>(date: &D) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Parse a `YYYY-MM-DD` key back into a date (midnight is implied).
pub fn from_key(key: &str) -> Result<NaiveDate, DateKeyError> {
    let parts: Vec<&str> = key.split('-').collect();
    let [y, m, d] = parts.as_slice() else {
        return Err(DateKeyError::Shape(key.to_string()));
    };
    if y.len() != 4 || m.len() != 2 || d.len() != 2 {
        return Err(DateKeyError::Shape(key.to_string()));
    }
    if ![y, m, d]
        .iter()
        .all(|p| p.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(DateKeyError::NotNumeric(key.to_string()));
    }

    // All-digit fields of bounded length always parse.
    let year: i32 = y.parse().map_err(|_| DateKeyError::NotNumeric(key.to_string()))?;
    let month: u32 = m.parse().map_err(|_| DateKeyError::NotNumeric(key.to_string()))?;
    let day: u32 = d.parse().map_err(|_| DateKeyError::NotNumeric(key.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| DateKeyError::NoSuchDay(key.to_string()))
}

/// A calendar day identified by its `YYYY-MM-DD` key.
///
/// Ordering follows the calendar, which for zero-padded keys is also the
/// lexicographic order of the strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_key(&self.0))
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_key(s).map(Self)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
