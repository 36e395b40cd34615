//! Calendar events as stored in the remote database, plus the form draft used
//! to create them.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::datekey::{DateKey, DateKeyError};

pub const MIN_NOTIFY_MINUTES: i64 = 1;
pub const MAX_NOTIFY_MINUTES: i64 = 180;
pub const DEFAULT_NOTIFY_MINUTES: u32 = 60;
pub const DEFAULT_START: &str = "20:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    #[default]
    Event,
    Task,
    RoutineWork,
    RoutineFood,
}

impl EventKind {
    pub fn is_routine(&self) -> bool {
        matches!(self, EventKind::RoutineWork | EventKind::RoutineFood)
    }
}

/// Who an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Owner {
    #[default]
    #[serde(rename = "both")]
    Both,
    #[serde(rename = "personA", alias = "benjamin")]
    PersonA,
    #[serde(rename = "personB", alias = "nana")]
    PersonB,
}

/// A single calendar entry.
///
/// Times are kept as the `HH:MM` strings the store holds; use
/// [`Event::start_time`] / [`Event::end_time`] for typed access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "or_default")]
    pub kind: EventKind,
    #[serde(default, deserialize_with = "or_default")]
    pub owner: Owner,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default = "default_notify_minutes")]
    pub notify_minutes: u32,
}

fn default_notify_minutes() -> u32 {
    DEFAULT_NOTIFY_MINUTES
}

/// Unrecognised kind/owner values fall back to the default instead of
/// rejecting the whole event.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Parse an `HH:MM` clock string.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

impl Event {
    pub fn start_time(&self) -> Option<NaiveTime> {
        self.start.as_deref().and_then(parse_clock)
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        self.end.as_deref().and_then(parse_clock)
    }

    pub fn is_routine(&self) -> bool {
        self.kind.is_routine()
    }

    /// `"HH:MM"` or `"HH:MM – HH:MM"`; empty when there is no start.
    pub fn time_label(&self) -> String {
        match (self.start.as_deref(), self.end.as_deref()) {
            (Some(start), Some(end)) => format!("{start} – {end}"),
            (Some(start), None) => start.to_string(),
            _ => String::new(),
        }
    }

    /// Start string used for ordering a day's events.
    pub fn sort_start(&self) -> &str {
        self.start.as_deref().unwrap_or("00:00")
    }
}

/// Stable sort by start time, events without a start first.
pub fn sort_by_start(events: &mut [Event]) {
    events.sort_by(|a, b| a.sort_start().cmp(b.sort_start()));
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("title is required")]
    MissingTitle,
    #[error("date is required")]
    MissingDate,
    #[error("invalid date: {0}")]
    Date(#[from] DateKeyError),
    #[error("invalid time {0:?}, expected HH:MM")]
    Time(String),
}

/// The editable form behind "new event / task".
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub date: String,
    pub start: String,
    pub end: String,
    pub address: String,
    pub kind: EventKind,
    pub owner: Owner,
    pub notify: bool,
    pub notify_minutes: i64,
}

impl EventDraft {
    /// A fresh form for `date`.
    pub fn new(date: DateKey) -> Self {
        Self {
            title: String::new(),
            date: date.to_string(),
            start: DEFAULT_START.to_string(),
            end: String::new(),
            address: String::new(),
            kind: EventKind::Event,
            owner: Owner::Both,
            notify: true,
            notify_minutes: DEFAULT_NOTIFY_MINUTES as i64,
        }
    }

    /// Validate the form and produce an unsaved event for its date.
    pub fn submit(&self) -> Result<(DateKey, Event), DraftError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(DraftError::MissingTitle);
        }
        let date = self.date.trim();
        if date.is_empty() {
            return Err(DraftError::MissingDate);
        }
        let key: DateKey = date.parse()?;

        let start = optional_clock(&self.start)?;
        let end = optional_clock(&self.end)?;
        let address = Some(self.address.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        let event = Event {
            id: None,
            title: title.to_string(),
            kind: self.kind,
            owner: self.owner,
            start,
            end,
            address,
            notify: self.notify,
            notify_minutes: self
                .notify_minutes
                .clamp(MIN_NOTIFY_MINUTES, MAX_NOTIFY_MINUTES) as u32,
        };
        Ok((key, event))
    }
}

fn optional_clock(raw: &str) -> Result<Option<String>, DraftError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_clock(raw)
        .map(|t| Some(t.format("%H:%M").to_string()))
        .ok_or_else(|| DraftError::Time(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_draft_defaults() {
        let draft = EventDraft::new(key("2024-06-14"));
        assert_eq!(draft.date, "2024-06-14");
        assert_eq!(draft.start, "20:00");
        assert!(draft.end.is_empty());
        assert_eq!(draft.kind, EventKind::Event);
        assert_eq!(draft.owner, Owner::Both);
        assert!(draft.notify);
        assert_eq!(draft.notify_minutes, 60);
    }

    #[test]
    fn test_submit_trims_and_drops_empty_fields() {
        let mut draft = EventDraft::new(key("2024-06-14"));
        draft.title = "  Dentist ".to_string();
        draft.address = "   ".to_string();

        let (date, event) = draft.submit().unwrap();
        assert_eq!(date, key("2024-06-14"));
        assert_eq!(event.title, "Dentist");
        assert_eq!(event.start.as_deref(), Some("20:00"));
        assert_eq!(event.end, None);
        assert_eq!(event.address, None);
        assert_eq!(event.id, None);
    }

    #[test]
    fn test_submit_requires_title_and_date() {
        let mut draft = EventDraft::new(key("2024-06-14"));
        assert_eq!(draft.submit(), Err(DraftError::MissingTitle));

        draft.title = "Call".to_string();
        draft.date = " ".to_string();
        assert_eq!(draft.submit(), Err(DraftError::MissingDate));

        draft.date = "14/06/2024".to_string();
        assert!(matches!(draft.submit(), Err(DraftError::Date(_))));
    }

    #[test]
    fn test_submit_rejects_bad_time() {
        let mut draft = EventDraft::new(key("2024-06-14"));
        draft.title = "Call".to_string();
        draft.end = "25:00".to_string();
        assert_eq!(draft.submit(), Err(DraftError::Time("25:00".to_string())));
    }

    #[test]
    fn test_submit_normalizes_single_digit_hour() {
        let mut draft = EventDraft::new(key("2024-06-14"));
        draft.title = "Run".to_string();
        draft.start = "7:05".to_string();
        let (_, event) = draft.submit().unwrap();
        assert_eq!(event.start.as_deref(), Some("07:05"));
    }

    #[test]
    fn test_submit_clamps_notify_minutes() {
        let mut draft = EventDraft::new(key("2024-06-14"));
        draft.title = "Call".to_string();

        draft.notify_minutes = 0;
        assert_eq!(draft.submit().unwrap().1.notify_minutes, 1);

        draft.notify_minutes = 500;
        assert_eq!(draft.submit().unwrap().1.notify_minutes, 180);

        draft.notify_minutes = 45;
        assert_eq!(draft.submit().unwrap().1.notify_minutes, 45);
    }

    #[test]
    fn test_event_deserializes_store_shape() {
        let json = r#"{
            "id": "-Nabc",
            "title": "Pick up groceries",
            "kind": "task",
            "owner": "nana",
            "start": "18:00",
            "end": null,
            "address": "Herzl 1, Yavne",
            "notify": true,
            "notifyMinutes": 30
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.id.as_deref(), Some("-Nabc"));
        assert_eq!(event.kind, EventKind::Task);
        assert_eq!(event.owner, Owner::PersonB);
        assert_eq!(event.end, None);
        assert_eq!(event.notify_minutes, 30);
    }

    #[test]
    fn test_event_missing_fields_use_defaults() {
        let event: Event = serde_json::from_str(r#"{"title": "Bare"}"#).unwrap();
        assert_eq!(event.kind, EventKind::Event);
        assert_eq!(event.owner, Owner::Both);
        assert!(!event.notify);
        assert_eq!(event.notify_minutes, DEFAULT_NOTIFY_MINUTES);
    }

    #[test]
    fn test_event_serializes_camel_case_and_canonical_owner() {
        let event: Event =
            serde_json::from_str(r#"{"title": "x", "owner": "benjamin", "kind": "routine-work"}"#)
                .unwrap();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["owner"], "personA");
        assert_eq!(value["kind"], "routine-work");
        assert!(value.get("notifyMinutes").is_some());
    }

    #[test]
    fn test_time_label() {
        let mut event: Event = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(event.time_label(), "");
        event.start = Some("09:00".to_string());
        assert_eq!(event.time_label(), "09:00");
        event.end = Some("10:30".to_string());
        assert_eq!(event.time_label(), "09:00 – 10:30");
    }

    #[test]
    fn test_sort_by_start_is_stable_and_puts_missing_first() {
        let make = |title: &str, start: Option<&str>| Event {
            id: None,
            title: title.to_string(),
            kind: EventKind::Event,
            owner: Owner::Both,
            start: start.map(str::to_string),
            end: None,
            address: None,
            notify: false,
            notify_minutes: 60,
        };
        let mut events = vec![
            make("b", Some("17:00")),
            make("a", Some("08:00")),
            make("none", None),
            make("c", Some("17:00")),
        ];
        sort_by_start(&mut events);
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["none", "a", "b", "c"]);
    }

    #[test]
    fn test_unknown_kind_and_owner_fall_back_to_defaults() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "title": "Grandma visit",
            "owner": "grandma",
            "kind": "meeting",
            "start": "10:00"
        }))
        .unwrap();
        assert_eq!(event.title, "Grandma visit");
        assert_eq!(event.kind, EventKind::Event);
        assert_eq!(event.owner, Owner::Both);
        assert_eq!(event.start.as_deref(), Some("10:00"));

        let legacy: Event =
            serde_json::from_value(serde_json::json!({"title": "x", "owner": "nana", "kind": "task"}))
                .unwrap();
        assert_eq!(legacy.owner, Owner::PersonB);
        assert_eq!(legacy.kind, EventKind::Task);

        let null: Event =
            serde_json::from_value(serde_json::json!({"title": "x", "owner": null})).unwrap();
        assert_eq!(null.owner, Owner::Both);
    }
}
