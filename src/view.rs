//! View models: everything a renderer needs to paint the month grid, the
//! header and the day detail, already resolved to display strings.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use reqwest::Url;

use crate::api::{DayWeather, ShabbatTimes};
use crate::datekey::DateKey;
use crate::event::{Event, EventKind, Owner};
use crate::freetime::free_time_labels;
use crate::grid::{MonthGrid, YearMonth};
use crate::state::AppState;

pub const MAX_CHIPS: usize = 3;
/// More than this many user events on a day highlights its cell.
pub const BUSY_DAY_THRESHOLD: usize = 2;

const WAZE_BASE: &str = "https://waze.com/ul";
const PLACEHOLDER: &str = "...";

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Column headings of the grid, Sunday first.
pub const GRID_WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn month_name(month: YearMonth) -> &'static str {
    MONTH_NAMES[month.month0 as usize % 12]
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

pub fn kind_label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Task => "Task",
        EventKind::RoutineWork | EventKind::RoutineFood => "Automatic",
        EventKind::Event => "Event",
    }
}

pub fn owner_label(owner: Owner) -> &'static str {
    match owner {
        Owner::Both => "Shared",
        Owner::PersonA => "Person A",
        Owner::PersonB => "Person B",
    }
}

/// `d.m.yyyy`, without zero padding.
pub fn short_date(date: NaiveDate) -> String {
    format!("{}.{}.{}", date.day(), date.month(), date.year())
}

/// Navigation link that opens the address in Waze.
pub fn waze_url(address: &str) -> Option<String> {
    Url::parse_with_params(WAZE_BASE, [("q", address)])
        .ok()
        .map(String::from)
}

fn clock(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// The Shabbat tag of a grid cell: candle lighting on Fridays and havdalah
/// on Saturdays, with a placeholder while the time is unknown.
pub fn shabbat_tag(date: NaiveDate, times: Option<&ShabbatTimes>) -> Option<String> {
    match date.weekday() {
        Weekday::Fri => Some(format!(
            "🕯️ Candle lighting: {}",
            clock(times.and_then(|t| t.candles))
        )),
        Weekday::Sat => Some(format!(
            "✨ Havdalah: {}",
            clock(times.and_then(|t| t.havdalah))
        )),
        _ => None,
    }
}

/// The Shabbat line of the day detail; only shown once the time is known.
pub fn shabbat_info(date: NaiveDate, times: Option<&ShabbatTimes>) -> Option<String> {
    let times = times?;
    match date.weekday() {
        Weekday::Fri => times
            .candles
            .map(|t| format!("🕯️ Candle lighting: {}", t.format("%H:%M"))),
        Weekday::Sat => times
            .havdalah
            .map(|t| format!("✨ Havdalah: {}", t.format("%H:%M"))),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventChip {
    pub text: String,
    pub owner: Owner,
}

/// One cell of the month grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub key: DateKey,
    pub day: u32,
    pub hebrew_label: String,
    pub is_other_month: bool,
    pub shabbat: Option<String>,
    pub holiday: Option<String>,
    pub chips: Vec<EventChip>,
    /// `"+N more"` when some events did not fit.
    pub more: Option<String>,
    pub glow: bool,
    pub is_today: bool,
}

impl DayCell {
    pub fn build(state: &AppState, date: NaiveDate, is_other_month: bool) -> Self {
        let key = DateKey::new(date);
        let events = state.user_events_for(key);
        let chips = events
            .iter()
            .take(MAX_CHIPS)
            .map(|e| EventChip {
                text: format!("• {}", e.title),
                owner: e.owner,
            })
            .collect();
        let more = (events.len() > MAX_CHIPS).then(|| format!("+{} more", events.len() - MAX_CHIPS));

        Self {
            key,
            day: date.day(),
            hebrew_label: state
                .hebrew_dates
                .get(&key)
                .map(|h| h.label.clone())
                .unwrap_or_default(),
            is_other_month,
            shabbat: shabbat_tag(date, state.shabbat.get(&key)),
            holiday: state.holidays.get(&key).map(|h| h.name.clone()),
            chips,
            more,
            glow: events.len() > BUSY_DAY_THRESHOLD,
            is_today: date == state.today,
        }
    }
}

/// All 42 cells of the viewed month.
pub fn month_cells(state: &AppState) -> Vec<DayCell> {
    MonthGrid::for_month(state.view)
        .cells()
        .iter()
        .map(|cell| DayCell::build(state, cell.date, cell.is_other_month))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthHeader {
    pub gregorian: String,
    pub hebrew: String,
    pub today: String,
    pub location: String,
}

impl MonthHeader {
    pub fn build(state: &AppState) -> Self {
        let view = state.view;
        let reference = [15, 1]
            .into_iter()
            .filter_map(|day| view.first_day().with_day(day))
            .find_map(|date| state.hebrew_dates.get(&DateKey::new(date)));

        let location = if state.city.name.is_empty() {
            "No city set".to_string()
        } else {
            state.city.name.clone()
        };

        Self {
            gregorian: format!("{} {}", month_name(view), view.year),
            hebrew: reference
                .map(|h| h.month_year())
                .unwrap_or_else(|| "Hebrew date loading...".to_string()),
            today: format!("Today: {}", short_date(state.today)),
            location,
        }
    }
}

/// One line of the day detail's event list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub time: String,
    pub title: String,
    pub kind: EventKind,
    pub owner: Owner,
    /// `"<kind> • <owner>"`
    pub meta: String,
    pub address: Option<String>,
    pub waze_url: Option<String>,
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        Self {
            time: event.time_label(),
            title: event.title.clone(),
            kind: event.kind,
            owner: event.owner,
            meta: format!("{} • {}", kind_label(event.kind), owner_label(event.owner)),
            address: event.address.clone(),
            waze_url: event.address.as_deref().and_then(waze_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayDetail {
    pub key: DateKey,
    pub hebrew: Option<String>,
    pub gregorian: String,
    pub weekday: String,
    pub shabbat: Option<String>,
    pub holiday: Option<String>,
    pub events: Vec<EventRow>,
    pub free_time: Vec<String>,
}

impl DayDetail {
    pub fn build(state: &AppState, key: DateKey) -> Self {
        let date = key.date();
        let events = state.day_events(key);
        Self {
            key,
            hebrew: state.hebrew_dates.get(&key).map(|h| h.full()),
            gregorian: short_date(date),
            weekday: weekday_name(date.weekday()).to_string(),
            shabbat: shabbat_info(date, state.shabbat.get(&key)),
            holiday: state.holidays.get(&key).map(|h| h.name.clone()),
            events: events.iter().map(EventRow::from).collect(),
            free_time: free_time_labels(&events),
        }
    }
}

/// Display lines for a day's forecast.
pub fn weather_lines(city: &str, day: &DayWeather) -> Vec<String> {
    let temp = |t: Option<f64>| {
        t.map(|v| format!("{v}°C"))
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    };
    let mut lines = vec![
        format!("Location: {city}"),
        format!("Date: {}", day.date),
        day.description().to_string(),
        format!("🌡️ High: {}", temp(day.max_temp)),
        format!("🥶 Low: {}", temp(day.min_temp)),
    ];
    if let Some(rain) = day.rain_probability {
        lines.push(format!("☔ Chance of rain: {rain}%"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Holiday;
    use crate::hebrew::HebrewDate;
    use crate::prefs::{CityInfo, Theme};

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn state() -> AppState {
        AppState::new(
            NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            CityInfo {
                name: "Yavne, Israel".to_string(),
                lat: 31.8928,
                lon: 34.8209,
                country_code: "IL".to_string(),
            },
            Theme::Light,
        )
    }

    fn add(state: &mut AppState, date: &str, id: &str, owner: Owner, address: Option<&str>) {
        let event = Event {
            id: Some(id.to_string()),
            title: format!("Event {id}"),
            kind: EventKind::Event,
            owner,
            start: Some("12:00".to_string()),
            end: Some("13:00".to_string()),
            address: address.map(str::to_string),
            notify: false,
            notify_minutes: 60,
        };
        state
            .events
            .entry(key(date))
            .or_default()
            .insert(id.to_string(), event);
    }

    // ==================== Cell Tests ====================

    #[test]
    fn test_month_cells_cover_grid() {
        let cells = month_cells(&state());
        assert_eq!(cells.len(), 42);
        // June 2024 starts on a Saturday.
        assert!(cells[..6].iter().all(|c| c.is_other_month));
        assert_eq!(cells[6].key, key("2024-06-01"));
        assert_eq!(cells.iter().filter(|c| c.is_today).count(), 1);
    }

    #[test]
    fn test_cell_chips_overflow_and_glow() {
        let mut state = state();
        for id in ["a", "b", "c", "d", "e"] {
            add(&mut state, "2024-06-10", id, Owner::PersonA, None);
        }
        let cell = DayCell::build(&state, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(), false);
        assert_eq!(cell.chips.len(), 3);
        assert_eq!(cell.chips[0].text, "• Event a");
        assert_eq!(cell.chips[0].owner, Owner::PersonA);
        assert_eq!(cell.more.as_deref(), Some("+2 more"));
        assert!(cell.glow);
        // Monday, so no Shabbat tag.
        assert_eq!(cell.shabbat, None);
    }

    #[test]
    fn test_cell_glow_needs_more_than_two() {
        let mut state = state();
        add(&mut state, "2024-06-10", "a", Owner::Both, None);
        add(&mut state, "2024-06-10", "b", Owner::Both, None);
        let cell = DayCell::build(&state, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(), false);
        assert!(!cell.glow);
        assert_eq!(cell.more, None);
    }

    #[test]
    fn test_shabbat_tags_with_placeholder() {
        let friday = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let times = ShabbatTimes {
            candles: Some(t(19, 29)),
            havdalah: None,
        };
        assert_eq!(
            shabbat_tag(friday, Some(&times)).as_deref(),
            Some("🕯️ Candle lighting: 19:29")
        );
        assert_eq!(
            shabbat_tag(saturday, Some(&times)).as_deref(),
            Some("✨ Havdalah: ...")
        );
        assert_eq!(
            shabbat_tag(saturday, None).as_deref(),
            Some("✨ Havdalah: ...")
        );
        assert_eq!(shabbat_info(saturday, Some(&times)), None);
    }

    #[test]
    fn test_cell_annotations() {
        let mut state = state();
        state
            .hebrew_dates
            .insert(key("2024-06-12"), HebrewDate::new(6, "Sivan", 5784));
        state.holidays.insert(
            key("2024-06-12"),
            Holiday {
                name: "Shavuot I".to_string(),
                hebrew: None,
            },
        );
        let cell = DayCell::build(&state, NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(), false);
        assert_eq!(cell.hebrew_label, "ו׳");
        assert_eq!(cell.holiday.as_deref(), Some("Shavuot I"));
        assert!(!cell.is_today);
    }

    // ==================== Header Tests ====================

    #[test]
    fn test_header_prefers_fifteenth() {
        let mut state = state();
        state
            .hebrew_dates
            .insert(key("2024-06-01"), HebrewDate::new(25, "Iyyar", 5784));
        let header = MonthHeader::build(&state);
        assert_eq!(header.hebrew, "Iyyar 5784");

        state
            .hebrew_dates
            .insert(key("2024-06-15"), HebrewDate::new(9, "Sivan", 5784));
        let header = MonthHeader::build(&state);
        assert_eq!(header.gregorian, "June 2024");
        assert_eq!(header.hebrew, "Sivan 5784");
        assert_eq!(header.today, "Today: 14.6.2024");
        assert_eq!(header.location, "Yavne, Israel");
    }

    #[test]
    fn test_header_loading_placeholder() {
        let header = MonthHeader::build(&state());
        assert_eq!(header.hebrew, "Hebrew date loading...");
    }

    // ==================== Detail Tests ====================

    #[test]
    fn test_day_detail_lists_routine_and_address() {
        let mut state = state();
        add(&mut state, "2024-06-13", "x", Owner::PersonB, Some("Herzl 1, Yavne"));
        state
            .hebrew_dates
            .insert(key("2024-06-13"), HebrewDate::new(7, "Sivan", 5784));

        let detail = DayDetail::build(&state, key("2024-06-13"));
        assert_eq!(detail.gregorian, "13.6.2024");
        assert_eq!(detail.weekday, "Thursday");
        assert_eq!(detail.hebrew.as_deref(), Some("ז׳ Sivan 5784"));
        assert_eq!(detail.events.len(), 3);
        assert_eq!(detail.events[0].title, "Work");
        assert_eq!(detail.events[0].meta, "Automatic • Shared");
        assert_eq!(detail.events[1].time, "12:00 – 13:00");
        assert_eq!(detail.events[1].meta, "Event • Person B");
        let url = detail.events[1].waze_url.as_deref().unwrap();
        assert!(url.starts_with("https://waze.com/ul?q="));
        assert!(url.contains("Herzl"));
        assert_eq!(detail.free_time, vec!["07:00 – 08:00", "18:30 – 23:00"]);
    }

    #[test]
    fn test_day_detail_shabbat_line() {
        let mut state = state();
        state.shabbat.insert(
            key("2024-06-14"),
            ShabbatTimes {
                candles: Some(t(19, 29)),
                havdalah: None,
            },
        );
        let detail = DayDetail::build(&state, key("2024-06-14"));
        assert_eq!(detail.shabbat.as_deref(), Some("🕯️ Candle lighting: 19:29"));
    }

    #[test]
    fn test_waze_url_encodes_address() {
        let url = waze_url("רחוב הרצל 5").unwrap();
        assert!(url.starts_with("https://waze.com/ul?q="));
        assert!(!url.contains(' '));
        assert!(url.contains("%D7%A8"));
    }

    #[test]
    fn test_weather_lines_skip_missing_rain() {
        let day = DayWeather {
            date: "2024-06-14".to_string(),
            max_temp: Some(31.5),
            min_temp: None,
            rain_probability: None,
            code: Some(0),
        };
        let lines = weather_lines("Yavne", &day);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3], "🌡️ High: 31.5°C");
        assert_eq!(lines[4], "🥶 Low: ...");
    }

    #[test]
    fn test_short_date_unpadded() {
        assert_eq!(short_date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()), "5.1.2024");
    }
}
