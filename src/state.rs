//! Everything the calendar knows at a given moment.
//!
//! [`AppState`] is owned by a single [`Calendar`](crate::calendar::Calendar)
//! and only mutated through `&mut self`. Remote lookups are tagged with a
//! [`Ticket`] when they start; a completion whose ticket has since been
//! superseded by a newer request of the same kind is dropped.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::api::{EventCache, Holiday, ShabbatTimes};
use crate::datekey::DateKey;
use crate::event::{Event, EventKind, sort_by_start};
use crate::grid::YearMonth;
use crate::hebrew::HebrewDate;
use crate::prefs::{CityInfo, Theme};
use crate::routine::routine_events;

/// The classes of remote lookup that are sequenced independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    HebrewDates,
    Shabbat,
    Holidays,
    Weather,
}

/// Identifies one in-flight lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    kind: RequestKind,
    seq: u64,
}

impl Ticket {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

/// Hands out tickets and remembers the latest one per kind.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: HashMap<RequestKind, u64>,
}

impl RequestTracker {
    pub fn begin(&mut self, kind: RequestKind) -> Ticket {
        let seq = self.latest.entry(kind).or_insert(0);
        *seq += 1;
        Ticket { kind, seq: *seq }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.get(&ticket.kind) == Some(&ticket.seq)
    }
}

/// Progress of a remote lookup that feeds the view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    NotLoaded,
    Loading,
    Ready,
    /// The lookup failed; the reason is shown instead of the data.
    Unavailable(String),
}

/// Outcome of a user-triggered lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Lookup<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Lookup::Ready(value) => Some(value),
            Lookup::Unavailable(_) => None,
        }
    }
}

/// A task together with the day it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedEvent {
    pub date: DateKey,
    pub event: Event,
}

#[derive(Debug)]
pub struct AppState {
    pub today: NaiveDate,
    pub view: YearMonth,
    pub selected: Option<DateKey>,
    pub city: CityInfo,
    pub theme: Theme,
    pub events: EventCache,
    pub hebrew_dates: BTreeMap<DateKey, HebrewDate>,
    pub shabbat: BTreeMap<DateKey, ShabbatTimes>,
    pub shabbat_status: LoadStatus,
    pub holidays: BTreeMap<DateKey, Holiday>,
    pub holidays_status: LoadStatus,
    /// Year the holiday map was fetched for, with the city used.
    pub holidays_for: Option<(i32, String)>,
    pub requests: RequestTracker,
}

impl AppState {
    pub fn new(today: NaiveDate, city: CityInfo, theme: Theme) -> Self {
        Self {
            today,
            view: YearMonth::of(today),
            selected: None,
            city,
            theme,
            events: EventCache::new(),
            hebrew_dates: BTreeMap::new(),
            shabbat: BTreeMap::new(),
            shabbat_status: LoadStatus::NotLoaded,
            holidays: BTreeMap::new(),
            holidays_status: LoadStatus::NotLoaded,
            holidays_for: None,
            requests: RequestTracker::default(),
        }
    }

    /// The day lookups and the weather refer to: the selection, else today.
    pub fn selected_or_today(&self) -> DateKey {
        self.selected.unwrap_or_else(|| DateKey::new(self.today))
    }

    /// Stored events of one day, in store order.
    pub fn events_for(&self, key: DateKey) -> Vec<Event> {
        self.events
            .get(&key)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Stored events of one day without routine entries.
    pub fn user_events_for(&self, key: DateKey) -> Vec<Event> {
        self.events_for(key)
            .into_iter()
            .filter(|e| !e.is_routine())
            .collect()
    }

    /// Routine blocks followed by stored events, ordered by start time.
    pub fn day_events(&self, key: DateKey) -> Vec<Event> {
        let mut events = routine_events(key.date());
        events.extend(self.events_for(key));
        sort_by_start(&mut events);
        events
    }

    /// Every task in the viewed month, in date order.
    pub fn month_tasks(&self) -> Vec<DatedEvent> {
        self.view
            .days()
            .map(DateKey::new)
            .flat_map(|date| {
                self.events_for(date)
                    .into_iter()
                    .filter(|e| e.kind == EventKind::Task)
                    .map(move |event| DatedEvent { date, event })
            })
            .collect()
    }

    /// Replace the event cache with a fresh snapshot.
    pub fn replace_events(&mut self, events: EventCache) {
        self.events = events;
    }

    /// Merge Hebrew dates fetched under `ticket`. Returns `false` when the
    /// ticket was superseded and the data was dropped.
    pub fn apply_hebrew(
        &mut self,
        ticket: Ticket,
        dates: BTreeMap<DateKey, HebrewDate>,
    ) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.hebrew_dates.extend(dates);
        true
    }

    /// Merge Shabbat times, or record why they are unavailable.
    pub fn apply_shabbat(
        &mut self,
        ticket: Ticket,
        result: Result<BTreeMap<DateKey, ShabbatTimes>, String>,
    ) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        match result {
            Ok(times) => {
                self.shabbat.extend(times);
                self.shabbat_status = LoadStatus::Ready;
            }
            Err(reason) => self.shabbat_status = LoadStatus::Unavailable(reason),
        }
        true
    }

    /// Replace the holiday map for `year`, or record why it is unavailable.
    pub fn apply_holidays(
        &mut self,
        ticket: Ticket,
        year: i32,
        result: Result<BTreeMap<DateKey, Holiday>, String>,
    ) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        match result {
            Ok(holidays) => {
                self.holidays = holidays;
                self.holidays_status = LoadStatus::Ready;
                self.holidays_for = Some((year, self.city.name.clone()));
            }
            Err(reason) => {
                self.holidays_status = LoadStatus::Unavailable(reason);
                self.holidays_for = None;
            }
        }
        true
    }

    /// Whether the holiday map must be fetched again for the viewed year.
    pub fn holidays_stale(&self) -> bool {
        match &self.holidays_for {
            Some((year, city)) => *year != self.view.year || *city != self.city.name,
            None => true,
        }
    }

    /// Forget everything that depends on the city.
    pub fn change_city(&mut self, city: CityInfo) {
        self.city = city;
        self.shabbat.clear();
        self.shabbat_status = LoadStatus::NotLoaded;
        self.holidays.clear();
        self.holidays_status = LoadStatus::NotLoaded;
        self.holidays_for = None;
    }

    fn accept(&self, ticket: Ticket) -> bool {
        let current = self.requests.is_current(ticket);
        if !current {
            tracing::debug!("Dropping superseded {:?} result", ticket.kind());
        }
        current
    }
}
