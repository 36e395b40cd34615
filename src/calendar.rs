//! The calendar service: owns the remote clients, the preferences, the
//! reminder scheduler and the [`AppState`], and turns remote failures into
//! degraded state instead of errors.
//!
//! Month lookups are split into a request phase that takes tickets
//! ([`Calendar::month_request`]), a fetch phase that runs without borrowing
//! the calendar ([`MonthRequest::run`]) and an apply phase
//! ([`Calendar::apply_month`]) that drops superseded results.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{
    self, DayWeather, EventCache, FirebaseStore, HebcalClient, Holiday, NominatimClient,
    OpenMeteoClient, ShabbatTimes,
};
use crate::config::AppConfig;
use crate::datekey::DateKey;
use crate::event::{Event, EventDraft};
use crate::freetime::free_time_labels;
use crate::grid::{GridError, YearMonth};
use crate::hebrew::HebrewDate;
use crate::prefs::{CityInfo, Preferences, Theme};
use crate::reminder::{Reminder, ReminderScheduler};
use crate::state::{AppState, DatedEvent, LoadStatus, Lookup, RequestKind, Ticket};
use crate::traits::{Clock, Notifier};
use crate::view::{DayCell, DayDetail, MonthHeader, month_cells};

const NO_COORDINATES: &str = "city has no coordinates";

/// The remote services the calendar talks to.
#[derive(Clone, Debug)]
pub struct Clients {
    pub hebcal: HebcalClient,
    pub geocode: NominatimClient,
    pub weather: OpenMeteoClient,
    /// Absent when no database URL is configured; events are then read-only
    /// and empty.
    pub store: Option<FirebaseStore>,
}

impl Clients {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = api::http_client(&config.network, &config.api.user_agent)?;
        let store = match &config.store.url {
            Some(url) if !url.trim().is_empty() => Some(FirebaseStore::new(
                url.trim(),
                config.store.auth_token.clone(),
                &config.network,
                &config.api.user_agent,
            )?),
            _ => None,
        };

        Ok(Self {
            hebcal: HebcalClient::new(http.clone(), &config.api.hebcal_url),
            geocode: NominatimClient::new(http.clone(), &config.api.nominatim_url),
            weather: OpenMeteoClient::new(http, &config.api.open_meteo_url),
            store,
        })
    }
}

/// Lookups for one month, ready to run.
#[derive(Debug)]
pub struct MonthRequest {
    month: YearMonth,
    city: CityInfo,
    hebcal: HebcalClient,
    hebrew: Ticket,
    shabbat: Option<Ticket>,
    holidays: Option<Ticket>,
}

/// Results of a [`MonthRequest`], still tagged with their tickets.
#[derive(Debug)]
pub struct MonthData {
    month: YearMonth,
    hebrew: (Ticket, BTreeMap<DateKey, HebrewDate>),
    shabbat: Option<(Ticket, Result<BTreeMap<DateKey, ShabbatTimes>, String>)>,
    holidays: Option<(Ticket, Result<BTreeMap<DateKey, Holiday>, String>)>,
}

impl MonthRequest {
    pub fn month(&self) -> YearMonth {
        self.month
    }

    /// Fetch Hebrew dates, Shabbat times and (when due) holidays
    /// concurrently.
    pub async fn run(self) -> MonthData {
        let Self {
            month,
            city,
            hebcal,
            hebrew,
            shabbat,
            holidays,
        } = self;

        let shabbat_fetch = async {
            match shabbat {
                Some(_) => Some(hebcal.fetch_shabbat(&city, month).await),
                None => None,
            }
        };
        let holidays_fetch = async {
            match holidays {
                Some(_) => Some(hebcal.fetch_holidays(&city, month.year).await),
                None => None,
            }
        };
        let (dates, shabbat_result, holidays_result) = tokio::join!(
            hebcal.fetch_hebrew_month(month),
            shabbat_fetch,
            holidays_fetch
        );

        MonthData {
            month,
            hebrew: (hebrew, dates),
            shabbat: shabbat.zip(shabbat_result.map(|r| r.map_err(|e| degrade("Shabbat times", e)))),
            holidays: holidays.zip(holidays_result.map(|r| r.map_err(|e| degrade("Holidays", e)))),
        }
    }
}

fn degrade(what: &str, error: anyhow::Error) -> String {
    tracing::warn!("{} unavailable: {:#}", what, error);
    format!("{error:#}")
}

/// Result of a weather lookup for the selected day.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherStatus {
    Ready { city: String, day: DayWeather },
    NoCoordinates,
    /// The forecast came back without any days.
    NoData,
    Failed(String),
    /// A newer weather request was started before this one finished.
    Superseded,
}

/// Weather lookup for one day, ready to run.
#[derive(Debug)]
pub struct WeatherRequest {
    ticket: Ticket,
    key: DateKey,
    city: CityInfo,
    client: OpenMeteoClient,
}

impl WeatherRequest {
    pub async fn run(self) -> (Ticket, WeatherStatus) {
        let status = if !self.city.has_coordinates() {
            WeatherStatus::NoCoordinates
        } else {
            match self.client.fetch_daily(&self.city).await {
                Ok(daily) => match daily.select(self.key) {
                    Some(day) => WeatherStatus::Ready {
                        city: self.city.name.clone(),
                        day,
                    },
                    None => WeatherStatus::NoData,
                },
                Err(e) => WeatherStatus::Failed(degrade("Weather", e)),
            }
        };
        (self.ticket, status)
    }
}

pub struct Calendar {
    clients: Clients,
    prefs: Preferences,
    clock: Arc<dyn Clock>,
    reminders: ReminderScheduler,
    state: AppState,
}

impl Calendar {
    /// Build a calendar, restoring the saved city and theme.
    pub fn new(
        clients: Clients,
        prefs: Preferences,
        default_city: CityInfo,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let city = prefs.load_city().unwrap_or(default_city);
        let theme = prefs.load_theme();
        let state = AppState::new(clock.today(), city, theme);
        tracing::debug!("Calendar for {} in {:?} theme", state.city.name, theme);

        Self {
            clients,
            prefs,
            reminders: ReminderScheduler::new(Arc::clone(&clock), notifier),
            clock,
            state,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let clients = Clients::from_config(config)?;
        let prefs = Preferences::new(config.storage.prefs_dir());
        Ok(Self::new(
            clients,
            prefs,
            CityInfo::from(&config.city),
            clock,
            notifier,
        ))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> Option<&FirebaseStore> {
        self.clients.store.as_ref()
    }

    // ==================== Month Navigation ====================

    /// Take tickets for the viewed month's lookups. Holidays are only
    /// requested when the year or city changed, unless `force_holidays`.
    pub fn month_request(&mut self, force_holidays: bool) -> MonthRequest {
        let state = &mut self.state;
        let hebrew = state.requests.begin(RequestKind::HebrewDates);

        let located = state.city.has_coordinates();
        let shabbat = if located {
            state.shabbat_status = LoadStatus::Loading;
            Some(state.requests.begin(RequestKind::Shabbat))
        } else {
            state.shabbat_status = LoadStatus::Unavailable(NO_COORDINATES.to_string());
            None
        };
        let holidays = if !located {
            state.holidays_status = LoadStatus::Unavailable(NO_COORDINATES.to_string());
            None
        } else if force_holidays || state.holidays_stale() {
            state.holidays_status = LoadStatus::Loading;
            Some(state.requests.begin(RequestKind::Holidays))
        } else {
            None
        };

        MonthRequest {
            month: state.view,
            city: state.city.clone(),
            hebcal: self.clients.hebcal.clone(),
            hebrew,
            shabbat,
            holidays,
        }
    }

    /// Store the results that are still current. Returns `false` when every
    /// part was superseded.
    pub fn apply_month(&mut self, data: MonthData) -> bool {
        let (ticket, dates) = data.hebrew;
        let mut applied = self.state.apply_hebrew(ticket, dates);
        if let Some((ticket, result)) = data.shabbat {
            applied |= self.state.apply_shabbat(ticket, result);
        }
        if let Some((ticket, result)) = data.holidays {
            applied |= self.state.apply_holidays(ticket, data.month.year, result);
        }
        applied
    }

    /// Fetch and store everything the viewed month needs.
    pub async fn reload_month(&mut self) {
        let request = self.month_request(false);
        let data = request.run().await;
        self.apply_month(data);
    }

    pub async fn show_month(&mut self, year: i32, month0: u32) -> Result<(), GridError> {
        self.state.view = YearMonth::new(year, month0)?;
        self.reload_month().await;
        Ok(())
    }

    pub async fn prev_month(&mut self) {
        self.state.view = self.state.view.prev();
        self.reload_month().await;
    }

    pub async fn next_month(&mut self) {
        self.state.view = self.state.view.next();
        self.reload_month().await;
    }

    /// Jump back to the current month and select today.
    pub async fn go_to_today(&mut self) {
        self.state.today = self.clock.today();
        self.state.view = YearMonth::of(self.state.today);
        self.state.selected = Some(DateKey::new(self.state.today));
        self.reload_month().await;
    }

    // ==================== Views ====================

    pub fn header(&self) -> MonthHeader {
        MonthHeader::build(&self.state)
    }

    pub fn cells(&self) -> Vec<DayCell> {
        month_cells(&self.state)
    }

    /// Select a day and describe it.
    pub fn open_day(&mut self, key: DateKey) -> DayDetail {
        self.state.selected = Some(key);
        DayDetail::build(&self.state, key)
    }

    /// Free slots of a day, routine included.
    pub fn free_time(&self, key: DateKey) -> Vec<String> {
        free_time_labels(&self.state.day_events(key))
    }

    /// Tasks of the viewed month.
    pub fn upcoming_tasks(&self) -> Vec<DatedEvent> {
        self.state.month_tasks()
    }

    // ==================== Weather ====================

    pub fn weather_request(&mut self) -> WeatherRequest {
        WeatherRequest {
            ticket: self.state.requests.begin(RequestKind::Weather),
            key: self.state.selected_or_today(),
            city: self.state.city.clone(),
            client: self.clients.weather.clone(),
        }
    }

    /// Check a finished weather lookup against the latest request.
    pub fn accept_weather(&self, ticket: Ticket, status: WeatherStatus) -> WeatherStatus {
        if self.state.requests.is_current(ticket) {
            status
        } else {
            WeatherStatus::Superseded
        }
    }

    /// Forecast for the selected day (or today).
    pub async fn weather(&mut self) -> WeatherStatus {
        let (ticket, status) = self.weather_request().run().await;
        self.accept_weather(ticket, status)
    }

    // ==================== City & Theme ====================

    pub async fn search_city(&self, query: &str) -> Lookup<Vec<CityInfo>> {
        let query = query.trim();
        if query.is_empty() {
            return Lookup::Ready(Vec::new());
        }
        match self.clients.geocode.search(query).await {
            Ok(cities) => Lookup::Ready(cities),
            Err(e) => Lookup::Unavailable(degrade("City search", e)),
        }
    }

    /// Switch city, remember it and refetch the city-dependent data.
    pub async fn select_city(&mut self, city: CityInfo) {
        if let Err(e) = self.prefs.save_city(&city) {
            tracing::debug!("Could not save city: {:#}", e);
        }
        tracing::info!("City set to {}", city.name);
        self.state.change_city(city);
        let request = self.month_request(true);
        let data = request.run().await;
        self.apply_month(data);
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.state.theme = theme;
        if let Err(e) = self.prefs.save_theme(theme) {
            tracing::debug!("Could not save theme: {:#}", e);
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.state.theme.toggled();
        self.set_theme(theme);
        theme
    }

    // ==================== Events ====================

    /// Validate a draft, persist it and schedule its reminder.
    pub async fn save_event(&mut self, draft: &EventDraft) -> Result<(DateKey, Event)> {
        let (key, mut event) = draft.submit()?;
        let store = self
            .clients
            .store
            .as_ref()
            .context("No event store configured")?;
        let id = store.upsert(key, &mut event).await?;

        self.state
            .events
            .entry(key)
            .or_default()
            .insert(id, event.clone());
        if let Some(reminder) = self.reminders.schedule(key, &event) {
            tracing::info!("Reminder set for {}", reminder.fire_at);
        }
        Ok((key, event))
    }

    /// Reload all events from the store.
    pub async fn refresh_events(&mut self) -> Result<()> {
        let Some(store) = &self.clients.store else {
            return Ok(());
        };
        let events = store.fetch_all().await?;
        self.state.replace_events(events);
        Ok(())
    }

    /// Replace the cache with a live snapshot and plan its reminders again.
    pub fn apply_snapshot(&mut self, events: EventCache) -> Vec<Reminder> {
        self.state.replace_events(events);
        self.state.today = self.clock.today();
        self.reminders.reschedule_all(&self.state.events)
    }

    pub fn pending_reminders(&self) -> usize {
        self.reminders.pending_count()
    }
}
