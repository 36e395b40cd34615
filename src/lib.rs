//! BNAPP Calendar Library
//!
//! A family calendar that lays out Gregorian months annotated with Hebrew
//! dates, Shabbat times, holidays, weather and events synced through a
//! Firebase Realtime Database. The library holds the calendar logic and
//! remote clients; the binary is a thin terminal front end over it.

pub mod api;
pub mod calendar;
pub mod config;
pub mod datekey;
pub mod event;
pub mod freetime;
pub mod grid;
pub mod hebrew;
pub mod prefs;
pub mod reminder;
pub mod routine;
pub mod state;
pub mod traits;
pub mod view;

// Re-export commonly used types
pub use api::{EventCache, FirebaseStore, HebcalClient, NominatimClient, OpenMeteoClient};
pub use calendar::{Calendar, Clients, MonthRequest, WeatherStatus};
pub use config::AppConfig;
pub use datekey::{DateKey, DateKeyError, from_key, to_key};
pub use event::{DraftError, Event, EventDraft, EventKind, Owner};
pub use freetime::{Interval, free_intervals, free_time_labels};
pub use grid::{GridError, MonthGrid, MonthGridCell, YearMonth};
pub use hebrew::HebrewDate;
pub use prefs::{CityInfo, Preferences, Theme};
pub use reminder::{Reminder, ReminderScheduler};
pub use routine::routine_events;
pub use state::{AppState, LoadStatus, Lookup};
pub use traits::{Clock, LogNotifier, MockClock, MockNotifier, Notifier, SystemClock};
#[cfg(feature = "desktop")]
pub use traits::SystemNotifier;
pub use view::{DayCell, DayDetail, MonthHeader};
