//! Abstractions for time and side effects to enable testing.
//!
//! This module provides traits for:
//! - `Clock`: the current time, so "today" and reminder delays are testable
//! - `Notifier`: reminder delivery without touching the desktop

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};

// ==================== Clock Trait ====================

/// Trait for abstracting time access.
pub trait Clock: Send + Sync {
    /// Get the current time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Get the current time in the local timezone.
    fn now_local(&self) -> DateTime<Local>;

    /// Today's date on the local calendar.
    fn today(&self) -> NaiveDate {
        self.now_local().date_naive()
    }
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Mock clock for testing with controllable time.
#[derive(Debug, Clone)]
pub struct MockClock {
    utc_time: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a new mock clock set to the given UTC time.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            utc_time: Arc::new(Mutex::new(time)),
        }
    }

    /// Create a mock clock at a wall-clock time in the local timezone.
    pub fn at_local(time: chrono::NaiveDateTime) -> Self {
        use chrono::TimeZone;
        let local = Local
            .from_local_datetime(&time)
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&time));
        Self::new(local.with_timezone(&Utc))
    }

    /// Set the mock clock to a new time.
    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.utc_time.lock().unwrap() = time;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut time = self.utc_time.lock().unwrap();
        *time += duration;
    }
}

impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.utc_time.lock().unwrap()
    }

    fn now_local(&self) -> DateTime<Local> {
        self.now_utc().with_timezone(&Local)
    }
}

// ==================== Notifier Trait ====================

/// Trait for abstracting system notifications.
pub trait Notifier: Send + Sync {
    /// Send a notification with the given title and body.
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Desktop notifications via notify-rust.
#[cfg(feature = "desktop")]
#[derive(Debug, Clone, Default)]
pub struct SystemNotifier;

#[cfg(feature = "desktop")]
impl Notifier for SystemNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("BNAPP Calendar")
            .show()?;
        Ok(())
    }
}

/// Notifier that only writes to the log, for headless builds.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        tracing::info!("{}: {}", title, body);
        Ok(())
    }
}

/// Mock notifier for testing that records all notifications.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    notifications: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNotifier {
    /// Create a new mock notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all notifications that have been sent.
    pub fn get_notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    /// Get the count of notifications sent.
    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    /// Check if any notification was sent.
    pub fn was_called(&self) -> bool {
        !self.notifications.lock().unwrap().is_empty()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}
