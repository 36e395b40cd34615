//! Local reminders fired a configurable number of minutes before an event.
//!
//! A reminder is planned against the injected [`Clock`] and delivered through
//! the injected [`Notifier`] from a tokio task that sleeps until the fire
//! time. Reminders whose fire time has already passed are never scheduled.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tokio::task::JoinHandle;

use crate::api::EventCache;
use crate::datekey::DateKey;
use crate::event::Event;
use crate::traits::{Clock, Notifier};

pub const REMINDER_TITLE: &str = "Calendar reminder";

/// When and what to notify for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub key: String,
    pub title: String,
    pub fire_at: NaiveDateTime,
}

impl Reminder {
    /// Plan a reminder for `event` on `date`, or `None` when the event has no
    /// start, has notifications off, or the fire time is not after `now`.
    pub fn plan(date: DateKey, event: &Event, now: NaiveDateTime) -> Option<Self> {
        if !event.notify {
            return None;
        }
        let start = event.start_time()?;
        let fire_at = date.date().and_time(start) - Duration::minutes(event.notify_minutes.into());
        if fire_at <= now {
            return None;
        }
        let key = match &event.id {
            Some(id) => id.clone(),
            None => format!("{date}/{}", event.title),
        };
        Some(Self {
            key,
            title: event.title.clone(),
            fire_at,
        })
    }
}

/// Owns the sleeping reminder tasks.
pub struct ReminderScheduler {
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    pending: HashMap<String, JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            clock,
            notifier,
            pending: HashMap::new(),
        }
    }

    /// Schedule a reminder for one event, replacing any earlier one with the
    /// same identity. Must be called inside a tokio runtime.
    pub fn schedule(&mut self, date: DateKey, event: &Event) -> Option<Reminder> {
        let now = self.clock.now_local().naive_local();
        let reminder = Reminder::plan(date, event, now)?;
        let delay = (reminder.fire_at - now).to_std().ok()?;

        let notifier = Arc::clone(&self.notifier);
        let title = reminder.title.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = notifier.notify(REMINDER_TITLE, &title) {
                tracing::warn!("Failed to deliver reminder for {:?}: {:#}", title, e);
            }
        });

        self.pending.retain(|_, h| !h.is_finished());
        if let Some(previous) = self.pending.insert(reminder.key.clone(), handle) {
            previous.abort();
        }
        tracing::debug!("Reminder for {:?} at {}", reminder.title, reminder.fire_at);
        Some(reminder)
    }

    /// Drop every pending reminder and plan afresh from a full snapshot.
    pub fn reschedule_all(&mut self, events: &EventCache) -> Vec<Reminder> {
        self.cancel_all();
        let mut planned = Vec::new();
        for (date, bucket) in events {
            for event in bucket.values() {
                if let Some(reminder) = self.schedule(*date, event) {
                    planned.push(reminder);
                }
            }
        }
        planned.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));
        planned
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }

    /// Number of reminders that have not fired yet.
    pub fn pending_count(&self) -> usize {
        self.pending.values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
