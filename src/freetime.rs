//! Free-time computation: the complement of a day's busy intervals within a
//! fixed 07:00–23:00 window.

use std::fmt;

use chrono::Timelike;

use crate::event::{Event, parse_clock};

/// 07:00
pub const DAY_START: u32 = 7 * 60;
/// 23:00
pub const DAY_END: u32 = 23 * 60;
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A span of minutes since midnight, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start <= end && end <= MINUTES_PER_DAY).then_some(Self { start, end })
    }

    /// Interval between two `HH:MM` strings.
    pub fn from_clock(start: &str, end: &str) -> Option<Self> {
        Self::new(clock_to_minutes(start)?, clock_to_minutes(end)?)
    }

    /// Busy interval of an event, if it has both a start and an end.
    pub fn of_event(event: &Event) -> Option<Self> {
        Self::from_clock(event.start.as_deref()?, event.end.as_deref()?)
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} – {}",
            minutes_to_clock(self.start),
            minutes_to_clock(self.end)
        )
    }
}

pub fn clock_to_minutes(value: &str) -> Option<u32> {
    parse_clock(value).map(|t| t.hour() * 60 + t.minute())
}

/// Zero-padded 24-hour `HH:MM`.
pub fn minutes_to_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Busy intervals of `events`; events missing either bound are skipped.
pub fn busy_intervals<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<Interval> {
    events.into_iter().filter_map(Interval::of_event).collect()
}

/// Free intervals within the default 07:00–23:00 window.
pub fn free_intervals(busy: &[Interval]) -> Vec<Interval> {
    free_intervals_within(busy, DAY_START, DAY_END)
}

/// Sweep the sorted busy intervals with a cursor starting at `day_start`,
/// emitting every uncovered gap up to `day_end`.
///
/// Overlapping busy intervals are merged by the cursor only ever moving
/// forward. Gaps are clipped to the window and empty gaps are dropped.
pub fn free_intervals_within(busy: &[Interval], day_start: u32, day_end: u32) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = busy.iter().copied().filter(|i| !i.is_empty()).collect();
    sorted.sort_by_key(|i| i.start);

    let mut cursor = day_start;
    let mut free = Vec::new();
    for interval in sorted {
        let gap_end = interval.start.min(day_end);
        if gap_end > cursor {
            free.push(Interval {
                start: cursor,
                end: gap_end,
            });
        }
        cursor = cursor.max(interval.end);
    }
    if cursor < day_end {
        free.push(Interval {
            start: cursor,
            end: day_end,
        });
    }
    free
}

/// Free time for a day given everything scheduled on it, as display strings.
pub fn free_time_labels<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<String> {
    free_intervals(&busy_intervals(events))
        .iter()
        .map(Interval::to_string)
        .collect()
}
