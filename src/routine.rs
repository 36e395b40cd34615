//! Routine blocks synthesized from the weekday.
//!
//! These never reach the store; they are added on the fly to day listings and
//! to the free-time computation.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::event::{Event, EventKind, Owner};

pub const WORK_START: &str = "08:00";
pub const WORK_END: &str = "17:00";
pub const FOOD_START: &str = "17:00";
pub const FOOD_END: &str = "18:30";

/// Whether `date` falls on a working day (Monday to Friday).
pub fn is_work_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The routine events for `date`: work hours and dinner on working days,
/// nothing on weekends.
pub fn routine_events(date: NaiveDate) -> Vec<Event> {
    if !is_work_day(date) {
        return Vec::new();
    }
    vec![
        routine(EventKind::RoutineWork, "Work", WORK_START, WORK_END),
        routine(EventKind::RoutineFood, "Dinner & shower", FOOD_START, FOOD_END),
    ]
}

fn routine(kind: EventKind, title: &str, start: &str, end: &str) -> Event {
    let id = match kind {
        EventKind::RoutineFood => "routine-food",
        _ => "routine-work",
    };
    Event {
        id: Some(id.to_string()),
        title: title.to_string(),
        kind,
        owner: Owner::Both,
        start: Some(start.to_string()),
        end: Some(end.to_string()),
        address: None,
        notify: false,
        notify_minutes: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekdays_get_work_and_food_blocks() {
        // 2024-06-10 is a Monday.
        for offset in 0..5 {
            let day = date(2024, 6, 10 + offset);
            let events = routine_events(day);
            assert_eq!(events.len(), 2, "{day} should have routine blocks");
            assert_eq!(events[0].kind, EventKind::RoutineWork);
            assert_eq!(events[0].start.as_deref(), Some("08:00"));
            assert_eq!(events[0].end.as_deref(), Some("17:00"));
            assert_eq!(events[1].kind, EventKind::RoutineFood);
            assert_eq!(events[1].start.as_deref(), Some("17:00"));
            assert_eq!(events[1].end.as_deref(), Some("18:30"));
            assert!(events.iter().all(|e| e.is_routine()));
        }
    }

    #[test]
    fn test_weekend_has_no_routine() {
        assert!(routine_events(date(2024, 6, 15)).is_empty()); // Saturday
        assert!(routine_events(date(2024, 6, 16)).is_empty()); // Sunday
    }

    #[test]
    fn test_routine_ids_are_fixed() {
        let events = routine_events(date(2024, 6, 12));
        assert_eq!(events[0].id.as_deref(), Some("routine-work"));
        assert_eq!(events[1].id.as_deref(), Some("routine-food"));
    }
}
