//! Hebrew calendar annotations.

use serde::{Deserialize, Serialize};

/// Day-of-month labels 1–30 in Hebrew numerals.
///
/// Single letters carry a geresh (׳), compound forms a gershayim (״) before the
/// last letter. 15 and 16 use ט״ו / ט״ז rather than spelling out the divine name.
const DAY_LABELS: [&str; 30] = [
    "א׳", "ב׳", "ג׳", "ד׳", "ה׳", "ו׳", "ז׳", "ח׳", "ט׳", "י׳", //
    "י״א", "י״ב", "י״ג", "י״ד", "ט״ו", "ט״ז", "י״ז", "י״ח", "י״ט", "כ׳", //
    "כ״א", "כ״ב", "כ״ג", "כ״ד", "כ״ה", "כ״ו", "כ״ז", "כ״ח", "כ״ט", "ל׳",
];

/// Hebrew-numeral label for a day of the Hebrew month; decimal outside 1–30.
pub fn day_label(day: u32) -> String {
    match day {
        1..=30 => DAY_LABELS[day as usize - 1].to_string(),
        _ => day.to_string(),
    }
}

/// A Gregorian day's position in the Hebrew calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HebrewDate {
    pub day: u32,
    pub month: String,
    pub year: i32,
    pub label: String,
}

impl HebrewDate {
    pub fn new(day: u32, month: impl Into<String>, year: i32) -> Self {
        Self {
            day,
            month: month.into(),
            year,
            label: day_label(day),
        }
    }

    /// `"<month> <year>"`, as used in the month header.
    pub fn month_year(&self) -> String {
        format!("{} {}", self.month, self.year)
    }

    /// `"<day label> <month> <year>"`, as used in the day view.
    pub fn full(&self) -> String {
        format!("{} {} {}", self.label, self.month, self.year)
    }
}
