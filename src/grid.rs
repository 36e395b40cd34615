//! Month grid layout.
//!
//! A month is always painted as six full weeks (Sunday first), padded with
//! trailing days of the previous month and leading days of the next one.

use chrono::{Datelike, Days, Months, NaiveDate};
use thiserror::Error;

pub const GRID_ROWS: usize = 6;
pub const GRID_COLS: usize = 7;
pub const GRID_LENGTH: usize = GRID_ROWS * GRID_COLS;

/// Viewable years. The padding cells of every grid in this range still have
/// a four-digit date key (December 9999 would spill into year 10000).
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9998;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("month index {0} is outside 0..=11")]
    Month(u32),
    #[error("year {0} is outside the supported range")]
    Year(i32),
}

/// A viewed month. `month0` is 0-based (January = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month0: u32,
}

impl YearMonth {
    pub fn new(year: i32, month0: u32) -> Result<Self, GridError> {
        if month0 > 11 {
            return Err(GridError::Month(month0));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(GridError::Year(year));
        }
        Ok(Self { year, month0 })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // Validated in `new`, or derived from a real date in `of`.
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day() + Days::new(self.days_in_month() as u64 - 1)
    }

    pub fn days_in_month(&self) -> u32 {
        let first = self.first_day();
        match first.checked_add_months(Months::new(1)) {
            Some(next) => (next - first).num_days() as u32,
            None => 31,
        }
    }

    /// Previous month, wrapping December of the prior year. Stays put at the
    /// first viewable month.
    pub fn prev(&self) -> Self {
        if self.month0 == 0 && self.year <= MIN_YEAR {
            *self
        } else if self.month0 == 0 {
            Self {
                year: self.year - 1,
                month0: 11,
            }
        } else {
            Self {
                year: self.year,
                month0: self.month0 - 1,
            }
        }
    }

    /// Next month, wrapping to January of the following year. Stays put at
    /// the last viewable month.
    pub fn next(&self) -> Self {
        if self.month0 == 11 && self.year >= MAX_YEAR {
            *self
        } else if self.month0 == 11 {
            Self {
                year: self.year + 1,
                month0: 0,
            }
        } else {
            Self {
                year: self.year,
                month0: self.month0 + 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month0() == self.month0
    }

    /// Every day of the month in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.first_day()
            .iter_days()
            .take(self.days_in_month() as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthGridCell {
    pub date: NaiveDate,
    pub is_other_month: bool,
}

/// The 42-cell layout of one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    month: YearMonth,
    cells: Vec<MonthGridCell>,
}

impl MonthGrid {
    /// Build the grid for `year` / 0-based `month0`.
    pub fn build(year: i32, month0: u32) -> Result<Self, GridError> {
        Ok(Self::for_month(YearMonth::new(year, month0)?))
    }

    pub fn for_month(month: YearMonth) -> Self {
        let first = month.first_day();
        let leading = first.weekday().num_days_from_sunday() as u64;
        let mut cells = Vec::with_capacity(GRID_LENGTH);

        for back in (1..=leading).rev() {
            cells.push(MonthGridCell {
                date: first - Days::new(back),
                is_other_month: true,
            });
        }

        cells.extend(month.days().map(|date| MonthGridCell {
            date,
            is_other_month: false,
        }));

        // Four- and five-week months get padded the same way as six-week ones.
        let to_add = GRID_LENGTH.saturating_sub(cells.len());
        let next_first = month.last_day() + Days::new(1);
        cells.extend((0..to_add as u64).map(|i| MonthGridCell {
            date: next_first + Days::new(i),
            is_other_month: true,
        }));

        Self { month, cells }
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn cells(&self) -> &[MonthGridCell] {
        &self.cells
    }

    /// The six weeks of the grid, Sunday to Saturday.
    pub fn rows(&self) -> impl Iterator<Item = &[MonthGridCell]> {
        self.cells.chunks(GRID_COLS)
    }

    pub fn first(&self) -> NaiveDate {
        self.cells[0].date
    }

    pub fn last(&self) -> NaiveDate {
        self.cells[self.cells.len() - 1].date
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.cells.iter().position(|c| c.date == date)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Weekday;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_grid_invariants(grid: &MonthGrid) {
        let month = grid.month();
        assert_eq!(grid.cells().len(), GRID_LENGTH);
        for pair in grid.cells().windows(2) {
            assert_eq!(pair[1].date, pair[0].date + Days::new(1));
        }
        for cell in grid.cells() {
            assert_eq!(cell.is_other_month, !month.contains(cell.date));
        }
        assert_eq!(grid.first().weekday(), Weekday::Sun);
        let current = grid.cells().iter().filter(|c| !c.is_other_month).count();
        assert_eq!(current as u32, month.days_in_month());
    }

    #[test]
    fn test_rejects_bad_month_index() {
        assert_eq!(MonthGrid::build(2024, 12), Err(GridError::Month(12)));
    }

    #[test]
    fn test_rejects_out_of_range_year() {
        assert_eq!(MonthGrid::build(0, 0), Err(GridError::Year(0)));
        assert_eq!(MonthGrid::build(10_000, 0), Err(GridError::Year(10_000)));
        assert_eq!(MonthGrid::build(9999, 11), Err(GridError::Year(9999)));
    }

    #[test]
    fn test_edge_grids_have_parseable_keys() {
        for (year, month0) in [(1, 0), (9998, 11)] {
            let grid = MonthGrid::build(year, month0).unwrap();
            for cell in grid.cells() {
                let key = crate::datekey::to_key(&cell.date);
                assert_eq!(crate::datekey::from_key(&key), Ok(cell.date), "{key}");
            }
        }
    }

    #[test]
    fn test_navigation_stops_at_viewable_range() {
        let last = YearMonth::new(9998, 11).unwrap();
        assert_eq!(last.next(), last);
        let first = YearMonth::new(1, 0).unwrap();
        assert_eq!(first.prev(), first);
        assert_eq!(YearMonth::new(9998, 10).unwrap().next(), last);
    }

    #[test]
    fn test_month_starting_on_sunday_has_no_leading_days() {
        // September 2024 starts on a Sunday.
        let grid = MonthGrid::build(2024, 8).unwrap();
        assert_eq!(grid.first(), date(2024, 9, 1));
        assert!(!grid.cells()[0].is_other_month);
        assert_eq!(grid.last(), date(2024, 10, 12));
    }

    #[test]
    fn test_february_of_four_exact_weeks() {
        // February 2015: 28 days starting on Sunday, padded with two weeks.
        let grid = MonthGrid::build(2015, 1).unwrap();
        assert_grid_invariants(&grid);
        assert_eq!(grid.first(), date(2015, 2, 1));
        assert_eq!(grid.last(), date(2015, 3, 14));
    }

    #[test]
    fn test_month_needing_six_rows() {
        // March 2025: 31 days starting Saturday spans six weeks.
        let grid = MonthGrid::build(2025, 2).unwrap();
        assert_grid_invariants(&grid);
        assert_eq!(grid.first(), date(2025, 2, 23));
        assert_eq!(grid.last(), date(2025, 4, 5));
        assert!(grid.cells()[41].is_other_month);
        assert_eq!(grid.cells()[36].date, date(2025, 3, 31));
    }

    #[test]
    fn test_rows_are_weeks() {
        let grid = MonthGrid::build(2024, 4).unwrap();
        let rows: Vec<_> = grid.rows().collect();
        assert_eq!(rows.len(), GRID_ROWS);
        for row in rows {
            assert_eq!(row.len(), GRID_COLS);
            assert_eq!(row[0].date.weekday(), Weekday::Sun);
            assert_eq!(row[6].date.weekday(), Weekday::Sat);
        }
    }

    #[test]
    fn test_index_of() {
        let grid = MonthGrid::build(2024, 4).unwrap();
        // May 1st 2024 is a Wednesday.
        assert_eq!(grid.index_of(date(2024, 5, 1)), Some(3));
        assert_eq!(grid.index_of(date(2024, 8, 1)), None);
    }

    #[test]
    fn test_every_weekday_and_length_combination() {
        let mut seen = HashSet::new();
        for year in 1900..2100 {
            for month0 in 0..12 {
                let grid = MonthGrid::build(year, month0).unwrap();
                assert_grid_invariants(&grid);
                let month = grid.month();
                seen.insert((
                    month.first_day().weekday().num_days_from_sunday(),
                    month.days_in_month(),
                ));
            }
        }
        // 7 first weekdays x 4 month lengths (28..=31).
        assert_eq!(seen.len(), 28);
    }

    #[test]
    fn test_year_month_navigation_wraps() {
        let jan = YearMonth::new(2025, 0).unwrap();
        assert_eq!(jan.prev(), YearMonth::new(2024, 11).unwrap());
        let dec = YearMonth::new(2024, 11).unwrap();
        assert_eq!(dec.next(), jan);
        assert_eq!(YearMonth::of(date(2024, 7, 19)), YearMonth::new(2024, 6).unwrap());
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(YearMonth::new(2024, 1).unwrap().days_in_month(), 29);
        assert_eq!(YearMonth::new(2023, 1).unwrap().days_in_month(), 28);
        assert_eq!(YearMonth::new(2023, 3).unwrap().days_in_month(), 30);
        assert_eq!(YearMonth::new(2023, 11).unwrap().days_in_month(), 31);
        assert_eq!(YearMonth::new(2023, 11).unwrap().last_day(), date(2023, 12, 31));
    }

    // ==================== Property-Based Tests ====================

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn grid_always_has_42_ascending_cells(year in 1i32..=9998, month0 in 0u32..12) {
                let grid = MonthGrid::build(year, month0).unwrap();
                prop_assert_eq!(grid.cells().len(), GRID_LENGTH);
                for pair in grid.cells().windows(2) {
                    prop_assert!(pair[0].date < pair[1].date);
                }
            }
        }
    }
}
