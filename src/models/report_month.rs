use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A calendar month, the unit every savings figure is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportMonth {
    year: i32,
    month: u32,
}

impl ReportMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The most recent month that has fully elapsed as of `today`.
    pub fn last_completed(today: NaiveDate) -> Self {
        Self::containing(today).previous()
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn days(&self) -> u32 {
        match self.month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            _ if is_leap_year(self.year) => 29,
            _ => 28,
        }
    }

    /// `startTime` query value: first instant of the month.
    pub fn start_param(&self) -> String {
        format!("{:04}-{:02}-01T00:00:00.000000000Z", self.year, self.month)
    }

    /// `endTime` query value: last second of the month.
    pub fn end_param(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T23:59:59.000000000Z",
            self.year,
            self.month,
            self.days()
        )
    }

    /// Inclusive iteration from `self` through `last`. Empty when `last < self`.
    pub fn through(self, last: ReportMonth) -> impl Iterator<Item = ReportMonth> {
        std::iter::successors(Some(self), |m| Some(m.next())).take_while(move |m| *m <= last)
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(ReportMonth::new(2024, 2).unwrap().days(), 29);
        assert_eq!(ReportMonth::new(2023, 2).unwrap().days(), 28);
        assert_eq!(ReportMonth::new(1900, 2).unwrap().days(), 28);
        assert_eq!(ReportMonth::new(2000, 2).unwrap().days(), 29);
        assert_eq!(ReportMonth::new(2024, 4).unwrap().days(), 30);
        assert_eq!(ReportMonth::new(2024, 12).unwrap().days(), 31);
    }

    #[test]
    fn test_last_completed_wraps_year() {
        assert_eq!(ReportMonth::last_completed(date("2024-03-10")).to_string(), "2024-02");
        assert_eq!(ReportMonth::last_completed(date("2024-01-01")).to_string(), "2023-12");
    }

    #[test]
    fn test_window_params() {
        let feb = ReportMonth::new(2024, 2).unwrap();
        assert_eq!(feb.start_param(), "2024-02-01T00:00:00.000000000Z");
        assert_eq!(feb.end_param(), "2024-02-29T23:59:59.000000000Z");
    }

    #[test]
    fn test_through_is_inclusive_and_crosses_years() {
        let months: Vec<String> = ReportMonth::new(2023, 11)
            .unwrap()
            .through(ReportMonth::new(2024, 2).unwrap())
            .map(|m| m.to_string())
            .collect();
        assert_eq!(months, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn test_through_is_empty_when_start_after_end() {
        let start = ReportMonth::new(2024, 3).unwrap();
        assert_eq!(start.through(start.previous()).count(), 0);
    }

    #[test]
    fn test_rejects_invalid_month() {
        assert!(ReportMonth::new(2024, 0).is_none());
        assert!(ReportMonth::new(2024, 13).is_none());
    }
}
