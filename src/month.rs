use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::FaturaError;

/// A calendar month, rendered and parsed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::from_date(chrono::Local::now().date_naive())
    }

    pub fn add_months(self, months: u32) -> Self {
        let index = self.year as i64 * 12 + (self.month as i64 - 1) + months as i64;
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn next(self) -> Self {
        self.add_months(1)
    }

    /// Number of months from `self` to `later`; negative if `later` is earlier.
    pub fn months_until(self, later: Self) -> i64 {
        (later.year as i64 * 12 + later.month as i64) - (self.year as i64 * 12 + self.month as i64)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = FaturaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FaturaError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(ym("2025-01").to_string(), "2025-01");
        assert_eq!(ym("2025-1").to_string(), "2025-01");
        assert!("2025-13".parse::<YearMonth>().is_err());
        assert!("2025".parse::<YearMonth>().is_err());
        assert!("jan-2025".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_add_months_rolls_over_year() {
        assert_eq!(ym("2024-11").add_months(3), ym("2025-02"));
        assert_eq!(ym("2024-12").next(), ym("2025-01"));
        assert_eq!(ym("2024-05").add_months(0), ym("2024-05"));
        assert_eq!(ym("2024-01").add_months(24), ym("2026-01"));
    }

    #[test]
    fn test_ordering_and_distance() {
        assert!(ym("2024-12") < ym("2025-01"));
        assert_eq!(ym("2024-11").months_until(ym("2025-02")), 3);
        assert_eq!(ym("2025-02").months_until(ym("2024-11")), -3);
    }

    #[test]
    fn test_from_date() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 31).unwrap();
        assert_eq!(YearMonth::from_date(d), ym("2025-07"));
    }
}
