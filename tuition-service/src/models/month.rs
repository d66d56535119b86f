//! Billing period key.
//!
//! A month key is the exact lexical form `YYYY-MM`. It identifies one
//! billing period and is immutable once a record carries it. Parsing is
//! strict: `2026-2` is not a month key, `2026-02` is.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raised when a string is not a valid `YYYY-MM` month key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month key, expected YYYY-MM")]
pub struct InvalidMonthKey;

/// A validated `YYYY-MM` billing period.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Parse the exact `YYYY-MM` form. No zero-pad forgiveness.
    pub fn parse(s: &str) -> Result<Self, InvalidMonthKey> {
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(InvalidMonthKey);
        }
        let (year_part, month_part) = (&s[..4], &s[5..]);
        if !year_part.bytes().all(|b| b.is_ascii_digit())
            || !month_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(InvalidMonthKey);
        }
        let year: i32 = year_part.parse().map_err(|_| InvalidMonthKey)?;
        let month: u32 = month_part.parse().map_err(|_| InvalidMonthKey)?;
        if !(1..=12).contains(&month) {
            return Err(InvalidMonthKey);
        }
        Ok(Self { year, month })
    }

    /// The month key covering the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First calendar day of the period.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("month key is validated on construction")
    }

    /// Last calendar day of the period.
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .expect("month key is validated on construction")
            - Duration::days(1)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = InvalidMonthKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = InvalidMonthKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}

/// `validator` rule for raw month fields on request payloads.
pub fn validate_month_key(value: &str) -> Result<(), validator::ValidationError> {
    MonthKey::parse(value)
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("month_format"))
}
