use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PayrollError;

pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 2100;

/// One payroll cycle: a calendar month of a given year.
///
/// Field order makes the derived `Ord` chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct Period {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 1, minimum = 1, maximum = 12)]
    pub month: u32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self, PayrollError> {
        if !(1..=12).contains(&month) {
            return Err(PayrollError::validation(
                "month",
                format!("{month} is not between 1 and 12"),
            ));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(PayrollError::validation(
                "year",
                format!("{year} is not between {MIN_YEAR} and {MAX_YEAR}"),
            ));
        }
        Ok(Self { year, month })
    }

    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction, day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Whole months from `self` to `later`; negative when `later` is earlier.
    pub fn months_until(&self, later: &Period) -> i64 {
        (later.year as i64 - self.year as i64) * 12 + later.month as i64 - self.month as i64
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
