//! Jalali (Solar Hijri) accounting periods.
//!
//! Expenses and payments are grouped by the Jalali year and month of the civil date they
//! happened on. The conversion counts days from 1600-01-01 Gregorian (= 978-10-11 Jalali)
//! and walks the 33-year leap cycle, so it is defined for every date `chrono` can hold.

use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

const GREGORIAN_DAYS_IN_MONTH: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const JALALI_DAYS_IN_MONTH: [i64; 12] = [31, 31, 31, 31, 31, 31, 30, 30, 30, 30, 30, 29];

/// Days in one 33-year Jalali cycle.
const DAYS_PER_CYCLE: i64 = 12_053;
/// Days in one 4-year sub-cycle.
const DAYS_PER_QUAD: i64 = 1_461;
/// Jalali year that starts at the first Nowruz after the Gregorian epoch.
const EPOCH_JALALI_YEAR: i64 = 979;
/// Days from the Gregorian epoch to that Nowruz (1600-03-20).
const EPOCH_NOWRUZ_OFFSET: i64 = 79;

/// A (Jalali year, month) pair. Ordered lexicographically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Jalali year
    pub year: i32,
    /// Jalali month, 1 (Farvardin) to 12 (Esfand)
    pub month: i32,
}

impl Period {
    /// Validated constructor for caller-supplied periods.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if `month` is outside `1..=12`.
    pub fn new(year: i32, month: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::invalid_input(format!(
                "period month must be between 1 and 12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Rebuilds a period from stored columns without validation.
    #[must_use]
    pub const fn from_parts(year: i32, month: i32) -> Self {
        Self { year, month }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.year, self.month)
    }
}

const fn is_gregorian_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Converts a Gregorian date into its Jalali `(year, month, day)`.
#[must_use]
pub fn to_jalali(date: NaiveDate) -> (i64, i64, i64) {
    let gy = i64::from(date.year()) - 1600;
    let gm = i64::from(date.month0());
    let gd = i64::from(date.day0());

    let mut g_day_no = 365 * gy + (gy + 3).div_euclid(4) - (gy + 99).div_euclid(100)
        + (gy + 399).div_euclid(400);
    g_day_no += GREGORIAN_DAYS_IN_MONTH[..gm as usize].iter().sum::<i64>();
    if gm > 1 && is_gregorian_leap(gy.rem_euclid(400)) {
        g_day_no += 1;
    }
    g_day_no += gd;

    let mut j_day_no = g_day_no - EPOCH_NOWRUZ_OFFSET;
    let cycles = j_day_no.div_euclid(DAYS_PER_CYCLE);
    j_day_no = j_day_no.rem_euclid(DAYS_PER_CYCLE);

    let mut jy = EPOCH_JALALI_YEAR + 33 * cycles + 4 * (j_day_no / DAYS_PER_QUAD);
    j_day_no %= DAYS_PER_QUAD;

    if j_day_no >= 366 {
        jy += (j_day_no - 1) / 365;
        j_day_no = (j_day_no - 1) % 365;
    }

    let mut month = 0;
    while month < 11 && j_day_no >= JALALI_DAYS_IN_MONTH[month] {
        j_day_no -= JALALI_DAYS_IN_MONTH[month];
        month += 1;
    }

    (jy, month as i64 + 1, j_day_no + 1)
}

/// Maps a civil date to the period it is booked under.
#[must_use]
pub fn to_period(date: NaiveDate) -> Period {
    let (year, month, _) = to_jalali(date);
    // chrono years fit in i32 and the Jalali year is ~621 smaller
    Period::from_parts(year as i32, month as i32)
}
