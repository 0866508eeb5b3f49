use chrono::{Datelike, Days, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeekError {
    #[error("date out of range: {0}")]
    OutOfRange(NaiveDate),
}

/// Thursday of the monday-first week containing `date`.
/// The thursday decides which year the week belongs to.
fn thursday_of(date: NaiveDate) -> Result<NaiveDate, WeekError> {
    let from_monday = date.weekday().num_days_from_monday() as i64;
    let shift = 3 - from_monday;

    let shifted = if shift >= 0 {
        date.checked_add_days(Days::new(shift as u64))
    } else {
        date.checked_sub_days(Days::new(shift.unsigned_abs()))
    };
    shifted.ok_or(WeekError::OutOfRange(date))
}

/// ISO-8601 week number (1-53) of `date`.
pub fn iso_week(date: NaiveDate) -> Result<u32, WeekError> {
    let thursday = thursday_of(date)?;

    // january 4 is always in week 1
    let jan4 = NaiveDate::from_ymd_opt(thursday.year(), 1, 4)
        .ok_or(WeekError::OutOfRange(date))?;
    let anchor = thursday_of(jan4)?;

    let days = (thursday - anchor).num_days();
    Ok(1 + (days as f64 / 7.0).round() as u32)
}

/// The year the ISO week of `date` belongs to. Differs from the calendar
/// year for the first and last few days of some years.
pub fn iso_week_year(date: NaiveDate) -> Result<i32, WeekError> {
    Ok(thursday_of(date)?.year())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
    /// some day inside the week, used to step to neighbouring weeks
    day: NaiveDate,
}

impl IsoWeek {
    pub fn next(&self) -> Result<IsoWeek, WeekError> {
        let day = self.day
            .checked_add_days(Days::new(7))
            .ok_or(WeekError::OutOfRange(self.day))?;
        week_of(day)
    }
}

pub fn week_of(date: NaiveDate) -> Result<IsoWeek, WeekError> {
    Ok(IsoWeek {
        year: iso_week_year(date)?,
        week: iso_week(date)?,
        day: date,
    })
}
