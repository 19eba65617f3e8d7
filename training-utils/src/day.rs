//! Calendar days, in the user's local calendar, serialized as `YYYY-MM-DD`.

use std::ops::RangeInclusive;

use chrono::{Days, NaiveDate};

pub fn today_local() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// The `len` days ending at `today`, inclusive. `None` for an empty window.
pub fn trailing_window(today: NaiveDate, len: u32) -> Option<RangeInclusive<NaiveDate>> {
    let back = len.checked_sub(1)?;
    let start = today.checked_sub_days(Days::new(u64::from(back)))?;
    Some(start..=today)
}
