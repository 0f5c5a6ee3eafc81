//! Week arithmetic: (year, week number) → Monday 00:00:00 .. Sunday 23:59:59.
//!
//! Boundaries are local wall-clock times; [`WeekPeriod::bounds`] turns them
//! into unix seconds for a given zone. [`week_range`] does not validate the
//! week number: week 0 or week 60 land outside the nominal year. Input
//! validation lives in the prompt/flag layer.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone};
use weektally_config::{LabelLocale, WeekAnchor};

const DAY_NAMES_EN: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];
const DAY_NAMES_ID: [&str; 7] = ["Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu", "Minggu"];

const MONTH_NAMES_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];
const MONTH_NAMES_ID: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni",
    "Juli", "Agustus", "September", "Oktober", "November", "Desember",
];

/// Distance from the first to the last instant of a week.
pub fn week_span() -> Duration {
    Duration::days(6) + Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekPeriod {
    pub year: i32,
    pub week: u32,
    /// Monday 00:00:00, local
    pub start: NaiveDateTime,
    /// Sunday 23:59:59, local
    pub end: NaiveDateTime,
}

/// Compute the week period. `None` only when `year` is outside chrono's
/// representable range.
pub fn week_range(year: i32, week: u32, anchor: WeekAnchor) -> Option<WeekPeriod> {
    let reference = match anchor {
        WeekAnchor::Jan1 => NaiveDate::from_ymd_opt(year, 1, 1)?,
        WeekAnchor::Iso => NaiveDate::from_ymd_opt(year, 1, 4)?,
    };
    let first_monday =
        reference - Duration::days(reference.weekday().num_days_from_monday() as i64);
    let monday = first_monday.checked_add_signed(Duration::weeks(week as i64 - 1))?;

    let start = monday.and_hms_opt(0, 0, 0)?;
    Some(WeekPeriod {
        year,
        week,
        start,
        end: start + week_span(),
    })
}

/// ISO week number of `today`, shown as a hint when prompting.
pub fn current_iso_week(today: NaiveDate) -> u32 {
    today.iso_week().week()
}

impl WeekPeriod {
    /// Destination tab title, e.g. `2024 W1`.
    pub fn tab_title(&self) -> String {
        format!("{} W{}", self.year, self.week)
    }

    /// Human-readable range, e.g. `Monday, 1 January 2024 - Sunday, 7 January 2024`.
    pub fn label(&self, locale: LabelLocale) -> String {
        format!(
            "{} - {}",
            format_day(self.start.date(), locale),
            format_day(self.end.date(), locale),
        )
    }

    /// Unix-second boundaries of the week in `tz`.
    pub fn bounds<Tz: TimeZone>(&self, tz: &Tz) -> (i64, i64) {
        (local_to_unix(tz, self.start), local_to_unix(tz, self.end))
    }
}

fn format_day(date: NaiveDate, locale: LabelLocale) -> String {
    let (days, months) = match locale {
        LabelLocale::En => (&DAY_NAMES_EN, &MONTH_NAMES_EN),
        LabelLocale::Id => (&DAY_NAMES_ID, &MONTH_NAMES_ID),
    };
    format!(
        "{}, {} {} {}",
        days[date.weekday().num_days_from_monday() as usize],
        date.day(),
        months[date.month0() as usize],
        date.year(),
    )
}

/// Ambiguous local times (DST fall-back) take the earlier instant; skipped
/// ones (DST spring-forward) move an hour later.
fn local_to_unix<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> i64 {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| local.and_utc().timestamp())
}
