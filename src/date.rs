//! Date helpers: ISO `YYYY-MM-DD` parsing, UTC epoch conversion, and
//! offset-alias query frequencies (`7D`, `W`, `MS`, `1Y`) used to split long pulls into windows.

use crate::error::RetrieverError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use time::util::days_in_year_month;
use time::{Date, Duration, Month, OffsetDateTime};

/// Earliest useful date when no start is given.
pub const DEFAULT_START_DATE: &str = "2005-08-01";

/// Parse `YYYY-MM-DD` (UTC calendar date).
pub fn parse_iso_date(s: &str) -> Result<Date, RetrieverError> {
    let bad = || RetrieverError::InvalidDate(s.to_string());
    let parts: Vec<_> = s.trim().split('-').collect();
    if parts.len() != 3 {
        return Err(bad());
    }
    let year: i32 = parts[0].parse().map_err(|_| bad())?;
    let month: u8 = parts[1].parse().map_err(|_| bad())?;
    let day: u8 = parts[2].parse().map_err(|_| bad())?;
    let month = Month::try_from(month).map_err(|_| bad())?;
    Date::from_calendar_date(year, month, day).map_err(|_| bad())
}

pub fn format_date(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}

/// Midnight UTC of `d` as epoch seconds.
pub fn date_to_epoch(d: Date) -> i64 {
    d.midnight().assume_utc().unix_timestamp()
}

/// Start epoch for a query; `None` means the beginning of Reddit.
pub fn start_epoch(start: Option<&str>) -> Result<i64, RetrieverError> {
    let d = parse_iso_date(start.unwrap_or(DEFAULT_START_DATE))?;
    Ok(date_to_epoch(d))
}

/// End epoch for a query; `None` means tomorrow (UTC) so today is fully covered.
pub fn end_epoch(end: Option<&str>) -> Result<i64, RetrieverError> {
    match end {
        Some(s) => Ok(date_to_epoch(parse_iso_date(s)?)),
        None => Ok(date_to_epoch(tomorrow_utc())),
    }
}

pub fn tomorrow_utc() -> Date {
    let today = OffsetDateTime::now_utc().date();
    today.next_day().unwrap_or(today)
}

/// Convert an epoch (seconds, UTC) to a datetime; out-of-range values clamp to the epoch.
pub fn epoch_to_datetime(epoch: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(epoch).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

// ----------------------------- Query frequency ------------------------------------

/// Largest `<n>` accepted in a frequency alias.
pub const MAX_FREQ_MULTIPLE: u32 = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreqUnit {
    Day,
    /// Weeks ending on Sunday.
    Week,
    MonthEnd,
    MonthStart,
    YearEnd,
    YearStart,
}

/// `<n><unit>` offset alias, e.g. `7D`, `1Y`, `MS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryFreq {
    pub n: u32,
    pub unit: FreqUnit,
}

impl QueryFreq {
    pub fn days(n: u32) -> Self {
        Self { n: n.max(1), unit: FreqUnit::Day }
    }

    /// First date on the offset that is >= `start`.
    fn first_on_or_after(&self, start: Date) -> Option<Date> {
        match self.unit {
            FreqUnit::Day => Some(start),
            FreqUnit::Week => {
                let ahead = (7 - start.weekday().number_days_from_sunday()) % 7;
                start.checked_add(Duration::days(ahead as i64))
            }
            FreqUnit::MonthEnd => month_end(start.year(), start.month()),
            FreqUnit::MonthStart => {
                if start.day() == 1 {
                    Some(start)
                } else {
                    let (y, m) = shift_months(start.year(), start.month(), 1)?;
                    Date::from_calendar_date(y, m, 1).ok()
                }
            }
            FreqUnit::YearEnd => Date::from_calendar_date(start.year(), Month::December, 31).ok(),
            FreqUnit::YearStart => {
                if start.month() == Month::January && start.day() == 1 {
                    Some(start)
                } else {
                    Date::from_calendar_date(start.year().checked_add(1)?, Month::January, 1).ok()
                }
            }
        }
    }

    fn advance(&self, d: Date) -> Option<Date> {
        let n = self.n as i64;
        match self.unit {
            FreqUnit::Day => d.checked_add(Duration::days(n)),
            FreqUnit::Week => d.checked_add(Duration::weeks(n)),
            FreqUnit::MonthEnd => {
                let (y, m) = shift_months(d.year(), d.month(), self.n)?;
                month_end(y, m)
            }
            FreqUnit::MonthStart => {
                let (y, m) = shift_months(d.year(), d.month(), self.n)?;
                Date::from_calendar_date(y, m, 1).ok()
            }
            FreqUnit::YearEnd => Date::from_calendar_date(add_years(d.year(), self.n)?, Month::December, 31).ok(),
            FreqUnit::YearStart => Date::from_calendar_date(add_years(d.year(), self.n)?, Month::January, 1).ok(),
        }
    }
}

impl fmt::Display for QueryFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            FreqUnit::Day => "D",
            FreqUnit::Week => "W",
            FreqUnit::MonthEnd => "M",
            FreqUnit::MonthStart => "MS",
            FreqUnit::YearEnd => "Y",
            FreqUnit::YearStart => "YS",
        };
        write!(f, "{}{}", self.n, unit)
    }
}

fn freq_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d*)\s*([A-Za-z]+(?:-SUN)?)$").expect("static frequency regex"))
}

impl FromStr for QueryFreq {
    type Err = RetrieverError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || RetrieverError::InvalidFrequency(s.to_string());
        let caps = freq_regex().captures(s.trim()).ok_or_else(bad)?;
        let n: u32 = match &caps[1] {
            "" => 1,
            digits => digits.parse().map_err(|_| bad())?,
        };
        if n == 0 || n > MAX_FREQ_MULTIPLE {
            return Err(bad());
        }
        let unit = match caps[2].to_ascii_uppercase().as_str() {
            "D" => FreqUnit::Day,
            "W" | "W-SUN" => FreqUnit::Week,
            "M" | "ME" => FreqUnit::MonthEnd,
            "MS" => FreqUnit::MonthStart,
            "Y" | "YE" | "A" => FreqUnit::YearEnd,
            "YS" | "AS" => FreqUnit::YearStart,
            _ => return Err(bad()),
        };
        Ok(Self { n, unit })
    }
}

/// `None` past the representable calendar; the boundary loop ends there.
fn shift_months(year: i32, month: Month, by: u32) -> Option<(i32, Month)> {
    let idx = i64::from(year) * 12 + i64::from(u8::from(month)) - 1 + i64::from(by);
    let m = (idx.rem_euclid(12) + 1) as u8;
    let y = i32::try_from(idx.div_euclid(12)).ok()?;
    Some((y, Month::try_from(m).ok()?))
}

fn add_years(year: i32, by: u32) -> Option<i32> {
    year.checked_add(i32::try_from(by).ok()?)
}

fn month_end(year: i32, month: Month) -> Option<Date> {
    Date::from_calendar_date(year, month, days_in_year_month(year, month)).ok()
}

/// Window boundaries from `start` to `end` at `freq`.
///
/// Generated offset dates inside `[start, end]`, with `start` prepended when it
/// precedes the first one and `end` appended when it follows the last one, so a
/// partial trailing window is always included.
pub fn date_boundaries(start: Date, end: Date, freq: QueryFreq) -> Result<Vec<Date>, RetrieverError> {
    let incompatible = || RetrieverError::IncompatibleDateRange {
        start: format_date(start),
        end: format_date(end),
        freq: freq.to_string(),
    };
    if start > end {
        return Err(incompatible());
    }

    let mut dates = Vec::new();
    let mut cur = freq.first_on_or_after(start);
    while let Some(d) = cur {
        if d > end {
            break;
        }
        dates.push(d);
        cur = freq.advance(d);
    }

    let (first, last) = match (dates.first(), dates.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return Err(incompatible()),
    };
    if start < first {
        dates.insert(0, start);
    }
    if end > last {
        dates.push(end);
    }
    Ok(dates)
}

/// Parse both ends and build boundaries in one go (command-line convenience).
pub fn date_boundaries_iso(start: &str, end: &str, freq: &str) -> Result<Vec<Date>, RetrieverError> {
    let freq: QueryFreq = freq.parse()?;
    date_boundaries(parse_iso_date(start)?, parse_iso_date(end)?, freq)
}

/// Consecutive `(start, stop)` pairs over boundaries.
pub fn windows(boundaries: &[Date]) -> impl Iterator<Item = (Date, Date)> + '_ {
    boundaries.windows(2).map(|w| (w[0], w[1]))
}
