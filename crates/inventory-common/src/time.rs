//! Time handling utilities for instrument file archives.
//!
//! All timestamps are UTC. File cadences and iteration steps are expressed
//! as [`Freq`] values using the familiar offset-alias strings (`"1D"`,
//! `"6H"`, `"MS"`, `"YS"`, ...).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Unit of a [`Freq`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FreqUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    /// Calendar month, anchored on the input timestamp.
    MonthStart,
    /// Calendar year, anchored on the input timestamp.
    YearStart,
}

impl FreqUnit {
    fn alias(&self) -> &'static str {
        match self {
            FreqUnit::Second => "S",
            FreqUnit::Minute => "min",
            FreqUnit::Hour => "H",
            FreqUnit::Day => "D",
            FreqUnit::Week => "W",
            FreqUnit::MonthStart => "MS",
            FreqUnit::YearStart => "YS",
        }
    }

    fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "S" | "s" => Some(FreqUnit::Second),
            "T" | "min" => Some(FreqUnit::Minute),
            "H" | "h" => Some(FreqUnit::Hour),
            "D" | "d" => Some(FreqUnit::Day),
            "W" | "w" => Some(FreqUnit::Week),
            "MS" => Some(FreqUnit::MonthStart),
            "YS" | "AS" => Some(FreqUnit::YearStart),
            _ => None,
        }
    }

    /// Start-anchored replacement for a period-end alias.
    fn start_alias_for(alias: &str) -> Option<&'static str> {
        match alias {
            "M" | "ME" => Some("MS"),
            "Y" | "YE" | "A" => Some("YS"),
            _ => None,
        }
    }
}

/// A positive multiple of a time unit: a file cadence or an iteration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Freq {
    count: u32,
    unit: FreqUnit,
}

impl Freq {
    /// One calendar day, the default file cadence and iteration step.
    pub const DAILY: Freq = Freq { count: 1, unit: FreqUnit::Day };

    pub fn new(count: u32, unit: FreqUnit) -> Result<Self, TimeParseError> {
        if count == 0 {
            return Err(TimeParseError::InvalidFrequency(format!("0{}", unit.alias())));
        }
        Ok(Self { count, unit })
    }

    pub fn days(count: u32) -> Result<Self, TimeParseError> {
        Self::new(count, FreqUnit::Day)
    }

    pub fn months(count: u32) -> Result<Self, TimeParseError> {
        Self::new(count, FreqUnit::MonthStart)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn unit(&self) -> FreqUnit {
        self.unit
    }

    /// Fixed length of this frequency, `None` for calendar units.
    pub fn as_duration(&self) -> Option<Duration> {
        let n = self.count as i64;
        match self.unit {
            FreqUnit::Second => Some(Duration::seconds(n)),
            FreqUnit::Minute => Some(Duration::minutes(n)),
            FreqUnit::Hour => Some(Duration::hours(n)),
            FreqUnit::Day => Some(Duration::days(n)),
            FreqUnit::Week => Some(Duration::weeks(n)),
            FreqUnit::MonthStart | FreqUnit::YearStart => None,
        }
    }

    /// True when one period spans at most a single day.
    pub fn is_daily_or_finer(&self) -> bool {
        self.as_duration()
            .map(|d| d <= Duration::days(1))
            .unwrap_or(false)
    }

    fn months_per_step(&self) -> Option<u32> {
        match self.unit {
            FreqUnit::MonthStart => Some(self.count),
            FreqUnit::YearStart => self.count.checked_mul(12),
            _ => None,
        }
    }

    /// Timestamp `n` whole periods after `start`.
    ///
    /// Calendar units are always computed from `start` so month-end dates
    /// do not drift across a long sequence.
    pub fn nth_after(&self, start: DateTime<Utc>, n: u32) -> Option<DateTime<Utc>> {
        match self.as_duration() {
            Some(step) => step
                .checked_mul(i32::try_from(n).ok()?)
                .and_then(|offset| start.checked_add_signed(offset)),
            None => {
                let months = self.months_per_step()?.checked_mul(n)?;
                start.checked_add_months(Months::new(months))
            }
        }
    }

    /// Timestamp one period after `dt`.
    pub fn advance(&self, dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.nth_after(dt, 1)
    }

    /// Timestamp one period before `dt`.
    pub fn retreat(&self, dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.as_duration() {
            Some(step) => dt.checked_sub_signed(step),
            None => dt.checked_sub_months(Months::new(self.months_per_step()?)),
        }
    }
}

impl Default for Freq {
    fn default() -> Self {
        Freq::DAILY
    }
}

impl fmt::Display for Freq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.alias())
    }
}

impl FromStr for Freq {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, alias) = trimmed.split_at(split);

        let count = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| TimeParseError::InvalidFrequency(s.to_string()))?
        };
        if let Some(start) = FreqUnit::start_alias_for(alias) {
            return Err(TimeParseError::InvalidFrequency(format!(
                "{} (period-end offsets are not supported, use {})",
                s, start
            )));
        }
        let unit = FreqUnit::from_alias(alias)
            .ok_or_else(|| TimeParseError::InvalidFrequency(s.to_string()))?;

        Freq::new(count, unit).map_err(|_| TimeParseError::InvalidFrequency(s.to_string()))
    }
}

impl TryFrom<String> for Freq {
    type Error = TimeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Freq> for String {
    fn from(freq: Freq) -> Self {
        freq.to_string()
    }
}

/// Midnight UTC on the given calendar day.
pub fn utc_date(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
}

/// Truncate a timestamp to midnight of its day.
pub fn floor_to_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt.date_naive().and_time(NaiveTime::default()))
}

/// Every `freq` step from `start` up to and including `stop`.
pub fn date_range(start: DateTime<Utc>, stop: DateTime<Utc>, freq: Freq) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let mut n = 0;
    while let Some(current) = freq.nth_after(start, n) {
        if current > stop {
            break;
        }
        out.push(current);
        n += 1;
    }
    out
}

/// Concatenated [`date_range`]s for each start/stop pair of a season.
pub fn create_date_range(
    starts: &[DateTime<Utc>],
    stops: &[DateTime<Utc>],
    freq: Freq,
) -> Vec<DateTime<Utc>> {
    starts
        .iter()
        .zip(stops)
        .flat_map(|(start, stop)| date_range(*start, *stop, freq))
        .collect()
}

/// Parse a date or datetime string, assuming UTC when no offset is given.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DD` and `YYYYMMDD`.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    for fmt in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::default())));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt < &self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Widen the window by `pad` on both sides.
    pub fn padded(&self, pad: Duration) -> Self {
        Self {
            start: self.start - pad,
            end: self.end + pad,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),
}
