//! Filename generators for synthetic instrument archives.
//!
//! Each generator renders names matching one of the
//! [`templates`](crate::fixtures::templates) so tests can populate a
//! directory without hand-writing dozens of names.

use chrono::{DateTime, Datelike, Duration, Utc};

/// Every day from `start` through `stop`, inclusive.
pub fn days(start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let mut day = start;
    while day <= stop {
        out.push(day);
        day += Duration::days(1);
    }
    out
}

/// `YYYY-MM-DD.nofile` names for each day in `start..=stop`.
///
/// # Example
///
/// ```
/// use test_utils::{daily_nofile_names, utc};
///
/// let names = daily_nofile_names(utc!(2008, 12, 31), utc!(2009, 1, 1));
/// assert_eq!(names, vec!["2008-12-31.nofile", "2009-01-01.nofile"]);
/// ```
pub fn daily_nofile_names(start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<String> {
    days(start, stop)
        .into_iter()
        .map(|d| d.format("%Y-%m-%d.nofile").to_string())
        .collect()
}

/// `YYYY/data_YYYYDDD.cdf` names for each day in `start..=stop`.
pub fn doy_names(start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<String> {
    days(start, stop)
        .into_iter()
        .map(|d| format!("{:04}/data_{:04}{:03}.cdf", d.year(), d.year(), d.ordinal()))
        .collect()
}

/// `vefi_YYYY_MM_DD_vN.cdf` names, one per day and version.
pub fn versioned_names(start: DateTime<Utc>, stop: DateTime<Utc>, versions: &[u32]) -> Vec<String> {
    days(start, stop)
        .into_iter()
        .flat_map(|d| {
            versions
                .iter()
                .map(move |v| format!("vefi_{}_v{}.cdf", d.format("%Y_%m_%d"), v))
        })
        .collect()
}

/// `monthly_YYYYMM.nc` names for `count` months starting at `year`/`month`.
pub fn monthly_names(year: i32, month: u32, count: u32) -> Vec<String> {
    (0..count)
        .map(|i| {
            let index = (month - 1) + i;
            let y = year + (index / 12) as i32;
            let m = index % 12 + 1;
            format!("monthly_{:04}{:02}.nc", y, m)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utc;

    #[test]
    fn test_days_inclusive() {
        assert_eq!(days(utc!(2009, 2, 27), utc!(2009, 3, 1)).len(), 3);
        assert!(days(utc!(2009, 3, 2), utc!(2009, 3, 1)).is_empty());
    }

    #[test]
    fn test_doy_names() {
        let names = doy_names(utc!(2008, 12, 31), utc!(2009, 1, 1));
        assert_eq!(names, vec!["2008/data_2008366.cdf", "2009/data_2009001.cdf"]);
    }

    #[test]
    fn test_versioned_names() {
        let names = versioned_names(utc!(2009, 1, 1), utc!(2009, 1, 1), &[1, 2]);
        assert_eq!(names, vec!["vefi_2009_01_01_v1.cdf", "vefi_2009_01_01_v2.cdf"]);
    }

    #[test]
    fn test_monthly_names_wrap_year() {
        let names = monthly_names(2009, 11, 3);
        assert_eq!(names, vec!["monthly_200911.nc", "monthly_200912.nc", "monthly_201001.nc"]);
    }
}
