//! Read-side aggregation.
//!
//! Everything in this module is a pure function over counter rows the caller
//! has already loaded, plus a wall-clock reference. No caches, no shared
//! state: two concurrent dashboard requests never interact.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::dimension::DimensionKind;

/// The UTC calendar fields an hourly period bucket is keyed on.
///
/// Day is day-of-month. Bucketing by weekday would fold e.g. every Monday of
/// a month into one bucket and is wrong for time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl PeriodKey {
    pub fn from_utc(ts: DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
            day: ts.day(),
            hour: ts.hour(),
        }
    }
}

/// One counter row as read back from the store, with period fields and
/// dimension values joined in. This is the unit the aggregation functions
/// consume.
#[derive(Debug, Clone, Serialize)]
pub struct CounterRow {
    pub id: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub path: String,
    pub browser: Option<String>,
    pub platform: Option<String>,
    pub referrer: Option<String>,
    pub count: u64,
}

impl CounterRow {
    fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    fn dimension_value(&self, kind: DimensionKind) -> Option<&str> {
        match kind {
            DimensionKind::Path => Some(self.path.as_str()),
            DimensionKind::Browser => self.browser.as_deref(),
            DimensionKind::Platform => self.platform.as_deref(),
            DimensionKind::Referrer => self.referrer.as_deref(),
        }
    }
}

/// One (value, summed count) pair produced by [`rollup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollupEntry {
    pub value: String,
    pub count: u64,
}

/// Sum counts per distinct value of `kind`. Rows without that dimension
/// (e.g. no referrer) are skipped. Output order is unspecified; callers sort.
pub fn rollup(rows: &[CounterRow], kind: DimensionKind) -> Vec<RollupEntry> {
    let mut sums: HashMap<&str, u64> = HashMap::new();
    for row in rows {
        if let Some(value) = row.dimension_value(kind) {
            *sums.entry(value).or_default() += row.count;
        }
    }
    sums.into_iter()
        .map(|(value, count)| RollupEntry {
            value: value.to_string(),
            count,
        })
        .collect()
}

/// [`rollup`] sorted descending by count, ties broken by value, for display.
pub fn rollup_desc(rows: &[CounterRow], kind: DimensionKind) -> Vec<RollupEntry> {
    let mut entries = rollup(rows, kind);
    entries.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    entries
}

/// One day in the gap-filled series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub count: u64,
}

/// Per-UTC-day sums, gap-filled with zeroes.
///
/// Walks a cursor in 1-day steps from the earliest day with data through the
/// day of `now` inclusive (or the latest data day, if data lies ahead of the
/// clock), emitting the real sum when present and a zero point otherwise.
/// Sparse data must not render as a shorter chart.
///
/// A site with no counters yields an empty series, which is the valid
/// "no data yet" outcome rather than an error.
pub fn time_series(rows: &[CounterRow], now: DateTime<Utc>) -> Vec<SeriesPoint> {
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for row in rows {
        if let Some(date) = row.date() {
            *by_day.entry(date).or_default() += row.count;
        }
    }

    let (Some((&first, _)), Some((&last_data, _))) =
        (by_day.first_key_value(), by_day.last_key_value())
    else {
        return Vec::new();
    };

    let end = now.date_naive().max(last_data);
    let mut series = Vec::new();
    let mut cursor = first;
    while cursor <= end {
        series.push(SeriesPoint {
            date: cursor,
            count: by_day.get(&cursor).copied().unwrap_or(0),
        });
        cursor += Duration::days(1);
    }
    series
}

/// Width of a comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Hour,
    Day,
    Month,
}

impl WindowKind {
    /// Reference instant for the window immediately preceding `as_of`:
    /// exactly one window width earlier. Calendar arithmetic, never bucket-id
    /// arithmetic — month subtraction clamps (Mar 31 → Feb 28/29).
    fn previous_instant(&self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            WindowKind::Hour => as_of - Duration::hours(1),
            WindowKind::Day => as_of - Duration::days(1),
            WindowKind::Month => as_of - Months::new(1),
        }
    }

    /// Does `row` fall inside the window containing `at`?
    fn matches(&self, row: &CounterRow, at: DateTime<Utc>) -> bool {
        let same_month = row.year == at.year() && row.month == at.month();
        match self {
            WindowKind::Month => same_month,
            WindowKind::Day => same_month && row.day == at.day(),
            WindowKind::Hour => same_month && row.day == at.day() && row.hour == at.hour(),
        }
    }
}

/// Current-vs-previous window totals. `change` is signed; zero is a distinct
/// outcome from positive and negative (flat traffic, not "no data").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowComparison {
    pub current: u64,
    pub previous: u64,
    pub change: i64,
}

/// Sum counters in the window containing `as_of` versus the immediately
/// preceding window of the same kind.
pub fn window_comparison(
    rows: &[CounterRow],
    kind: WindowKind,
    as_of: DateTime<Utc>,
) -> WindowComparison {
    let prev_at = kind.previous_instant(as_of);
    let mut current: u64 = 0;
    let mut previous: u64 = 0;
    for row in rows {
        if kind.matches(row, as_of) {
            current += row.count;
        }
        if kind.matches(row, prev_at) {
            previous += row.count;
        }
    }
    WindowComparison {
        current,
        previous,
        change: current as i64 - previous as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(
        (year, month, day, hour): (i32, u32, u32, u32),
        path: &str,
        browser: Option<&str>,
        referrer: Option<&str>,
        count: u64,
    ) -> CounterRow {
        CounterRow {
            id: format!("ctr_{year}{month}{day}{hour}_{path}_{count}"),
            year,
            month,
            day,
            hour,
            path: path.to_string(),
            browser: browser.map(str::to_string),
            platform: Some("macOS".to_string()),
            referrer: referrer.map(str::to_string),
            count,
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 30, 0)
            .single()
            .expect("valid test timestamp")
    }

    #[test]
    fn period_key_uses_day_of_month() {
        // 2026-08-27 is a Thursday (weekday 4); the key must carry 27.
        let key = PeriodKey::from_utc(utc(2026, 8, 27, 14));
        assert_eq!(
            key,
            PeriodKey {
                year: 2026,
                month: 8,
                day: 27,
                hour: 14
            }
        );
    }

    #[test]
    fn rollup_sums_across_periods_and_keeps_values_apart() {
        let rows = vec![
            row((2026, 8, 1, 10), "/a", Some("Firefox"), None, 3),
            row((2026, 8, 2, 11), "/a", Some("Chrome"), None, 4),
            row((2026, 8, 2, 11), "/b", Some("Chrome"), None, 2),
        ];
        let entries = rollup_desc(&rows, DimensionKind::Path);
        assert_eq!(
            entries,
            vec![
                RollupEntry {
                    value: "/a".to_string(),
                    count: 7
                },
                RollupEntry {
                    value: "/b".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn rollup_skips_rows_without_the_dimension() {
        let rows = vec![
            row((2026, 8, 1, 10), "/a", None, Some("https://news.example"), 5),
            row((2026, 8, 1, 11), "/a", None, None, 9),
        ];
        let referrers = rollup(&rows, DimensionKind::Referrer);
        assert_eq!(referrers.len(), 1);
        assert_eq!(referrers[0].value, "https://news.example");
        assert_eq!(referrers[0].count, 5);
        // Browser absent everywhere → empty rollup, not an entry for "".
        assert!(rollup(&rows, DimensionKind::Browser).is_empty());
    }

    #[test]
    fn time_series_fills_gaps_with_zeroes() {
        // Data on day 1 and day 5, now = day 6 → six entries, 2–4 zeroed.
        let rows = vec![
            row((2026, 8, 1, 9), "/", None, None, 4),
            row((2026, 8, 5, 9), "/", None, None, 7),
        ];
        let series = time_series(&rows, utc(2026, 8, 6, 12));
        assert_eq!(series.len(), 6);
        let d = |day| NaiveDate::from_ymd_opt(2026, 8, day).expect("valid test date");
        assert_eq!(series[0].date, d(1));
        assert_eq!(series[0].count, 4);
        for (i, day) in [(1usize, 2u32), (2, 3), (3, 4)] {
            assert_eq!(series[i].date, d(day));
            assert_eq!(series[i].count, 0);
        }
        assert_eq!(series[4].count, 7);
        assert_eq!(series[5].count, 0);
    }

    #[test]
    fn time_series_sums_hours_within_a_day() {
        let rows = vec![
            row((2026, 8, 3, 0), "/", None, None, 1),
            row((2026, 8, 3, 23), "/", None, None, 2),
        ];
        let series = time_series(&rows, utc(2026, 8, 3, 23));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].count, 3);
    }

    #[test]
    fn time_series_empty_input_is_empty_not_error() {
        assert!(time_series(&[], utc(2026, 8, 6, 0)).is_empty());
    }

    #[test]
    fn window_comparison_signs() {
        let rows = vec![
            row((2026, 8, 27, 14), "/", None, None, 10),
            row((2026, 8, 27, 13), "/", None, None, 15),
        ];
        let as_of = utc(2026, 8, 27, 14);
        let hour = window_comparison(&rows, WindowKind::Hour, as_of);
        assert_eq!(
            hour,
            WindowComparison {
                current: 10,
                previous: 15,
                change: -5
            }
        );

        let rows_eq = vec![
            row((2026, 8, 27, 14), "/", None, None, 6),
            row((2026, 8, 27, 13), "/", None, None, 6),
        ];
        assert_eq!(
            window_comparison(&rows_eq, WindowKind::Hour, as_of).change,
            0
        );
    }

    #[test]
    fn window_comparison_hour_crosses_midnight() {
        let rows = vec![
            row((2026, 8, 27, 0), "/", None, None, 3),
            row((2026, 8, 26, 23), "/", None, None, 8),
        ];
        let cmp = window_comparison(&rows, WindowKind::Hour, utc(2026, 8, 27, 0));
        assert_eq!(cmp.current, 3);
        assert_eq!(cmp.previous, 8);
        assert_eq!(cmp.change, -5);
    }

    #[test]
    fn window_comparison_day_and_month() {
        let rows = vec![
            row((2026, 8, 27, 2), "/", None, None, 5),
            row((2026, 8, 26, 22), "/", None, None, 1),
            row((2026, 7, 30, 9), "/", None, None, 20),
        ];
        let as_of = utc(2026, 8, 27, 14);

        let day = window_comparison(&rows, WindowKind::Day, as_of);
        assert_eq!((day.current, day.previous, day.change), (5, 1, 4));

        let month = window_comparison(&rows, WindowKind::Month, as_of);
        assert_eq!((month.current, month.previous, month.change), (6, 20, -14));
    }

    #[test]
    fn window_comparison_month_subtraction_clamps() {
        // as_of Mar 31 → previous window is February, clamped to Feb 28.
        let rows = vec![
            row((2026, 3, 31, 10), "/", None, None, 2),
            row((2026, 2, 14, 10), "/", None, None, 9),
        ];
        let cmp = window_comparison(&rows, WindowKind::Month, utc(2026, 3, 31, 10));
        assert_eq!((cmp.current, cmp.previous), (2, 9));
    }
}
