//! # Temporal Bucketing
//!
//! Maps idea creation timestamps into calendar-day buckets and period
//! keys (day / week / month) shared by the calendar and dashboard views.
//! Everything here is a pure, stateless transformation over the stored
//! UTC timestamps; no timezone conversion is applied.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Idea;

/// Granularity of the dashboard time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
}

impl Period {
    /// Lenient parse for query-string values; malformed input falls back
    /// to `Day`.
    pub fn parse(value: &str) -> Period {
        match value {
            "week" => Period::Week,
            "month" => Period::Month,
            _ => Period::Day,
        }
    }
}

/// `"YYYY-MM-DD"` of the stored timestamp.
pub fn day_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// `"YYYY-MM"` of the stored timestamp.
pub fn month_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m").to_string()
}

/// `"YYYY-W##"` week label.
///
/// Deliberately reproduces the app's historical approximation
/// `ceil((day_of_year_0 + jan1_weekday + 1) / 7)` with Sunday as weekday
/// zero. This is not strict ISO-8601 week numbering: labels near year
/// boundaries differ from ISO weeks, and existing dashboards are keyed by
/// these labels, so the formula must not be "corrected" in place.
pub fn week_key(ts: DateTime<Utc>) -> String {
    let year = ts.year();
    let jan1_weekday = NaiveDate::from_ymd_opt(year, 1, 1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    let week = (ts.ordinal0() + jan1_weekday + 1).div_ceil(7);
    format!("{year}-W{week:02}")
}

fn period_key(ts: DateTime<Utc>, period: Period) -> String {
    match period {
        Period::Day => day_key(ts),
        Period::Week => week_key(ts),
        Period::Month => month_key(ts),
    }
}

/// Partitions ideas into day buckets keyed by [`day_key`]. Ideas sharing
/// a day keep their relative input order within the bucket.
pub fn group_by_day(ideas: &[Idea]) -> BTreeMap<String, Vec<Idea>> {
    let mut buckets: BTreeMap<String, Vec<Idea>> = BTreeMap::new();
    for idea in ideas {
        buckets
            .entry(day_key(idea.created_at))
            .or_default()
            .push(idea.clone());
    }
    buckets
}

/// Idea counts per period key, key-ascending (the dashboard plots the
/// keys sorted).
pub fn count_by_period(ideas: &[Idea], period: Period) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for idea in ideas {
        *counts.entry(period_key(idea.created_at, period)).or_default() += 1;
    }
    counts
}

/// Every calendar date of the month, ascending. Month is 1-12; an invalid
/// month yields an empty sequence rather than a panic.
pub fn days_in_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let Some(mut date) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return days;
    };
    while date.month() == month {
        days.push(date);
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    days
}

/// Layout data for one calendar month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    /// Blank placeholder cells before the 1st: the weekday index of the
    /// first day of the month, with Sunday as column zero.
    pub leading_blanks: u32,
    pub days: Vec<NaiveDate>,
}

pub fn month_grid(year: i32, month: u32) -> MonthGrid {
    let days = days_in_month(year, month);
    let leading_blanks = days
        .first()
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    MonthGrid { year, month, leading_blanks, days }
}
