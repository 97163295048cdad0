// src/sink/rotation.rs
//! Wall-clock rotation schedule for the file sink.
//!
//! Boundaries are aligned to UTC: a `Minute` schedule rolls over at hh:mm:00,
//! a `Day` schedule at 00:00, a `Weekday` schedule at 00:00 of that weekday.

use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, TimeDelta, Utc, Weekday};
use regex::Regex;
use std::str::FromStr;

const DAY_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Second,
    Minute,
    Hour,
    /// `D` and `midnight` both land here.
    Day,
    Weekday(Weekday),
}

impl FromStr for Rotation {
    type Err = anyhow::Error;

    /// Accepts the `when` values of a Python `TimedRotatingFileHandler`.
    fn from_str(s: &str) -> Result<Self> {
        let when = s.trim().to_ascii_uppercase();
        let r = match when.as_str() {
            "S" => Rotation::Second,
            "M" => Rotation::Minute,
            "H" => Rotation::Hour,
            "D" | "MIDNIGHT" => Rotation::Day,
            w if w.len() == 2 && w.starts_with('W') => {
                let day = match &w[1..] {
                    "0" => Weekday::Mon,
                    "1" => Weekday::Tue,
                    "2" => Weekday::Wed,
                    "3" => Weekday::Thu,
                    "4" => Weekday::Fri,
                    "5" => Weekday::Sat,
                    "6" => Weekday::Sun,
                    other => bail!("invalid weekday '{other}' in rotation interval '{s}'"),
                };
                Rotation::Weekday(day)
            }
            _ => bail!("unsupported rotation interval '{s}'"),
        };
        Ok(r)
    }
}

impl Rotation {
    fn period_secs(&self) -> i64 {
        match self {
            Rotation::Second => 1,
            Rotation::Minute => 60,
            Rotation::Hour => 3_600,
            Rotation::Day => DAY_SECS,
            Rotation::Weekday(_) => 7 * DAY_SECS,
        }
    }

    /// First boundary strictly after `now`.
    pub fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ts = now.timestamp();
        let secs = match self {
            Rotation::Weekday(target) => {
                let mut day = (ts.div_euclid(DAY_SECS) + 1) * DAY_SECS;
                // at most six steps
                while from_ts(day).weekday() != *target {
                    day += DAY_SECS;
                }
                day
            }
            _ => {
                let unit = self.period_secs();
                (ts.div_euclid(unit) + 1) * unit
            }
        };
        from_ts(secs)
    }

    /// Start of the period that ends at `boundary`; names the backup file.
    pub fn period_start(&self, boundary: DateTime<Utc>) -> DateTime<Utc> {
        boundary - TimeDelta::seconds(self.period_secs())
    }

    pub fn suffix_format(&self) -> &'static str {
        match self {
            Rotation::Second => "%Y-%m-%d_%H-%M-%S",
            Rotation::Minute => "%Y-%m-%d_%H-%M",
            Rotation::Hour => "%Y-%m-%d_%H",
            Rotation::Day | Rotation::Weekday(_) => "%Y-%m-%d",
        }
    }

    pub fn suffix(&self, boundary: DateTime<Utc>) -> String {
        self.period_start(boundary)
            .format(self.suffix_format())
            .to_string()
    }

    /// Matches exactly the suffixes `suffix` produces.
    pub fn suffix_pattern(&self) -> Regex {
        let pat = match self {
            Rotation::Second => r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}$",
            Rotation::Minute => r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}$",
            Rotation::Hour => r"^\d{4}-\d{2}-\d{2}_\d{2}$",
            Rotation::Day | Rotation::Weekday(_) => r"^\d{4}-\d{2}-\d{2}$",
        };
        Regex::new(pat).expect("static rotation suffix regex")
    }
}

fn from_ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn parses_python_when_values() {
        assert_eq!("midnight".parse::<Rotation>().unwrap(), Rotation::Day);
        assert_eq!("d".parse::<Rotation>().unwrap(), Rotation::Day);
        assert_eq!("h".parse::<Rotation>().unwrap(), Rotation::Hour);
        assert_eq!(
            "W6".parse::<Rotation>().unwrap(),
            Rotation::Weekday(Weekday::Sun)
        );
        assert!("W7".parse::<Rotation>().is_err());
        assert!("fortnight".parse::<Rotation>().is_err());
    }

    #[test]
    fn boundaries_align_to_wall_clock() {
        let now = at(2024, 3, 14, 10, 37, 12);
        assert_eq!(Rotation::Minute.next_boundary(now), at(2024, 3, 14, 10, 38, 0));
        assert_eq!(Rotation::Hour.next_boundary(now), at(2024, 3, 14, 11, 0, 0));
        assert_eq!(Rotation::Day.next_boundary(now), at(2024, 3, 15, 0, 0, 0));
        // 2024-03-14 is a Thursday
        assert_eq!(
            Rotation::Weekday(Weekday::Mon).next_boundary(now),
            at(2024, 3, 18, 0, 0, 0)
        );
        assert_eq!(
            Rotation::Weekday(Weekday::Fri).next_boundary(now),
            at(2024, 3, 15, 0, 0, 0)
        );
    }

    #[test]
    fn boundary_is_strictly_after_now() {
        let midnight = at(2024, 3, 15, 0, 0, 0);
        assert_eq!(Rotation::Day.next_boundary(midnight), at(2024, 3, 16, 0, 0, 0));
    }

    #[test]
    fn suffix_names_the_closed_period() {
        let boundary = at(2024, 3, 15, 0, 0, 0);
        assert_eq!(Rotation::Day.suffix(boundary), "2024-03-14");
        assert_eq!(Rotation::Hour.suffix(boundary), "2024-03-14_23");
        assert!(Rotation::Hour.suffix_pattern().is_match("2024-03-14_23"));
        assert!(!Rotation::Day.suffix_pattern().is_match("2024-03-14_23"));
    }
}
