//! History explorer: date-range filtering and per-channel statistics.

use serde::Serialize;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

use insight_types::{Channel, History, Reading};

/// An inclusive range of calendar days in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First day, from 00:00:00.
    pub start: Date,
    /// Last day, up to 23:59:59.999.
    pub end: Date,
}

impl DateRange {
    /// Create a range covering `start` through `end`.
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// The seven days ending on `today`.
    pub fn last_week(today: Date) -> Self {
        Self {
            start: today.saturating_sub(Duration::days(7)),
            end: today,
        }
    }

    /// Parse a `YYYY-MM-DD` day.
    pub fn parse_day(s: &str) -> Result<Date, time::error::Parse> {
        Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
    }

    /// First instant of the range.
    pub fn start_instant(&self) -> OffsetDateTime {
        PrimitiveDateTime::new(self.start, Time::MIDNIGHT).assume_utc()
    }

    /// Last instant of the range, at millisecond resolution.
    pub fn end_instant(&self) -> OffsetDateTime {
        let end_of_day = Time::from_hms_milli(23, 59, 59, 999).unwrap_or(Time::MIDNIGHT);
        PrimitiveDateTime::new(self.end, end_of_day).assume_utc()
    }

    /// Whether a timestamp falls inside the range.
    pub fn contains(&self, time: OffsetDateTime) -> bool {
        time >= self.start_instant() && time <= self.end_instant()
    }
}

/// Readings of `history` within `range`, oldest first.
pub fn filter(history: &History, range: &DateRange) -> Vec<Reading> {
    history
        .iter()
        .filter(|r| range.contains(r.time))
        .copied()
        .collect()
}

/// Readings of `history` within `range`, newest first (log view order).
pub fn log_view(history: &History, range: &DateRange) -> Vec<Reading> {
    history
        .iter()
        .rev()
        .filter(|r| range.contains(r.time))
        .copied()
        .collect()
}

/// Minimum, mean and maximum of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

/// Statistics over a set of readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryStats {
    /// Number of readings summarized.
    pub count: usize,
    pub temperature: ChannelStats,
    pub pressure: ChannelStats,
    pub vibration: ChannelStats,
}

impl HistoryStats {
    /// Summarize readings; `None` when there are none.
    pub fn compute(readings: &[Reading]) -> Option<Self> {
        if readings.is_empty() {
            return None;
        }
        let channel = |c: Channel| {
            let (min, max, sum) = readings.iter().map(|r| r.get(c)).fold(
                (f64::INFINITY, f64::NEG_INFINITY, 0.0),
                |(min, max, sum), v| (min.min(v), max.max(v), sum + v),
            );
            ChannelStats {
                min,
                avg: sum / readings.len() as f64,
                max,
            }
        };
        Some(Self {
            count: readings.len(),
            temperature: channel(Channel::Temperature),
            pressure: channel(Channel::Pressure),
            vibration: channel(Channel::Vibration),
        })
    }

    /// Stats for one channel.
    pub fn channel(&self, channel: Channel) -> ChannelStats {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Pressure => self.pressure,
            Channel::Vibration => self.vibration,
        }
    }
}
