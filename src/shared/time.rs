use std::ops::{Add, AddAssign, Sub};

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

const SLOT_FORMAT: &str = "%-I:%M %p";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(u32);

impl From<u32> for Duration {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    /// Rounds fractional seconds, as reported by routing engines.
    pub fn from_seconds_f64(secs: f64) -> Self {
        Self(secs.max(0.0).round() as u32)
    }

    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes * 60)
    }

    pub const fn from_hours(hours: u32) -> Self {
        Self(hours * 60 * 60)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    pub fn as_minutes(&self) -> f64 {
        self.0 as f64 / 60.0
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0
    }
}

/// Formats a wall clock time the way booking slots are labelled, e.g. `"3:00 PM"`.
pub fn format_slot(time: NaiveTime) -> String {
    time.format(SLOT_FORMAT).to_string()
}

/// Parses a slot label such as `"3:00 PM"` or `"03:00 PM"`.
pub fn parse_slot(slot: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(slot.trim(), "%I:%M %p").ok()
}

/// Upcoming bookable slots: `count` labels spaced `interval` apart, the
/// first one `offset` after `now`.
pub fn generate_time_slots(
    now: NaiveDateTime,
    count: usize,
    interval: Duration,
    offset: Duration,
) -> Vec<String> {
    let interval = TimeDelta::seconds(interval.as_seconds() as i64);
    let mut current = now + TimeDelta::seconds(offset.as_seconds() as i64);
    let mut slots = Vec::with_capacity(count);
    for _ in 0..count {
        slots.push(format_slot(current.time()));
        current += interval;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn slots_have_no_leading_zero() {
        let slots = generate_time_slots(
            at(8, 0),
            3,
            Duration::from_minutes(60),
            Duration::from_minutes(60),
        );
        assert_eq!(slots, vec!["9:00 AM", "10:00 AM", "11:00 AM"]);
    }

    #[test]
    fn slots_wrap_past_midnight() {
        let slots = generate_time_slots(
            at(22, 30),
            2,
            Duration::from_minutes(60),
            Duration::from_minutes(60),
        );
        assert_eq!(slots, vec!["11:30 PM", "12:30 AM"]);
    }

    #[test]
    fn parse_slot_accepts_padded_hours() {
        assert_eq!(parse_slot("03:00 PM"), parse_slot("3:00 PM"));
        assert!(parse_slot("15:00").is_none());
    }

    #[test]
    fn duration_minutes() {
        assert_eq!(Duration::from_seconds_f64(89.6).as_seconds(), 90);
        assert_eq!(Duration::from_minutes(2).as_minutes(), 2.0);
    }
}
