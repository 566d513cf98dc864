use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::{Add, AddAssign, Sub};

/// Simulated wall-clock time in whole seconds since the start of the run.
#[derive(Debug, Clone, Copy, Default, Ord, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd)]
pub struct Time(pub u64);

impl Time {
    pub const ZERO: Time = Time(0);

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64
    }

    /// Rounds fractional seconds to the nearest whole second; negative and
    /// non-finite inputs collapse to zero.
    pub fn from_secs_f64(secs: f64) -> Time {
        if secs.is_finite() && secs > 0.0 {
            Time(secs.round() as u64)
        } else {
            Time::ZERO
        }
    }

    pub fn saturating_sub(self, rhs: Time) -> Time {
        Time(self.0.saturating_sub(rhs.0))
    }

    /// Parses `HH:MM:SS` as seconds past midnight.
    pub fn parse_hms(s: &str) -> Option<Time> {
        let mut parts = s.trim().split(':');
        let h = parts.next()?.parse::<u64>().ok()?;
        let m = parts.next()?.parse::<u64>().ok()?;
        let sec = parts.next()?.parse::<u64>().ok()?;
        if parts.next().is_some() || m >= 60 || sec >= 60 {
            return None;
        }
        Some(Time(h * 3600 + m * 60 + sec))
    }
}

/// Accepts either an integer number of seconds or an `HH:MM:SS` string.
pub fn deserialize_clock<'de, D>(deserializer: D) -> Result<Time, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Clock(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Time(secs)),
        Raw::Clock(s) => {
            Time::parse_hms(&s).ok_or_else(|| D::Error::custom(format!("invalid clock time `{}`", s)))
        }
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let days = self.0 / 86_400;
        let remaining = self.0 % 86_400;
        let hours = remaining / 3600;
        let mins = (remaining % 3600) / 60;
        let secs = remaining % 60;
        write!(f, "DAY{} {:02}:{:02}:{:02}", days + 1, hours, mins, secs)
    }
}

impl Add<u64> for Time {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Time(self.0 + rhs)
    }
}

impl Add<Time> for Time {
    type Output = Self;

    fn add(self, rhs: Time) -> Self::Output {
        Time(self.0 + rhs.0)
    }
}

impl Sub<u64> for Time {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Time(self.0 - rhs)
    }
}

impl Sub<Time> for Time {
    type Output = Self;

    fn sub(self, rhs: Time) -> Self::Output {
        Time(self.0 - rhs.0)
    }
}

impl AddAssign<u64> for Time {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl AddAssign<Time> for Time {
    fn add_assign(&mut self, rhs: Time) {
        self.0 += rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rolls_over_days() {
        assert_eq!("DAY1 00:02:00", Time(120).to_string());
        assert_eq!("DAY2 01:00:05", Time(86_400 + 3605).to_string());
    }

    #[test]
    fn test_parse_hms() {
        assert_eq!(Some(Time(7 * 3600 + 30 * 60 + 15)), Time::parse_hms("07:30:15"));
        assert_eq!(None, Time::parse_hms("07:61:00"));
        assert_eq!(None, Time::parse_hms("07:30"));
    }

    #[test]
    fn test_deserialize_either_form() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "deserialize_clock")]
            at: Time,
        }
        let secs: Row = serde_json::from_str(r#"{"at": 90}"#).unwrap();
        let clock: Row = serde_json::from_str(r#"{"at": "00:01:30"}"#).unwrap();
        assert_eq!(secs.at, clock.at);
        assert!(serde_json::from_str::<Row>(r#"{"at": "noon"}"#).is_err());
    }

    #[test]
    fn test_from_secs_rounds_and_clamps() {
        assert_eq!(Time(31), Time::from_secs_f64(30.6));
        assert_eq!(Time::ZERO, Time::from_secs_f64(-4.0));
        assert_eq!(Time::ZERO, Time::from_secs_f64(f64::NAN));
        assert_eq!(Time(5), Time(3).saturating_sub(Time(10)) + 5);
    }
}
