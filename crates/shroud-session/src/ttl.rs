// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifetimes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use shroud_core::ShroudError;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// "Persistent" is still finite: ten years.
pub const PERSISTENT_SECS: u64 = 10 * 365 * DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTtl {
    FifteenMinutes,
    OneHour,
    OneDay,
    Persistent,
    Custom(Duration),
}

impl SessionTtl {
    /// A custom TTL. Zero is rejected.
    pub fn from_secs(secs: u64) -> Result<Self, ShroudError> {
        if secs == 0 {
            return Err(ShroudError::InvalidInput(
                "session TTL must be greater than zero".to_string(),
            ));
        }
        Ok(match secs {
            s if s == 15 * MINUTE => Self::FifteenMinutes,
            HOUR => Self::OneHour,
            DAY => Self::OneDay,
            PERSISTENT_SECS => Self::Persistent,
            s => Self::Custom(Duration::from_secs(s)),
        })
    }

    pub fn as_duration(&self) -> Duration {
        match self {
            Self::FifteenMinutes => Duration::from_secs(15 * MINUTE),
            Self::OneHour => Duration::from_secs(HOUR),
            Self::OneDay => Duration::from_secs(DAY),
            Self::Persistent => Duration::from_secs(PERSISTENT_SECS),
            Self::Custom(d) => *d,
        }
    }
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self::FifteenMinutes
    }
}

impl fmt::Display for SessionTtl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FifteenMinutes => f.write_str("15m"),
            Self::OneHour => f.write_str("1h"),
            Self::OneDay => f.write_str("24h"),
            Self::Persistent => f.write_str("persistent"),
            Self::Custom(d) => write!(f, "{}s", d.as_secs()),
        }
    }
}

/// Accepts `15m`, `1h`, `24h`, `persistent`, a plain number of seconds, or
/// a number with an `s`/`m`/`h`/`d` suffix.
impl FromStr for SessionTtl {
    type Err = ShroudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "persistent" {
            return Ok(Self::Persistent);
        }
        let invalid = || ShroudError::InvalidInput(format!("unrecognised session TTL `{s}`"));
        let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
            Some(idx) => s.split_at(idx),
            None => (s.as_str(), "s"),
        };
        let count: u64 = digits.parse().map_err(|_| invalid())?;
        let scale = match unit {
            "s" => 1,
            "m" => MINUTE,
            "h" => HOUR,
            "d" => DAY,
            _ => return Err(invalid()),
        };
        Self::from_secs(count.checked_mul(scale).ok_or_else(invalid)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_parse() {
        assert_eq!("15m".parse::<SessionTtl>().unwrap(), SessionTtl::FifteenMinutes);
        assert_eq!("1h".parse::<SessionTtl>().unwrap(), SessionTtl::OneHour);
        assert_eq!("24h".parse::<SessionTtl>().unwrap(), SessionTtl::OneDay);
        assert_eq!("1d".parse::<SessionTtl>().unwrap(), SessionTtl::OneDay);
        assert_eq!("Persistent".parse::<SessionTtl>().unwrap(), SessionTtl::Persistent);
        assert_eq!(
            "90".parse::<SessionTtl>().unwrap(),
            SessionTtl::Custom(Duration::from_secs(90))
        );
    }

    #[test]
    fn zero_and_garbage_rejected() {
        for input in ["0", "0m", "", "m", "5w", "-1", "forever"] {
            assert!(
                matches!(input.parse::<SessionTtl>(), Err(ShroudError::InvalidInput(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn persistent_is_finite_and_long() {
        let d = SessionTtl::Persistent.as_duration();
        assert!(d > Duration::from_secs(9 * 365 * DAY));
        assert!(chrono::Duration::from_std(d).is_ok());
    }

    #[test]
    fn display_roundtrips_presets() {
        for ttl in [
            SessionTtl::FifteenMinutes,
            SessionTtl::OneHour,
            SessionTtl::OneDay,
            SessionTtl::Persistent,
        ] {
            assert_eq!(ttl.to_string().parse::<SessionTtl>().unwrap(), ttl);
        }
    }
}
