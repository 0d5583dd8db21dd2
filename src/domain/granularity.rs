//! Time granularities for rate limit windows.

use crate::error::LimiterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The base time unit of a rate limit.
///
/// Month and year are fixed approximations (30 and 365 days); no calendar
/// arithmetic is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One second
    Second,
    /// One minute (60 seconds)
    Minute,
    /// One hour (3600 seconds)
    Hour,
    /// One day (86 400 seconds)
    Day,
    /// Thirty days
    Month,
    /// 365 days
    Year,
}

impl Granularity {
    /// Number of seconds in one unit of this granularity.
    pub const fn seconds(self) -> u64 {
        match self {
            Granularity::Second => 1,
            Granularity::Minute => 60,
            Granularity::Hour => 3600,
            Granularity::Day => 86_400,
            Granularity::Month => 30 * 86_400,
            Granularity::Year => 365 * 86_400,
        }
    }

    /// Lowercase singular name, as used in canonical limit strings and
    /// storage keys.
    pub const fn name(self) -> &'static str {
        match self {
            Granularity::Second => "second",
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Granularity {
    type Err = LimiterError;

    /// Parses a granularity name, case-insensitively, singular or plural.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let singular = lowered.strip_suffix('s').unwrap_or(&lowered);

        match singular {
            "second" => Ok(Granularity::Second),
            "minute" => Ok(Granularity::Minute),
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            _ => Err(LimiterError::MalformedExpression(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_per_unit() {
        assert_eq!(Granularity::Second.seconds(), 1);
        assert_eq!(Granularity::Minute.seconds(), 60);
        assert_eq!(Granularity::Hour.seconds(), 3_600);
        assert_eq!(Granularity::Day.seconds(), 86_400);
        assert_eq!(Granularity::Month.seconds(), 2_592_000);
        assert_eq!(Granularity::Year.seconds(), 31_536_000);
    }

    #[test]
    fn test_parse_singular_and_plural() {
        assert_eq!("minute".parse::<Granularity>().unwrap(), Granularity::Minute);
        assert_eq!("minutes".parse::<Granularity>().unwrap(), Granularity::Minute);
        assert_eq!("seconds".parse::<Granularity>().unwrap(), Granularity::Second);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("HOUR".parse::<Granularity>().unwrap(), Granularity::Hour);
        assert_eq!("Days".parse::<Granularity>().unwrap(), Granularity::Day);
    }

    #[test]
    fn test_parse_rejects_unknown_unit() {
        assert!("fortnight".parse::<Granularity>().is_err());
        assert!("".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for granularity in [
            Granularity::Second,
            Granularity::Minute,
            Granularity::Hour,
            Granularity::Day,
            Granularity::Month,
            Granularity::Year,
        ] {
            let name = granularity.to_string();
            assert_eq!(name.parse::<Granularity>().unwrap(), granularity);
        }
    }
}
