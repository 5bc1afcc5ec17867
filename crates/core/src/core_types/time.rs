//! Reference timestamp of a fire domain

use crate::error::FireError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// 2000-01-01T00:00:00Z
const DEFAULT_EPOCH: i64 = 946_684_800;

/// Calendar anchor used to interpret time-dependent layers.
///
/// Simulation time is expressed in seconds relative to this anchor. The textual
/// form is `YYYY-MM-DDTHH:MM:SSZ`, as accepted by `FireDomain[date=...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTime(DateTime<Utc>);

impl ReferenceTime {
    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for ReferenceTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl Default for ReferenceTime {
    fn default() -> Self {
        Self(DateTime::from_timestamp(DEFAULT_EPOCH, 0).unwrap_or_default())
    }
}

impl fmt::Display for ReferenceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for ReferenceTime {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s.trim(), DATE_FORMAT)
            .map(|naive| Self(naive.and_utc()))
            .map_err(|err| FireError::command(format!("'{s}' is not a YYYY-MM-DDTHH:MM:SSZ date: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_date() {
        let t: ReferenceTime = "2024-03-01T01:30:15Z".parse().unwrap();
        // 2024 is a leap year: 31 + 29 + 1
        assert_eq!(t.datetime().ordinal(), 61);
        assert_eq!(t.datetime().num_seconds_from_midnight(), 5415);
        assert_eq!(t.to_string(), "2024-03-01T01:30:15Z");

        assert_eq!(ReferenceTime::default().to_string(), "2000-01-01T00:00:00Z");
        let last: ReferenceTime = "2023-12-31T23:59:59Z".parse().unwrap();
        assert_eq!(last.datetime().ordinal(), 365);
    }

    #[test]
    fn test_reject_bad_dates() {
        assert!("2023-02-29T00:00:00Z".parse::<ReferenceTime>().is_err());
        assert!("2023-13-01T00:00:00Z".parse::<ReferenceTime>().is_err());
        assert!("2023-01-01".parse::<ReferenceTime>().is_err());
        assert!("2023-01-01T25:00:00Z".parse::<ReferenceTime>().is_err());
    }
}
