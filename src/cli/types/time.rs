//! Season type and the club's local clock.

use crate::error::{DataError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type-safe wrapper for Season years
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Season(pub u16);

impl Season {
    pub fn new(year: u16) -> Self {
        Self(year)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// The season of the current local calendar year.
    pub fn current() -> Self {
        Self(chrono::Local::now().year() as u16)
    }
}

/// Time zone used for date ranges, posting windows and "today".
pub const HOME_TZ: Tz = chrono_tz::America::Los_Angeles;

/// `now` as a calendar date in [`HOME_TZ`].
pub fn home_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&HOME_TZ).date_naive()
}

/// Today's date in [`HOME_TZ`].
pub fn home_today() -> NaiveDate {
    home_date(Utc::now())
}

impl Default for Season {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Season {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(s.trim().parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_from_str() {
        assert_eq!("2024".parse::<Season>().unwrap(), Season::new(2024));
        assert_eq!(" 1958 ".parse::<Season>().unwrap().as_u16(), 1958);
        assert!("next year".parse::<Season>().is_err());
    }

    #[test]
    fn test_home_date_crosses_midnight_utc() {
        // 03:30 UTC on Apr 2 is still Apr 1 in Los Angeles.
        let now = DateTime::parse_from_rfc3339("2024-04-02T03:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(home_date(now), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
    }

    #[test]
    fn test_season_display_and_order() {
        assert_eq!(Season::new(2025).to_string(), "2025");
        assert!(Season::new(2023) < Season::new(2024));
    }
}
