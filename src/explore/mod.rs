//! Explore
//!
//! Climate series for one org unit, compared against climate normals of a
//! reference period. The selection (org unit, monthly period, reference
//! period) is passed explicitly as an [`ExploreContext`].

mod monthly;

pub use monthly::{monthly_precipitation, MonthlyNormal, MonthlyObservation, MonthlyPrecipitation, MonthlyRow};

use crate::org_unit::OrgUnitFeature;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExploreError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid reference period: {0}")]
    InvalidReferencePeriod(String),

    #[error("Period ends before it starts: {0} to {1}")]
    InvalidRange(YearMonth, YearMonth),
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, ExploreError> {
        if !(1..=12).contains(&month) {
            return Err(ExploreError::InvalidPeriod(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// DHIS2 monthly period id, e.g. `202401`
    pub fn dhis2_id(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ExploreError;

    /// Accepts `YYYYMM` and `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExploreError::InvalidPeriod(s.to_string());
        let s = s.trim();
        if !s.is_ascii() {
            return Err(invalid());
        }

        let (year, month) = match s.len() {
            6 => (&s[..4], &s[4..]),
            7 if s.as_bytes()[4] == b'-' => (&s[..4], &s[5..]),
            _ => return Err(invalid()),
        };

        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = ExploreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Inclusive range of months to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPeriod {
    pub start_time: YearMonth,
    pub end_time: YearMonth,
}

impl MonthlyPeriod {
    pub fn new(start_time: YearMonth, end_time: YearMonth) -> Result<Self, ExploreError> {
        if end_time < start_time {
            return Err(ExploreError::InvalidRange(start_time, end_time));
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.start_time <= month && month <= self.end_time
    }
}

/// Years the climate normals were computed over, e.g. `1991-2020`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePeriod {
    pub id: String,
    pub start_time: i32,
    pub end_time: i32,
}

impl FromStr for ReferencePeriod {
    type Err = ExploreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExploreError::InvalidReferencePeriod(s.to_string());
        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let start_time: i32 = start.trim().parse().map_err(|_| invalid())?;
        let end_time: i32 = end.trim().parse().map_err(|_| invalid())?;

        if end_time < start_time {
            return Err(invalid());
        }

        Ok(Self {
            id: format!("{}-{}", start_time, end_time),
            start_time,
            end_time,
        })
    }
}

/// What the user is exploring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreContext {
    pub org_unit: OrgUnitFeature,
    pub monthly_period: MonthlyPeriod,
    pub reference_period: ReferencePeriod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_month() {
        assert_eq!("202401".parse::<YearMonth>().unwrap(), YearMonth { year: 2024, month: 1 });
        assert_eq!("2024-12".parse::<YearMonth>().unwrap(), YearMonth { year: 2024, month: 12 });
        assert!("202413".parse::<YearMonth>().is_err());
        assert!("2024".parse::<YearMonth>().is_err());
        assert!("2024/01".parse::<YearMonth>().is_err());
        assert!("+20401".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_year_month_display_and_order() {
        let jan = YearMonth::new(2024, 1).unwrap();
        let dec = YearMonth::new(2023, 12).unwrap();
        assert!(dec < jan);
        assert_eq!(jan.to_string(), "2024-01");
        assert_eq!(jan.dhis2_id(), "202401");
    }

    #[test]
    fn test_monthly_period_range() {
        let start = YearMonth::new(2023, 6).unwrap();
        let end = YearMonth::new(2024, 5).unwrap();

        let period = MonthlyPeriod::new(start, end).unwrap();
        assert!(period.contains(YearMonth::new(2024, 1).unwrap()));
        assert!(!period.contains(YearMonth::new(2024, 6).unwrap()));
        assert!(MonthlyPeriod::new(end, start).is_err());
    }

    #[test]
    fn test_reference_period() {
        let reference: ReferencePeriod = "1991-2020".parse().unwrap();
        assert_eq!(reference.start_time, 1991);
        assert_eq!(reference.end_time, 2020);
        assert_eq!(reference.id, "1991-2020");
        assert!("2020-1991".parse::<ReferencePeriod>().is_err());
        assert!("1991".parse::<ReferencePeriod>().is_err());
    }

    #[test]
    fn test_context_deserialize() {
        let json = r#"{
            "orgUnit": {"id": "O6uvpzGd5pu", "properties": {"name": "Bo"}},
            "monthlyPeriod": {"startTime": "2023-01", "endTime": "202312"},
            "referencePeriod": {"id": "1991-2020", "startTime": 1991, "endTime": 2020}
        }"#;

        let ctx: ExploreContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.org_unit.name(), "Bo");
        assert_eq!(ctx.monthly_period.end_time, YearMonth::new(2023, 12).unwrap());
    }
}
