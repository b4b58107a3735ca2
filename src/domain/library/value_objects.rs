use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::LibraryCardError;

// ============================================================================
// Value Objects - Library Domain
// ============================================================================

/// UUID v4 identity, displayed as 32 hex characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    /// Accepts both the hex and the hyphenated form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Closed interval of instants, `start_date <= end_date`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Result<Self, LibraryCardError> {
        if start_date > end_date {
            return Err(LibraryCardError::InvalidDateRange { start_date, end_date });
        }
        Ok(Self { start_date, end_date })
    }

    pub fn one_week() -> Self {
        Self::starting_now_for(Duration::weeks(1))
    }

    pub fn two_weeks() -> Self {
        Self::starting_now_for(Duration::weeks(2))
    }

    /// One calendar month from now
    pub fn one_month() -> Self {
        let start_date = Utc::now();
        let end_date = start_date
            .checked_add_months(Months::new(1))
            .unwrap_or(start_date + Duration::days(31));
        Self { start_date, end_date }
    }

    fn starting_now_for(length: Duration) -> Self {
        let start_date = Utc::now();
        Self {
            start_date,
            end_date: start_date + length,
        }
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn is_within_range(&self, date: DateTime<Utc>) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Whole days between start and end
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    pub(crate) fn extended_by(&self, days: u32) -> Self {
        Self {
            start_date: self.start_date,
            end_date: self.end_date + Duration::days(i64::from(days)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Suspended,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = LibraryCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CardStatus::Active),
            "suspended" => Ok(CardStatus::Suspended),
            other => Err(LibraryCardError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_check_if_date_is_within_range() {
        let one_week = DateRange::one_week();
        let one_month = DateRange::one_month();
        let now = Utc::now();

        assert!(!one_month.is_within_range(now + Duration::days(50)));
        assert!(one_month.is_within_range(now + Duration::days(12)));
        assert!(!one_week.is_within_range(now + Duration::days(15)));
        assert!(one_week.is_within_range(now + Duration::days(5)));
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let now = Utc::now();

        let result = DateRange::new(now, now - Duration::days(1));

        assert!(matches!(result, Err(LibraryCardError::InvalidDateRange { .. })));
        assert!(DateRange::new(now, now).is_ok());
    }

    #[test]
    fn test_range_lengths() {
        assert_eq!(DateRange::one_week().days(), 7);
        assert_eq!(DateRange::two_weeks().days(), 14);
        assert!(DateRange::one_month().days() >= 28);
    }

    #[test]
    fn test_entity_id_formats() {
        let id = EntityId::new();
        let hex = id.to_string();

        assert_eq!(hex.len(), 32);
        assert_eq!(hex.parse::<EntityId>().unwrap(), id);
        assert_eq!(id.as_uuid().to_string().parse::<EntityId>().unwrap(), id);
    }

    #[test]
    fn test_card_status_round_trip() {
        assert_eq!("suspended".parse::<CardStatus>().unwrap(), CardStatus::Suspended);
        assert_eq!(CardStatus::Active.to_string(), "active");
        assert!("closed".parse::<CardStatus>().is_err());
    }
}
