//! Appointment duration rules.

use chrono::{DateTime, Utc};

use crate::config::SchedulingConfig;
use crate::error::{DurationRule, SchedulingError};

/// Bookings are made in steps of this many minutes.
pub const DEFAULT_INCREMENT_MINUTES: i64 = 5;

/// Length of `[start, end)` in whole minutes, rounded to the nearest minute.
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds();
    (millis + 30_000).div_euclid(60_000)
}

/// Check that the duration is positive and a multiple of five minutes.
///
/// Returns the duration in minutes.
pub fn validate_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, SchedulingError> {
    DurationPolicy::default().check(start, end)
}

/// Duration limits applied before a booking is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationPolicy {
    pub increment_minutes: i64,
    pub min_minutes: Option<i64>,
    pub max_minutes: Option<i64>,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            increment_minutes: DEFAULT_INCREMENT_MINUTES,
            min_minutes: None,
            max_minutes: None,
        }
    }
}

impl DurationPolicy {
    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self {
            increment_minutes: config.increment_minutes,
            min_minutes: config.min_duration_minutes,
            max_minutes: config.max_duration_minutes,
        }
    }

    /// Validate `[start, end)` and return its duration in minutes.
    pub fn check(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, SchedulingError> {
        let minutes = duration_minutes(start, end);
        let invalid = |reason| SchedulingError::InvalidDuration { minutes, reason };

        if minutes <= 0 {
            return Err(invalid(DurationRule::NotPositive));
        }

        if self.increment_minutes > 0 && minutes % self.increment_minutes != 0 {
            return Err(invalid(DurationRule::NotIncrement(self.increment_minutes)));
        }

        if let Some(min) = self.min_minutes {
            if minutes < min {
                return Err(invalid(DurationRule::BelowMinimum(min)));
            }
        }

        if let Some(max) = self.max_minutes {
            if minutes > max {
                return Err(invalid(DurationRule::AboveMaximum(max)));
            }
        }

        Ok(minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn after(minutes: i64) -> DateTime<Utc> {
        start() + Duration::minutes(minutes)
    }

    #[test]
    fn test_five_minute_rule() {
        assert_eq!(validate_duration(start(), after(15)), Ok(15));
        assert_eq!(validate_duration(start(), after(5)), Ok(5));
        assert_eq!(
            validate_duration(start(), after(7)),
            Err(SchedulingError::InvalidDuration {
                minutes: 7,
                reason: DurationRule::NotIncrement(5)
            })
        );
    }

    #[test]
    fn test_non_positive_duration() {
        assert!(matches!(
            validate_duration(start(), start()),
            Err(SchedulingError::InvalidDuration {
                reason: DurationRule::NotPositive,
                ..
            })
        ));
        assert!(validate_duration(start(), after(-30)).is_err());
    }

    #[test]
    fn test_rounds_to_nearest_minute() {
        assert_eq!(duration_minutes(start(), after(15) + Duration::seconds(20)), 15);
        assert_eq!(duration_minutes(start(), after(14) + Duration::seconds(30)), 15);
    }

    #[test]
    fn test_policy_bounds() {
        let policy = DurationPolicy {
            increment_minutes: 5,
            min_minutes: Some(15),
            max_minutes: Some(480),
        };

        assert_eq!(policy.check(start(), after(15)), Ok(15));
        assert_eq!(policy.check(start(), after(480)), Ok(480));
        assert_eq!(
            policy.check(start(), after(10)).unwrap_err(),
            SchedulingError::InvalidDuration {
                minutes: 10,
                reason: DurationRule::BelowMinimum(15)
            }
        );
        assert_eq!(
            policy.check(start(), after(485)).unwrap_err(),
            SchedulingError::InvalidDuration {
                minutes: 485,
                reason: DurationRule::AboveMaximum(480)
            }
        );
    }
}
