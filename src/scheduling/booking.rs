//! Pre-submission checks for creating or rescheduling an appointment.

use chrono::{DateTime, Utc};
use tracing::info;

use super::conflict::find_conflicts;
use super::duration::DurationPolicy;
use super::interval::AppointmentInterval;
use crate::config::SchedulingConfig;
use crate::error::SchedulingError;

/// A slot the user wants to book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingProposal {
    /// Practitioner to book.
    pub resource_id: String,

    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    /// Id of the appointment being moved, when rescheduling.
    pub reschedule_of: Option<String>,
}

impl BookingProposal {
    pub fn new(resource_id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            resource_id: resource_id.into(),
            start,
            end,
            reschedule_of: None,
        }
    }

    pub fn rescheduling(mut self, appointment_id: impl Into<String>) -> Self {
        self.reschedule_of = Some(appointment_id.into());
        self
    }
}

/// Runs the duration policy, the past-date rule and the conflict check.
#[derive(Debug, Clone)]
pub struct BookingGuard {
    duration: DurationPolicy,
    reject_past: bool,
}

impl Default for BookingGuard {
    fn default() -> Self {
        Self::new(DurationPolicy::default(), false)
    }
}

impl BookingGuard {
    pub fn new(duration: DurationPolicy, reject_past: bool) -> Self {
        Self {
            duration,
            reject_past,
        }
    }

    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self::new(DurationPolicy::from_config(config), config.reject_past)
    }

    /// Validate `proposal` against the known schedule.
    ///
    /// Returns the duration in minutes, ready to send as `minutesDuration`.
    pub fn check(
        &self,
        existing: &[AppointmentInterval],
        proposal: &BookingProposal,
        now: DateTime<Utc>,
    ) -> Result<i64, SchedulingError> {
        let minutes = self.duration.check(proposal.start, proposal.end)?;

        if self.reject_past && proposal.start < now {
            return Err(SchedulingError::StartInPast);
        }

        let conflicts = find_conflicts(
            existing,
            &proposal.resource_id,
            proposal.start,
            proposal.end,
            proposal.reschedule_of.as_deref(),
        );

        if !conflicts.is_empty() {
            info!(
                "Provider {} already booked between {} and {}",
                proposal.resource_id, proposal.start, proposal.end
            );
            return Err(SchedulingError::ConflictDetected {
                resource_id: proposal.resource_id.clone(),
                conflicting_ids: conflicts.into_iter().map(|e| e.id.clone()).collect(),
            });
        }

        Ok(minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DurationRule;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    fn schedule() -> Vec<AppointmentInterval> {
        vec![AppointmentInterval::new("A", "dr-1", at(10, 0), at(10, 30))]
    }

    fn clinic_guard() -> BookingGuard {
        BookingGuard::new(
            DurationPolicy {
                increment_minutes: 5,
                min_minutes: Some(15),
                max_minutes: Some(480),
            },
            true,
        )
    }

    #[test]
    fn test_accepts_free_slot() {
        let proposal = BookingProposal::new("dr-1", at(10, 30), at(11, 0));
        let now = at(8, 0);
        assert_eq!(clinic_guard().check(&schedule(), &proposal, now), Ok(30));
    }

    #[test]
    fn test_rejects_conflict_with_ids() {
        let proposal = BookingProposal::new("dr-1", at(10, 15), at(10, 45));
        let err = clinic_guard()
            .check(&schedule(), &proposal, at(8, 0))
            .unwrap_err();

        assert_eq!(
            err,
            SchedulingError::ConflictDetected {
                resource_id: "dr-1".into(),
                conflicting_ids: vec!["A".into()],
            }
        );
    }

    #[test]
    fn test_reschedule_in_place() {
        let proposal = BookingProposal::new("dr-1", at(10, 0), at(10, 30)).rescheduling("A");
        assert_eq!(clinic_guard().check(&schedule(), &proposal, at(8, 0)), Ok(30));
    }

    #[test]
    fn test_duration_checked_before_conflicts() {
        // Overlaps A, but the 7 minute duration is reported first.
        let proposal = BookingProposal::new("dr-1", at(10, 0), at(10, 0) + Duration::minutes(7));
        let err = BookingGuard::default()
            .check(&schedule(), &proposal, at(8, 0))
            .unwrap_err();

        assert_eq!(
            err,
            SchedulingError::InvalidDuration {
                minutes: 7,
                reason: DurationRule::NotIncrement(5)
            }
        );
    }

    #[test]
    fn test_past_start_rejected_when_configured() {
        let proposal = BookingProposal::new("dr-2", at(9, 0), at(9, 30));

        assert_eq!(
            clinic_guard().check(&[], &proposal, at(12, 0)),
            Err(SchedulingError::StartInPast)
        );
        assert_eq!(
            BookingGuard::default().check(&[], &proposal, at(12, 0)),
            Ok(30)
        );
    }
}
