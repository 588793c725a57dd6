//! Time intervals checked for double-booking.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::fhir::models::{parse_instant, Appointment, Bundle};

/// One booked span of a schedulable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentInterval {
    /// Appointment id, used to exclude an entry from its own reschedule check.
    pub id: String,

    /// Schedulable resource (the practitioner id).
    pub resource_id: String,

    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AppointmentInterval {
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_id: resource_id.into(),
            start,
            end,
        }
    }

    /// Build one interval per practitioner booked by an appointment.
    ///
    /// Empty when the appointment has no id, no practitioner participant,
    /// an unparseable start/end, or `start >= end`.
    pub fn from_appointment(appointment: &Appointment) -> Vec<Self> {
        let Some((id, start, end)) = booked_span(appointment) else {
            return Vec::new();
        };

        appointment
            .provider_ids()
            .into_iter()
            .map(|provider| Self::new(id, provider, start, end))
            .collect()
    }
}

/// Id and `[start, end)` of an appointment, if all are present and ordered.
fn booked_span(appointment: &Appointment) -> Option<(&str, DateTime<Utc>, DateTime<Utc>)> {
    let id = appointment.id.as_deref()?;
    let start = parse_instant(appointment.start.as_deref()?)?;
    let end = parse_instant(appointment.end.as_deref()?)?;
    (start < end).then_some((id, start, end))
}

/// Provider intervals for every usable appointment in a search bundle.
pub fn intervals_for_conflict_check(bundle: &Bundle) -> Vec<AppointmentInterval> {
    bundle
        .appointments()
        .flat_map(|appointment| {
            let intervals = AppointmentInterval::from_appointment(appointment);
            if intervals.is_empty() {
                debug!(
                    "Skipping appointment {:?} for conflict checks: missing provider or invalid times",
                    appointment.id
                );
            }
            intervals
        })
        .collect()
}
