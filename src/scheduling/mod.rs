//! Appointment scheduling rules.
//!
//! This module provides:
//! - Provider intervals built from FHIR appointment snapshots
//! - Half-open overlap detection per provider
//! - Duration policy (5-minute increments, optional bounds)
//! - A booking guard combining the checks before a create or reschedule

pub mod booking;
pub mod conflict;
pub mod duration;
pub mod interval;

pub use booking::{BookingGuard, BookingProposal};
pub use conflict::{find_conflicts, has_conflict};
pub use duration::{duration_minutes, validate_duration, DurationPolicy};
pub use interval::{intervals_for_conflict_check, AppointmentInterval};
