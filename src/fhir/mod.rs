//! ModMed FHIR API access.
//!
//! Provides the authorized client for the protected upstream and the
//! appointment snapshot models it returns.

pub mod client;
pub mod models;

pub use client::{AppointmentQuery, FhirClient};
pub use models::{parse_instant, parse_reference, Appointment, Bundle, ResourceKind};
