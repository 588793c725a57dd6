//! Clinic dashboard backend core.
//!
//! Keeps the bearer token for the ModMed FHIR API valid and shared across
//! concurrent requests, and checks proposed appointments for double-booking
//! before they are submitted.

#![deny(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod fhir;
pub mod logging;
pub mod scheduling;

pub use auth::{OAuth2Client, TokenManager};
pub use config::Config;
pub use error::{ApiError, AppError, AuthError, SchedulingError};
pub use fhir::FhirClient;
pub use scheduling::{has_conflict, validate_duration, AppointmentInterval, BookingGuard};

/// Build the token manager and FHIR client described by `config`.
///
/// The configuration is validated first; missing credentials or a bad base
/// URL are reported as [`AppError::Config`]. The returned client owns a clone
/// of the token manager; clone either to share the credential with other
/// handlers.
pub fn connect(config: &Config) -> Result<FhirClient<OAuth2Client>, AppError> {
    config
        .validate()
        .map_err(|e| AppError::Config(format!("{:#}", e)))?;

    let oauth = OAuth2Client::new(config)?;
    let tokens = TokenManager::from_config(oauth, config);
    Ok(FhirClient::new(config, tokens)?)
}
