//! Error types for the clinicdash crate.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use std::fmt;

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Which OAuth2 grant an acquisition attempt used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    Password,
    RefreshToken,
}

impl GrantKind {
    /// Value sent as `grant_type` to the token endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token acquisition errors.
///
/// `Clone` because a single failed acquisition is handed to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Token endpoint rejected {grant} grant: HTTP {status}")]
    AcquisitionRejected { grant: GrantKind, status: u16 },

    #[error("Token endpoint unreachable: {0}")]
    TransientNetwork(String),

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

/// Protected API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized (401): token rejected after re-authentication")]
    Unauthorized,

    #[error("Bad request (400): {0}")]
    BadRequest(String),

    #[error("Forbidden (403): Insufficient permissions")]
    Forbidden,

    #[error("Not found (404)")]
    NotFound,

    #[error("Conflict (409): resource was modified")]
    Conflict,

    #[error("Rate limited (429): Too many requests")]
    RateLimited,

    #[error("Upstream server error: HTTP {0}")]
    Server(u16),

    #[error("Unexpected response: HTTP {0}")]
    Unexpected(u16),

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Token acquisition failed: {0}")]
    Auth(#[from] AuthError),
}

/// Booking validation errors, raised before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Invalid duration of {minutes} minutes: {reason}")]
    InvalidDuration { minutes: i64, reason: DurationRule },

    #[error("Cannot schedule appointments in the past")]
    StartInPast,

    #[error("Provider {resource_id} is already booked ({})", .conflicting_ids.join(", "))]
    ConflictDetected {
        resource_id: String,
        conflicting_ids: Vec<String>,
    },
}

/// The duration rule a proposed appointment broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationRule {
    NotPositive,
    NotIncrement(i64),
    BelowMinimum(i64),
    AboveMaximum(i64),
}

impl fmt::Display for DurationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive => f.write_str("end time must be after start time"),
            Self::NotIncrement(step) => write!(f, "must be in {}-minute increments", step),
            Self::BelowMinimum(min) => write!(f, "minimum is {} minutes", min),
            Self::AboveMaximum(max) => write!(f, "maximum is {} minutes", max),
        }
    }
}

impl ApiError {
    /// Returns a user-friendly message for display in the dashboard.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Unauthorized => "Authentication failed. Please refresh and try again.",
            Self::BadRequest(_) => "Invalid request. Please check your input.",
            Self::Forbidden => "Permission denied. You don't have access to this resource.",
            Self::NotFound => "Resource not found. It may have been deleted.",
            Self::Conflict => "Conflict detected. Resource may have been modified.",
            Self::RateLimited => "Too many requests. Please wait and try again.",
            Self::Server(_) => "Server error. Please try again later.",
            Self::Unexpected(_) | Self::ParseFailed(_) => {
                "Unexpected response from the scheduling system. Please try again."
            }
            Self::Network(e) if e.is_timeout() => "Request timed out. Please try again.",
            Self::Network(_) => "Network error. Check your connection.",
            Self::Auth(e) => e.user_message(),
        }
    }
}

impl AuthError {
    /// Returns a user-friendly message for display in the dashboard.
    pub fn user_message(&self) -> &str {
        match self {
            Self::AcquisitionRejected { .. } => {
                "Could not sign in to the scheduling system. Check the integration credentials."
            }
            Self::TransientNetwork(_) => "Scheduling system unreachable. Please try again.",
            Self::MalformedResponse(_) => "Unexpected response from the sign-in service.",
        }
    }
}

impl AppError {
    /// Returns a user-friendly message for display in the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(e) => e.user_message().to_string(),
            Self::Api(e) => e.user_message().to_string(),
            Self::Scheduling(SchedulingError::ConflictDetected { .. }) => {
                "Provider has a scheduling conflict. Please choose a different time.".to_string()
            }
            Self::Scheduling(SchedulingError::InvalidDuration { reason, .. }) => {
                format!("Appointment duration {}.", reason)
            }
            Self::Scheduling(e) => e.to_string(),
            Self::Config(_) => "Configuration error. Please check settings.".to_string(),
        }
    }

    /// Returns true if this error is an authentication failure that must be
    /// surfaced to the user rather than swallowed.
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            Self::Auth(AuthError::AcquisitionRejected { .. })
                | Self::Api(ApiError::Unauthorized)
                | Self::Api(ApiError::Auth(AuthError::AcquisitionRejected { .. }))
        )
    }
}
