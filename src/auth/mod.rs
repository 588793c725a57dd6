//! ModMed OAuth2 authentication.
//!
//! Provides the grant client for the token endpoint, zeroizing secret
//! wrappers, and the token manager that caches and renews the bearer token.

pub mod oauth;
pub mod secure;
pub mod token_manager;

pub use oauth::{GrantClient, OAuth2Client, TokenResponse, API_KEY_HEADER};
pub use secure::SecureString;
pub use token_manager::{Credential, CredentialSnapshot, TokenManager};
