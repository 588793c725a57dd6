//! Bearer token management with proactive renewal and single-flight acquisition.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use super::oauth::{GrantClient, TokenResponse};
use super::secure::SecureString;
use crate::config::Config;
use crate::error::AuthError;

/// Tokens expiring within this window are renewed before use.
pub const DEFAULT_EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Lifetime assumed when the grant response carries no `expires_in`.
pub const DEFAULT_FALLBACK_TTL_SECONDS: i64 = 1500;

/// An acquisition shared by every caller that arrives while it is pending.
type Acquisition = Shared<BoxFuture<'static, Result<SecureString, AuthError>>>;

/// The cached OAuth2 credential for one upstream identity.
#[derive(Debug, Default)]
pub struct Credential {
    access_token: Option<SecureString>,
    refresh_token: Option<SecureString>,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// The cached access token, if it stays valid beyond `margin` from `now`.
    pub fn usable_token(&self, now: DateTime<Utc>, margin: Duration) -> Option<&SecureString> {
        let deadline = self.expires_at?.checked_sub_signed(margin)?;
        self.access_token.as_ref().filter(|_| now < deadline)
    }

    /// Replace the credential with a successful grant response.
    ///
    /// A response without a refresh token keeps the one already held. An
    /// `expires_in` too large to represent is treated as missing.
    pub fn apply(
        &mut self,
        response: TokenResponse,
        now: DateTime<Utc>,
        fallback_ttl: Duration,
    ) -> SecureString {
        let expires_at = response
            .expires_in
            .and_then(|seconds| i64::try_from(seconds).ok())
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .or_else(|| {
                if response.expires_in.is_some() {
                    warn!(expires_in = ?response.expires_in, "Token lifetime out of range, using fallback");
                }
                now.checked_add_signed(fallback_ttl)
            })
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        self.expires_at = Some(expires_at);
        self.access_token = Some(response.access_token.clone());

        response.access_token
    }

    fn clear_access_token(&mut self) {
        self.access_token = None;
        self.expires_at = None;
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Non-secret view of the credential, for logging and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub acquisition_pending: bool,
}

struct State {
    credential: Credential,
    in_flight: Option<Acquisition>,
}

struct Inner<C> {
    client: C,
    state: Mutex<State>,
    expiry_margin: Duration,
    fallback_ttl: Duration,
}

impl<C: GrantClient> Inner<C> {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        // The state is replaced wholesale under the lock, so a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refresh grant first, password grant if no refresh token is held or the refresh fails.
    async fn acquire(&self) -> Result<TokenResponse, AuthError> {
        let refresh_token = self.lock_state().credential.refresh_token.clone();

        if let Some(refresh_token) = refresh_token {
            match self.client.refresh_grant(&refresh_token).await {
                Ok(response) => {
                    info!("Access token refreshed");
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Refresh grant failed, falling back to password grant: {}", e);
                    if matches!(e, AuthError::AcquisitionRejected { .. }) {
                        // Revoked or expired; retrying it next time would fail again.
                        self.lock_state().credential.refresh_token = None;
                    }
                }
            }
        }

        let response = self.client.password_grant().await?;
        info!("New access token acquired with password grant");
        Ok(response)
    }
}

/// Owns the bearer token for the protected upstream and hands it to request handlers.
///
/// Cloning is cheap and every clone shares the same credential. Concurrent
/// callers that find the token missing or about to expire all wait on a single
/// acquisition instead of each calling the token endpoint.
pub struct TokenManager<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for TokenManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: GrantClient + 'static> TokenManager<C> {
    /// Create a token manager with explicit renewal settings.
    pub fn new(client: C, expiry_margin: Duration, fallback_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                state: Mutex::new(State {
                    credential: Credential::default(),
                    in_flight: None,
                }),
                expiry_margin,
                fallback_ttl,
            }),
        }
    }

    /// Create a token manager using the `[token]` configuration section.
    pub fn from_config(client: C, config: &Config) -> Self {
        Self::new(client, config.expiry_margin(), config.fallback_ttl())
    }

    /// Get a bearer token that stays valid beyond the expiry margin.
    ///
    /// Returns the cached token without a network call when possible. Otherwise
    /// joins the pending acquisition, or starts one if none is pending.
    pub async fn get_token(&self) -> Result<SecureString, AuthError> {
        let acquisition = {
            let mut state = self.inner.lock_state();

            if let Some(token) = state
                .credential
                .usable_token(Utc::now(), self.inner.expiry_margin)
            {
                return Ok(token.clone());
            }

            match &state.in_flight {
                Some(pending) => {
                    debug!("Joining pending token acquisition");
                    pending.clone()
                }
                None => {
                    let pending = Self::start_acquisition(Arc::clone(&self.inner));
                    state.in_flight = Some(pending.clone());
                    pending
                }
            }
        };

        acquisition.await
    }

    /// Build the shared acquisition. It runs when first polled and clears the
    /// in-flight slot itself once settled, whichever caller drives it.
    fn start_acquisition(inner: Arc<Inner<C>>) -> Acquisition {
        async move {
            let result = inner.acquire().await;

            let mut state = inner.lock_state();
            state.in_flight = None;

            let response = match result {
                Ok(response) => response,
                Err(e) => return Err(e),
            };
            let token = state
                .credential
                .apply(response, Utc::now(), inner.fallback_ttl);
            debug!(expires_at = ?state.credential.expires_at, "Credential updated");
            Ok::<_, AuthError>(token)
        }
        .boxed()
        .shared()
    }

    /// Drop the cached access token so the next `get_token` re-acquires.
    ///
    /// The refresh token is kept, so re-acquisition tries the refresh grant
    /// before the password grant.
    pub fn invalidate(&self) {
        self.inner.lock_state().credential.clear_access_token();
        info!("Cached access token invalidated");
    }

    /// Drop the cached access token only if it is still `rejected`.
    ///
    /// Returns false when the token was already replaced, e.g. by another
    /// request that hit the same 401 first.
    pub fn invalidate_if_current(&self, rejected: &SecureString) -> bool {
        let mut state = self.inner.lock_state();
        if state.credential.access_token.as_ref() != Some(rejected) {
            debug!("Rejected token already replaced, keeping current credential");
            return false;
        }

        state.credential.clear_access_token();
        info!("Cached access token invalidated after upstream rejection");
        true
    }

    pub fn credential_snapshot(&self) -> CredentialSnapshot {
        let state = self.inner.lock_state();
        CredentialSnapshot {
            has_access_token: state.credential.access_token.is_some(),
            has_refresh_token: state.credential.refresh_token.is_some(),
            expires_at: state.credential.expires_at,
            acquisition_pending: state.in_flight.is_some(),
        }
    }
}
