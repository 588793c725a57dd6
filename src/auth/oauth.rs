//! OAuth2 grant client for the ModMed token endpoint.
//!
//! Supports the resource-owner password grant and the refresh-token grant.
//! Both are form-encoded POSTs carrying the `x-api-key` header.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use super::secure::SecureString;
use crate::config::Config;
use crate::error::{AuthError, GrantKind};

/// Header carrying the ModMed API key on every upstream call.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Source of freshly issued tokens.
///
/// Abstracted so the token manager can be exercised without a live endpoint.
#[async_trait]
pub trait GrantClient: Send + Sync {
    /// Obtain tokens with the primary username/password credential.
    async fn password_grant(&self) -> Result<TokenResponse, AuthError>;

    /// Obtain tokens using a previously issued refresh token.
    async fn refresh_grant(&self, refresh_token: &SecureString)
        -> Result<TokenResponse, AuthError>;
}

#[async_trait]
impl<T: GrantClient + ?Sized> GrantClient for std::sync::Arc<T> {
    async fn password_grant(&self) -> Result<TokenResponse, AuthError> {
        (**self).password_grant().await
    }

    async fn refresh_grant(
        &self,
        refresh_token: &SecureString,
    ) -> Result<TokenResponse, AuthError> {
        (**self).refresh_grant(refresh_token).await
    }
}

/// Token response from the grant endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecureString,
    #[serde(default)]
    pub refresh_token: Option<SecureString>,
    /// Lifetime in seconds. Some deployments send it as a string.
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    pub expires_in: Option<u64>,
}

fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid expires_in: {:?}", s))),
    }
}

/// OAuth2 client for the ModMed grant endpoint.
pub struct OAuth2Client {
    token_url: String,
    api_key: SecureString,
    username: String,
    password: SecureString,
    http_client: reqwest::Client,
}

impl OAuth2Client {
    /// Create a new OAuth2 client from configuration.
    pub fn new(config: &Config) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(config.http_connect_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::TransientNetwork(e.to_string()))?;

        Ok(Self {
            token_url: config.token_url(),
            api_key: config.modmed.api_key.clone(),
            username: config.modmed.username.clone(),
            password: config.modmed.password.clone(),
            http_client,
        })
    }

    async fn request_grant(
        &self,
        grant: GrantKind,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let response = self
            .http_client
            .post(&self.token_url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::TransientNetwork(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Log error details for debugging (doesn't expose to user)
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("{} grant failed: HTTP {} - {}", grant, status, error_body);
            return Err(AuthError::AcquisitionRejected {
                grant,
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl GrantClient for OAuth2Client {
    async fn password_grant(&self) -> Result<TokenResponse, AuthError> {
        let params = [
            ("grant_type", GrantKind::Password.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        self.request_grant(GrantKind::Password, &params).await
    }

    async fn refresh_grant(
        &self,
        refresh_token: &SecureString,
    ) -> Result<TokenResponse, AuthError> {
        let params = [
            ("grant_type", GrantKind::RefreshToken.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];

        self.request_grant(GrantKind::RefreshToken, &params).await
    }
}
