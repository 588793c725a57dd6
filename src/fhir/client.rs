//! ModMed FHIR API client.
//!
//! Every call goes through [`FhirClient::send_authorized`], which attaches the
//! bearer token and re-authenticates once when the upstream answers 401.

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::models::Bundle;
use crate::auth::{GrantClient, SecureString, TokenManager, API_KEY_HEADER};
use crate::config::Config;
use crate::error::ApiError;
use crate::scheduling::{intervals_for_conflict_check, AppointmentInterval};

/// Media type requested from the FHIR API.
const FHIR_JSON: &str = "application/fhir+json";

/// How many times a request is retried after a 401 with a re-acquired token.
const MAX_REAUTH_RETRIES: usize = 1;

/// Filters for the appointment search.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    /// Calendar day, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

/// Client for the OAuth2-protected FHIR API.
pub struct FhirClient<C> {
    http_client: Client,
    base_url: String,
    api_key: SecureString,
    tokens: TokenManager<C>,
}

impl<C: GrantClient + 'static> FhirClient<C> {
    /// Create a new FHIR client sharing `tokens` with other request handlers.
    pub fn new(config: &Config, tokens: TokenManager<C>) -> Result<Self, ApiError> {
        let http_client = Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(config.http_connect_timeout())
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            http_client,
            base_url: config.fhir_base_url(),
            api_key: config.modmed.api_key.clone(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenManager<C> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request with the bearer token, retrying once on 401.
    ///
    /// `build` is called once per attempt. On a 401 the rejected token is
    /// invalidated and a new one acquired before the single retry; a 401 on
    /// the retry is returned as [`ApiError::Unauthorized`].
    pub async fn send_authorized<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut token = self.tokens.get_token().await?;

        for attempt in 0..=MAX_REAUTH_RETRIES {
            let response = build(&self.http_client)
                .bearer_auth(token.as_str())
                .header(API_KEY_HEADER, self.api_key.as_str())
                .header(ACCEPT, FHIR_JSON)
                .send()
                .await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if attempt == MAX_REAUTH_RETRIES {
                error!("Upstream rejected freshly acquired token (HTTP 401)");
                break;
            }

            warn!("Upstream rejected bearer token (HTTP 401), re-authenticating");
            self.tokens.invalidate_if_current(&token);
            token = self.tokens.get_token().await?;
        }

        Err(ApiError::Unauthorized)
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!("Fetching {}", url);

        let response = self
            .send_authorized(|http| http.get(&url).query(query))
            .await?;
        handle_response(response).await
    }

    /// Search appointments.
    pub async fn search_appointments(&self, query: &AppointmentQuery) -> Result<Bundle, ApiError> {
        let bundle: Bundle = self.get_json("appointments", query).await?;
        debug!("Appointment search returned {} entries", bundle.entry.len());
        Ok(bundle)
    }

    /// Booked intervals for one provider, ready for conflict checks.
    pub async fn provider_schedule(
        &self,
        provider_id: &str,
        date: Option<&str>,
    ) -> Result<Vec<AppointmentInterval>, ApiError> {
        let query = AppointmentQuery {
            date: date.map(str::to_string),
            provider_id: Some(provider_id.to_string()),
            patient_id: None,
        };

        let bundle = self.search_appointments(&query).await?;
        Ok(intervals_for_conflict_check(&bundle))
    }

    /// Open slots for a provider at a location. The body is returned as-is.
    pub async fn availability(
        &self,
        provider_id: &str,
        location_id: &str,
        start: &str,
        end: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let query = [
            ("provider", provider_id),
            ("location", location_id),
            ("start", start),
            ("end", end),
        ];

        self.get_json("Availability", &query[..]).await
    }
}

/// Decode a successful response or map its status to an [`ApiError`].
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| ApiError::ParseFailed(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    error!("FHIR request failed: HTTP {} - {}", status, body);

    Err(match status.as_u16() {
        400 => ApiError::BadRequest(body),
        401 => ApiError::Unauthorized,
        403 => ApiError::Forbidden,
        404 => ApiError::NotFound,
        409 => ApiError::Conflict,
        429 => ApiError::RateLimited,
        code if status.is_server_error() => ApiError::Server(code),
        code => ApiError::Unexpected(code),
    })
}
