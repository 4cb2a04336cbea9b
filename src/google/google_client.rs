//! Google OAuth and Calendar API calls.
//!
//! Everything that leaves the process goes through [`GoogleClient`]; the
//! handlers only see [`Credential`]s and [`ApiEvent`]s.

use chrono::{DateTime, SecondsFormat, Utc};
use oauth2::{AuthorizationCode, CsrfToken, RefreshToken, Scope};
use oauth2::url::Url;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ClientSecrets, ConfigError, GoogleOAuthClient, CALENDAR_READONLY_SCOPE};
use crate::credentials::Credential;
use crate::error::ProviderError;

pub const PRIMARY_CALENDAR: &str = "primary";
pub const MAX_UPCOMING_EVENTS: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEventTime {
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub start: Option<ApiEventTime>,
}

#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

/// Formats `timeMin`: UTC, microseconds, `Z` suffix.
pub fn format_time_min(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub struct GoogleClient {
    oauth: GoogleOAuthClient,
    http: reqwest::Client,
    secrets: ClientSecrets,
    calendar_api_base: String,
}

impl GoogleClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            // The token endpoint must never be followed through redirects.
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            oauth: config.google_oauth_client()?,
            http,
            secrets: config.client_secrets.clone(),
            calendar_api_base: config.calendar_api_base.clone(),
        })
    }

    /// Consent URL for read-only calendar access with offline access and
    /// incremental consent, plus the state to stash in the session.
    pub fn authorize_url(&self) -> (Url, CsrfToken) {
        self.oauth
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(CALENDAR_READONLY_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("include_granted_scopes", "true")
            .url()
    }

    pub async fn exchange_code(&self, code: String) -> Result<Credential, ProviderError> {
        let response = self
            .oauth
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http)
            .await
            .map_err(ProviderError::from_token_error)?;

        info!("exchanged authorization code for Google tokens");
        Ok(Credential::from_token_response(
            &response,
            &self.secrets,
            None,
            Utc::now(),
        ))
    }

    /// Trades the refresh token for a new access token.
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, ProviderError> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| ProviderError::auth("credential has no refresh token"))?;

        let response = self
            .oauth
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(&self.http)
            .await
            .map_err(ProviderError::from_token_error)?;

        info!("refreshed Google access token");
        Ok(Credential::from_token_response(
            &response,
            &self.secrets,
            Some(credential),
            Utc::now(),
        ))
    }

    /// First page (at most ten) of upcoming single events on the primary
    /// calendar, ordered by start time.
    pub async fn list_upcoming_events(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApiEvent>, ProviderError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.calendar_api_base,
            urlencoding::encode(PRIMARY_CALENDAR)
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", format_time_min(now)),
                ("maxResults", MAX_UPCOMING_EVENTS.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "calendar API returned an error");
            return Err(ProviderError::from_status(status, &body));
        }

        let list: EventListResponse = response.json().await.map_err(ProviderError::from_reqwest)?;
        debug!(count = list.items.len(), "fetched upcoming events");

        let mut items = list.items;
        items.truncate(MAX_UPCOMING_EVENTS);
        Ok(items)
    }
}
