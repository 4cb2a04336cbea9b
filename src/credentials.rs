//! Google OAuth credential as stored on a user record.
//!
//! The serialized form follows Google's "authorized user" JSON layout
//! (`token`, `refresh_token`, `token_uri`, `client_id`, `client_secret`,
//! `scopes`, `expiry`), so blobs written by other Google client libraries
//! load unchanged.

use chrono::{DateTime, Duration, Utc};
use oauth2::TokenResponse;
use serde::{Deserialize, Serialize};

use crate::config::ClientSecrets;

/// Access tokens are treated as expired this long before their real expiry.
pub const EXPIRY_SKEW_SECS: i64 = 225;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "token", default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

/// What the events endpoint may do with a stored credential right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Valid,
    Refreshable,
    Unusable,
}

impl Credential {
    /// Builds a credential from a token endpoint response.
    ///
    /// `previous` supplies the refresh token and scopes when the response
    /// omits them, which Google does on refresh.
    pub fn from_token_response<T: TokenResponse>(
        response: &T,
        secrets: &ClientSecrets,
        previous: Option<&Credential>,
        now: DateTime<Utc>,
    ) -> Self {
        let refresh_token = response
            .refresh_token()
            .map(|rt| rt.secret().to_string())
            .or_else(|| previous.and_then(|p| p.refresh_token.clone()));

        let scopes = match response.scopes() {
            Some(scopes) => scopes.iter().map(|s| s.to_string()).collect(),
            None => previous.map(|p| p.scopes.clone()).unwrap_or_default(),
        };

        let expiry = response
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .and_then(|d| now.checked_add_signed(d));

        Self {
            access_token: response.access_token().secret().to_string(),
            refresh_token,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: Some(secrets.client_secret.clone()),
            scopes,
            expiry,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// True once the expiry (minus the skew) has passed. No expiry means never.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - Duration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && !self.is_expired(now)
    }

    pub fn is_refreshable(&self, now: DateTime<Utc>) -> bool {
        self.is_expired(now) && self.refresh_token.is_some()
    }

    pub fn state(&self, now: DateTime<Utc>) -> CredentialState {
        if self.is_valid(now) {
            CredentialState::Valid
        } else if self.is_refreshable(now) {
            CredentialState::Refreshable
        } else {
            CredentialState::Unusable
        }
    }
}
