// --- File: src/config.rs ---

use actix_web::cookie::Key as CookieSignKey;
use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RedirectUrl,
    TokenUrl,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Read-only calendar access is the only scope ever requested.
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const REDIRECT_PATH: &str = "/rest/v1/calendar/redirect/";
/// Cookie the host application keeps its login JWT in.
pub const DEFAULT_HOST_AUTH_COOKIE: &str = "host_auth_token";

/// Google OAuth client with the authorization and token endpoints set.
pub type GoogleOAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("client secrets file {path:?}: {reason}")]
    ClientSecrets { path: PathBuf, reason: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

// --- Client secrets file ---

/// OAuth client identity as found in a Google Cloud Console download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct SecretsFile {
    web: Option<SecretsSection>,
    installed: Option<SecretsSection>,
    // Flat layout
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct SecretsSection {
    client_id: String,
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

impl ClientSecrets {
    /// Parses `{"web": {...}}`, `{"installed": {...}}` or a flat
    /// `{"client_id": ..., "client_secret": ...}` document.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: SecretsFile =
            serde_json::from_str(json).map_err(|e| format!("failed to parse JSON: {e}"))?;
        let section = match (file.web.or(file.installed), file.client_id, file.client_secret) {
            (Some(section), _, _) => section,
            (None, Some(client_id), Some(client_secret)) => SecretsSection {
                client_id,
                client_secret,
                auth_uri: None,
                token_uri: None,
            },
            _ => return Err("expected a 'web' or 'installed' section".to_string()),
        };
        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
            auth_uri: section.auth_uri.unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
            token_uri: section.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ClientSecrets {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|reason| ConfigError::ClientSecrets {
            path: path.to_path_buf(),
            reason,
        })
    }
}

// --- Unified Configuration Struct ---
#[derive(Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,

    pub client_secrets: ClientSecrets,
    pub redirect_uri: String,
    pub calendar_api_base: String,
    pub provider_timeout: Duration,

    /// HS256 secret the host application signs its bearer tokens with.
    pub host_auth_secret: String,
    pub host_auth_cookie: String,
    pub session_key: CookieSignKey,

    pub database_url: Option<String>,
    pub encryption_key: Option<Vec<u8>>,

    /// Write refreshed credentials back to the user record.
    pub persist_refreshed_credentials: bool,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

impl AppConfig {
    // Load configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        crate::utils::ensure_dotenv_loaded();

        let server_host = env_or("SERVER_HOST", "127.0.0.1");
        let server_port = env_or("SERVER_PORT", "6666")
            .parse::<u16>()
            .map_err(|e| invalid("SERVER_PORT", e.to_string()))?;

        let base_dir = PathBuf::from(env_or("BASE_DIR", "."));
        let secrets_path = base_dir.join(env_or("GOOGLE_CLIENT_SECRETS", "client_secrets.json"));
        let client_secrets = ClientSecrets::from_file(&secrets_path)?;
        info!(path = ?secrets_path, client_id = %client_secrets.client_id, "loaded Google client secrets");

        let redirect_uri = env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| format!("http://{server_host}:{server_port}{REDIRECT_PATH}"));
        let calendar_api_base = env_or("GOOGLE_CALENDAR_API_BASE", DEFAULT_CALENDAR_API_BASE)
            .trim_end_matches('/')
            .to_string();
        let provider_timeout = env_or("PROVIDER_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| invalid("PROVIDER_TIMEOUT_SECS", e.to_string()))?;

        let host_auth_secret =
            env::var("HOST_AUTH_SECRET").map_err(|_| ConfigError::Missing("HOST_AUTH_SECRET"))?;
        let host_auth_cookie = env_or("HOST_AUTH_COOKIE", DEFAULT_HOST_AUTH_COOKIE);

        let session_key = match env::var("SESSION_SECRET") {
            Ok(secret) if secret.len() >= 64 => CookieSignKey::from(secret.as_bytes()),
            Ok(_) => return Err(invalid("SESSION_SECRET", "must be at least 64 bytes")),
            Err(_) => {
                warn!("SESSION_SECRET not set; sessions will not survive a restart");
                CookieSignKey::generate()
            }
        };

        let database_url = env::var("DATABASE_URL").ok();
        let encryption_key = match env::var("ENCRYPTION_KEY") {
            Ok(hex_key) => Some(decode_encryption_key(&hex_key)?),
            Err(_) => None,
        };
        if database_url.is_some() && encryption_key.is_none() {
            return Err(ConfigError::Missing("ENCRYPTION_KEY"));
        }

        let persist_refreshed_credentials = env_flag("PERSIST_REFRESHED_CREDENTIALS");

        Ok(AppConfig {
            server_host,
            server_port,
            client_secrets,
            redirect_uri,
            calendar_api_base,
            provider_timeout,
            host_auth_secret,
            host_auth_cookie,
            session_key,
            database_url,
            encryption_key,
            persist_refreshed_credentials,
        })
    }

    /// Builds the typed OAuth client from the loaded client secrets.
    /// Session cookies only travel over TLS once the redirect URI is https.
    pub fn secure_cookies(&self) -> bool {
        self.redirect_uri.starts_with("https://")
    }

    pub fn google_oauth_client(&self) -> Result<GoogleOAuthClient, ConfigError> {
        let auth_url = AuthUrl::new(self.client_secrets.auth_uri.clone())
            .map_err(|e| invalid("auth_uri", e.to_string()))?;
        let token_url = TokenUrl::new(self.client_secrets.token_uri.clone())
            .map_err(|e| invalid("token_uri", e.to_string()))?;
        let redirect_url = RedirectUrl::new(self.redirect_uri.clone())
            .map_err(|e| invalid("GOOGLE_REDIRECT_URI", e.to_string()))?;

        Ok(BasicClient::new(ClientId::new(self.client_secrets.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secrets.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url))
    }
}

#[cfg(feature = "sqlite")]
fn decode_encryption_key(hex_key: &str) -> Result<Vec<u8>, ConfigError> {
    let bytes = hex::decode(hex_key.trim()).map_err(|e| invalid("ENCRYPTION_KEY", e.to_string()))?;
    if bytes.len() != 32 {
        return Err(invalid("ENCRYPTION_KEY", "expected 32 bytes (64 hex chars)"));
    }
    Ok(bytes)
}

#[cfg(not(feature = "sqlite"))]
fn decode_encryption_key(_hex_key: &str) -> Result<Vec<u8>, ConfigError> {
    Err(invalid("ENCRYPTION_KEY", "compiled without the `sqlite` feature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_web_section() {
        let json = r#"{"web": {
            "client_id": "abc.apps.googleusercontent.com",
            "project_id": "demo",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "secret",
            "redirect_uris": ["http://localhost:6666/rest/v1/calendar/redirect/"]
        }}"#;
        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret, "secret");
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn parses_installed_and_flat_layouts() {
        let installed = r#"{"installed": {"client_id": "id", "client_secret": "s", "token_uri": "http://localhost/token"}}"#;
        let secrets = ClientSecrets::from_json(installed).unwrap();
        assert_eq!(secrets.token_uri, "http://localhost/token");
        assert_eq!(secrets.auth_uri, DEFAULT_AUTH_URI);

        let flat = r#"{"client_id": "id", "client_secret": "s"}"#;
        assert_eq!(ClientSecrets::from_json(flat).unwrap().client_id, "id");
    }

    #[test]
    fn rejects_file_without_identity() {
        let err = ClientSecrets::from_json(r#"{"other": {}}"#).unwrap_err();
        assert!(err.contains("'web' or 'installed'"));
        assert!(ClientSecrets::from_json("not json").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ClientSecrets::from_file(Path::new("/nonexistent/client_secrets.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/client_secrets.json"));
    }
}
