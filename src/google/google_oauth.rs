// --- File: src/google/google_oauth.rs ---

use actix_web::{get, http::header, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::AuthenticatedUser;
use crate::config::AppConfig;
use crate::error::{ApiError, ProviderError};
use crate::google::google_client::GoogleClient;
use crate::session::{
    new_session_cookie, session_id_from_request, SessionStore, GOOGLE_AUTH_STATE_KEY,
    GOOGLE_AUTH_USER_KEY,
};
use crate::storage::UserStore;

pub const EVENTS_PATH: &str = "/rest/v1/calendar/events/";

// --- Structures ---
#[derive(Deserialize, Debug)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by Google instead of `code` when the user declines consent.
    pub error: Option<String>,
}

// --- Public Handler Functions ---

/// Redirects the browser to Google's consent screen, remembering the OAuth
/// state (and the host user, when known) in the caller's session.
#[get("/init")]
pub async fn start_google_auth(
    req: HttpRequest,
    user: Option<AuthenticatedUser>,
    config: web::Data<AppConfig>,
    google: web::Data<GoogleClient>,
    sessions: web::Data<SessionStore>,
) -> HttpResponse {
    let (authorize_url, csrf_token) = google.authorize_url();

    let mut response = HttpResponse::Found();
    response.append_header((header::LOCATION, authorize_url.to_string()));

    let session_id = match session_id_from_request(&req, &config.session_key) {
        Some(id) => id,
        None => {
            let (id, cookie) = new_session_cookie(&config.session_key, config.secure_cookies());
            response.cookie(cookie);
            id
        }
    };
    sessions.insert(&session_id, GOOGLE_AUTH_STATE_KEY, csrf_token.secret().to_string());
    if let Some(user) = &user {
        sessions.insert(&session_id, GOOGLE_AUTH_USER_KEY, user.id.clone());
    }

    info!(user_id = ?user.as_ref().map(|u| &u.id), "redirecting to Google consent screen");
    response.finish()
}

/// Google redirects here after consent. Exchanges the code and stores the
/// resulting credential on the user's record.
///
/// The user comes from the host credentials on the request, or else from
/// the session `/init` was called with. Without either the callback is
/// rejected before anything else happens.
#[get("/redirect/")]
pub async fn google_auth_callback(
    req: HttpRequest,
    user: Option<AuthenticatedUser>,
    query: web::Query<AuthCallbackQuery>,
    config: web::Data<AppConfig>,
    google: web::Data<GoogleClient>,
    sessions: web::Data<SessionStore>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, ApiError> {
    // Session values are single use, whatever happens next.
    let session_id = session_id_from_request(&req, &config.session_key);
    let take = |key| session_id.as_deref().and_then(|id| sessions.take(id, key));
    let session_user = take(GOOGLE_AUTH_USER_KEY);
    let stored_state = take(GOOGLE_AUTH_STATE_KEY);

    let user_id = match (user, session_user) {
        (Some(user), Some(started_by)) if user.id != started_by => {
            warn!(user_id = %user.id, "OAuth flow was started by another user");
            return Err(ApiError::InvalidState("session belongs to another user"));
        }
        (Some(user), _) => user.id,
        (None, Some(started_by)) => started_by,
        (None, None) => return Err(ApiError::NotAuthenticated),
    };

    let Some(stored_state) = stored_state else {
        warn!(user_id = %user_id, "no OAuth state in session");
        return Err(ApiError::InvalidState("missing session state"));
    };
    if query.state.as_deref() != Some(stored_state.as_str()) {
        warn!(user_id = %user_id, "OAuth state mismatch");
        return Err(ApiError::InvalidState("state parameter does not match session"));
    }

    if let Some(error) = &query.error {
        warn!(user_id = %user_id, error = %error, "Google returned an authorization error");
        return Err(ProviderError::auth(format!("authorization denied: {error}")).into());
    }
    let Some(code) = query.code.clone() else {
        return Err(ApiError::InvalidState("missing authorization code"));
    };

    let credential = google.exchange_code(code).await?;
    users.save_credentials(&user_id, &credential.to_json()?).await?;
    info!(
        user_id = %user_id,
        has_refresh_token = credential.refresh_token.is_some(),
        "stored Google credentials"
    );

    Ok(HttpResponse::Found()
        .append_header((header::LOCATION, EVENTS_PATH))
        .finish())
}
