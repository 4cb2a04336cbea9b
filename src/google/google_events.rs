// --- File: src/google/google_events.rs ---

use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::AuthenticatedUser;
use crate::config::AppConfig;
use crate::credentials::{Credential, CredentialState};
use crate::error::ApiError;
use crate::google::google_client::{ApiEvent, GoogleClient};
use crate::storage::UserStore;

/// What the events endpoint returns per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub summary: Option<String>,
    /// `start.dateTime` for timed events, `start.date` for all-day ones.
    pub start: String,
}

impl EventSummary {
    pub fn from_api(event: ApiEvent) -> Option<Self> {
        let start = event.start.and_then(|s| s.date_time.or(s.date));
        let Some(start) = start else {
            warn!(event_id = ?event.id, "event has no start; skipping");
            return None;
        };
        Some(Self {
            summary: event.summary,
            start,
        })
    }
}

/// Loads the caller's stored credential and settles the
/// valid / refreshable / unusable question before any API call.
///
/// A refreshed credential is only written back when
/// `persist_refreshed_credentials` is set; otherwise every request after
/// expiry refreshes again.
async fn usable_credential(
    user: &AuthenticatedUser,
    config: &AppConfig,
    google: &GoogleClient,
    users: &dyn UserStore,
) -> Result<Credential, ApiError> {
    let Some(raw) = users.load_credentials(&user.id).await? else {
        debug!(user_id = %user.id, "no stored credentials");
        return Err(ApiError::InvalidCredentials);
    };
    let credential = Credential::from_json(&raw).map_err(|e| {
        warn!(user_id = %user.id, error = %e, "stored credentials unreadable");
        ApiError::InvalidCredentials
    })?;

    match credential.state(Utc::now()) {
        CredentialState::Valid => Ok(credential),
        CredentialState::Refreshable => {
            let refreshed = google.refresh(&credential).await?;
            if config.persist_refreshed_credentials {
                users.save_credentials(&user.id, &refreshed.to_json()?).await?;
                info!(user_id = %user.id, "persisted refreshed credentials");
            }
            Ok(refreshed)
        }
        CredentialState::Unusable => {
            debug!(user_id = %user.id, "stored credentials expired without refresh token");
            Err(ApiError::InvalidCredentials)
        }
    }
}

/// Lists up to ten upcoming events of the caller's primary calendar.
#[get("/events/")]
pub async fn list_calendar_events(
    user: AuthenticatedUser,
    config: web::Data<AppConfig>,
    google: web::Data<GoogleClient>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, ApiError> {
    let credential = usable_credential(&user, &config, &google, users.get_ref()).await?;

    let events: Vec<EventSummary> = google
        .list_upcoming_events(&credential.access_token, Utc::now())
        .await?
        .into_iter()
        .filter_map(EventSummary::from_api)
        .collect();

    Ok(HttpResponse::Ok().json(events))
}
