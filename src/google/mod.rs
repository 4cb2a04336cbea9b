// --- File: src/google/mod.rs ---

pub mod google_client;
pub mod google_events;
pub mod google_oauth;

use actix_web::web;

pub use google_client::GoogleClient;
pub use google_events::{list_calendar_events, EventSummary};
pub use google_oauth::{google_auth_callback, start_google_auth};

pub const CALENDAR_SCOPE_PATH: &str = "/rest/v1/calendar";

/// Mounts `init`, `redirect/` and `events/` under `/rest/v1/calendar`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(CALENDAR_SCOPE_PATH)
            .service(start_google_auth)
            .service(google_auth_callback)
            .service(list_calendar_events),
    );
}
