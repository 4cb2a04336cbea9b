use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use tracing::{error, info};

use tiny_gcal_oauth::{
    config::AppConfig,
    google::{self, GoogleClient},
    session::SessionStore,
    storage::user_store_from_config,
    utils,
};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{context}: {err}");
    io::Error::other(format!("{context}: {err}"))
}

/// Loads configuration (dotenv file from the first CLI argument, default
/// `.env`), wires the Google client, session and user stores, and serves
/// the calendar routes until shutdown.
#[actix_web::main]
async fn main() -> io::Result<()> {
    let env_file = utils::ensure_dotenv_loaded();
    utils::init_tracing();
    info!("📦 Loading environment from {env_file}");

    let config = AppConfig::load().map_err(|e| startup_error("configuration failed", e))?;
    let google_client =
        GoogleClient::from_config(&config).map_err(|e| startup_error("Google client setup failed", e))?;
    let user_store = user_store_from_config(&config)
        .await
        .map_err(|e| startup_error("user store setup failed", e))?;

    if config.persist_refreshed_credentials {
        info!("refreshed credentials will be written back to the user record");
    }

    let bind = (config.server_host.clone(), config.server_port);
    info!("🚀 Server starting on http://{}:{}", bind.0, bind.1);
    info!(
        "🔗 Start the flow: http://{}:{}{}/init",
        bind.0,
        bind.1,
        google::CALENDAR_SCOPE_PATH
    );

    let config = web::Data::new(config);
    let google_client = web::Data::new(google_client);
    let sessions = web::Data::new(SessionStore::new());
    let users = web::Data::from(user_store);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(config.clone())
            .app_data(google_client.clone())
            .app_data(sessions.clone())
            .app_data(users.clone())
            .configure(google::routes)
    })
    .bind(bind)?
    .run()
    .await
}
