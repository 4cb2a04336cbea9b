#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use actix_web::{
    cookie::{Cookie, Key},
    test, web, App,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use tiny_gcal_oauth::{
    auth::HostClaims,
    config::{AppConfig, ClientSecrets},
    credentials::Credential,
    google::{self, GoogleClient},
    session::SessionStore,
    storage::{MemoryUserStore, UserStore},
};

pub const HOST_AUTH_SECRET: &str = "host-application-test-secret";
pub const CLIENT_ID: &str = "test-client.apps.googleusercontent.com";
pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const HOST_AUTH_COOKIE: &str = "host_auth_token";

/// Configuration pointing the token and Calendar endpoints at `mock_uri`.
pub fn test_config(mock_uri: &str) -> AppConfig {
    AppConfig {
        server_host: "127.0.0.1".to_string(),
        server_port: 6666,
        client_secrets: ClientSecrets {
            client_id: CLIENT_ID.to_string(),
            client_secret: "test-client-secret".to_string(),
            auth_uri: AUTH_URI.to_string(),
            token_uri: format!("{mock_uri}/token"),
        },
        redirect_uri: "http://127.0.0.1:6666/rest/v1/calendar/redirect/".to_string(),
        calendar_api_base: mock_uri.to_string(),
        provider_timeout: Duration::from_secs(5),
        host_auth_secret: HOST_AUTH_SECRET.to_string(),
        host_auth_cookie: HOST_AUTH_COOKIE.to_string(),
        session_key: Key::generate(),
        database_url: None,
        encryption_key: None,
        persist_refreshed_credentials: false,
    }
}

pub fn memory_users() -> Arc<dyn UserStore> {
    Arc::new(MemoryUserStore::new())
}

/// JWT as the host application would issue it for `user_id`.
pub fn host_token(user_id: &str) -> String {
    let claims = HostClaims {
        sub: user_id.to_string(),
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(HOST_AUTH_SECRET.as_bytes()),
    )
    .expect("failed to sign test token")
}

/// `Authorization` header value carrying the host JWT.
pub fn bearer(user_id: &str) -> String {
    format!("Bearer {}", host_token(user_id))
}

/// The host application's login cookie, as a browser would replay it.
pub fn host_cookie(user_id: &str) -> Cookie<'static> {
    Cookie::new(HOST_AUTH_COOKIE, host_token(user_id))
}

pub fn stored_credential(
    config: &AppConfig,
    access_token: &str,
    refresh_token: Option<&str>,
    expiry: DateTime<Utc>,
) -> String {
    Credential {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        token_uri: config.client_secrets.token_uri.clone(),
        client_id: CLIENT_ID.to_string(),
        client_secret: Some("test-client-secret".to_string()),
        scopes: vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()],
        expiry: Some(expiry),
    }
    .to_json()
    .expect("failed to serialize test credential")
}

pub async fn setup_test_app(
    test_config: AppConfig,
    users: Arc<dyn UserStore>,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    let google_client = GoogleClient::from_config(&test_config).expect("Google client");

    test::init_service(
        App::new()
            .app_data(web::Data::new(test_config))
            .app_data(web::Data::new(google_client))
            .app_data(web::Data::new(SessionStore::new()))
            .app_data(web::Data::from(users))
            .configure(google::routes),
    )
    .await
}
