//! # tiny_gcal_oauth
//!
//! `tiny_gcal_oauth` is a small Actix-Web backend that walks a user through
//! Google's OAuth2 consent screen, keeps the resulting credential on the
//! user's record and lists their next ten calendar events.
//!
//! ## ✅ Endpoints
//!
//! - `GET /rest/v1/calendar/init`: redirect to Google's consent screen
//! - `GET /rest/v1/calendar/redirect/`: OAuth callback, stores the credential
//! - `GET /rest/v1/calendar/events/`: `[{"summary": ..., "start": ...}]`
//!
//! The host application's HS256 JWT (`sub` = user id) is read from
//! `Authorization: Bearer` or from its login cookie (`HOST_AUTH_COOKIE`).
//! A user seen at `init` is kept in the session, so Google's redirect back
//! to the callback only needs the session cookie.
//!
//! ## 🔧 Configuration
//!
//! Start the app like this:
//!
//! ```bash
//! cargo run -- .env.production
//! ```
//!
//! ### Required values
//!
//! - `HOST_AUTH_SECRET`
//! - a Google client secrets file (`BASE_DIR/GOOGLE_CLIENT_SECRETS`, default `./client_secrets.json`)
//!
//! ### Optional values
//!
//! - `SERVER_HOST=127.0.0.1`, `SERVER_PORT=6666`
//! - `GOOGLE_REDIRECT_URI` (defaults to this server's `/rest/v1/calendar/redirect/`)
//! - `HOST_AUTH_COOKIE=host_auth_token`
//! - `SESSION_SECRET` (64+ bytes, signs the session cookie; `Secure` when the redirect URI is https)
//! - `DATABASE_URL=sqlite://users.db?mode=rwc` + `ENCRYPTION_KEY` (64 hex chars)
//! - `PERSIST_REFRESHED_CREDENTIALS=false`
//! - `PROVIDER_TIMEOUT_SECS=30`
//! - `RUST_LOG=info`, `LOG_FORMAT=json`
//!
//! ## ✨ Feature Flags
//!
//! - `sqlite` (default): SQLite user store with AES-256-GCM encrypted credentials.
//!
//! ## 📄 License
//!
//! MIT License © [Holger Trahe](https://github.com/holg)

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod google;
pub mod session;
pub mod storage;
pub mod utils;
