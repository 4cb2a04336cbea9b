//! Server-side session storage keyed by a signed cookie.
//!
//! Only the OAuth round trip uses it: the init handler stores the CSRF
//! state, the redirect handler takes it back out.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, CookieJar, Key, SameSite};
use actix_web::HttpRequest;
use oauth2::CsrfToken;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const SESSION_COOKIE_NAME: &str = "calendar_session";
/// Session field holding the OAuth state between init and redirect.
pub const GOOGLE_AUTH_STATE_KEY: &str = "google_auth_state";
/// Host user id recorded at init, for callbacks that arrive without host credentials.
pub const GOOGLE_AUTH_USER_KEY: &str = "google_auth_user";
/// A session only needs to outlive one consent screen.
pub const SESSION_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
struct SessionEntry {
    values: HashMap<String, String>,
    touched: Instant,
}

#[derive(Debug)]
pub struct SessionStore {
    entries: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Sets `key` in session `session_id`, creating the session if needed.
    pub fn insert(&self, session_id: &str, key: &str, value: String) {
        let Ok(mut entries) = self.entries.lock() else {
            warn!("session store lock poisoned; dropping write");
            return;
        };
        let now = Instant::now();
        let ttl = self.ttl;
        entries.retain(|_, entry| now.duration_since(entry.touched) < ttl);

        let entry = entries
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                values: HashMap::new(),
                touched: now,
            });
        entry.values.insert(key.to_string(), value);
        entry.touched = now;
    }

    /// Removes and returns `key` from a live session.
    pub fn take(&self, session_id: &str, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        let entry = entries.get_mut(session_id)?;
        if entry.touched.elapsed() >= self.ttl {
            debug!("session expired");
            entries.remove(session_id);
            return None;
        }
        entry.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns the session id from the request's signed session cookie, if the signature checks out.
pub fn session_id_from_request(req: &HttpRequest, key: &Key) -> Option<String> {
    let cookie = req.cookie(SESSION_COOKIE_NAME)?;
    let mut jar = CookieJar::new();
    jar.add_original(cookie);
    let verified = jar.signed(key).get(SESSION_COOKIE_NAME);
    if verified.is_none() {
        warn!("session cookie present but signature invalid");
    }
    verified.map(|c| c.value().to_string())
}

/// Mints a fresh session id and the signed cookie carrying it.
/// `secure` restricts the cookie to https.
pub fn new_session_cookie(key: &Key, secure: bool) -> (String, Cookie<'static>) {
    let session_id = CsrfToken::new_random().secret().to_string();
    let mut jar = CookieJar::new();
    jar.signed_mut(key).add(
        Cookie::build(SESSION_COOKIE_NAME, session_id.clone())
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::minutes(SESSION_TTL.as_secs() as i64 / 60))
            .finish(),
    );
    let cookie = jar
        .get(SESSION_COOKIE_NAME)
        .cloned()
        .unwrap_or_else(|| Cookie::named(SESSION_COOKIE_NAME));
    (session_id, cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn take_is_single_use() {
        let store = SessionStore::new();
        store.insert("s1", GOOGLE_AUTH_STATE_KEY, "state-abc".to_string());
        assert_eq!(
            store.take("s1", GOOGLE_AUTH_STATE_KEY).as_deref(),
            Some("state-abc")
        );
        assert_eq!(store.take("s1", GOOGLE_AUTH_STATE_KEY), None);
        assert_eq!(store.take("unknown", GOOGLE_AUTH_STATE_KEY), None);
    }

    #[test]
    fn expired_sessions_are_ignored_and_pruned() {
        let store = SessionStore::with_ttl(Duration::ZERO);
        store.insert("old", GOOGLE_AUTH_STATE_KEY, "x".to_string());
        assert_eq!(store.take("old", GOOGLE_AUTH_STATE_KEY), None);

        store.insert("a", "k", "1".to_string());
        store.insert("b", "k", "2".to_string());
        // Each insert prunes everything older than the (zero) ttl.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn signed_cookie_round_trip() {
        let key = Key::generate();
        let (session_id, cookie) = new_session_cookie(&key, false);
        assert_ne!(cookie.value(), session_id, "cookie value carries a signature");
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.http_only(), Some(true));

        let req = TestRequest::default().cookie(cookie).to_http_request();
        assert_eq!(session_id_from_request(&req, &key), Some(session_id));

        let other = Key::generate();
        assert_eq!(session_id_from_request(&req, &other), None);
    }

    #[test]
    fn secure_flag_is_applied() {
        let key = Key::generate();
        let (session_id, cookie) = new_session_cookie(&key, true);
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));

        let req = TestRequest::default().cookie(cookie).to_http_request();
        assert_eq!(session_id_from_request(&req, &key), Some(session_id));
    }

    #[test]
    fn forged_cookie_is_rejected() {
        let key = Key::generate();
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE_NAME, "attacker-chosen"))
            .to_http_request();
        assert_eq!(session_id_from_request(&req, &key), None);
    }
}
