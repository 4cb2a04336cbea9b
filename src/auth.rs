// --- File: src/auth.rs ---

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::AppConfig;
use crate::error::ApiError;

/// Claims of the bearer token issued by the host application.
#[derive(Debug, Serialize, Deserialize)]
pub struct HostClaims {
    /// The host's user id.
    pub sub: String,
    pub exp: usize,
}

/// A caller the host application has already logged in.
///
/// The host JWT is read from `Authorization: Bearer` or, for browser
/// navigations that carry no header, from the host's login cookie.
/// Extraction fails with `ApiError::NotAuthenticated` when neither holds a
/// token or the token is expired or badly signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
}

impl AuthenticatedUser {
    pub fn from_bearer(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<HostClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(Self {
            id: data.claims.sub,
        })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let Some(config) = req.app_data::<web::Data<AppConfig>>() else {
            error!("AppConfig missing from app data; cannot authenticate");
            return ready(Err(ApiError::NotAuthenticated));
        };
        let cookie = req.cookie(&config.host_auth_cookie);
        let token = bearer_token(req).or_else(|| cookie.as_ref().map(|c| c.value()));
        let Some(token) = token else {
            return ready(Err(ApiError::NotAuthenticated));
        };
        let result = AuthenticatedUser::from_bearer(token, &config.host_auth_secret).map_err(|e| {
            debug!(error = %e, "rejected host bearer token");
            ApiError::NotAuthenticated
        });
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, secret: &str, ttl: Duration) -> String {
        let claims = HostClaims {
            sub: sub.to_string(),
            exp: (Utc::now() + ttl).timestamp() as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let user = AuthenticatedUser::from_bearer(&token("alice", "s3cret", Duration::hours(1)), "s3cret")
            .unwrap();
        assert_eq!(user.id, "alice");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_token() {
        assert!(AuthenticatedUser::from_bearer(&token("a", "one", Duration::hours(1)), "two").is_err());
        assert!(
            AuthenticatedUser::from_bearer(&token("a", "one", Duration::hours(-2)), "one").is_err()
        );
        assert!(AuthenticatedUser::from_bearer("not-a-jwt", "one").is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        let req = actix_web::test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));

        let req = actix_web::test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic Zm9vOmJhcg=="))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }
}
