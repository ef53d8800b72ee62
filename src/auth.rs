use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, models::User, repository::RepositoryState};

/// Name of the cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "session";

// Sessions expire after a week; rehydration re-checks the user row on every
// request anyway.
const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("failed to sign session token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Claims
///
/// Payload of the signed session token. Signed with the server's secret and
/// validated on every request that carries the session cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the id of the logged-in user.
    pub sub: i64,
    /// Expiration Time (exp): timestamp after which the token is rejected.
    pub exp: usize,
    /// Issued At (iat): timestamp when the token was minted.
    pub iat: usize,
}

// --- Passwords ---

/// Hashes a plaintext password with Argon2id and a fresh random salt. The
/// plaintext is never stored or logged.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verifies a plaintext password against a stored hash. Any failure,
/// including an unparsable hash, counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// --- Session tokens ---

/// Mints a signed session token for the given user id.
pub fn mint_session(user_id: i64, secret: &str) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + SESSION_TTL_SECS) as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Decodes a session token back into a user id. Returns None on any failure
/// (bad signature, malformed token, expired), since an invalid session simply
/// means the request proceeds as anonymous.
pub fn decode_session(token: &str, secret: &str) -> Option<i64> {
    let mut validation = Validation::default();
    // Ensure expiration time validation is always active.
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims.sub)
}

// --- Session cookie plumbing ---

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Adds a freshly signed session cookie for the user to the jar.
pub fn start_session(
    jar: CookieJar,
    user_id: i64,
    config: &AppConfig,
) -> Result<CookieJar, AuthError> {
    let token = mint_session(user_id, &config.secret_key)?;
    Ok(jar.add(session_cookie(token)))
}

/// Removes the session cookie. Safe to call for anonymous requests.
pub fn end_session(jar: CookieJar) -> CookieJar {
    jar.remove(session_cookie(String::new()))
}

// --- Request identity ---

/// CurrentUser
///
/// The resolved identity of a request: `Some(user)` for a valid session,
/// `None` for anonymous. Extraction never rejects; every failure mode of
/// rehydration (missing cookie, bad or expired token, user row gone, storage
/// error) degrades to anonymous so public pages keep working.
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(User::is_admin)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    // Allows the extractor to pull the repository from the app state.
    RepositoryState: FromRef<S>,
    // Allows the extractor to pull the AppConfig (for the signing secret).
    AppConfig: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(CurrentUser(None));
        };

        let Some(user_id) = decode_session(cookie.value(), &config.secret_key) else {
            return Ok(CurrentUser(None));
        };

        // Final verification against the database. A token may outlive its
        // user record.
        match repo.get_user(user_id).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(e) => {
                tracing::warn!("session rehydration failed: {e}");
                Ok(CurrentUser(None))
            }
        }
    }
}
