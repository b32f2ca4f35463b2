//! Accounts and sessions: Argon2 password hashes, random bearer tokens
//! stored hashed, an extractor for the authenticated caller and an admin
//! guard on top of it.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::db::{
    AuthUser, DbPool, LoginRequest, LoginResponse, Role, SignupRequest, User, UserResponse,
};
use crate::AppState;

use super::error::ApiError;
use super::validation::{validate_email, validate_password};

pub const SESSION_COOKIE: &str = "durus_session";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random bearer token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Open a session for a user and return the bearer token.
pub async fn create_session(db: &DbPool, user_id: &str, ttl_days: i64) -> Result<String, ApiError> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let expires_at = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(ttl_days.max(1)))
        .ok_or_else(|| ApiError::internal("Session expiry out of range"))?
        .to_rfc3339();

    sqlx::query("INSERT INTO sessions (id, user_id, token_hash, expires_at) VALUES (?, ?, ?, ?)")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(&token_hash)
        .bind(&expires_at)
        .execute(db)
        .await?;

    Ok(token)
}

fn session_cookie(token: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    cookie
}

/// Register a learner account and open a session.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<LoginResponse>), ApiError> {
    if let Err(e) = validate_email(&request.email) {
        return Err(ApiError::validation_field("email", e));
    }
    if let Err(e) = validate_password(&request.password) {
        return Err(ApiError::validation_field("password", e));
    }

    let email = request.email.trim().to_lowercase();
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;
    let name = if request.name.trim().is_empty() {
        email.split('@').next().unwrap_or("learner").to_string()
    } else {
        request.name.trim().to_string()
    };

    sqlx::query("INSERT INTO users (id, email, password_hash, name, role) VALUES (?, ?, ?, ?, ?)")
        .bind(&id)
        .bind(&email)
        .bind(&password_hash)
        .bind(&name)
        .bind(Role::Learner.as_str())
        .execute(&state.db)
        .await?;

    tracing::info!(email = %email, "Learner account created");

    let token = create_session(&state.db, &id, state.config.auth.session_ttl_days).await?;
    let user = AuthUser {
        id,
        email,
        name,
        role: Role::Learner,
    };

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(&token)),
        Json(LoginResponse {
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(request.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if user.password_hash.is_empty() || !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = create_session(&state.db, &user.id, state.config.auth.session_ttl_days).await?;
    let user = AuthUser::from(user);

    Ok((
        jar.add(session_cookie(&token)),
        Json(LoginResponse {
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

/// Current-user endpoint
pub async fn session(user: AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// Sign-out. An already-missing session still succeeds: the point is that
/// the caller ends up signed out, not that a row was deleted.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (StatusCode, CookieJar) {
    if let Some(token) = extract_token(&headers, &jar) {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(&token))
            .execute(&state.db)
            .await;
        match result {
            Ok(r) if r.rows_affected() == 0 => {
                tracing::debug!("Sign-out for a session that was already gone");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Sign-out session delete failed; clearing cookie anyway");
            }
        }
    }

    (StatusCode::NO_CONTENT, jar.remove(removal_cookie()))
}

/// Token from the Authorization header, falling back to the session cookie.
fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Resolve a token to the calling user. The configured admin API token is
/// accepted as a synthetic admin for scripted access.
pub async fn get_current_user(
    db: &DbPool,
    config: &Config,
    token: &str,
) -> Result<AuthUser, ApiError> {
    // Constant-time comparison against the static admin token
    let admin_token = config.auth.admin_token.as_bytes();
    let provided = token.as_bytes();
    if admin_token.len() == provided.len() && admin_token.ct_eq(provided).into() {
        return Ok(AuthUser {
            id: "system".to_string(),
            email: config.auth.admin_email.clone(),
            name: "System Admin".to_string(),
            role: Role::Admin,
        });
    }

    let session: Option<(String,)> = sqlx::query_as(
        "SELECT user_id FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(hash_token(token))
    .fetch_optional(db)
    .await?;

    let (user_id,) = session.ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_optional(db)
        .await?;

    user.map(AuthUser::from)
        .ok_or_else(|| ApiError::unauthorized("Session user no longer exists"))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = extract_token(&parts.headers, &jar)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        get_current_user(&state.db, &state.config, &token).await
    }
}

/// Extractor rejecting non-admin callers.
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}

/// Create the bootstrap admin account if it does not exist yet.
pub async fn ensure_admin_user(db: &DbPool, email: &str, password: &str) -> anyhow::Result<()> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let password_hash = if password.is_empty() {
        // No password configured: account exists but cannot log in with one.
        String::new()
    } else {
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?
    };

    sqlx::query("INSERT INTO users (id, email, password_hash, name, role) VALUES (?, ?, ?, ?, ?)")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(email)
        .bind(&password_hash)
        .bind("Admin")
        .bind(Role::Admin.as_str())
        .execute(db)
        .await?;

    tracing::info!(email = %email, "Created admin user");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{memory_pool, seed_user};

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn session_token_resolves_user() {
        let db = memory_pool().await;
        let config = Config::default();
        let user_id = seed_user(&db, "amina@example.com", "learner").await;

        let token = create_session(&db, &user_id, 7).await.unwrap();
        let user = get_current_user(&db, &config, &token).await.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.role, Role::Learner);

        // Unknown token is rejected
        let err = get_current_user(&db, &config, "deadbeef").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_api_token_is_a_synthetic_admin() {
        let db = memory_pool().await;
        let config = Config::default();

        let user = get_current_user(&db, &config, &config.auth.admin_token)
            .await
            .unwrap();
        assert_eq!(user.id, "system");
        assert!(user.role.is_admin());
    }

    #[tokio::test]
    async fn expired_session_is_rejected() {
        let db = memory_pool().await;
        let config = Config::default();
        let user_id = seed_user(&db, "amina@example.com", "learner").await;

        let token = generate_token();
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at) VALUES (?, ?, ?, datetime('now', '-1 day'))",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&user_id)
        .bind(hash_token(&token))
        .execute(&db)
        .await
        .unwrap();

        assert!(get_current_user(&db, &config, &token).await.is_err());
    }

    #[tokio::test]
    async fn ensure_admin_user_is_idempotent() {
        let db = memory_pool().await;
        ensure_admin_user(&db, "admin@durus.local", "s3cret-pass").await.unwrap();
        ensure_admin_user(&db, "admin@durus.local", "s3cret-pass").await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
