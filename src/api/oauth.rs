//! Google OAuth sign-in.
//!
//! The SPA asks for an authorization URL, sends the learner to Google, and
//! Google redirects back to our callback. The callback exchanges the code,
//! reads the profile, finds-or-creates the account by email and hands the
//! session token to the SPA via its /auth/callback route.

use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::OAuthProviderConfig;
use crate::db::{Role, User};
use crate::AppState;

use super::auth::create_session;
use super::error::ApiError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Serialize)]
pub struct OAuthAuthorizationResponse {
    pub authorization_url: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    pub code: String,
    #[allow(dead_code)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    #[serde(default)]
    name: Option<String>,
}

/// URL-encode a string for use in query parameters
fn url_encode(s: &str) -> String {
    let mut encoded = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    encoded
}

fn redirect_uri(state: &AppState, oauth: &OAuthProviderConfig) -> String {
    oauth.redirect_uri.clone().unwrap_or_else(|| {
        format!(
            "{}/api/auth/oauth/google/callback",
            state.config.server.public_origin.trim_end_matches('/')
        )
    })
}

fn google_config(state: &AppState) -> Result<&OAuthProviderConfig, ApiError> {
    state
        .config
        .oauth
        .google
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Google OAuth is not configured"))
}

/// Build the provider authorize URL for the SPA to navigate to.
pub async fn google_authorize(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OAuthAuthorizationResponse>, ApiError> {
    let oauth = google_config(&state)?;

    let nonce: [u8; 16] = rand::rng().random();
    let state_param = hex::encode(nonce);

    let authorization_url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        GOOGLE_AUTH_URL,
        url_encode(&oauth.client_id),
        url_encode(&redirect_uri(&state, oauth)),
        url_encode("openid email profile"),
        state_param,
    );

    Ok(Json(OAuthAuthorizationResponse {
        authorization_url,
        state: state_param,
    }))
}

/// Handle the OAuth callback from Google.
pub async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OAuthCallbackRequest>,
) -> Result<Redirect, ApiError> {
    let oauth = google_config(&state)?;

    let access_token = exchange_code(oauth, &redirect_uri(&state, oauth), &params.code).await?;
    let profile = fetch_userinfo(&access_token).await?;

    let email = profile.email.trim().to_lowercase();
    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;

    let user_id = match existing {
        Some(user) => user.id,
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            let name = profile
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| email.split('@').next().unwrap_or("learner").to_string());
            sqlx::query(
                "INSERT INTO users (id, email, password_hash, name, role) VALUES (?, ?, '', ?, ?)",
            )
            .bind(&id)
            .bind(&email)
            .bind(&name)
            .bind(Role::Learner.as_str())
            .execute(&state.db)
            .await?;
            tracing::info!(email = %email, "Created account from Google sign-in");
            id
        }
    };

    let token = create_session(&state.db, &user_id, state.config.auth.session_ttl_days).await?;

    // The token travels in the fragment so it never hits server logs.
    Ok(Redirect::to(&format!("/auth/callback#token={}", token)))
}

async fn exchange_code(
    oauth: &OAuthProviderConfig,
    redirect_uri: &str,
    code: &str,
) -> Result<String, ApiError> {
    let client = reqwest::Client::new();
    let response = client
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Google token exchange request failed");
            ApiError::external("Could not reach the sign-in provider")
        })?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "Google rejected the token exchange");
        return Err(ApiError::unauthorized("Sign-in was not accepted by Google"));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ApiError::internal(format!("Malformed token response: {e}")))?;
    Ok(token.access_token)
}

async fn fetch_userinfo(access_token: &str) -> Result<GoogleUserInfo, ApiError> {
    let client = reqwest::Client::new();
    let response = client
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Google userinfo request failed");
            ApiError::external("Could not reach the sign-in provider")
        })?;

    if !response.status().is_success() {
        return Err(ApiError::unauthorized("Google did not return a profile"));
    }

    response
        .json()
        .await
        .map_err(|e| ApiError::internal(format!("Malformed profile response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encode_escapes_reserved_characters() {
        assert_eq!(url_encode("a b&c"), "a%20b%26c");
        assert_eq!(url_encode("safe-chars_.~"), "safe-chars_.~");
        assert_eq!(
            url_encode("https://x.test/cb?x=1"),
            "https%3A%2F%2Fx.test%2Fcb%3Fx%3D1"
        );
    }
}
