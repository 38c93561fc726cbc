//! Token API handlers.
//!
//! - `POST /tokens` logs in with a form-encoded `username` (or email) and
//!   `password`, returns an access token and sets the refresh token cookie.
//! - `PUT /tokens` exchanges the refresh token cookie for a new access token.
//!
//! # Examples
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:8080/api/tokens \
//!   -c cookies.txt \
//!   -d "username=test_user_1&password=123456"
//! ```
//!
//! Refresh:
//! ```bash
//! curl -X PUT http://localhost:8080/api/tokens -b cookies.txt
//! ```

use axum::{
    Json,
    extract::State,
    http::{
        HeaderMap, HeaderValue,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use fast_cms::auth::AuthError;
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    error::{ApiError, ApiResult},
    extractors::{ApiForm, cookie_value},
    request_id::RequestId,
};
use crate::{logging, metrics};

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// OAuth2-style password form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username or email
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Login with username or email.
///
/// # Response
///
/// `200 OK` with `{"access_token": "...", "token_type": "bearer"}` and a
/// `Set-Cookie` header carrying the refresh token.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown user or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiForm(form): ApiForm<LoginForm>,
) -> ApiResult<impl IntoResponse> {
    let result = state.auth_manager.login(&form.username, &form.password).await;
    metrics::login_attempts_total(result.is_ok());

    let (user, tokens) = result.inspect_err(|err| {
        if matches!(err, AuthError::InvalidCredentials) {
            logging::log_security_event(
                "failed_login",
                None,
                Some(request_id.as_str()),
                "Invalid credentials",
            );
        }
    })?;
    tracing::info!(user_id = user.id, request_id = request_id.as_str(), "User logged in");

    let max_age = state.auth_manager.config().refresh_token_ttl.num_seconds();
    let cookie = refresh_cookie(&tokens.refresh_token, max_age)
        .map_err(|e| ApiError::Internal(format!("unusable refresh token: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok((headers, Json(TokenResponse::bearer(tokens.access_token))))
}

/// Mint a new access token from the refresh token cookie.
///
/// # Errors
///
/// - `401 Unauthorized`: Cookie missing, malformed, forged or expired
pub async fn refresh(
    State(state): State<AppState>,
    request_id: RequestId,
    headers: HeaderMap,
) -> ApiResult<Json<TokenResponse>> {
    let token = cookie_value(&headers, REFRESH_COOKIE_NAME);
    let result = state.auth_manager.refresh(token).await;
    metrics::token_refresh_total(result.is_ok());

    let access_token = result.inspect_err(|err| {
        if matches!(err, AuthError::InvalidCredentials) {
            logging::log_security_event(
                "invalid_refresh",
                None,
                Some(request_id.as_str()),
                if token.is_some() {
                    "Rejected refresh token"
                } else {
                    "Missing refresh token cookie"
                },
            );
        }
    })?;

    Ok(Json(TokenResponse::bearer(access_token)))
}

/// `HttpOnly` cookie carrying the refresh token.
pub fn refresh_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE_NAME}={token}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={max_age_secs}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie("abc.def.ghi", 604_800).unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("refresh_token=abc.def.ghi;"));
        for attribute in ["Path=/", "HttpOnly", "Secure", "SameSite=Lax", "Max-Age=604800"] {
            assert!(cookie.contains(attribute), "missing {attribute}");
        }
    }

    #[test]
    fn test_refresh_cookie_rejects_header_breaking_tokens() {
        assert!(refresh_cookie("bad\r\ntoken", 1).is_err());
    }
}
