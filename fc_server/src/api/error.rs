//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the body is always
//! `{"error": "<message>"}` and internal details are only logged.

use axum::{
    Json,
    extract::{
        multipart::MultipartRejection,
        rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use fast_cms::{auth::AuthError, content::ContentError};
use serde::Serialize;

use crate::metrics;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Content(#[from] ContentError),

    /// Upload is not an allowed image type, or its bytes do not match the
    /// declared type
    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("File too large: maximum size is {max_bytes} bytes")]
    FileTooLarge { max_bytes: usize },

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body, query or path could not be extracted
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Route not found")]
    RouteNotFound,

    /// Filesystem failure while storing uploads
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => auth_status(err),
            ApiError::Content(err) => match err {
                ContentError::Auth(err) => auth_status(err),
                ContentError::NotFound(_) => StatusCode::NOT_FOUND,
                ContentError::DuplicateEntry(_) => StatusCode::CONFLICT,
                ContentError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ContentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidFileFormat(_)
            | ApiError::FileTooLarge { .. }
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Io(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Auth(err) => err.client_message(),
            ApiError::Content(err) => err.client_message(),
            ApiError::Io(_) | ApiError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::PermissionDenied => StatusCode::FORBIDDEN,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::UserNameAlreadyExists | AuthError::UserEmailAlreadyExists => {
            StatusCode::CONFLICT
        }
        AuthError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::Database(_) | AuthError::HashingFailed | AuthError::JwtError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => tracing::error!(error = %self, "request failed"),
            StatusCode::FORBIDDEN => metrics::permission_denied_total(),
            _ => {}
        }

        let body = Json(ErrorResponse {
            error: self.client_message(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),+ $(,)?) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    ApiError::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )+
    };
}

impl_from_rejection!(
    JsonRejection,
    FormRejection,
    QueryRejection,
    PathRejection,
    MultipartRejection,
);

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (ApiError::from(AuthError::PermissionDenied), StatusCode::FORBIDDEN),
            (ApiError::from(AuthError::UserNotFound), StatusCode::NOT_FOUND),
            (ApiError::from(AuthError::UserNameAlreadyExists), StatusCode::CONFLICT),
            (ApiError::from(AuthError::UserEmailAlreadyExists), StatusCode::CONFLICT),
            (ApiError::from(ContentError::DuplicateEntry("Tag")), StatusCode::CONFLICT),
            (ApiError::from(ContentError::NotFound("Post")), StatusCode::NOT_FOUND),
            (
                ApiError::from(ContentError::Auth(AuthError::PermissionDenied)),
                StatusCode::FORBIDDEN,
            ),
            (ApiError::InvalidFileFormat("text/plain".into()), StatusCode::BAD_REQUEST),
            (ApiError::FileTooLarge { max_bytes: 1 }, StatusCode::BAD_REQUEST),
            (ApiError::RouteNotFound, StatusCode::NOT_FOUND),
            (
                ApiError::Rejected {
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                    message: "missing field `email`".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::from(AuthError::Database(sqlx::Error::RowNotFound)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_unauthorized_response_shape() {
        let response = ApiError::from(AuthError::InvalidCredentials).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Invalid authentication credentials");
    }

    #[tokio::test]
    async fn test_internal_errors_are_sanitized() {
        let response =
            ApiError::from(ContentError::Database(sqlx::Error::PoolTimedOut)).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
