//! HTTP API for the content backend.
//!
//! # Modules
//!
//! - [`tokens`]: Login and access-token refresh
//! - [`users`]: Registration, profiles and avatars
//! - [`terms`]: Categories and tags
//! - [`posts`]: Posts
//! - [`extractors`]: Bearer authentication
//! - [`error`]: Error to response mapping
//!
//! # Endpoints Overview
//!
//! Everything except `/`, `/health` and `/static` is nested under the
//! configured prefix (`/api` by default).
//!
//! ```text
//! GET    /                        - App info (public)
//! GET    /health                  - Health check (public)
//! POST   /api/tokens              - Login, sets refresh cookie (public)
//! PUT    /api/tokens              - Refresh access token (cookie)
//! POST   /api/users               - Register (public)
//! GET    /api/users               - List users (auth)
//! GET    /api/users/me            - Current user (auth)
//! GET    /api/users/{id}          - Read user (auth)
//! PATCH  /api/users/{id}          - Update user (auth, rank check)
//! PUT    /api/users/{id}/avatar   - Upload avatar (auth, rank check)
//! GET    /api/categories          - List categories (public)
//! POST   /api/categories          - Create category (admin)
//! GET    /api/categories/{id}     - Category with posts (public)
//! PATCH  /api/categories/{id}     - Rename category (admin)
//! DELETE /api/categories/{id}     - Delete category (admin)
//! ...    /api/tags[/{id}]         - Same as categories
//! GET    /api/posts               - List posts (public)
//! POST   /api/posts               - Create post (auth)
//! GET    /api/posts/{id}          - Read post (public)
//! PATCH  /api/posts/{id}          - Update post (auth, rank check)
//! DELETE /api/posts/{id}          - Delete post (auth, rank check)
//! GET    /static/*                - Uploaded files
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use fast_cms::Database;
//! use fc_server::{api::{AppState, create_router}, config::ServerConfig};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env(None, None)?;
//! let db = Database::new(&config.database).await?;
//!
//! let app = create_router(AppState::new(db, config));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extractors;
pub mod posts;
pub mod request_id;
pub mod terms;
pub mod tokens;
pub mod upload;
pub mod users;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use fast_cms::{
    AuthManager, ContentManager, Database, UserManager,
    db::{SqlUserRepository, UserRepository},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir};

use crate::config::ServerConfig;
use error::ApiError;
use terms::{Categories, Tags};

/// Multipart framing allowance on top of the image size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is behind an `Arc` or is a pool
/// handle.
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub user_manager: Arc<UserManager>,
    pub content_manager: Arc<ContentManager>,
    pub db: Database,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the managers onto one shared user repository.
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(SqlUserRepository::new(db.pool().clone()));

        Self {
            auth_manager: Arc::new(AuthManager::new(users.clone(), config.auth_config())),
            user_manager: Arc::new(UserManager::new(users.clone())),
            content_manager: Arc::new(ContentManager::new(db.pool().clone(), users)),
            db,
            config: Arc::new(config),
        }
    }
}

/// Create the complete router with all endpoints and middleware.
///
/// Layers, innermost first: gzip compression, request id and access log,
/// then CORS when a frontend origin is configured.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        .route("/", get(root_info))
        .route("/health", get(health_check))
        .nest(&config.api_prefix, api_router(&config))
        .nest_service("/static", ServeDir::new(&config.storage.static_dir))
        .fallback(route_not_found)
        .layer(CompressionLayer::new())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware));

    let router = match config.frontend_url.as_deref().map(cors_layer) {
        Some(Ok(cors)) => router.layer(cors),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "FRONTEND_URL is not a valid origin, CORS disabled");
            router
        }
        None => router,
    };

    router.with_state(state)
}

fn api_router(config: &ServerConfig) -> Router<AppState> {
    let avatar_limit = config.storage.max_image_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/tokens", post(tokens::login).put(tokens::refresh))
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/me", get(users::read_me))
        .route(
            "/users/{user_id}",
            get(users::read_user).patch(users::update_user),
        )
        .route(
            "/users/{user_id}/avatar",
            put(users::upload_avatar).layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route(
            "/categories",
            get(terms::list::<Categories>).post(terms::create::<Categories>),
        )
        .route(
            "/categories/{id}",
            get(terms::read::<Categories>)
                .patch(terms::rename::<Categories>)
                .delete(terms::delete::<Categories>),
        )
        .route("/tags", get(terms::list::<Tags>).post(terms::create::<Tags>))
        .route(
            "/tags/{id}",
            get(terms::read::<Tags>)
                .patch(terms::rename::<Tags>)
                .delete(terms::delete::<Tags>),
        )
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{post_id}",
            get(posts::read_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
}

/// Credentialed CORS for a single frontend origin
fn cors_layer(origin: &str) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let origin = HeaderValue::from_str(origin.trim_end_matches('/'))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Application info.
///
/// ```bash
/// curl http://localhost:8080/
/// # {"name":"FastCMS","environment":"development","debug":true,"host":"127.0.0.1","port":8080}
/// ```
async fn root_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = &state.config;
    Json(json!({
        "name": config.app_name,
        "environment": config.environment.as_str(),
        "debug": config.debug,
        "host": config.bind.ip().to_string(),
        "port": config.bind.port(),
    }))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"0.1.0","database":true,"timestamp":"2026-01-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.db.health_check().await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(error = %err, "Database health check failed");
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_origin() {
        assert!(cors_layer("http://localhost:5173").is_ok());
        assert!(cors_layer("http://localhost:5173/").is_ok());
        assert!(cors_layer("bad\norigin").is_err());
    }
}
