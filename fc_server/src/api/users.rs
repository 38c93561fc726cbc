//! User API handlers.
//!
//! Registration is public; everything else requires a bearer token. Edits to
//! another account, including avatar uploads, follow the rank rule: admins
//! may only modify accounts ranked strictly below them.

use axum::{
    Json,
    extract::{Multipart, State, multipart::{MultipartError, MultipartRejection}},
    http::StatusCode,
};
use fast_cms::{
    auth::{User, UserId},
    pagination::{Page, PageQuery},
    users::{UserCreate, UserUpdate},
};

use super::{
    AppState,
    error::{ApiError, ApiResult},
    extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser},
    upload,
};

/// Name of the multipart field carrying the avatar image
pub const AVATAR_FIELD: &str = "file";

/// Register a new account.
///
/// # Errors
///
/// - `409 Conflict`: Username or email already taken
/// - `422 Unprocessable Entity`: Malformed username, email or password
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UserCreate>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.user_manager.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<User>>> {
    Ok(Json(state.user_manager.list(&page).await?))
}

pub async fn read_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

pub async fn read_user(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.user_manager.get(user_id).await?))
}

/// Partially update an account.
///
/// # Errors
///
/// - `403 Forbidden`: Rank check failed, or an illegal `power` change
/// - `404 Not Found`: Target does not exist
/// - `409 Conflict`: New username or email belongs to another account
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> ApiResult<Json<User>> {
    let user = state.user_manager.update(&actor, user_id, update).await?;
    Ok(Json(user))
}

/// Replace an account's avatar with an uploaded image.
///
/// Expects `multipart/form-data` with the image in the `file` field. The old
/// avatar file is deleted once the new one is recorded.
///
/// # Errors
///
/// - `400 Bad Request`: Not an allowed image, content does not match the
///   declared type, or larger than the configured limit
/// - `403 Forbidden` / `404 Not Found`: As for profile updates
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(user_id): ApiPath<UserId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<User>> {
    let mut multipart = multipart?;
    let target = state
        .user_manager
        .authorize_avatar_change(&actor, user_id)
        .await?;
    let storage = &state.config.storage;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, storage.max_image_size))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, storage.max_image_size))?;
        file = Some((content_type, bytes));
        break;
    }
    let (content_type, bytes) = file.ok_or_else(|| {
        ApiError::BadRequest(format!("missing multipart field '{AVATAR_FIELD}'"))
    })?;

    let kind = upload::validate_image(content_type.as_deref(), &bytes, storage.max_image_size)?;
    let filename = upload::store_image(&storage.avatar_dir, kind, &bytes).await?;

    let updated = match state.user_manager.replace_avatar(target.id, &filename).await {
        Ok(user) => user,
        Err(err) => {
            upload::remove_image(&storage.avatar_dir, &filename).await;
            return Err(err.into());
        }
    };
    if let Some(old) = target.avatar.as_deref() {
        upload::remove_image(&storage.avatar_dir, old).await;
    }

    tracing::info!(
        actor_id = actor.id,
        user_id = updated.id,
        avatar = %filename,
        "Avatar replaced"
    );
    Ok(Json(updated))
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::FileTooLarge { max_bytes }
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
