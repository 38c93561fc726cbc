//! Post API handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use fast_cms::{
    content::{Post, PostCreate, PostFilter, PostUpdate, models::PostId},
    pagination::{Page, PageQuery},
};

use super::{
    AppState,
    error::ApiResult,
    extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser},
};

/// Paginated post listing in creation order.
///
/// Accepts `page`, `per_page` and the optional filters `category_id`,
/// `tag_id` and `author_id`.
pub async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageQuery>,
    ApiQuery(filter): ApiQuery<PostFilter>,
) -> ApiResult<Json<Page<Post>>> {
    Ok(Json(state.content_manager.list_posts(&filter, &page).await?))
}

pub async fn read_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<PostId>,
) -> ApiResult<Json<Post>> {
    Ok(Json(state.content_manager.get_post(post_id).await?))
}

/// Create a post authored by the caller.
///
/// # Errors
///
/// - `404 Not Found`: Unknown category or tag id
/// - `409 Conflict`: Title already used
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(author): CurrentUser,
    ApiJson(request): ApiJson<PostCreate>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = state.content_manager.create_post(&author, request).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// # Errors
///
/// - `403 Forbidden`: Caller is neither the author nor ranked above them
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(post_id): ApiPath<PostId>,
    ApiJson(update): ApiJson<PostUpdate>,
) -> ApiResult<Json<Post>> {
    let post = state
        .content_manager
        .update_post(&actor, post_id, update)
        .await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(post_id): ApiPath<PostId>,
) -> ApiResult<StatusCode> {
    state.content_manager.delete_post(&actor, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
