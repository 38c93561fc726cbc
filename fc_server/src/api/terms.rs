//! Category and tag API handlers.
//!
//! Both taxonomies expose the same routes; a [`TermRoute`] marker picks the
//! table, so `Router::route("/categories", get(list::<Categories>))` and the
//! `/tags` equivalent share one set of handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use fast_cms::content::{Term, TermDetail, TermKind, TermName, models::TermId};

use super::{
    AppState,
    error::ApiResult,
    extractors::{ApiJson, ApiPath, CurrentUser},
};

/// Selects the taxonomy a handler operates on
pub trait TermRoute: Send + Sync + 'static {
    const KIND: TermKind;
}

pub struct Categories;

impl TermRoute for Categories {
    const KIND: TermKind = TermKind::Category;
}

pub struct Tags;

impl TermRoute for Tags {
    const KIND: TermKind = TermKind::Tag;
}

pub async fn list<K: TermRoute>(State(state): State<AppState>) -> ApiResult<Json<Vec<Term>>> {
    Ok(Json(state.content_manager.list_terms(K::KIND).await?))
}

/// Term with the posts filed under it.
///
/// # Errors
///
/// - `404 Not Found`: No such term
pub async fn read<K: TermRoute>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TermId>,
) -> ApiResult<Json<TermDetail>> {
    Ok(Json(state.content_manager.get_term(K::KIND, id).await?))
}

/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin
/// - `409 Conflict`: Name already used
/// - `422 Unprocessable Entity`: Empty or overlong name
pub async fn create<K: TermRoute>(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(request): ApiJson<TermName>,
) -> ApiResult<(StatusCode, Json<Term>)> {
    let term = state
        .content_manager
        .create_term(&actor, K::KIND, &request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(term)))
}

pub async fn rename<K: TermRoute>(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<TermId>,
    ApiJson(request): ApiJson<TermName>,
) -> ApiResult<Json<Term>> {
    let term = state
        .content_manager
        .rename_term(&actor, K::KIND, id, &request.name)
        .await?;
    Ok(Json(term))
}

pub async fn delete<K: TermRoute>(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<TermId>,
) -> ApiResult<StatusCode> {
    state.content_manager.delete_term(&actor, K::KIND, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
