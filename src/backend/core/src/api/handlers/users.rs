use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::extract::{JsonBody, PathParams, QueryParams};
use crate::api::{ApiResponse, AppState};
use crate::auth::AdminPrincipal;
use crate::error::TollboothError;
use crate::models::{NewPrincipal, PrincipalId, PrincipalPatch};
use crate::pagination::ListQuery;

pub async fn create_user(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    JsonBody(req): JsonBody<NewPrincipal>,
) -> Result<impl IntoResponse, TollboothError> {
    let user = state.principals.create(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<impl IntoResponse, TollboothError> {
    let users = state.principals.list(query).await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> Result<impl IntoResponse, TollboothError> {
    let user = state.principals.get(PrincipalId(id)).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
    JsonBody(patch): JsonBody<PrincipalPatch>,
) -> Result<impl IntoResponse, TollboothError> {
    let user = state.principals.update(PrincipalId(id), patch).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> Result<impl IntoResponse, TollboothError> {
    let user = state.principals.delete(PrincipalId(id)).await?;
    Ok(Json(ApiResponse::success(user)))
}
