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
use crate::models::{NewPermission, PermissionId, PermissionPatch};
use crate::pagination::ListQuery;

pub async fn create_permission(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    JsonBody(req): JsonBody<NewPermission>,
) -> Result<impl IntoResponse, TollboothError> {
    let permission = state.permissions.create(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(permission))))
}

pub async fn list_permissions(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<impl IntoResponse, TollboothError> {
    let permissions = state.permissions.list(query).await?;
    Ok(Json(ApiResponse::success(permissions)))
}

pub async fn get_permission(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> Result<impl IntoResponse, TollboothError> {
    let permission = state.permissions.get(PermissionId(id)).await?;
    Ok(Json(ApiResponse::success(permission)))
}

pub async fn update_permission(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
    JsonBody(patch): JsonBody<PermissionPatch>,
) -> Result<impl IntoResponse, TollboothError> {
    let permission = state.permissions.update(PermissionId(id), patch).await?;
    Ok(Json(ApiResponse::success(permission)))
}

pub async fn delete_permission(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> Result<impl IntoResponse, TollboothError> {
    let permission = state.permissions.delete(PermissionId(id)).await?;
    Ok(Json(ApiResponse::success(permission)))
}
