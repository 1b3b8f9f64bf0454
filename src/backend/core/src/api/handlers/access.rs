use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::ensure_known_service;
use crate::access::AccessDecision;
use crate::api::extract::{JsonBody, PathParams};
use crate::api::{ApiResponse, AppState};
use crate::auth::{AdminPrincipal, CurrentPrincipal};
use crate::error::TollboothError;
use crate::models::{PlanId, PrincipalId};

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: i64,
}

/// Body of a granted service call.
#[derive(Serialize)]
pub struct ServiceGrant {
    pub service: String,
    pub granted: bool,
    pub current_usage: u64,
    pub limit: u64,
}

/// Use a service on behalf of the caller. Denials are 403 with a reason.
pub async fn use_service(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    PathParams(service): PathParams<String>,
) -> Result<impl IntoResponse, TollboothError> {
    ensure_known_service(&state, &service)?;

    match state.access.check_and_consume(principal.id, &service).await? {
        AccessDecision::Granted {
            current_usage,
            limit,
        } => Ok(Json(ApiResponse::success(ServiceGrant {
            service,
            granted: true,
            current_usage,
            limit,
        }))),
        AccessDecision::Denied(reason) => Err(TollboothError::access_denied(reason)),
    }
}

pub async fn my_access(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    PathParams(service): PathParams<String>,
) -> Result<impl IntoResponse, TollboothError> {
    ensure_known_service(&state, &service)?;
    let report = state.access.query_access(principal.id, &service).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn user_access(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams((id, service)): PathParams<(i64, String)>,
) -> Result<impl IntoResponse, TollboothError> {
    ensure_known_service(&state, &service)?;
    let report = state.access.query_access(PrincipalId(id), &service).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn record_usage(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams((id, service)): PathParams<(i64, String)>,
) -> Result<impl IntoResponse, TollboothError> {
    ensure_known_service(&state, &service)?;
    let usage = state.access.record_usage(PrincipalId(id), &service).await?;
    Ok(Json(ApiResponse::success(usage)))
}

pub async fn subscribe(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    JsonBody(req): JsonBody<SubscribeRequest>,
) -> Result<impl IntoResponse, TollboothError> {
    let subscription = state
        .access
        .subscribe(principal.id, PlanId(req.plan_id))
        .await?;
    Ok(Json(ApiResponse::success(subscription)))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse, TollboothError> {
    let principal = state.access.unsubscribe(principal.id).await?;
    Ok(Json(ApiResponse::success(principal)))
}
