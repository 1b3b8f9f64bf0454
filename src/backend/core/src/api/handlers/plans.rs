use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::extract::{JsonBody, PathParams, QueryParams};
use crate::api::{ApiResponse, AppState};
use crate::auth::AdminPrincipal;
use crate::error::TollboothError;
use crate::models::{NewPlan, PlanId, PlanPatch, ServiceSet};
use crate::pagination::ListQuery;

// ═══════════════════════════════════════════════════════════════════════════════
// Request Types
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreatePlanRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "api_permissions")]
    pub allowed_services: ServiceSet,
    pub usage_limit: i64,
}

impl TryFrom<CreatePlanRequest> for NewPlan {
    type Error = TollboothError;

    fn try_from(req: CreatePlanRequest) -> Result<Self, Self::Error> {
        Ok(NewPlan {
            name: req.name,
            description: req.description,
            allowed_services: req.allowed_services,
            usage_limit: usage_limit(req.usage_limit)?,
        })
    }
}

/// Absent fields are left untouched.
#[derive(Deserialize, Default)]
pub struct UpdatePlanRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "api_permissions")]
    pub allowed_services: Option<ServiceSet>,
    #[serde(default)]
    pub usage_limit: Option<i64>,
}

impl TryFrom<UpdatePlanRequest> for PlanPatch {
    type Error = TollboothError;

    fn try_from(req: UpdatePlanRequest) -> Result<Self, Self::Error> {
        Ok(PlanPatch {
            name: req.name,
            description: req.description,
            allowed_services: req.allowed_services,
            usage_limit: req.usage_limit.map(usage_limit).transpose()?,
        })
    }
}

fn usage_limit(value: i64) -> Result<u64, TollboothError> {
    u64::try_from(value).map_err(|_| {
        TollboothError::validation("usage_limit must not be negative").with_context("usage_limit", value)
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn create_plan(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    JsonBody(req): JsonBody<CreatePlanRequest>,
) -> Result<impl IntoResponse, TollboothError> {
    let plan = state.plans.create(req.try_into()?).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(plan))))
}

pub async fn list_plans(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<impl IntoResponse, TollboothError> {
    let plans = state.plans.list(query).await?;
    Ok(Json(ApiResponse::success(plans)))
}

pub async fn get_plan(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> Result<impl IntoResponse, TollboothError> {
    let plan = state.plans.get(PlanId(id)).await?;
    Ok(Json(ApiResponse::success(plan)))
}

pub async fn update_plan(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
    JsonBody(req): JsonBody<UpdatePlanRequest>,
) -> Result<impl IntoResponse, TollboothError> {
    let plan = state.plans.update(PlanId(id), req.try_into()?).await?;
    Ok(Json(ApiResponse::success(plan)))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> Result<impl IntoResponse, TollboothError> {
    let plan = state.plans.delete(PlanId(id)).await?;
    Ok(Json(ApiResponse::success(plan)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_legacy_field_name_is_accepted() {
        let req: CreatePlanRequest = serde_json::from_str(
            r#"{"name":"Basic","api_permissions":"storage,compute","usage_limit":100}"#,
        )
        .unwrap();
        let plan = NewPlan::try_from(req).unwrap();
        assert!(plan.allowed_services.contains("compute"));
        assert_eq!(plan.description, "");
    }

    #[test]
    fn test_negative_limit_is_a_validation_error() {
        let req: CreatePlanRequest = serde_json::from_str(
            r#"{"name":"Basic","allowed_services":"storage","usage_limit":-1}"#,
        )
        .unwrap();
        let err = NewPlan::try_from(req).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_empty_update_is_empty_patch() {
        let req: UpdatePlanRequest = serde_json::from_str("{}").unwrap();
        assert!(PlanPatch::try_from(req).unwrap().is_empty());
    }
}
