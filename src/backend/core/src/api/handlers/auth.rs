use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    Form, Json,
};
use serde::Deserialize;

use crate::api::{ApiResponse, AppState};
use crate::auth::CurrentPrincipal;
use crate::error::TollboothError;

/// Login body, accepted as a form (OAuth2 password style) or as JSON.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[async_trait]
impl<S> FromRequest<S> for LoginRequest
where
    S: Send + Sync,
{
    type Rejection = TollboothError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<Self>::from_request(req, state).await?;
            Ok(body)
        } else {
            let Form(body) = Form::<Self>::from_request(req, state)
                .await
                .map_err(|e| TollboothError::validation(e.body_text()))?;
            Ok(body)
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    body: LoginRequest,
) -> Result<impl IntoResponse, TollboothError> {
    let token = state.auth.login(&body.username, &body.password).await?;
    Ok(Json(ApiResponse::success(token)))
}

pub async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> impl IntoResponse {
    Json(ApiResponse::success(principal))
}
