//! Axum extractors for authenticated principals.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;

use super::{bearer_token, Authenticator};
use crate::error::TollboothError;
use crate::models::Principal;

/// Any authenticated principal.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

/// An authenticated principal with `is_admin` set.
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = TollboothError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<Authenticator>::from_ref(state);
        let principal = auth.resolve(bearer_token(&parts.headers)).await?;
        Ok(Self(principal))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminPrincipal
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = TollboothError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentPrincipal(principal) = CurrentPrincipal::from_request_parts(parts, state).await?;
        Authenticator::require_admin(principal).map(Self)
    }
}
