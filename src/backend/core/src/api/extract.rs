//! Request extractors whose rejections use the API error body.
//!
//! axum's stock `Json`, `Path` and `Query` reject with plain text. These
//! wrappers run the same extraction and turn a rejection into a
//! `VALIDATION_ERROR`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::error::TollboothError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(TollboothError))]
pub struct JsonBody<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(TollboothError))]
pub struct PathParams<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(TollboothError))]
pub struct QueryParams<T>(pub T);

impl From<JsonRejection> for TollboothError {
    fn from(rejection: JsonRejection) -> Self {
        TollboothError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for TollboothError {
    fn from(rejection: PathRejection) -> Self {
        TollboothError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for TollboothError {
    fn from(rejection: QueryRejection) -> Self {
        TollboothError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::http::Request;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[allow(dead_code)]
        usage_limit: i64,
    }

    #[tokio::test]
    async fn test_missing_field_is_a_validation_error() {
        let request = Request::builder()
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"name":"Basic"}"#))
            .unwrap();

        let err = JsonBody::<Body>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.to_string().contains("usage_limit"));
    }

    #[tokio::test]
    async fn test_bad_query_is_a_validation_error() {
        #[derive(Debug, Deserialize)]
        struct Window {
            #[allow(dead_code)]
            limit: u64,
        }

        let request = Request::builder()
            .uri("/plans?limit=lots")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let err = QueryParams::<Window>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
