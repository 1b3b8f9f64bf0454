//! Authentication gate.
//!
//! `login` exchanges a username and secret for a signed HS256 token.
//! `resolve` turns a presented bearer token back into the stored principal,
//! and `require_admin` narrows that to administrators.
//!
//! Secrets are compared as plaintext bytes.

mod extract;

pub use extract::{AdminPrincipal, CurrentPrincipal};

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{Result, TollboothError};
use crate::models::{Principal, PrincipalId};
use crate::store::{bounded, Store};

const INVALID_CREDENTIALS: &str = "Incorrect username or password";

// ═══════════════════════════════════════════════════════════════════════════════
// Tokens
// ═══════════════════════════════════════════════════════════════════════════════

/// JWT token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal id)
    pub sub: String,

    pub username: String,

    /// Admin at issue time. Authorization re-reads the stored flag.
    #[serde(default)]
    pub adm: bool,

    /// Token ID
    pub jti: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer
    pub iss: String,
}

impl Claims {
    pub fn principal_id(&self) -> Result<PrincipalId> {
        self.sub
            .parse::<i64>()
            .map(PrincipalId)
            .map_err(|_| TollboothError::unauthenticated("The provided token is invalid"))
    }
}

/// Response body of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authenticator
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Authenticator {
    store: Arc<dyn Store>,
    timeout: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    token_ttl: Duration,
}

impl Authenticator {
    pub fn new(config: &AuthConfig, store: Arc<dyn Store>, timeout: Duration) -> Result<Self> {
        if config.jwt_secret.is_empty() {
            return Err(TollboothError::configuration("auth.jwt_secret must be set"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Ok(Self {
            store,
            timeout,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            token_ttl: config.token_ttl,
        })
    }

    /// Exchange credentials for a token.
    ///
    /// Unknown usernames and wrong secrets fail with the same message.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken> {
        let principal = bounded(self.timeout, self.store.find_principal_by_username(username)).await?;

        match principal {
            Some(principal) if principal.secret_matches(password) => {
                counter!("tollbooth_logins_total", "outcome" => "success").increment(1);
                info!(user_id = %principal.id, "Login succeeded");
                self.issue(&principal)
            }
            _ => {
                counter!("tollbooth_logins_total", "outcome" => "failure").increment(1);
                debug!("Login rejected");
                Err(TollboothError::unauthenticated(INVALID_CREDENTIALS))
            }
        }
    }

    /// Sign a token for `principal`.
    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.token_ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: principal.id.to_string(),
            username: principal.username.clone(),
            adm: principal.is_admin,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TollboothError::internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: self.token_ttl.as_secs(),
        })
    }

    /// Verify signature, issuer and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Resolve a presented credential to the stored principal.
    pub async fn resolve(&self, credential: Option<&str>) -> Result<Principal> {
        let token = credential
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TollboothError::unauthenticated("Not authenticated"))?;

        let claims = self.verify(token)?;
        let id = claims.principal_id()?;

        bounded(self.timeout, self.store.load_principal(id))
            .await?
            .ok_or_else(|| TollboothError::unauthenticated("The provided token is invalid"))
    }

    /// Fail with `Forbidden` unless `principal` is an administrator.
    pub fn require_admin(principal: Principal) -> Result<Principal> {
        if principal.is_admin {
            Ok(principal)
        } else {
            Err(TollboothError::forbidden("Not enough permissions"))
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer ")))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::NewPrincipal;
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            ..Default::default()
        }
    }

    async fn setup() -> (Authenticator, Principal) {
        let store = Arc::new(MemoryStore::new());
        let principal = store
            .insert_principal(NewPrincipal {
                username: "alice".into(),
                password: "wonderland".into(),
                is_admin: false,
            })
            .await
            .unwrap();
        let auth = Authenticator::new(&config(), store, Duration::from_secs(1)).unwrap();
        (auth, principal)
    }

    #[tokio::test]
    async fn test_login_then_resolve() {
        let (auth, principal) = setup().await;
        let token = auth.login("alice", "wonderland").await.unwrap();
        assert_eq!(token.token_type, "bearer");

        let resolved = auth.resolve(Some(&token.access_token)).await.unwrap();
        assert_eq!(resolved.id, principal.id);
    }

    #[tokio::test]
    async fn test_bad_credentials_share_one_error() {
        let (auth, _) = setup().await;
        let wrong_secret = auth.login("alice", "nope").await.unwrap_err();
        let unknown_user = auth.login("bob", "wonderland").await.unwrap_err();

        assert_eq!(wrong_secret.code(), ErrorCode::Unauthenticated);
        assert_eq!(wrong_secret.user_message(), unknown_user.user_message());
    }

    #[tokio::test]
    async fn test_missing_or_garbage_credential_is_unauthenticated() {
        let (auth, _) = setup().await;
        assert_eq!(
            auth.resolve(None).await.unwrap_err().code(),
            ErrorCode::Unauthenticated
        );
        assert_eq!(
            auth.resolve(Some("admin_token")).await.unwrap_err().code(),
            ErrorCode::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let (auth, principal) = setup().await;
        let other = Authenticator::new(
            &AuthConfig {
                jwt_secret: "other-secret".into(),
                ..Default::default()
            },
            Arc::new(MemoryStore::new()),
            Duration::from_secs(1),
        )
        .unwrap();

        let forged = other.issue(&principal).unwrap();
        let err = auth.resolve(Some(&forged.access_token)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthenticated);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (auth, principal) = setup().await;
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: principal.id.to_string(),
            username: principal.username.clone(),
            adm: false,
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
            iss: "tollbooth".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = auth.resolve(Some(&token)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthenticated);
        assert!(err.user_message().contains("expired"));
    }

    #[tokio::test]
    async fn test_require_admin() {
        let (_, principal) = setup().await;
        let err = Authenticator::require_admin(principal.clone()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let admin = Principal {
            is_admin: true,
            ..principal
        };
        assert!(Authenticator::require_admin(admin).is_ok());
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
