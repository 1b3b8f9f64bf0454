use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{id_type, PlanId};

id_type!(
    /// Identifier of a user.
    PrincipalId
);

/// An authenticated actor, possibly holding admin privilege.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub credential_secret: String,
    pub is_admin: bool,
    /// Weak reference; the plan may have been deleted since.
    pub subscription_plan_id: Option<PlanId>,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    /// Plaintext equality against the stored secret.
    pub fn secret_matches(&self, candidate: &str) -> bool {
        self.credential_secret.as_bytes() == candidate.as_bytes()
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("credential_secret", &"[REDACTED]")
            .field("is_admin", &self.is_admin)
            .field("subscription_plan_id", &self.subscription_plan_id)
            .field("usage_count", &self.usage_count)
            .finish()
    }
}

#[derive(Clone, PartialEq, Deserialize)]
pub struct NewPrincipal {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl fmt::Debug for NewPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewPrincipal")
            .field("username", &self.username)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

/// Profile fields an admin may change. Usage and subscription are not here.
#[derive(Clone, Default, PartialEq, Deserialize)]
pub struct PrincipalPatch {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
}

impl PrincipalPatch {
    pub fn apply(self, principal: &mut Principal) {
        if let Some(password) = self.password {
            principal.credential_secret = password;
        }
        if let Some(is_admin) = self.is_admin {
            principal.is_admin = is_admin;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal {
            id: PrincipalId(7),
            username: "alice".into(),
            credential_secret: "s3cret".into(),
            is_admin: false,
            subscription_plan_id: None,
            usage_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_secret_is_never_serialized_or_logged() {
        let p = principal();
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("credential_secret").is_none());
        assert!(!format!("{:?}", p).contains("s3cret"));
    }

    #[test]
    fn test_secret_matches_exact_bytes() {
        let p = principal();
        assert!(p.secret_matches("s3cret"));
        assert!(!p.secret_matches("S3cret"));
        assert!(!p.secret_matches("s3cret "));
    }

    #[test]
    fn test_patch_leaves_absent_fields() {
        let mut p = principal();
        PrincipalPatch {
            is_admin: Some(true),
            ..Default::default()
        }
        .apply(&mut p);
        assert!(p.is_admin);
        assert_eq!(p.credential_secret, "s3cret");
    }
}
