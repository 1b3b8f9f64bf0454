use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id_type;

id_type!(
    /// Identifier of a named permission.
    PermissionId
);

/// A named permission. Names are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPermission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update for a permission.
///
/// `description: Some(None)` clears the description, `None` leaves it as is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PermissionPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::explicit_null")]
    pub description: Option<Option<String>>,
}

impl PermissionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    pub fn apply(self, permission: &mut Permission) {
        if let Some(name) = self.name {
            permission.name = name;
        }
        if let Some(description) = self.description {
            permission.description = description;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let absent: PermissionPatch = serde_json::from_str(r#"{"name":"read"}"#).unwrap();
        assert_eq!(absent.description, None);

        let cleared: PermissionPatch = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: PermissionPatch = serde_json::from_str(r#"{"description":"x"}"#).unwrap();
        assert_eq!(set.description, Some(Some("x".to_string())));
    }

    #[test]
    fn test_empty_object_is_empty_patch() {
        let patch: PermissionPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
    }
}
