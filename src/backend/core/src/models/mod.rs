//! Domain model: plans, permissions, principals and service sets.

use serde::{Deserialize, Deserializer};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

pub(crate) use id_type;

mod permission;
mod plan;
mod principal;
mod service;

pub use permission::{NewPermission, Permission, PermissionId, PermissionPatch};
pub use plan::{NewPlan, Plan, PlanId, PlanPatch};
pub use principal::{NewPrincipal, Principal, PrincipalId, PrincipalPatch};
pub use service::{ServiceSet, ServiceVocabulary, DEFAULT_SERVICES};

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Used with `#[serde(default)]` so that a missing key yields `None` and a
/// `null` yields `Some(None)`.
pub(crate) fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
