//! Admin-facing catalogs: subscription plans and named permissions.
//!
//! Both catalogs share the same contract. Partial updates leave absent
//! fields untouched, an empty patch is a no-op, and a missing id is a
//! `NotFound` error rather than a panic.

mod permissions;
mod plans;

pub use permissions::PermissionRegistry;
pub use plans::PlanCatalog;

use crate::error::{Result, TollboothError};

/// Reject names that are empty after trimming.
pub(crate) fn require_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TollboothError::validation(format!("{} must not be empty", field))
            .with_context("field", field));
    }
    Ok(())
}
