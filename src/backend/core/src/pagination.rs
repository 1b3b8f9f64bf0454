//! Offset/limit list parameters.

use serde::Deserialize;

/// Default number of items returned by list endpoints.
pub const DEFAULT_LIMIT: u64 = 100;

/// Maximum allowed page size.
pub const MAX_LIMIT: u64 = 1000;

/// `?skip=&limit=` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl ListQuery {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self { skip, limit }
    }

    /// Limit clamped to [`MAX_LIMIT`].
    pub fn effective_limit(&self) -> u64 {
        self.limit.min(MAX_LIMIT)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(0, DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_missing_fields() {
        let query: ListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query, ListQuery::default());

        let query: ListQuery = serde_json::from_str(r#"{"skip":5}"#).unwrap();
        assert_eq!(query.skip, 5);
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_limit_is_capped() {
        assert_eq!(ListQuery::new(0, 50_000).effective_limit(), MAX_LIMIT);
        assert_eq!(ListQuery::new(0, 0).effective_limit(), 0);
    }
}
