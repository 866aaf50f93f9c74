//! Data service boundary
//!
//! The narrow request/response interface to the hosted relational backend:
//! per-collection select/insert/update/delete plus count. Filters are flat
//! field-equality maps with optional ordering and a row limit — everything
//! the site's queries need, nothing more.

use crate::error::Result;
use agora_model::{Collection, RecordId};
use async_trait::async_trait;
use serde_json::Value;

/// Client configuration, shared by the HTTP boundaries.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the hosted backend
    pub base_url: String,
    /// Optional API key sent as a bearer token
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Query parameters for a select or count.
#[derive(Debug, Clone, Default)]
pub struct SelectFilter {
    /// Field-equality conditions, all must match
    pub eq: Vec<(String, String)>,
    /// Optional ordering field
    pub order_by: Option<(String, SortOrder)>,
    /// Maximum rows returned
    pub limit: Option<u32>,
}

impl SelectFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field-equality condition.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.eq.push((field.into(), value.into()));
        self
    }

    pub fn order_asc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some((field.into(), SortOrder::Ascending));
        self
    }

    pub fn order_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some((field.into(), SortOrder::Descending));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.eq.is_empty() && self.order_by.is_none() && self.limit.is_none()
    }
}

/// The remote data service boundary.
///
/// One production implementation ([`crate::HttpDataService`]) and one
/// in-memory implementation ([`crate::MemoryDataService`]) for dev mode and
/// tests. All methods suspend the calling task; none block.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Fetch rows matching the filter.
    async fn select(&self, collection: Collection, filter: &SelectFilter) -> Result<Vec<Value>>;

    /// Insert a record; the service assigns the id and returns the stored row.
    async fn insert(&self, collection: Collection, record: Value) -> Result<Value>;

    /// Apply a partial update to one record.
    async fn update(&self, collection: Collection, id: &RecordId, partial: Value) -> Result<()>;

    /// Delete one record.
    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<()>;

    /// Count rows matching the filter without fetching them.
    async fn count(&self, collection: Collection, filter: &SelectFilter) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_builder() {
        let f = SelectFilter::new()
            .eq("status", "pending")
            .order_desc("created_at")
            .limit(50);
        assert_eq!(f.eq.len(), 1);
        assert_eq!(f.limit, Some(50));
        assert!(matches!(
            f.order_by,
            Some((ref field, SortOrder::Descending)) if field == "created_at"
        ));
    }

    #[test]
    fn test_empty_filter() {
        assert!(SelectFilter::new().is_empty());
        assert!(!SelectFilter::new().limit(1).is_empty());
    }
}
