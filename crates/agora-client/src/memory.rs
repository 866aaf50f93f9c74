//! In-memory implementation of the data service boundary
//!
//! Backs dev mode (no remote backend configured) and the test suites.
//! Same contract as the HTTP implementation: server-assigned integer ids,
//! filters, ordering, limits, exact counts.

use crate::data::{DataService, SelectFilter, SortOrder};
use crate::error::{ClientError, Result};
use agora_model::{Collection, RecordId};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

/// In-memory data service.
pub struct MemoryDataService {
    tables: DashMap<Collection, Vec<Value>>,
    next_id: AtomicI64,
}

impl Default for MemoryDataService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataService {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seed a collection directly, bypassing id assignment. Rows keep
    /// whatever ids they carry.
    pub fn load(&self, collection: Collection, rows: Vec<Value>) {
        self.tables.insert(collection, rows);
    }

    /// Current row count of a collection, unfiltered.
    pub fn len(&self, collection: Collection) -> usize {
        self.tables.get(&collection).map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn apply_filter(rows: &[Value], filter: &SelectFilter) -> Vec<Value> {
        let mut out: Vec<Value> = rows
            .iter()
            .filter(|row| {
                filter
                    .eq
                    .iter()
                    .all(|(field, value)| field_matches(row, field, value))
            })
            .cloned()
            .collect();

        if let Some((ref field, order)) = filter.order_by {
            out.sort_by(|a, b| {
                let ord = compare_fields(a, b, field);
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = filter.limit {
            out.truncate(limit as usize);
        }

        out
    }
}

fn field_matches(row: &Value, field: &str, value: &str) -> bool {
    match row.get(field) {
        Some(Value::String(s)) => s == value,
        Some(Value::Number(n)) => n.to_string() == value,
        Some(Value::Bool(b)) => b.to_string() == value,
        _ => false,
    }
}

fn compare_fields(a: &Value, b: &Value, field: &str) -> Ordering {
    let (a, b) = (a.get(field), b.get(field));
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DataService for MemoryDataService {
    async fn select(&self, collection: Collection, filter: &SelectFilter) -> Result<Vec<Value>> {
        let rows = self
            .tables
            .get(&collection)
            .map(|r| r.clone())
            .unwrap_or_default();
        Ok(Self::apply_filter(&rows, filter))
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<Value> {
        let mut row = record;
        let obj = row
            .as_object_mut()
            .ok_or_else(|| ClientError::InvalidResponse("Insert body must be an object".into()))?;

        // Server-assigned id and creation timestamp.
        if !obj.contains_key("id") || obj["id"].is_null() {
            let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
            obj.insert("id".to_string(), Value::from(id));
        }
        if !obj.contains_key("created_at") {
            obj.insert(
                "created_at".to_string(),
                Value::from(Utc::now().to_rfc3339()),
            );
        }

        self.tables.entry(collection).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, collection: Collection, id: &RecordId, partial: Value) -> Result<()> {
        let fields = partial
            .as_object()
            .ok_or_else(|| ClientError::InvalidResponse("Update body must be an object".into()))?
            .clone();

        let mut rows = self
            .tables
            .get_mut(&collection)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;

        let row = rows
            .iter_mut()
            .find(|r| RecordId::of_row(r).as_ref() == Some(id))
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;

        if let Some(obj) = row.as_object_mut() {
            for (k, v) in fields {
                obj.insert(k, v);
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<()> {
        let mut rows = self
            .tables
            .get_mut(&collection)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;

        let before = rows.len();
        rows.retain(|r| RecordId::of_row(r).as_ref() != Some(id));
        if rows.len() == before {
            return Err(ClientError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn count(&self, collection: Collection, filter: &SelectFilter) -> Result<u64> {
        let rows = self
            .tables
            .get(&collection)
            .map(|r| r.clone())
            .unwrap_or_default();
        // Counting ignores the row limit.
        let mut unlimited = filter.clone();
        unlimited.limit = None;
        Ok(Self::apply_filter(&rows, &unlimited).len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamp() {
        let service = MemoryDataService::new();
        let row = service
            .insert(Collection::Hackathons, json!({"slug": "h1", "title": "H1"}))
            .await
            .unwrap();
        assert!(row["id"].is_i64());
        assert!(row["created_at"].is_string());
        assert_eq!(service.len(Collection::Hackathons), 1);
    }

    #[tokio::test]
    async fn test_select_filter_order_limit() {
        let service = MemoryDataService::new();
        for (i, status) in ["pending", "approved", "pending"].iter().enumerate() {
            service
                .insert(
                    Collection::Registrations,
                    json!({"name": format!("r{i}"), "status": status, "rank": i}),
                )
                .await
                .unwrap();
        }

        let rows = service
            .select(
                Collection::Registrations,
                &SelectFilter::new().eq("status", "pending").order_desc("rank"),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "r2");

        let limited = service
            .select(Collection::Registrations, &SelectFilter::new().limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_count_ignores_limit() {
        let service = MemoryDataService::new();
        for i in 0..5 {
            service
                .insert(Collection::Tags, json!({"name": format!("t{i}")}))
                .await
                .unwrap();
        }
        let count = service
            .count(Collection::Tags, &SelectFilter::new().limit(2))
            .await
            .unwrap();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = MemoryDataService::new();
        let row = service
            .insert(Collection::Tags, json!({"name": "old"}))
            .await
            .unwrap();
        let id = RecordId::of_row(&row).unwrap();

        service
            .update(Collection::Tags, &id, json!({"name": "new"}))
            .await
            .unwrap();
        let rows = service
            .select(Collection::Tags, &SelectFilter::new())
            .await
            .unwrap();
        assert_eq!(rows[0]["name"], "new");

        service.delete(Collection::Tags, &id).await.unwrap();
        assert!(service.is_empty(Collection::Tags));
        assert!(matches!(
            service.delete(Collection::Tags, &id).await,
            Err(ClientError::NotFound(_))
        ));
    }
}
