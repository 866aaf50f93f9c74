//! HTTP implementation of the data service boundary
//!
//! Talks to the hosted backend's REST surface: one path per collection,
//! field filters as query-string `field=eq.value` pairs, representation
//! returned on insert, and exact counts read from the `Content-Range`
//! response header.

use crate::data::{DataService, SelectFilter, ServiceConfig, SortOrder};
use crate::error::{ClientError, Result};
use agora_model::{Collection, RecordId};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

/// HTTP client for the hosted data service.
pub struct HttpDataService {
    config: ServiceConfig,
    client: Client,
}

impl HttpDataService {
    /// Create a new data service client.
    pub fn new(config: ServiceConfig) -> Self {
        let mut headers = header::HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                    .expect("Invalid API key"),
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self { config, client }
    }

    fn collection_url(&self, collection: Collection, filter: &SelectFilter) -> String {
        let mut url = format!("{}/rest/v1/{}", self.config.base_url, collection.as_str());

        let mut params = Vec::new();
        for (field, value) in &filter.eq {
            params.push(format!(
                "{}=eq.{}",
                urlencoding::encode(field),
                urlencoding::encode(value)
            ));
        }
        if let Some((ref field, order)) = filter.order_by {
            let dir = match order {
                SortOrder::Ascending => "asc",
                SortOrder::Descending => "desc",
            };
            params.push(format!("order={}.{}", urlencoding::encode(field), dir));
        }
        if let Some(limit) = filter.limit {
            params.push(format!("limit={limit}"));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        url
    }

    fn row_url(&self, collection: Collection, id: &RecordId) -> String {
        format!(
            "{}/rest/v1/{}?id=eq.{}",
            self.config.base_url,
            collection.as_str(),
            urlencoding::encode(&id.to_string())
        )
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound("Resource not found".to_string()));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status,
                message: body,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<()> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound("Resource not found".to_string()));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status,
                message: body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn select(
        &self,
        collection: Collection,
        filter: &SelectFilter,
    ) -> Result<Vec<serde_json::Value>> {
        let url = self.collection_url(collection, filter);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    async fn insert(
        &self,
        collection: Collection,
        record: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/rest/v1/{}", self.config.base_url, collection.as_str());

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;

        // The service answers inserts with a one-row array.
        let mut rows: Vec<serde_json::Value> = self.handle_response(response).await?;
        rows.pop()
            .ok_or_else(|| ClientError::InvalidResponse("Insert returned no row".to_string()))
    }

    async fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        partial: serde_json::Value,
    ) -> Result<()> {
        let url = self.row_url(collection, id);

        let response = self
            .client
            .patch(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&partial)
            .send()
            .await?;

        self.check_status(response).await
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<()> {
        let url = self.row_url(collection, id);
        let response = self.client.delete(&url).send().await?;
        self.check_status(response).await
    }

    async fn count(&self, collection: Collection, filter: &SelectFilter) -> Result<u64> {
        let url = self.collection_url(collection, filter);

        let response = self
            .client
            .get(&url)
            .header("Prefer", "count=exact")
            .header(header::RANGE, "0-0")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status,
                message: body,
            });
        }

        // Content-Range is "<from>-<to>/<total>" or "*/<total>".
        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                ClientError::InvalidResponse("Missing Content-Range on count".to_string())
            })?;

        parse_content_range_total(range)
            .ok_or_else(|| ClientError::InvalidResponse(format!("Bad Content-Range: {range}")))
    }
}

fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit('/').next()?.trim().parse().ok()
}
