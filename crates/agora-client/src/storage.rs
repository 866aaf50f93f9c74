//! Object storage boundary
//!
//! Uploads files (gallery photos, event banners) to the external storage
//! service and returns their public URL. A missing bucket is self-healed
//! once: create the bucket, retry the upload exactly once, then surface
//! the failure.

use crate::data::ServiceConfig;
use crate::error::{ClientError, Result};
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::{info, warn};

/// Client for the object storage service.
pub struct ObjectStore {
    config: ServiceConfig,
    client: Client,
}

impl ObjectStore {
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

    /// Upload a file, creating the bucket once if it is missing.
    pub async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Result<String> {
        match self.try_upload(bucket, name, data.clone(), mime_type).await {
            Ok(url) => Ok(url),
            Err(ClientError::BucketNotFound(_)) => {
                warn!(bucket = %bucket, "Bucket missing, creating and retrying once");
                self.create_bucket(bucket).await?;
                self.try_upload(bucket, name, data, mime_type).await
            }
            Err(e) => Err(e),
        }
    }

    async fn try_upload(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url,
            urlencoding::encode(bucket),
            urlencoding::encode(name)
        );

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, mime_type)
            .body(data)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            if body.contains("Bucket not found") {
                return Err(ClientError::BucketNotFound(bucket.to_string()));
            }
            return Err(ClientError::NotFound(body));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status,
                message: body,
            });
        }

        let public_url = format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.base_url,
            urlencoding::encode(bucket),
            urlencoding::encode(name)
        );
        info!(bucket = %bucket, name = %name, "Uploaded object");
        Ok(public_url)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let url = format!("{}/storage/v1/bucket", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&serde_json::json!({"name": bucket, "public": true}))
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
        info!(bucket = %bucket, "Bucket created");
        Ok(())
    }
}
