//! Identity/session boundary
//!
//! Sign-in and sign-out against the external identity provider. The
//! runtime never sees credentials beyond this call and never mints tokens
//! itself; it only holds the opaque session token consumed by the admin
//! gate.

use crate::data::ServiceConfig;
use crate::error::{ClientError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// An authenticated admin session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    access_token: String,
    /// Seconds until the token expires
    expires_in: i64,
}

/// Client for the identity provider.
pub struct AuthClient {
    config: ServiceConfig,
    client: Client,
}

impl AuthClient {
    pub fn new(config: ServiceConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");
        Self { config, client }
    }

    /// Exchange credentials for a session token.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!(
            "{}/auth/v1/token?grant_type=password",
            self.config.base_url
        );

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&SignInRequest { email, password })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED
            || response.status() == StatusCode::BAD_REQUEST
        {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth(body));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status,
                message: body,
            });
        }

        let body: SignInResponse = response.json().await?;
        info!(email = %email, "Admin signed in");

        Ok(Session {
            access_token: body.access_token,
            expires_at: Utc::now() + ChronoDuration::seconds(body.expires_in),
        })
    }

    /// Invalidate a session token.
    pub async fn sign_out(&self, session: &Session) -> Result<()> {
        let url = format!("{}/auth/v1/logout", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", session.access_token),
            )
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
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry() {
        let live = Session {
            access_token: "t".into(),
            expires_at: Utc::now() + ChronoDuration::hours(1),
        };
        assert!(!live.is_expired());

        let dead = Session {
            access_token: "t".into(),
            expires_at: Utc::now() - ChronoDuration::seconds(1),
        };
        assert!(dead.is_expired());
    }
}
