//! Admin-curated content collections
//!
//! Simple ordered lists behind the marketing pages. Each carries either an
//! explicit `position` ordering field or, for the photo gallery, the layout
//! bucket label maintained by the rebalancer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

/// A photo in the landing-page gallery. `bucket` is the layout column the
/// rebalancer assigned; the rebalancer is the only writer of that field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoItem {
    pub id: i64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessStory {
    pub id: i64,
    pub name: String,
    pub story: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

/// A campus chapter of the organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatWeDoCard {
    pub id: i64,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// An admin-built registration form. `fields` is the form definition,
/// opaque structured data rendered by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub fields: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hackathon_id: Option<i64>,
    #[serde(default = "default_true")]
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

/// The single mission-letter document shown on the landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionLetter {
    pub id: i64,
    pub heading: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}
