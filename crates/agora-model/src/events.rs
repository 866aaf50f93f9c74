//! Event records: hackathons, workshops, past and one-off events
//!
//! All event entities share the same shape contract: server-assigned id, a
//! unique URL-safe slug used for direct lookup, display fields, enums for
//! status/mode, and arrays of nested structured blocks (schedule, FAQ,
//! mentors, rules, perks) stored as opaque JSON. Admin-curated, read-only
//! to the public.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Upcoming,
    Live,
    Completed,
}

impl Default for EventStatus {
    fn default() -> Self {
        Self::Draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventMode {
    Online,
    Offline,
    Hybrid,
}

impl Default for EventMode {
    fn default() -> Self {
        Self::Offline
    }
}

fn default_true() -> bool {
    true
}

/// A hackathon, the richest event entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hackathon {
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub mode: EventMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    // Nested structured blocks, opaque to the sync layer.
    #[serde(default)]
    pub schedule: Vec<Value>,
    #[serde(default)]
    pub faq: Vec<Value>,
    #[serde(default)]
    pub mentors: Vec<Value>,
    #[serde(default)]
    pub rules: Vec<Value>,
    #[serde(default)]
    pub perks: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A workshop. Same contract as [`Hackathon`], fewer blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workshop {
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub mode: EventMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub schedule: Vec<Value>,
    #[serde(default)]
    pub faq: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A past event shown in the archive section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastEvent {
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

/// A one-off event that is neither hackathon nor workshop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherEvent {
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub mode: EventMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub details: Vec<Value>,
}

/// Entry on the flagship-events strip of the landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagshipEvent {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub is_featured: bool,
}
