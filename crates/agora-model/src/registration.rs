//! Registration records
//!
//! Created by the public registration action (the one latency-sensitive,
//! optimistically-inserted entity), mutated by admin status changes, and
//! only ever hard-deleted by an explicit admin delete.

use crate::id::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Approval state of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl Default for RegistrationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("Unknown registration status: {other}")),
        }
    }
}

/// A member/participant registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: RecordId,
    pub name: String,
    /// Role or membership category chosen on the form.
    pub category: String,
    pub email: String,
    #[serde(default)]
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    /// Hackathon this registration belongs to, when it came from an event
    /// form rather than the general membership form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hackathon_id: Option<i64>,
    /// Free-form answers keyed by form field, opaque to the sync layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_token: Option<String>,
}

/// Input for the public registration action. The server assigns the id and
/// timestamps; the default status comes from site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRegistration {
    pub name: String,
    pub category: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hackathon_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&RegistrationStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        let back: RegistrationStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(back, RegistrationStatus::Rejected);
    }

    #[test]
    fn test_registration_from_row() {
        let row = json!({
            "id": 42,
            "name": "Asha",
            "category": "student",
            "email": "asha@example.org",
            "status": "pending",
            "created_at": "2025-03-01T10:00:00Z",
            "hackathon_id": 3,
        });
        let reg: Registration = serde_json::from_value(row).unwrap();
        assert_eq!(reg.id, RecordId::Int(42));
        assert_eq!(reg.status, RegistrationStatus::Pending);
        assert_eq!(reg.hackathon_id, Some(3));
        assert!(reg.ticket_token.is_none());
    }
}
