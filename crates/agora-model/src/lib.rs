//! Agora Model - shared record types for the community site
//!
//! Every remote collection the runtime synchronizes has a typed record here,
//! plus the collection registry itself. Records are flat serde documents:
//! a server-assigned identifier, plain attributes, and free-form nested
//! blocks (schedule, FAQ, mentors, form fields) kept as opaque
//! `serde_json::Value` — the sync layer never looks inside them.
//!
//! The cache itself stores raw JSON rows; these types are used at the
//! boundaries (mutations, settings parsing, seeding, the read API).

pub mod change;
pub mod collection;
pub mod content;
pub mod events;
pub mod id;
pub mod registration;
pub mod settings;

pub use change::ChangeEvent;
pub use collection::{Collection, UnknownCollection};
pub use content::{
    Chapter, MissionLetter, Partner, PhotoItem, RegistrationForm, SuccessStory, Tag, WhatWeDoCard,
};
pub use events::{EventMode, EventStatus, FlagshipEvent, Hackathon, OtherEvent, PastEvent, Workshop};
pub use id::RecordId;
pub use registration::{NewRegistration, Registration, RegistrationStatus};
pub use settings::{SettingRow, SettingsError, SiteSettings};
