//! Collection registry
//!
//! The fixed set of remote collections the runtime knows about. The string
//! names are the remote table names and double as cache keys and realtime
//! event identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Registrations,
    Hackathons,
    Workshops,
    PastEvents,
    OtherEvents,
    PhotoGallery,
    SuccessStories,
    Chapters,
    WhatWeDoCards,
    FlagshipEvents,
    Partners,
    Tags,
    RegistrationForms,
    SiteSettings,
    MissionLetter,
}

#[derive(Debug, Error)]
#[error("Unknown collection: {0}")]
pub struct UnknownCollection(pub String);

impl Collection {
    /// Every collection, in refresh order.
    pub const ALL: [Collection; 15] = [
        Collection::Registrations,
        Collection::Hackathons,
        Collection::Workshops,
        Collection::PastEvents,
        Collection::OtherEvents,
        Collection::PhotoGallery,
        Collection::SuccessStories,
        Collection::Chapters,
        Collection::WhatWeDoCards,
        Collection::FlagshipEvents,
        Collection::Partners,
        Collection::Tags,
        Collection::RegistrationForms,
        Collection::SiteSettings,
        Collection::MissionLetter,
    ];

    /// Remote table name for this collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Registrations => "registrations",
            Collection::Hackathons => "hackathons",
            Collection::Workshops => "workshops",
            Collection::PastEvents => "past_events",
            Collection::OtherEvents => "other_events",
            Collection::PhotoGallery => "photo_gallery",
            Collection::SuccessStories => "success_stories",
            Collection::Chapters => "chapters",
            Collection::WhatWeDoCards => "what_we_do_cards",
            Collection::FlagshipEvents => "flagship_events",
            Collection::Partners => "partners",
            Collection::Tags => "tags",
            Collection::RegistrationForms => "registration_forms",
            Collection::SiteSettings => "site_settings",
            Collection::MissionLetter => "mission_letter",
        }
    }

    /// Whether rows of this collection may ever be served to an
    /// unauthenticated client. Registrations carry personal data and the
    /// settings table is served through its typed accessor instead.
    pub fn publicly_listable(&self) -> bool {
        !matches!(self, Collection::Registrations)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}
