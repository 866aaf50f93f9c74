//! Change events from the push-notification channel
//!
//! The realtime channel reports row-level changes per collection. No
//! payload diff is consumed anywhere; the event is purely an invalidation
//! signal, so only the collection name survives parsing.

use crate::collection::Collection;
use serde::{Deserialize, Serialize};

/// A single invalidation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
}

impl ChangeEvent {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let ev = ChangeEvent::new(Collection::Hackathons);
        let json = serde_json::to_string(&ev).unwrap();
        let back: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }
}
