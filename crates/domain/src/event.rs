//! Event — one firing of a named event.
//!
//! An event is the value handed to every action of the fired chain. It
//! carries the firing timestamps of this and the previous occurrence so
//! gating actions can compare the two without a second lookup.

use serde::{Deserialize, Serialize};

use crate::id::EventId;
use crate::time::{self, Timestamp};

/// A single firing of a named event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Event name, e.g. `OnKeyDown_11` or `OnStartup`.
    pub name: String,
    /// Label of the collaborator that fired the event.
    pub source: String,
    /// Auxiliary context supplied by the firing collaborator.
    pub data: serde_json::Value,
    /// When this firing was recorded.
    pub fired_at: Timestamp,
    /// When the same event name fired before this one, if ever.
    pub previous_fired_at: Option<Timestamp>,
}

impl Event {
    /// Create an event firing stamped with the current time.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            source: source.into(),
            data,
            fired_at: time::now(),
            previous_fired_at: None,
        }
    }

    /// Attach the firing timestamps recorded by the dispatch engine.
    #[must_use]
    pub fn with_timing(mut self, fired_at: Timestamp, previous: Option<Timestamp>) -> Self {
        self.fired_at = fired_at;
        self.previous_fired_at = previous;
        self
    }
}
