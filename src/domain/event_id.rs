//! Type-safe event identifier.
//!
//! [`EventId`] wraps the numeric primary key of the `events` table so that
//! event identifiers cannot be confused with registration, user or rank
//! numbers. Ordering is the numeric order, which is also the ranking
//! tie-break order.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of an event owned by the events subsystem.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Wraps a raw database id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw database id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<EventId> for i64 {
    fn from(id: EventId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn orders_numerically() {
        let mut ids = vec![EventId::new(10), EventId::new(2), EventId::new(7)];
        ids.sort();
        assert_eq!(ids, vec![EventId::new(2), EventId::new(7), EventId::new(10)]);
    }

    #[test]
    fn display_is_plain_number() {
        assert_eq!(EventId::new(42).to_string(), "42");
    }

    #[test]
    fn serializes_transparently() {
        let Ok(json) = serde_json::to_string(&EventId::new(5)) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "5");
    }
}
