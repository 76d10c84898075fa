//! Common data types for the comms telemetry components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a voice net (a named voice channel/session).
///
/// Net identifiers are issued by the voice transport, so they are opaque
/// strings rather than UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetId(String);

impl NetId {
    /// Create a net identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of an operational event a subscription heartbeat belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Create an event identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_net_id_ordering_follows_string_order() {
        let mut ids = vec![NetId::from("CHARLIE"), NetId::from("ALPHA"), NetId::from("BRAVO")];
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(NetId::as_str).collect();
        assert_eq!(ordered, vec!["ALPHA", "BRAVO", "CHARLIE"]);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let net = NetId::from("ALPHA");
        assert_eq!(serde_json::to_string(&net).unwrap(), "\"ALPHA\"");

        let event: EventId = serde_json::from_str("\"evt-42\"").unwrap();
        assert_eq!(event.as_str(), "evt-42");
        assert_eq!(event.to_string(), "evt-42");
    }
}
