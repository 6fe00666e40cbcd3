//! Event message types.
//!
//! Events are notifications sent from the extension to the host when the
//! user acts in the browser.
//!
//! # Event Types
//!
//! | Module | Events |
//! |--------|--------|
//! | `action` | `clicked` |
//! | `page` | `dumpRequested` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::{RequestId, TabId};

// ============================================================================
// Event
// ============================================================================

/// An event notification from the extension to the host.
///
/// # Format
///
/// ```json
/// {
///   "id": "event-uuid",
///   "type": "event",
///   "method": "module.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: RequestId,

    /// Event type marker (always "event").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Returns the module name from the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let event = Event { method: "action.clicked".into(), .. };
    /// assert_eq!(event.module(), "action");
    /// ```
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    ///
    /// Events naming no valid tab are reported as [`ParsedEvent::Unknown`].
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        let tab_id = self.tab_id();

        match (self.method.as_str(), tab_id) {
            ("action.clicked", Some(tab_id)) => ParsedEvent::ActionClicked { tab_id },
            ("page.dumpRequested", Some(tab_id)) => ParsedEvent::DumpRequested { tab_id },
            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }

    /// Gets the `tabId` param.
    #[inline]
    fn tab_id(&self) -> Option<TabId> {
        self.params
            .get("tabId")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .and_then(TabId::new)
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// The toolbar button was clicked; capture the tab.
    ActionClicked {
        /// Tab the button was clicked in.
        tab_id: TabId,
    },

    /// The user asked for a page dump of the tab.
    DumpRequested {
        /// Tab to dump.
        tab_id: TabId,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: &str, params: &str) -> Event {
        let json_str = format!(
            r#"{{
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "type": "event",
                "method": "{method}",
                "params": {params}
            }}"#
        );
        serde_json::from_str(&json_str).expect("parse event")
    }

    #[test]
    fn test_action_clicked_parsing() {
        let event = event("action.clicked", r#"{ "tabId": 7 }"#);
        assert_eq!(event.module(), "action");
        assert_eq!(event.event_name(), "clicked");

        match event.parse() {
            ParsedEvent::ActionClicked { tab_id } => assert_eq!(tab_id.as_u32(), 7),
            other => panic!("unexpected parsed event: {other:?}"),
        }
    }

    #[test]
    fn test_dump_requested_parsing() {
        let event = event("page.dumpRequested", r#"{ "tabId": 2 }"#);

        assert!(matches!(
            event.parse(),
            ParsedEvent::DumpRequested { tab_id } if tab_id.as_u32() == 2
        ));
    }

    #[test]
    fn test_missing_tab_is_unknown() {
        let zero_tab = event("action.clicked", r#"{ "tabId": 0 }"#);
        assert!(matches!(zero_tab.parse(), ParsedEvent::Unknown { .. }));

        let no_tab = event("action.clicked", "{}");
        assert!(matches!(no_tab.parse(), ParsedEvent::Unknown { .. }));
    }

    #[test]
    fn test_unknown_event() {
        let event = event("custom.unknownEvent", r#"{ "foo": "bar" }"#);

        match event.parse() {
            ParsedEvent::Unknown { method, params } => {
                assert_eq!(method, "custom.unknownEvent");
                assert_eq!(params["foo"], "bar");
            }
            other => panic!("expected Unknown variant, got {other:?}"),
        }
    }
}
