//! Stages of a single order-creation call.

use serde::{Deserialize, Serialize};

/// Where an order-creation call is, or where it ended.
///
/// ```text
/// Validating ──► Enriching ──► Persisting ──┬──► Published
///                                            ├──► PublishDegraded
///                                            └──► PersistFailed
/// ```
///
/// Failures while validating or enriching end the call with an error and
/// leave nothing behind; they have no terminal stage of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStage {
    #[default]
    Validating,
    Enriching,
    Persisting,
    /// Order stored and its event acknowledged by the channel (terminal).
    Published,
    /// Order stored but its event was not delivered (terminal, still a success).
    PublishDegraded,
    /// Order could not be stored (terminal).
    PersistFailed,
}

impl OrderStage {
    /// Returns true if `next` directly follows this stage.
    pub fn can_transition_to(&self, next: OrderStage) -> bool {
        use OrderStage::*;
        matches!(
            (self, next),
            (Validating, Enriching)
                | (Enriching, Persisting)
                | (Persisting, Published | PublishDegraded | PersistFailed)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStage::Published | OrderStage::PublishDegraded | OrderStage::PersistFailed
        )
    }

    /// Returns true if the call ended with an order in the store.
    pub fn order_exists(&self) -> bool {
        matches!(self, OrderStage::Published | OrderStage::PublishDegraded)
    }

    /// Returns the stage name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStage::Validating => "Validating",
            OrderStage::Enriching => "Enriching",
            OrderStage::Persisting => "Persisting",
            OrderStage::Published => "Published",
            OrderStage::PublishDegraded => "PublishDegraded",
            OrderStage::PersistFailed => "PersistFailed",
        }
    }
}

impl std::fmt::Display for OrderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stage_is_validating() {
        assert_eq!(OrderStage::default(), OrderStage::Validating);
    }

    #[test]
    fn test_forward_transitions_only() {
        assert!(OrderStage::Validating.can_transition_to(OrderStage::Enriching));
        assert!(OrderStage::Enriching.can_transition_to(OrderStage::Persisting));
        assert!(OrderStage::Persisting.can_transition_to(OrderStage::PublishDegraded));
        assert!(!OrderStage::Validating.can_transition_to(OrderStage::Persisting));
        assert!(!OrderStage::Published.can_transition_to(OrderStage::Persisting));
        assert!(!OrderStage::Enriching.can_transition_to(OrderStage::Published));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStage::Validating.is_terminal());
        assert!(!OrderStage::Enriching.is_terminal());
        assert!(!OrderStage::Persisting.is_terminal());
        assert!(OrderStage::Published.is_terminal());
        assert!(OrderStage::PublishDegraded.is_terminal());
        assert!(OrderStage::PersistFailed.is_terminal());
    }

    #[test]
    fn test_degraded_publish_still_has_order() {
        assert!(OrderStage::PublishDegraded.order_exists());
        assert!(!OrderStage::PersistFailed.order_exists());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&OrderStage::PublishDegraded).unwrap();
        assert_eq!(json, "\"PublishDegraded\"");
        let back: OrderStage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStage::PublishDegraded);
    }
}
