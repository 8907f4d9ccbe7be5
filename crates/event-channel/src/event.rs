use chrono::{DateTime, Utc};
use common::{AccountId, OrderId};
use domain::{Account, Money, Order};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Topic carrying account lifecycle events, keyed by account id.
pub const ACCOUNT_EVENTS_TOPIC: &str = "account.events";

/// Topic carrying order lifecycle events, keyed by account id.
pub const ORDER_EVENTS_TOPIC: &str = "order.events";

/// Unique identifier for a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every event type the system publishes.
///
/// The `event_type` tag is part of the wire contract; consumers decode by
/// matching on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum DomainEvent {
    /// An account was created by the account service.
    #[serde(rename = "account.created")]
    AccountCreated(AccountCreated),

    /// An order was persisted by the order service.
    #[serde(rename = "order.created")]
    OrderCreated(OrderCreated),
}

/// Data for the `account.created` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreated {
    pub account_id: AccountId,
    pub name: String,
}

/// Data for the `order.created` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub total_price: Money,
}

impl DomainEvent {
    /// Builds the `account.created` event for a new account.
    pub fn account_created(account: &Account) -> Self {
        DomainEvent::AccountCreated(AccountCreated {
            account_id: account.id.clone(),
            name: account.name.clone(),
        })
    }

    /// Builds the `order.created` event for a persisted order.
    pub fn order_created(order: &Order) -> Self {
        DomainEvent::OrderCreated(OrderCreated {
            order_id: order.id,
            account_id: order.account_id.clone(),
            total_price: order.total_price,
        })
    }

    /// Returns the wire tag of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::AccountCreated(_) => "account.created",
            DomainEvent::OrderCreated(_) => "order.created",
        }
    }

    /// Returns the id of the entity the event is about.
    pub fn entity_id(&self) -> String {
        match self {
            DomainEvent::AccountCreated(data) => data.account_id.to_string(),
            DomainEvent::OrderCreated(data) => data.order_id.to_string(),
        }
    }

    /// Returns the topic this event belongs on.
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::AccountCreated(_) => ACCOUNT_EVENTS_TOPIC,
            DomainEvent::OrderCreated(_) => ORDER_EVENTS_TOPIC,
        }
    }

    /// Returns the partition key. Both topics are keyed by account.
    pub fn partition_key(&self) -> &str {
        match self {
            DomainEvent::AccountCreated(data) => data.account_id.as_str(),
            DomainEvent::OrderCreated(data) => data.account_id.as_str(),
        }
    }
}

/// A domain event together with its delivery metadata.
///
/// On the wire the event fields sit at the top level next to `event_id`
/// and `occurred_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier, usable by consumers for deduplication.
    pub event_id: EventId,

    /// When the fact happened.
    pub occurred_at: DateTime<Utc>,

    #[serde(flatten)]
    pub event: DomainEvent,
}

impl EventEnvelope {
    /// Wraps an event, stamping a fresh id and the current time.
    pub fn new(event: DomainEvent) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_at: Utc::now(),
            event,
        }
    }

    /// Encodes the envelope as a JSON message value.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes an envelope from a JSON message value.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::OrderedLine;
    use rust_decimal_macros::dec;

    fn sample_order() -> Order {
        Order::new(
            AccountId::new("acc-1"),
            vec![
                OrderedLine::new("prod-1", 2, Money::new(dec!(9.99))),
                OrderedLine::new("prod-2", 1, Money::new(dec!(5.00))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_order_created_wire_shape() {
        let order = sample_order();
        let envelope = EventEnvelope::new(DomainEvent::order_created(&order));

        let value: serde_json::Value =
            serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();

        assert_eq!(value["event_type"], "order.created");
        assert_eq!(value["order_id"], order.id.to_string());
        assert_eq!(value["account_id"], "acc-1");
        assert_eq!(value["total_price"], "24.98");
        assert_eq!(value["event_id"], envelope.event_id.to_string());
        assert!(value["occurred_at"].is_string());
    }

    #[test]
    fn test_account_created_wire_shape() {
        let account = Account::new("acc-7", "Ada");
        let envelope = EventEnvelope::new(DomainEvent::account_created(&account));

        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["event_type"], "account.created");
        assert_eq!(value["account_id"], "acc-7");
        assert_eq!(value["name"], "Ada");
    }

    #[test]
    fn test_decode_matches_variant() {
        let order = sample_order();
        let bytes = EventEnvelope::new(DomainEvent::order_created(&order))
            .to_bytes()
            .unwrap();

        match EventEnvelope::from_bytes(&bytes).unwrap().event {
            DomainEvent::OrderCreated(data) => {
                assert_eq!(data.order_id, order.id);
                assert_eq!(data.total_price, Money::new(dec!(24.98)));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let bytes = br#"{"event_type":"order.refunded","event_id":"00000000-0000-0000-0000-000000000000","occurred_at":"2024-01-01T00:00:00Z"}"#;
        assert!(EventEnvelope::from_bytes(bytes).is_err());
    }

    #[test]
    fn test_routing_metadata() {
        let event = DomainEvent::order_created(&sample_order());
        assert_eq!(event.event_type(), "order.created");
        assert_eq!(event.topic(), ORDER_EVENTS_TOPIC);
        assert_eq!(event.partition_key(), "acc-1");

        let account = DomainEvent::account_created(&Account::new("acc-2", "Bob"));
        assert_eq!(account.topic(), ACCOUNT_EVENTS_TOPIC);
        assert_eq!(account.entity_id(), "acc-2");
    }
}
