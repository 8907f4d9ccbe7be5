//! Asynchronous, at-least-once event propagation between services.
//!
//! Events are appended to named topics, split into partitions by key, so
//! every event for one key is seen in append order by a single consumer of
//! that partition. Nothing is ordered across partitions or topics.

pub mod channel;
pub mod error;
pub mod event;
pub mod kafka;
pub mod memory;
pub mod partition;
pub mod subscriber;

pub use channel::{EventChannel, Message, PartitionConsumer};
pub use error::{ChannelError, Result};
pub use event::{
    ACCOUNT_EVENTS_TOPIC, AccountCreated, DomainEvent, EventEnvelope, EventId, ORDER_EVENTS_TOPIC,
    OrderCreated,
};
pub use kafka::{KafkaConfig, KafkaEventChannel};
pub use memory::InMemoryEventChannel;
pub use partition::partition_for_key;
pub use subscriber::{MessageHandler, subscribe};
