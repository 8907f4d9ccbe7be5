use std::sync::Arc;

use async_trait::async_trait;

use crate::{EventEnvelope, Result};

/// A message read from a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub partition: i32,
    /// Position of the message within its partition.
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

/// Core trait for event channel implementations.
///
/// A channel is a set of named, partitioned append logs. Producers append
/// keyed messages; consumer groups read them back per partition.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Appends an event to `topic`, routed to a partition by `key`.
    ///
    /// Returns only once the write is acknowledged. Errors are returned to
    /// the caller, who decides whether they are fatal.
    async fn publish(&self, topic: &str, key: &str, envelope: &EventEnvelope) -> Result<()>;

    /// Opens the consumers that together cover every partition assigned to
    /// `group` on `topic`.
    ///
    /// Each consumer must be driven by a single task to keep per-partition
    /// ordering; different consumers may run concurrently.
    async fn consumers(&self, topic: &str, group: &str) -> Result<Vec<Box<dyn PartitionConsumer>>>;

    /// Publishes an event on its own topic under its own partition key.
    async fn publish_event(&self, envelope: &EventEnvelope) -> Result<()> {
        self.publish(
            envelope.event.topic(),
            envelope.event.partition_key(),
            envelope,
        )
        .await
    }
}

/// Reads messages for one slice of a consumer group's assignment.
#[async_trait]
pub trait PartitionConsumer: Send {
    /// Waits for the next message after the current read position.
    async fn recv(&mut self) -> Result<Message>;

    /// Marks `message` as consumed so the group resumes after it.
    async fn commit(&mut self, message: &Message) -> Result<()>;
}

#[async_trait]
impl<T: EventChannel + ?Sized> EventChannel for Arc<T> {
    async fn publish(&self, topic: &str, key: &str, envelope: &EventEnvelope) -> Result<()> {
        (**self).publish(topic, key, envelope).await
    }

    async fn consumers(&self, topic: &str, group: &str) -> Result<Vec<Box<dyn PartitionConsumer>>> {
        (**self).consumers(topic, group).await
    }
}
