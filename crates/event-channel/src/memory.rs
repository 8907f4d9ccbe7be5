use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, watch};

use crate::{
    ChannelError, EventChannel, EventEnvelope, Message, PartitionConsumer, Result,
    partition_for_key,
};

/// Default partition count for in-memory topics.
pub const DEFAULT_PARTITIONS: u32 = 4;

struct TopicLog {
    partitions: Vec<Vec<Message>>,
    appended: watch::Sender<u64>,
}

impl TopicLog {
    fn new(partitions: u32) -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            partitions: (0..partitions).map(|_| Vec::new()).collect(),
            appended,
        }
    }
}

#[derive(Default)]
struct ChannelState {
    topics: HashMap<String, TopicLog>,
    /// Next offset to read, per (topic, group, partition).
    committed: HashMap<(String, String, i32), i64>,
    fail_on_publish: bool,
}

impl ChannelState {
    fn topic_mut(&mut self, topic: &str, partitions: u32) -> &mut TopicLog {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicLog::new(partitions))
    }
}

/// In-memory partitioned log with consumer-group offsets.
///
/// Behaves like a single-broker Kafka cluster inside the process: messages
/// are retained, each group tracks its own committed offsets, and a
/// consumer reopened without committing re-reads uncommitted messages.
#[derive(Clone)]
pub struct InMemoryEventChannel {
    state: Arc<RwLock<ChannelState>>,
    partitions: u32,
}

impl Default for InMemoryEventChannel {
    fn default() -> Self {
        Self::with_partitions(DEFAULT_PARTITIONS)
    }
}

impl InMemoryEventChannel {
    /// Creates a channel whose topics have [`DEFAULT_PARTITIONS`] partitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel whose topics have `partitions` partitions.
    pub fn with_partitions(partitions: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(ChannelState::default())),
            partitions: partitions.max(1),
        }
    }

    /// Makes subsequent publishes fail until turned off again.
    pub async fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().await.fail_on_publish = fail;
    }

    /// Returns every message on `topic`, partition by partition.
    pub async fn messages(&self, topic: &str) -> Vec<Message> {
        let state = self.state.read().await;
        state
            .topics
            .get(topic)
            .map(|log| log.partitions.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Decodes every envelope published on `topic`.
    pub async fn published(&self, topic: &str) -> Result<Vec<EventEnvelope>> {
        self.messages(topic)
            .await
            .iter()
            .map(|m| EventEnvelope::from_bytes(&m.payload))
            .collect()
    }

    /// Returns the next offset `group` will read on a partition.
    pub async fn committed_offset(&self, topic: &str, group: &str, partition: i32) -> i64 {
        let state = self.state.read().await;
        state
            .committed
            .get(&(topic.to_string(), group.to_string(), partition))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventChannel for InMemoryEventChannel {
    async fn publish(&self, topic: &str, key: &str, envelope: &EventEnvelope) -> Result<()> {
        let payload = envelope.to_bytes()?;
        let partition = partition_for_key(key, self.partitions) as i32;

        let mut state = self.state.write().await;
        if state.fail_on_publish {
            return Err(ChannelError::Broker("publish rejected".to_string()));
        }

        let log = state.topic_mut(topic, self.partitions);
        let messages = &mut log.partitions[partition as usize];
        messages.push(Message {
            topic: topic.to_string(),
            partition,
            offset: messages.len() as i64,
            key: Some(key.to_string()),
            payload,
        });
        log.appended.send_modify(|count| *count += 1);

        metrics::counter!("event_channel_published_total", "topic" => topic.to_string())
            .increment(1);
        tracing::debug!(%topic, %key, partition, event_id = %envelope.event_id, "event appended");

        Ok(())
    }

    async fn consumers(&self, topic: &str, group: &str) -> Result<Vec<Box<dyn PartitionConsumer>>> {
        let mut state = self.state.write().await;
        let changes = state.topic_mut(topic, self.partitions).appended.subscribe();

        let consumers = (0..self.partitions as i32)
            .map(|partition| {
                let position = state
                    .committed
                    .get(&(topic.to_string(), group.to_string(), partition))
                    .copied()
                    .unwrap_or(0);

                Box::new(InMemoryPartitionConsumer {
                    state: Arc::clone(&self.state),
                    topic: topic.to_string(),
                    group: group.to_string(),
                    partition,
                    position,
                    changes: changes.clone(),
                }) as Box<dyn PartitionConsumer>
            })
            .collect();

        Ok(consumers)
    }
}

/// Reads a single partition of an in-memory topic for one consumer group.
struct InMemoryPartitionConsumer {
    state: Arc<RwLock<ChannelState>>,
    topic: String,
    group: String,
    partition: i32,
    position: i64,
    changes: watch::Receiver<u64>,
}

#[async_trait]
impl PartitionConsumer for InMemoryPartitionConsumer {
    async fn recv(&mut self) -> Result<Message> {
        loop {
            // Mark the current append count as seen before looking, so an
            // append racing with the lookup still wakes us.
            self.changes.borrow_and_update();

            {
                let state = self.state.read().await;
                let next = state
                    .topics
                    .get(&self.topic)
                    .and_then(|log| log.partitions.get(self.partition as usize))
                    .and_then(|messages| messages.get(self.position as usize));

                if let Some(message) = next {
                    self.position += 1;
                    return Ok(message.clone());
                }
            }

            self.changes
                .changed()
                .await
                .map_err(|_| ChannelError::Closed)?;
        }
    }

    async fn commit(&mut self, message: &Message) -> Result<()> {
        let mut state = self.state.write().await;
        let key = (self.topic.clone(), self.group.clone(), self.partition);
        let next = message.offset + 1;
        let committed = state.committed.entry(key).or_insert(0);
        *committed = (*committed).max(next);
        Ok(())
    }
}
