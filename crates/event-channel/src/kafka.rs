//! Kafka-backed event channel.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message as _;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};

use crate::{EventChannel, EventEnvelope, Message, PartitionConsumer, Result};

/// Connection settings for [`KafkaEventChannel`].
#[derive(Debug, Clone, PartialEq)]
pub struct KafkaConfig {
    /// Comma-separated `host:port` list.
    pub brokers: String,
    /// How long a publish may wait for broker acknowledgement.
    pub message_timeout: Duration,
    /// Consumers opened per group; partitions are shared out among them.
    pub consumers_per_group: usize,
}

impl KafkaConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            message_timeout: Duration::from_secs(5),
            consumers_per_group: 1,
        }
    }

    /// Producer settings. Idempotence keeps per-partition order intact when
    /// the client retries a send internally.
    pub fn producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            )
            .set("acks", "all")
            .set("enable.idempotence", "true");
        config
    }

    /// Consumer settings. Offsets are committed by hand, after the handler ran.
    pub fn consumer_config(&self, group: &str) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest");
        config
    }
}

/// Event channel over a Kafka (or Redpanda) cluster.
pub struct KafkaEventChannel {
    config: KafkaConfig,
    producer: FutureProducer,
}

impl KafkaEventChannel {
    /// Creates the producer. Fails if the client cannot be configured.
    pub fn new(config: KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = config.producer_config().create()?;
        tracing::info!(brokers = %config.brokers, "kafka producer initialized");
        Ok(Self { config, producer })
    }
}

#[async_trait]
impl EventChannel for KafkaEventChannel {
    async fn publish(&self, topic: &str, key: &str, envelope: &EventEnvelope) -> Result<()> {
        let payload = envelope.to_bytes()?;
        let record = FutureRecord::to(topic).key(key).payload(&payload);

        self.producer
            .send(record, Timeout::After(self.config.message_timeout))
            .await
            .map_err(|(e, _)| {
                tracing::error!(error = %e, %topic, %key, "failed to publish to kafka");
                e
            })?;

        metrics::counter!("event_channel_published_total", "topic" => topic.to_string())
            .increment(1);
        tracing::info!(%topic, %key, event_id = %envelope.event_id, "published to kafka");
        Ok(())
    }

    async fn consumers(&self, topic: &str, group: &str) -> Result<Vec<Box<dyn PartitionConsumer>>> {
        let mut consumers: Vec<Box<dyn PartitionConsumer>> = Vec::new();
        for _ in 0..self.config.consumers_per_group.max(1) {
            let consumer: StreamConsumer = self.config.consumer_config(group).create()?;
            consumer.subscribe(&[topic])?;
            consumers.push(Box::new(KafkaPartitionConsumer { consumer }));
        }
        tracing::info!(%topic, %group, count = consumers.len(), "kafka consumers subscribed");
        Ok(consumers)
    }
}

/// One member of a Kafka consumer group.
///
/// The broker assigns it a set of partitions; a single task reading it
/// preserves order within each of them.
struct KafkaPartitionConsumer {
    consumer: StreamConsumer,
}

#[async_trait]
impl PartitionConsumer for KafkaPartitionConsumer {
    async fn recv(&mut self) -> Result<Message> {
        let borrowed = self.consumer.recv().await?;
        Ok(Message {
            topic: borrowed.topic().to_string(),
            partition: borrowed.partition(),
            offset: borrowed.offset(),
            key: borrowed
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned()),
            payload: borrowed.payload().unwrap_or_default().to_vec(),
        })
    }

    async fn commit(&mut self, message: &Message) -> Result<()> {
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )?;
        self.consumer.commit(&offsets, CommitMode::Async)?;
        Ok(())
    }
}
