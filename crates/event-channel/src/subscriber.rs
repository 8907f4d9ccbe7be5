//! Consumer-group subscription loop.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{ChannelError, EventChannel, Message, PartitionConsumer, Result};

/// Processes messages delivered by [`subscribe`].
///
/// Delivery is at-least-once, so handlers must be idempotent.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<()>;
}

/// Consumes `topic` as `group` until `shutdown` is cancelled.
///
/// One task is spawned per consumer returned by the channel, so partitions
/// are processed concurrently while each one stays in order. A message's
/// offset is committed only after the handler returns. Handler failures
/// are logged and the message is skipped; it is not retried or
/// dead-lettered. A read or commit error stops the subscription.
#[tracing::instrument(skip(channel, handler, shutdown))]
pub async fn subscribe<C>(
    channel: &C,
    topic: &str,
    group: &str,
    handler: Arc<dyn MessageHandler>,
    shutdown: CancellationToken,
) -> Result<()>
where
    C: EventChannel + ?Sized,
{
    let consumers = channel.consumers(topic, group).await?;
    tracing::info!(consumers = consumers.len(), "subscription started");

    let mut workers = JoinSet::new();
    for consumer in consumers {
        workers.spawn(consume(consumer, Arc::clone(&handler), shutdown.clone()));
    }

    let mut outcome = Ok(());
    while let Some(joined) = workers.join_next().await {
        let result = joined.unwrap_or_else(|e| Err(ChannelError::Broker(e.to_string())));
        if let Err(e) = result {
            tracing::error!(error = %e, "subscription worker stopped");
            // One broken partition reader takes the whole subscription down.
            shutdown.cancel();
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
    }

    tracing::info!("subscription stopped");
    outcome
}

/// Drives a single consumer: read, handle, commit, repeat.
pub async fn consume(
    mut consumer: Box<dyn PartitionConsumer>,
    handler: Arc<dyn MessageHandler>,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        let message = tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            received = consumer.recv() => received?,
        };

        let topic = message.topic.clone();
        match handler.handle(&message).await {
            Ok(()) => {
                metrics::counter!("event_channel_consumed_total", "topic" => topic).increment(1);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    "error handling message, skipping"
                );
                metrics::counter!("event_channel_handler_failures_total", "topic" => topic)
                    .increment(1);
            }
        }

        consumer.commit(&message).await?;
    }
}
