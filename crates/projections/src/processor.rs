//! Feeds channel messages to projections.

use std::sync::Arc;

use async_trait::async_trait;
use event_channel::{ChannelError, EventEnvelope, Message, MessageHandler};

use crate::Result;
use crate::projection::Projection;

/// Decodes event envelopes off the channel and delivers each to every
/// registered projection.
///
/// Plugs into `event_channel::subscribe` as a [`MessageHandler`]. A payload
/// that cannot be decoded, or a projection that fails, surfaces as a handler
/// error; the subscription logs it and moves on.
#[derive(Clone, Default)]
pub struct ProjectionProcessor {
    projections: Vec<Arc<dyn Projection>>,
}

impl ProjectionProcessor {
    /// Creates a processor with no projections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Arc<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Delivers a single event to all registered projections.
    #[tracing::instrument(skip(self, envelope), fields(event_type = envelope.event.event_type(), event_id = %envelope.event_id))]
    pub async fn process_event(&self, envelope: &EventEnvelope) -> Result<()> {
        for projection in &self.projections {
            projection.handle(envelope).await?;
        }
        metrics::counter!("projections_events_processed", "event_type" => envelope.event.event_type())
            .increment(1);
        Ok(())
    }

    /// Resets all projections and replays `envelopes` into them in order.
    #[tracing::instrument(skip(self, envelopes), fields(count = envelopes.len()))]
    pub async fn rebuild_all(&self, envelopes: &[EventEnvelope]) -> Result<()> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        for envelope in envelopes {
            self.process_event(envelope).await?;
        }
        tracing::info!("projections rebuilt");
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for ProjectionProcessor {
    async fn handle(&self, message: &Message) -> event_channel::Result<()> {
        let envelope = EventEnvelope::from_bytes(&message.payload)?;
        self.process_event(&envelope)
            .await
            .map_err(|e| ChannelError::Handler(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use crate::ProjectionError;
    use common::AccountId;
    use domain::{Account, Money, Order, OrderedLine};
    use event_channel::DomainEvent;
    use tokio::sync::RwLock;

    /// Counts every event it sees; optionally fails.
    #[derive(Default)]
    struct CountingProjection {
        position: RwLock<ProjectionPosition>,
        fail: bool,
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<()> {
            if self.fail {
                return Err(ProjectionError::Projection("broken".to_string()));
            }
            let mut pos = self.position.write().await;
            *pos = pos.applied();
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    fn order_event() -> EventEnvelope {
        let order = Order::new(
            AccountId::new("acc-1"),
            vec![OrderedLine::new("prod-1", 1, Money::from_cents(100))],
        )
        .unwrap();
        EventEnvelope::new(DomainEvent::order_created(&order))
    }

    fn message_for(envelope: &EventEnvelope) -> Message {
        Message {
            topic: envelope.event.topic().to_string(),
            partition: 0,
            offset: 0,
            key: Some(envelope.event.partition_key().to_string()),
            payload: envelope.to_bytes().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_message_reaches_every_projection() {
        let first = Arc::new(CountingProjection::default());
        let second = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new();
        processor.register(first.clone());
        processor.register(second.clone());
        assert_eq!(processor.projection_count(), 2);

        processor.handle(&message_for(&order_event())).await.unwrap();

        assert_eq!(first.position().await.events_applied, 1);
        assert_eq!(second.position().await.events_applied, 1);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_handler_error() {
        let processor = ProjectionProcessor::new();
        let mut message = message_for(&order_event());
        message.payload = b"not json".to_vec();

        let result = processor.handle(&message).await;
        assert!(matches!(result, Err(ChannelError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_projection_failure_is_reported() {
        let mut processor = ProjectionProcessor::new();
        processor.register(Arc::new(CountingProjection {
            fail: true,
            ..Default::default()
        }));

        let result = processor.handle(&message_for(&order_event())).await;
        assert!(matches!(result, Err(ChannelError::Handler(_))));
    }

    #[tokio::test]
    async fn test_rebuild_resets_then_replays() {
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new();
        processor.register(projection.clone());

        let account = Account::new("acc-1", "Ada");
        let events = vec![
            EventEnvelope::new(DomainEvent::account_created(&account)),
            order_event(),
        ];
        processor.process_event(&events[0]).await.unwrap();

        processor.rebuild_all(&events).await.unwrap();
        assert_eq!(projection.position().await.events_applied, 2);
    }
}
