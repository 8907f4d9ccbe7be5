//! Integration tests: events published on the channel → subscription →
//! ProjectionProcessor → both views.

use std::sync::Arc;
use std::time::Duration;

use common::AccountId;
use domain::{Account, Money, Order, OrderedLine};
use event_channel::{
    ACCOUNT_EVENTS_TOPIC, DomainEvent, EventChannel, EventEnvelope, InMemoryEventChannel,
    MessageHandler, ORDER_EVENTS_TOPIC, subscribe,
};
use projections::{AccountDirectoryView, AccountOrdersView, Projection, ProjectionProcessor};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Harness {
    channel: InMemoryEventChannel,
    orders: AccountOrdersView,
    directory: AccountDirectoryView,
    shutdown: CancellationToken,
    subscriptions: Vec<JoinHandle<event_channel::Result<()>>>,
}

impl Harness {
    fn start() -> Self {
        let channel = InMemoryEventChannel::new();
        let orders = AccountOrdersView::new();
        let directory = AccountDirectoryView::new();

        let mut processor = ProjectionProcessor::new();
        processor.register(Arc::new(orders.clone()));
        processor.register(Arc::new(directory.clone()));
        let handler: Arc<dyn MessageHandler> = Arc::new(processor);

        let shutdown = CancellationToken::new();
        let subscriptions = [ORDER_EVENTS_TOPIC, ACCOUNT_EVENTS_TOPIC]
            .into_iter()
            .map(|topic| {
                let channel = channel.clone();
                let handler = Arc::clone(&handler);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    subscribe(&channel, topic, "projections", handler, shutdown).await
                })
            })
            .collect();

        Self {
            channel,
            orders,
            directory,
            shutdown,
            subscriptions,
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        for subscription in self.subscriptions {
            subscription.await.unwrap().unwrap();
        }
    }
}

async fn wait_until_seen<P: Projection>(projection: &P, expected: u64) {
    for _ in 0..400 {
        if projection.position().await.events_seen() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("{} did not see {expected} events", projection.name());
}

fn order_for(account: &str, cents: i64) -> Order {
    Order::new(
        AccountId::new(account),
        vec![OrderedLine::new("prod-1", 1, Money::from_cents(cents))],
    )
    .unwrap()
}

#[tokio::test]
async fn test_published_events_reach_both_views() {
    let h = Harness::start();

    for account in [Account::new("acc-1", "Ada"), Account::new("acc-2", "Grace")] {
        let envelope = EventEnvelope::new(DomainEvent::account_created(&account));
        h.channel.publish_event(&envelope).await.unwrap();
    }
    for (account, cents) in [("acc-1", 1999), ("acc-1", 499), ("acc-2", 2498)] {
        let envelope = EventEnvelope::new(DomainEvent::order_created(&order_for(account, cents)));
        h.channel.publish_event(&envelope).await.unwrap();
    }

    wait_until_seen(&h.directory, 2).await;
    wait_until_seen(&h.orders, 3).await;

    let ada = h.orders.get_account(&AccountId::new("acc-1")).await.unwrap();
    assert_eq!(ada.order_count, 2);
    assert_eq!(ada.total_spent, Money::from_cents(2498));

    let grace = h.orders.get_account(&AccountId::new("acc-2")).await.unwrap();
    assert_eq!(grace.total_spent, Money::from_cents(2498));

    let names: Vec<_> = h.directory.list().await.into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["Ada", "Grace"]);

    h.stop().await;
}

#[tokio::test]
async fn test_republished_order_is_counted_once() {
    let h = Harness::start();
    let order = order_for("acc-1", 1000);

    // Same order announced twice, as a retried publish would.
    for _ in 0..2 {
        let envelope = EventEnvelope::new(DomainEvent::order_created(&order));
        h.channel.publish_event(&envelope).await.unwrap();
    }

    wait_until_seen(&h.orders, 2).await;

    let summary = h.orders.get_account(&AccountId::new("acc-1")).await.unwrap();
    assert_eq!(summary.order_count, 1);
    assert_eq!(summary.order_ids, vec![order.id]);
    assert_eq!(h.orders.position().await.duplicates_skipped, 1);

    h.stop().await;
}

#[tokio::test]
async fn test_rebuild_from_channel_history() {
    let h = Harness::start();
    for cents in [100, 200, 300] {
        let envelope = EventEnvelope::new(DomainEvent::order_created(&order_for("acc-1", cents)));
        h.channel.publish_event(&envelope).await.unwrap();
    }
    wait_until_seen(&h.orders, 3).await;

    let history = h.channel.published(ORDER_EVENTS_TOPIC).await.unwrap();
    let fresh = AccountOrdersView::new();
    let mut processor = ProjectionProcessor::new();
    processor.register(Arc::new(fresh.clone()));
    processor.rebuild_all(&history).await.unwrap();

    assert_eq!(
        fresh.get_account(&AccountId::new("acc-1")).await,
        h.orders.get_account(&AccountId::new("acc-1")).await
    );

    h.stop().await;
}
