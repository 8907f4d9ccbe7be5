use common::AccountId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Money, Order, OrderedLine};
use event_channel::{DomainEvent, EventEnvelope};
use projections::{AccountOrdersView, ProjectionProcessor};

use std::sync::Arc;

/// Builds `n` order.created envelopes spread over 50 accounts.
fn order_events(n: usize) -> Vec<EventEnvelope> {
    (0..n)
        .map(|i| {
            let order = Order::new(
                AccountId::new(format!("acc-{}", i % 50)),
                vec![OrderedLine::new("prod-1", 2, Money::from_cents(1000))],
            )
            .unwrap();
            EventEnvelope::new(DomainEvent::order_created(&order))
        })
        .collect()
}

fn bench_rebuild(c: &mut Criterion, n: usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let events = order_events(n);

    c.bench_function(&format!("projections/rebuild_{n}_orders"), |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut processor = ProjectionProcessor::new();
                processor.register(Arc::new(AccountOrdersView::new()));
                processor.rebuild_all(&events).await.unwrap();
            });
        });
    });
}

fn bench_rebuild_100(c: &mut Criterion) {
    bench_rebuild(c, 100);
}

fn bench_rebuild_1000(c: &mut Criterion) {
    bench_rebuild(c, 1000);
}

fn bench_decode_and_apply(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let payloads: Vec<Vec<u8>> = order_events(100)
        .iter()
        .map(|e| e.to_bytes().unwrap())
        .collect();

    c.bench_function("projections/decode_and_apply_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut processor = ProjectionProcessor::new();
                processor.register(Arc::new(AccountOrdersView::new()));
                for payload in &payloads {
                    let envelope = EventEnvelope::from_bytes(payload).unwrap();
                    processor.process_event(&envelope).await.unwrap();
                }
            });
        });
    });
}

criterion_group!(benches, bench_rebuild_100, bench_rebuild_1000, bench_decode_and_apply);
criterion_main!(benches);
