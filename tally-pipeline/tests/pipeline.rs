//! Producer and consumer sharing one in-process broker

mod support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tally_broker::{MemoryBroker, OffsetReset};
use tally_common::{JsonCodec, Signal};
use tally_pipeline::{BurstProducer, ConsumerConfig, ConsumerLoop, ProducerConfig};
use tally_store::{MemoryStore, Store};
use tokio::sync::broadcast;

use support::wait_for_len;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn burst_is_consumed_and_reported() {
    let broker = MemoryBroker::new();
    let (signals, _) = broadcast::channel(4);

    let (consumer, handle) = ConsumerLoop::new(
        Box::new(broker.consumer("myGroup", OffsetReset::Earliest)),
        MemoryStore::default(),
        Arc::new(JsonCodec),
        &ConsumerConfig {
            read_timeout_ms: 50,
            ..ConsumerConfig::default()
        },
    )
    .expect("subscribe");
    let consuming = tokio::spawn(consumer.run(signals.subscribe()));

    let producer = BurstProducer::new(
        Arc::new(broker.producer()),
        Arc::new(JsonCodec),
        &ProducerConfig {
            burst_size: 1000,
            ..ProducerConfig::default()
        },
    );
    let summary = producer.run(signals.subscribe()).await.expect("burst");
    assert_eq!(summary.delivered, 1000);

    wait_for_len(&handle, 1000).await;
    signals.send(Signal::Shutdown).expect("signal");
    let store = consuming.await.expect("join");

    let report = store.report().expect("report").expect("above threshold");
    assert_eq!(report.count, 1000);
    assert_eq!(report.delivered_percent(), 100);
    assert!(report.is_consistent());
}
