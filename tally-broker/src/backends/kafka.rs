use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use rdkafka::{
    ClientConfig, ClientContext, Message,
    consumer::{Consumer, StreamConsumer},
    producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer},
    util::Timeout,
};
use tally_common::internal;
use tokio::sync::mpsc;

use crate::{
    BrokerError, ConsumerClient, DeliveryEvents, DeliveryOutcome, DeliveryReport, KafkaConfig,
    OffsetReset, ProducerClient, Record, Result,
};

fn client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client.set("bootstrap.servers", &config.bootstrap_servers);
    for (key, value) in &config.properties {
        client.set(key, value);
    }
    client
}

/// Forwards librdkafka delivery callbacks onto the delivery stream.
struct DeliveryForwarder {
    reports: Mutex<Option<mpsc::UnboundedSender<DeliveryReport>>>,
}

impl ClientContext for DeliveryForwarder {}

impl ProducerContext for DeliveryForwarder {
    type DeliveryOpaque = ();

    fn delivery(&self, result: &DeliveryResult<'_>, _opaque: Self::DeliveryOpaque) {
        let report = match result {
            Ok(message) => DeliveryReport {
                topic: message.topic().to_string(),
                outcome: DeliveryOutcome::Delivered {
                    partition: message.partition(),
                    offset: message.offset(),
                },
            },
            Err((error, message)) => DeliveryReport {
                topic: message.topic().to_string(),
                outcome: DeliveryOutcome::Failed {
                    detail: error.to_string(),
                },
            },
        };

        if let Some(reports) = self.reports.lock().as_ref() {
            let _ = reports.send(report);
        }
    }
}

/// Producer client backed by a librdkafka `ThreadedProducer`.
///
/// librdkafka's own polling thread drives delivery callbacks, which are
/// turned into [`DeliveryReport`]s.
pub struct KafkaProducer {
    producer: Arc<ThreadedProducer<DeliveryForwarder>>,
    events: Mutex<Option<DeliveryEvents>>,
}

impl std::fmt::Debug for KafkaProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaProducer")
            .field("in_flight", &self.producer.in_flight_count())
            .finish_non_exhaustive()
    }
}

impl KafkaProducer {
    /// # Errors
    /// If librdkafka rejects the configuration
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        internal!(
            level = INFO,
            "Creating Kafka producer for {}",
            config.bootstrap_servers
        );

        let (reports, events) = mpsc::unbounded_channel();
        let producer: ThreadedProducer<DeliveryForwarder> = client_config(config)
            .create_with_context(DeliveryForwarder {
                reports: Mutex::new(Some(reports)),
            })?;

        Ok(Self {
            producer: Arc::new(producer),
            events: Mutex::new(Some(events)),
        })
    }
}

#[async_trait]
impl ProducerClient for KafkaProducer {
    fn produce(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.producer
            .send(BaseRecord::<(), Vec<u8>>::to(topic).payload(&payload))
            .map_err(|(error, _)| BrokerError::from(error))
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        let producer = self.producer.clone();
        let flushed = tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| BrokerError::Transport(format!("flush task failed: {e}")))?;

        flushed.map_err(|error| match BrokerError::from(error) {
            BrokerError::FlushTimeout { .. } => BrokerError::FlushTimeout {
                pending: usize::try_from(self.producer.in_flight_count()).unwrap_or_default(),
            },
            other => other,
        })
    }

    fn take_events(&self) -> Option<DeliveryEvents> {
        self.events.lock().take()
    }

    fn close(&self) {
        self.producer.context().reports.lock().take();
        internal!("Kafka producer closed");
    }
}

/// Consumer client backed by a librdkafka `StreamConsumer`.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    group: String,
}

impl std::fmt::Debug for KafkaConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaConsumer")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

impl KafkaConsumer {
    /// # Errors
    /// If librdkafka rejects the configuration
    pub fn new(config: &KafkaConfig, group: &str, reset: OffsetReset) -> Result<Self> {
        internal!(
            level = INFO,
            "Creating Kafka consumer for {} (group {group})",
            config.bootstrap_servers
        );

        let consumer: StreamConsumer = client_config(config)
            .set("group.id", group)
            .set("auto.offset.reset", reset.as_str())
            .create()?;

        Ok(Self {
            consumer,
            group: group.to_string(),
        })
    }
}

#[async_trait]
impl ConsumerClient for KafkaConsumer {
    fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.consumer.subscribe(&[topic])?;
        Ok(())
    }

    async fn read_message(&mut self, timeout: Duration) -> Result<Record> {
        let message = tokio::time::timeout(timeout, self.consumer.recv())
            .await
            .map_err(|_| BrokerError::Timeout)??;

        Ok(Record {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }
}
