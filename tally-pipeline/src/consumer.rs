use std::{
    fmt::{self, Display},
    sync::Arc,
    time::Duration,
};

use tally_broker::{BrokerError, ConsumerClient, Record};
use tally_common::{Codec, Signal, incoming, internal};
use tally_store::{Store, StoreHandle, StoreQuery};
use tally_tracing::traced;
use tokio::{
    sync::{broadcast, mpsc},
    time::Instant,
};

use crate::{ConsumerConfig, PipelineError, signal::shutdown_requested};

const QUERY_CAPACITY: usize = 16;

/// What the loop does with the result of one read.
#[derive(Debug)]
pub enum Step {
    /// A record arrived: decode and store it
    Persist(Record),
    /// Nothing arrived within the read timeout: report on the store
    Report,
    /// The read failed: log and carry on
    Fault(BrokerError),
}

impl From<Result<Record, BrokerError>> for Step {
    fn from(read: Result<Record, BrokerError>) -> Self {
        match read {
            Ok(record) => Self::Persist(record),
            Err(err) if err.is_timeout() => Self::Report,
            Err(err) => Self::Fault(err),
        }
    }
}

/// Running totals for a [`ConsumerLoop`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: usize,
    pub stored: usize,
    pub decode_failures: usize,
    pub store_failures: usize,
    pub transport_errors: usize,
    pub reports: usize,
}

impl Display for ConsumerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} received, {} stored, {} undecodable, {} unstored, {} transport error(s), {} report(s)",
            self.received,
            self.stored,
            self.decode_failures,
            self.store_failures,
            self.transport_errors,
            self.reports
        )
    }
}

/// Reads from a topic forever, storing every decodable message.
///
/// A read that times out triggers [`Store::report`]. Malformed payloads and
/// transport errors are logged and skipped; nothing here stops the loop
/// except a shutdown signal. The loop owns its store and hands it back when
/// it stops.
#[derive(Debug)]
pub struct ConsumerLoop<S: Store> {
    client: Box<dyn ConsumerClient>,
    store: S,
    codec: Arc<dyn Codec>,
    topic: String,
    group: String,
    read_timeout: Duration,
    /// When the current read gives up; cleared once a read completes
    read_deadline: Option<Instant>,
    /// Partition and offset of the last stored record
    last_stored: Option<(i32, i64)>,
    queries: mpsc::Receiver<StoreQuery>,
    stats: ConsumerStats,
}

impl<S: Store> ConsumerLoop<S> {
    /// Subscribe `client` to the configured topic.
    ///
    /// The returned [`StoreHandle`] answers queries against the store while
    /// the loop runs.
    ///
    /// # Errors
    /// If the subscription fails
    pub fn new(
        mut client: Box<dyn ConsumerClient>,
        store: S,
        codec: Arc<dyn Codec>,
        config: &ConsumerConfig,
    ) -> Result<(Self, StoreHandle), PipelineError> {
        client.subscribe(&config.topic)?;
        internal!(
            level = INFO,
            "Subscribed to {} as group {}",
            config.topic,
            config.group_id
        );

        let (handle, queries) = StoreHandle::channel(QUERY_CAPACITY);

        Ok((
            Self {
                client,
                store,
                codec,
                topic: config.topic.clone(),
                group: config.group_id.clone(),
                read_timeout: config.read_timeout(),
                read_deadline: None,
                last_stored: None,
                queries,
                stats: ConsumerStats::default(),
            },
            handle,
        ))
    }

    pub const fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Run until a shutdown is signalled, then return the store.
    ///
    /// A pending shutdown is honoured before the next read starts, and a
    /// read in progress is abandoned when one arrives. Answering a store
    /// query interrupts a read but does not extend its deadline, so an idle
    /// topic still reports once per read timeout.
    #[traced(instrument(level = tracing::Level::TRACE, skip_all), timing(precision = "s"))]
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<Signal>) -> S {
        internal!(level = INFO, "Consuming from {}", self.topic);

        loop {
            let deadline = *self
                .read_deadline
                .get_or_insert_with(|| Instant::now() + self.read_timeout);
            let remaining = deadline.saturating_duration_since(Instant::now());

            let step = tokio::select! {
                biased;

                () = shutdown_requested(&mut shutdown) => break,
                Some(query) = self.queries.recv() => {
                    query.answer(&self.store);
                    continue;
                }
                read = self.client.read_message(remaining) => {
                    self.read_deadline = None;
                    Step::from(read)
                }
            };

            self.handle(step).await;
        }

        internal!(level = INFO, "Consumer stopped: {}", self.stats);
        self.store
    }

    async fn handle(&mut self, step: Step) {
        match step {
            Step::Persist(record) => self.persist(record).await,
            Step::Report => {
                self.stats.reports += 1;
                if let Err(err) = self.store.report() {
                    tracing::error!("Error producing report: {err}");
                }
            }
            Step::Fault(err) => {
                self.stats.transport_errors += 1;
                tracing::error!(topic = %self.topic, "Consumer error ({}): {err}", self.fault_context());
            }
        }
    }

    async fn persist(&mut self, record: Record) {
        self.stats.received += 1;

        let message = match self.codec.decode(&record.payload) {
            Ok(message) => message,
            Err(err) => {
                self.stats.decode_failures += 1;
                incoming!(level = WARN, "Skipping message on {record}: {err}");
                return;
            }
        };

        incoming!(level = DEBUG, "Message on {record}: {message:?}");

        if let Err(err) = self.store.add(message).await {
            self.stats.store_failures += 1;
            tracing::error!("Error storing message from {record}: {err}");
            return;
        }

        self.last_stored = Some((record.partition, record.offset));
        self.stats.stored += 1;
    }

    fn fault_context(&self) -> String {
        match self.last_stored {
            Some((partition, offset)) => format!(
                "group {}, last stored {}[{partition}]@{offset}",
                self.group, self.topic
            ),
            None => format!("group {}, nothing stored yet", self.group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_from_read() {
        let record = Record {
            topic: "t".to_string(),
            partition: 0,
            offset: 3,
            payload: Vec::new(),
        };

        assert!(matches!(Step::from(Ok(record)), Step::Persist(r) if r.offset == 3));
        assert!(matches!(Step::from(Err(BrokerError::Timeout)), Step::Report));
        assert!(matches!(
            Step::from(Err(BrokerError::Transport("reset".to_string()))),
            Step::Fault(BrokerError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn faults_carry_group_and_last_position() {
        use tally_broker::{MemoryBroker, OffsetReset};
        use tally_common::{JsonCodec, Message, Status};
        use tally_store::MemoryStore;

        let broker = MemoryBroker::new();
        for sequence in 0..2 {
            let message = Message::numbered(Status::Complete, sequence);
            broker.publish("mytopic", JsonCodec.encode(&message).expect("encode"));
        }

        let (mut consumer, _handle) = ConsumerLoop::new(
            Box::new(broker.consumer("audit", OffsetReset::Earliest)),
            MemoryStore::default(),
            Arc::new(JsonCodec),
            &ConsumerConfig::default(),
        )
        .expect("subscribe");
        assert_eq!(consumer.fault_context(), "group audit, nothing stored yet");

        for _ in 0..2 {
            let read = consumer
                .client
                .read_message(Duration::from_secs(1))
                .await;
            consumer.handle(Step::from(read)).await;
        }
        consumer
            .handle(Step::Fault(BrokerError::Transport("reset".to_string())))
            .await;

        assert_eq!(consumer.stats().stored, 2);
        assert_eq!(consumer.stats().transport_errors, 1);
        assert_eq!(
            consumer.fault_context(),
            "group audit, last stored mytopic[0]@1"
        );
    }
}
