use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tally_common::{internal, outgoing};
use tokio::sync::{Notify, mpsc};

use crate::{
    BrokerError, ConsumerClient, DeliveryEvents, DeliveryOutcome, DeliveryReport, OffsetReset,
    ProducerClient, Record, Result,
};

pub(crate) const fn default_queue_capacity() -> usize {
    100_000
}

/// Append-only log for one topic. Memory topics have a single partition.
#[derive(Debug, Default)]
struct TopicLog {
    records: RwLock<Vec<Arc<[u8]>>>,
    appended: Notify,
}

impl TopicLog {
    fn len(&self) -> usize {
        self.records.read().len()
    }

    fn append(&self, payload: Vec<u8>) -> i64 {
        let offset = {
            let mut records = self.records.write();
            records.push(Arc::from(payload));
            records.len() - 1
        };
        self.appended.notify_waiters();
        i64::try_from(offset).unwrap_or(i64::MAX)
    }
}

#[derive(Debug)]
struct Inner {
    topics: DashMap<String, Arc<TopicLog>>,
    /// Next offset to hand out, per `(group, topic)`.
    offsets: DashMap<(String, String), usize>,
    unavailable: AtomicBool,
    read_faults: Mutex<VecDeque<String>>,
    queue_capacity: usize,
}

/// In-process broker: topics, consumer groups and delivery reports without
/// any network.
///
/// Cloning is cheap and every clone refers to the same broker, so a
/// producer and a consumer created from clones of one `MemoryBroker` see
/// the same topics. Separate processes cannot share it.
///
/// # Consumer groups
/// The broker keeps the next offset for each `(group, topic)` pair. The
/// first subscription of a group starts at the beginning or the end of the
/// log according to its [`OffsetReset`]; later subscriptions resume where
/// the group left off. Offsets advance as records are returned.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_queue_capacity(default_queue_capacity())
    }

    /// A broker whose producers accept at most `queue_capacity` undelivered
    /// sends at a time.
    #[must_use]
    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: DashMap::new(),
                offsets: DashMap::new(),
                unavailable: AtomicBool::new(false),
                read_faults: Mutex::new(VecDeque::new()),
                queue_capacity: queue_capacity.max(1),
            }),
        }
    }

    /// Create a producer client for this broker.
    ///
    /// Must be called from within a Tokio runtime: the producer's delivery
    /// task is spawned here.
    #[must_use]
    pub fn producer(&self) -> MemoryProducer {
        MemoryProducer::new(self.clone())
    }

    #[must_use]
    pub fn consumer(&self, group: impl Into<String>, reset: OffsetReset) -> MemoryConsumer {
        MemoryConsumer {
            broker: self.clone(),
            group: group.into(),
            reset,
            topic: None,
        }
    }

    /// Make every subsequent delivery fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Queue a transport fault; the next read by any consumer returns it.
    pub fn inject_read_error(&self, detail: impl Into<String>) {
        self.inner.read_faults.lock().push_back(detail.into());
    }

    /// Number of records appended to `topic` so far.
    #[must_use]
    pub fn topic_len(&self, topic: &str) -> usize {
        self.inner.topics.get(topic).map_or(0, |log| log.len())
    }

    /// Append a raw payload directly, bypassing any producer.
    ///
    /// Returns the offset it was written at.
    pub fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> i64 {
        self.topic(topic).append(payload.into())
    }

    fn topic(&self, topic: &str) -> Arc<TopicLog> {
        self.inner
            .topics
            .entry(topic.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn deliver(&self, topic: String, payload: Vec<u8>) -> DeliveryReport {
        let outcome = if self.inner.unavailable.load(Ordering::SeqCst) {
            DeliveryOutcome::Failed {
                detail: format!("broker unavailable for topic {topic}"),
            }
        } else {
            let offset = self.topic(&topic).append(payload);
            DeliveryOutcome::Delivered {
                partition: 0,
                offset,
            }
        };

        DeliveryReport { topic, outcome }
    }

    fn register(&self, group: &str, topic: &str, reset: OffsetReset) {
        let log = self.topic(topic);
        self.inner
            .offsets
            .entry((group.to_string(), topic.to_string()))
            .or_insert_with(|| match reset {
                OffsetReset::Earliest => 0,
                OffsetReset::Latest => log.len(),
            });
    }

    /// Take the group's next record, if one is available, and advance the
    /// group's offset past it.
    fn claim(&self, group: &str, topic: &str, log: &TopicLog) -> Option<Record> {
        let mut next = self
            .inner
            .offsets
            .entry((group.to_string(), topic.to_string()))
            .or_insert(0);

        let payload = log.records.read().get(*next).cloned()?;
        let offset = *next;
        *next += 1;

        Some(Record {
            topic: topic.to_string(),
            partition: 0,
            offset: i64::try_from(offset).unwrap_or(i64::MAX),
            payload: payload.to_vec(),
        })
    }

    fn take_read_fault(&self) -> Option<String> {
        self.inner.read_faults.lock().pop_front()
    }
}

/// Count of sends queued but not yet reported.
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    drained: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    fn pending(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait_drained(&self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();

            if self.pending() == 0 {
                return;
            }

            drained.await;
        }
    }
}

#[derive(Debug)]
struct Submission {
    topic: String,
    payload: Vec<u8>,
}

/// Producer client for a [`MemoryBroker`].
///
/// Sends are queued on a bounded channel and applied to the broker by a
/// background task, which emits one [`DeliveryReport`] per send.
#[derive(Debug)]
pub struct MemoryProducer {
    queue: Mutex<Option<mpsc::Sender<Submission>>>,
    events: Mutex<Option<DeliveryEvents>>,
    in_flight: Arc<InFlight>,
}

impl MemoryProducer {
    fn new(broker: MemoryBroker) -> Self {
        let (queue, mut submissions) = mpsc::channel::<Submission>(broker.inner.queue_capacity);
        let (reports, events) = mpsc::unbounded_channel();
        let in_flight = Arc::new(InFlight::default());

        let tracker = in_flight.clone();
        tokio::spawn(async move {
            while let Some(Submission { topic, payload }) = submissions.recv().await {
                let report = broker.deliver(topic, payload);
                // The receiver may already be gone.
                let _ = reports.send(report);
                tracker.done();
            }

            internal!("Memory producer delivery task finished");
        });

        Self {
            queue: Mutex::new(Some(queue)),
            events: Mutex::new(Some(events)),
            in_flight,
        }
    }

    /// Sends queued but not yet reported.
    pub fn in_flight(&self) -> usize {
        self.in_flight.pending()
    }
}

#[async_trait]
impl ProducerClient for MemoryProducer {
    fn produce(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let queue = self.queue.lock();
        let Some(queue) = queue.as_ref() else {
            return Err(BrokerError::Closed);
        };

        self.in_flight.begin();
        queue
            .try_send(Submission {
                topic: topic.to_string(),
                payload,
            })
            .map_err(|err| {
                self.in_flight.done();
                match err {
                    mpsc::error::TrySendError::Full(_) => BrokerError::QueueFull,
                    mpsc::error::TrySendError::Closed(_) => BrokerError::Closed,
                }
            })?;

        outgoing!("Queued message for {topic}");
        Ok(())
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        if tokio::time::timeout(timeout, self.in_flight.wait_drained())
            .await
            .is_err()
        {
            return Err(BrokerError::FlushTimeout {
                pending: self.in_flight.pending(),
            });
        }

        Ok(())
    }

    fn take_events(&self) -> Option<DeliveryEvents> {
        self.events.lock().take()
    }

    fn close(&self) {
        if self.queue.lock().take().is_some() {
            internal!("Memory producer closed");
        }
    }
}

/// Consumer client for a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemoryConsumer {
    broker: MemoryBroker,
    group: String,
    reset: OffsetReset,
    topic: Option<String>,
}

#[async_trait]
impl ConsumerClient for MemoryConsumer {
    fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.broker.register(&self.group, topic, self.reset);
        self.topic = Some(topic.to_string());

        internal!(
            level = DEBUG,
            "Consumer group {} subscribed to {topic} ({})",
            self.group,
            self.reset.as_str()
        );
        Ok(())
    }

    async fn read_message(&mut self, timeout: Duration) -> Result<Record> {
        let Some(topic) = self.topic.as_deref() else {
            return Err(BrokerError::NotSubscribed);
        };

        if let Some(detail) = self.broker.take_read_fault() {
            tracing::debug!(group = %self.group, topic, "Injected read fault: {detail}");
            return Err(BrokerError::Transport(detail));
        }

        let log = self.broker.topic(topic);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let appended = log.appended.notified();
            tokio::pin!(appended);
            appended.as_mut().enable();

            if let Some(record) = self.broker.claim(&self.group, topic, &log) {
                return Ok(record);
            }

            if tokio::time::timeout_at(deadline, appended).await.is_err() {
                return Err(BrokerError::Timeout);
            }
        }
    }
}
