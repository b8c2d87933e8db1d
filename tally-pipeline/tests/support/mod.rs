#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tally_broker::{BrokerError, DeliveryEvents, DeliveryOutcome, DeliveryReport, ProducerClient};
use tally_common::{Codec, CodecError, JsonCodec, Message};
use tally_store::{MemoryStore, Report, Store, StoreError, StoreHandle};
use tokio::sync::mpsc;

/// JSON codec whose first `failures` encodes fail.
#[derive(Debug)]
pub struct FailingCodec {
    remaining: AtomicUsize,
}

impl FailingCodec {
    pub const fn new(failures: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(failures),
        }
    }
}

impl Codec for FailingCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let fail = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if fail {
            return Err(CodecError::Invalid("injected encode failure".to_string()));
        }

        JsonCodec.encode(message)
    }

    fn decode(&self, payload: &[u8]) -> Result<Message, CodecError> {
        JsonCodec.decode(payload)
    }
}

/// Accepts every send and never reports an outcome until closed.
#[derive(Debug)]
pub struct SilentProducer {
    reports: Mutex<Option<mpsc::UnboundedSender<DeliveryReport>>>,
    events: Mutex<Option<DeliveryEvents>>,
    pub produced: AtomicUsize,
}

impl SilentProducer {
    pub fn new() -> Self {
        let (reports, events) = mpsc::unbounded_channel();
        Self {
            reports: Mutex::new(Some(reports)),
            events: Mutex::new(Some(events)),
            produced: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProducerClient for SilentProducer {
    fn produce(&self, _topic: &str, _payload: Vec<u8>) -> tally_broker::Result<()> {
        self.produced.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> tally_broker::Result<()> {
        Err(BrokerError::FlushTimeout {
            pending: self.produced.load(Ordering::SeqCst),
        })
    }

    fn take_events(&self) -> Option<DeliveryEvents> {
        self.events.lock().take()
    }

    fn close(&self) {
        self.reports.lock().take();
    }
}

/// Reports the first `reported` sends as delivered, then closes its
/// delivery stream while still accepting sends.
#[derive(Debug)]
pub struct LossyProducer {
    reports: Mutex<Option<mpsc::UnboundedSender<DeliveryReport>>>,
    events: Mutex<Option<DeliveryEvents>>,
    reported: usize,
    sent: AtomicUsize,
}

impl LossyProducer {
    pub fn new(reported: usize) -> Self {
        let (reports, events) = mpsc::unbounded_channel();
        Self {
            reports: Mutex::new(Some(reports)),
            events: Mutex::new(Some(events)),
            reported,
            sent: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProducerClient for LossyProducer {
    fn produce(&self, topic: &str, _payload: Vec<u8>) -> tally_broker::Result<()> {
        let mut reports = self.reports.lock();
        let sent = self.sent.fetch_add(1, Ordering::SeqCst);

        if let Some(sender) = reports.as_ref() {
            let _ = sender.send(DeliveryReport {
                topic: topic.to_string(),
                outcome: DeliveryOutcome::Delivered {
                    partition: 0,
                    offset: i64::try_from(sent).unwrap_or(i64::MAX),
                },
            });
        }

        if sent + 1 >= self.reported {
            reports.take();
        }

        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> tally_broker::Result<()> {
        Ok(())
    }

    fn take_events(&self) -> Option<DeliveryEvents> {
        self.events.lock().take()
    }

    fn close(&self) {
        self.reports.lock().take();
    }
}

/// Memory store that rejects messages with a given value and counts
/// report requests.
#[derive(Debug, Default)]
pub struct InspectedStore {
    inner: MemoryStore,
    reject: Option<String>,
    pub reports: Arc<AtomicUsize>,
}

impl InspectedStore {
    pub fn rejecting(value: impl Into<String>) -> Self {
        Self {
            reject: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.inner.messages()
    }
}

#[async_trait]
impl Store for InspectedStore {
    async fn add(&mut self, message: Message) -> tally_store::Result<()> {
        if self.reject.as_deref() == Some(message.value.as_str()) {
            return Err(StoreError::Rejected(message.value));
        }

        self.inner.add(message).await
    }

    fn report(&self) -> tally_store::Result<Option<Report>> {
        self.reports.fetch_add(1, Ordering::SeqCst);
        self.inner.report()
    }

    fn summary(&self) -> Report {
        self.inner.summary()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Poll `handle` until the store holds `expected` messages.
pub async fn wait_for_len(handle: &StoreHandle, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if handle.len().await.expect("store handle") == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("store never reached {expected} message(s)"));
}
