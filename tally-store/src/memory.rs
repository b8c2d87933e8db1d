use async_trait::async_trait;
use tally_common::{Message, internal};

use crate::{Report, StoreConfig, r#trait::Store};

/// In-memory aggregate store
///
/// An append-only `Vec` of received messages, in arrival order. No
/// deduplication, no capacity bound. The per-status view is computed on
/// demand by [`Store::summary`] rather than maintained incrementally.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    messages: Vec<Message>,
    report_threshold: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl MemoryStore {
    #[must_use]
    pub const fn new(config: &StoreConfig) -> Self {
        Self {
            messages: Vec::new(),
            report_threshold: config.report_threshold,
        }
    }

    /// Everything received so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub const fn report_threshold(&self) -> usize {
        self.report_threshold
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn add(&mut self, message: Message) -> crate::Result<()> {
        self.messages.push(message);
        Ok(())
    }

    fn report(&self) -> crate::Result<Option<Report>> {
        let report = self.summary();
        if !report.is_consistent() {
            tracing::error!(?report, "Status buckets disagree with message count");
            return Err(crate::StoreError::Internal(format!(
                "status buckets do not add up to {}: {report:?}",
                report.count
            )));
        }

        if report.count < self.report_threshold {
            internal!(
                level = DEBUG,
                "Only {} message(s) received, skipping report",
                report.count
            );
            return Ok(None);
        }

        internal!(level = INFO, "==== Summary of message streaming ====");
        internal!(level = INFO, "{report}");

        Ok(Some(report))
    }

    fn summary(&self) -> Report {
        Report::tally(&self.messages)
    }

    fn len(&self) -> usize {
        self.messages.len()
    }
}
