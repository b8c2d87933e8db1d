use std::fmt::{self, Display};

use tally_broker::{DeliveryEvents, DeliveryOutcome};
use tally_common::outgoing;

use crate::BurstBarrier;

/// Delivery outcomes seen by a [`DeliveryTracker`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryTally {
    pub delivered: usize,
    pub failed: usize,
}

impl Display for DeliveryTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} delivered, {} failed", self.delivered, self.failed)
    }
}

/// Drains a producer's delivery stream until it closes.
///
/// Every outcome is counted against the burst's [`BurstBarrier`]; failures
/// are logged with the topic they were meant for.
#[derive(Debug)]
pub struct DeliveryTracker {
    events: DeliveryEvents,
    barrier: BurstBarrier,
}

impl DeliveryTracker {
    #[must_use]
    pub const fn new(events: DeliveryEvents, barrier: BurstBarrier) -> Self {
        Self { events, barrier }
    }

    pub async fn run(mut self) -> DeliveryTally {
        let mut tally = DeliveryTally::default();

        while let Some(report) = self.events.recv().await {
            match report.outcome {
                DeliveryOutcome::Delivered { partition, offset } => {
                    tally.delivered += 1;
                    outgoing!("Delivered to {}[{partition}]@{offset}", report.topic);
                }
                DeliveryOutcome::Failed { detail } => {
                    tally.failed += 1;
                    tracing::error!(topic = %report.topic, "Delivery failed: {detail}");
                }
            }

            self.barrier.record_observed();
        }

        self.barrier.close();
        outgoing!(level = DEBUG, "Delivery stream closed: {tally}");

        tally
    }
}
