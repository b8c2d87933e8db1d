use std::{
    fmt::{self, Display},
    sync::Arc,
    time::{Duration, Instant},
};

use tally_broker::ProducerClient;
use tally_common::{Codec, Message, Signal, Status, internal, outgoing};
use tally_tracing::traced;
use tokio::{sync::broadcast, task::JoinSet};

use crate::{
    BurstBarrier, DeliveryTracker, Participant, PipelineError, ProducerConfig,
    signal::shutdown_requested,
};

/// Outcome of one [`BurstProducer::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstSummary {
    pub requested: usize,
    /// Sends accepted by the broker client
    pub submitted: usize,
    /// Sends that failed to encode or queue
    pub dropped: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Accepted sends whose outcome was never reported
    pub unobserved: usize,
    pub elapsed: Duration,
}

impl Display for BurstSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requested, {} submitted, {} dropped, {} delivered, {} failed",
            self.requested, self.submitted, self.dropped, self.delivered, self.failed
        )?;

        if self.unobserved > 0 {
            write!(f, ", {} unobserved", self.unobserved)?;
        }

        Ok(())
    }
}

/// Publishes a burst of status-tagged messages and waits for their outcomes.
///
/// Each message gets a uniformly random [`Status`] and the value
/// `message #<n>`. All sends are issued concurrently.
#[derive(Debug, Clone)]
pub struct BurstProducer {
    client: Arc<dyn ProducerClient>,
    codec: Arc<dyn Codec>,
    topic: String,
    burst_size: usize,
    flush_timeout: Duration,
}

impl BurstProducer {
    #[must_use]
    pub fn new(
        client: Arc<dyn ProducerClient>,
        codec: Arc<dyn Codec>,
        config: &ProducerConfig,
    ) -> Self {
        Self {
            client,
            codec,
            topic: config.topic.clone(),
            burst_size: config.burst_size,
            flush_timeout: config.flush_timeout(),
        }
    }

    /// Run a single burst.
    ///
    /// Returns once every send has resolved and every delivery outcome has
    /// been observed, or early if a shutdown is signalled while waiting on
    /// outcomes. The client is closed on return.
    ///
    /// # Errors
    /// If the client's delivery stream has already been taken, or the
    /// delivery tracker task fails
    #[traced(instrument(level = tracing::Level::TRACE, skip_all), timing(precision = "ms"))]
    pub async fn run(
        &self,
        mut shutdown: broadcast::Receiver<Signal>,
    ) -> Result<BurstSummary, PipelineError> {
        let start = Instant::now();
        let events = self
            .client
            .take_events()
            .ok_or(PipelineError::EventsUnavailable)?;

        let barrier = BurstBarrier::new(self.burst_size);
        let tracker = tokio::spawn(DeliveryTracker::new(events, barrier.clone()).run());

        internal!(
            level = INFO,
            "Producing {} message(s) to {}",
            self.burst_size,
            self.topic
        );

        let mut sends = JoinSet::new();
        for sequence in 0..self.burst_size {
            let participant = barrier.participant();
            let client = self.client.clone();
            let codec = self.codec.clone();
            let topic = self.topic.clone();

            sends.spawn(async move {
                send(client.as_ref(), codec.as_ref(), &topic, sequence, participant);
            });
        }

        while let Some(joined) = sends.join_next().await {
            if let Err(err) = joined {
                tracing::error!("Send task failed: {err}");
            }
        }

        if let Err(err) = self.client.flush(self.flush_timeout).await {
            internal!(level = WARN, "Flush incomplete: {err}");
        }

        let progress = tokio::select! {
            progress = barrier.wait() => progress,
            () = shutdown_requested(&mut shutdown) => {
                let progress = barrier.progress();
                internal!(
                    level = WARN,
                    "Shutdown requested with {} delivery outcome(s) outstanding",
                    progress.unobserved()
                );
                progress
            }
        };

        if progress.closed && progress.unobserved() > 0 {
            tracing::error!(
                "Delivery stream closed early, {} outcome(s) lost",
                progress.unobserved()
            );
        }

        self.client.close();
        let tally = tracker
            .await
            .map_err(|err| PipelineError::Tracker(err.to_string()))?;

        let summary = BurstSummary {
            requested: self.burst_size,
            submitted: progress.submitted,
            dropped: progress.dropped,
            delivered: tally.delivered,
            failed: tally.failed,
            unobserved: progress.unobserved(),
            elapsed: start.elapsed(),
        };

        internal!(
            level = INFO,
            "Burst finished in {:?}: {summary}",
            summary.elapsed
        );

        Ok(summary)
    }
}

fn random_status() -> Status {
    Status::ALL[rand::random_range(0..Status::ALL.len())]
}

/// Encode and queue message `sequence`, resolving `participant` either way.
fn send(
    client: &dyn ProducerClient,
    codec: &dyn Codec,
    topic: &str,
    sequence: usize,
    participant: Participant,
) {
    let message = Message::numbered(random_status(), sequence);

    let payload = match codec.encode(&message) {
        Ok(payload) => payload,
        Err(err) => {
            internal!(level = ERROR, "Error encoding {}: {err}", message.value);
            return;
        }
    };

    match client.produce(topic, payload) {
        Ok(()) => {
            outgoing!("Queued {} ({})", message.value, message.status);
            participant.submitted();
        }
        Err(err) => internal!(level = ERROR, "Error queueing {}: {err}", message.value),
    }
}
