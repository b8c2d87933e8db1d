use std::sync::{Arc, LazyLock};

use anyhow::Context;
use tally_broker::Broker;
use tally_common::{JsonCodec, Signal, internal, logging};
use tally_pipeline::{BurstProducer, ConsumerLoop};
use tally_store::{MemoryStore, Store};
use tally_tracing::traced;
use tokio::{
    signal::unix::{SignalKind, signal},
    sync::broadcast,
};

use crate::Tally;

/// Which halves of the pipeline a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One burst, then exit
    Producer,
    /// Consume until shutdown
    Consumer,
    /// Consume, run one burst alongside, then keep consuming until shutdown
    Both,
}

impl Mode {
    const fn produces(self) -> bool {
        matches!(self, Self::Producer | Self::Both)
    }

    const fn consumes(self) -> bool {
        matches!(self, Self::Consumer | Self::Both)
    }
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Wait for SIGINT or SIGTERM and name the one that arrived.
async fn termination() -> std::io::Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        interrupted = tokio::signal::ctrl_c() => interrupted.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

/// Publish [`Signal::Shutdown`] on the first termination signal.
///
/// Only returns if a second SIGINT arrives before the pipeline has stopped,
/// in which case the stop is forced.
#[traced(instrument(level = tracing::Level::TRACE), timing(precision = "s"))]
async fn shutdown() -> anyhow::Result<()> {
    let received = termination()
        .await
        .context("Failed to install signal handlers")?;

    internal!(
        level = INFO,
        signal = received,
        "Stopping the pipeline; interrupt again to force"
    );

    if SHUTDOWN_BROADCAST.send(Signal::Shutdown).is_err() {
        internal!(level = WARN, "Nothing is listening for shutdown");
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for a second interrupt")?;

    anyhow::bail!("Forced shutdown before the pipeline stopped")
}

impl Tally {
    /// Run the configured pipeline until it finishes or the process is
    /// asked to stop
    ///
    /// # Errors
    ///
    /// This function will return an error if the broker cannot be reached,
    /// a client cannot be created, or the burst fails to start.
    #[traced(instrument(level = tracing::Level::TRACE, skip_all, err), timing(precision = "s"))]
    pub async fn run(self, mode: Mode) -> anyhow::Result<()> {
        logging::init();

        let broker = self
            .broker
            .clone()
            .connect()
            .context("Failed to connect to broker")?;

        if matches!(broker, Broker::Memory(_)) && mode != Mode::Both {
            internal!(
                level = WARN,
                "Running {mode:?} alone against the in-process broker; nothing is shared with other processes"
            );
        }

        internal!(level = INFO, "Controller running ({mode:?})");

        let ret = tokio::select! {
            r = self.serve(&broker, mode, &SHUTDOWN_BROADCAST) => {
                r
            }
            r = shutdown() => {
                r
            }
        };

        internal!(level = INFO, "Shutting down...");

        ret
    }

    /// Run the halves selected by `mode` against `broker`, stopping when
    /// `signals` carries a shutdown.
    ///
    /// # Errors
    ///
    /// If a client cannot be created or subscribed, or the burst fails
    pub async fn serve(
        &self,
        broker: &Broker,
        mode: Mode,
        signals: &broadcast::Sender<Signal>,
    ) -> anyhow::Result<()> {
        let consumer = if mode.consumes() {
            let client = broker
                .consumer(&self.consumer.group_id, self.consumer.offset_reset)
                .context("Failed to create consumer")?;
            let (consumer, _queries) = ConsumerLoop::new(
                client,
                MemoryStore::new(&self.store),
                Arc::new(JsonCodec),
                &self.consumer,
            )
            .context("Failed to subscribe consumer")?;

            Some(tokio::spawn(consumer.run(signals.subscribe())))
        } else {
            None
        };

        if mode.produces() {
            let client = broker.producer().context("Failed to create producer")?;
            let summary = BurstProducer::new(client, Arc::new(JsonCodec), &self.producer)
                .run(signals.subscribe())
                .await
                .context("Burst failed")?;

            internal!(level = INFO, "Burst complete: {summary}");
        }

        if let Some(consumer) = consumer {
            let store = consumer.await.context("Consumer task failed")?;
            internal!(
                level = INFO,
                "Final tally of {} message(s): {}",
                store.len(),
                store.summary()
            );
        }

        Ok(())
    }
}
