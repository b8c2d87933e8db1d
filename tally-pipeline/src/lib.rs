//! The message pipeline
//!
//! - [`BurstProducer`]: fans a fixed-size burst of messages out to the broker
//!   and waits for every outcome
//! - [`DeliveryTracker`]: drains the producer's delivery stream
//! - [`ConsumerLoop`]: reads, decodes and stores messages, reporting whenever
//!   a read times out

mod barrier;
mod config;
mod consumer;
mod error;
mod producer;
mod signal;
mod tracker;

pub use barrier::{BurstBarrier, BurstProgress, Participant};
pub use config::{ConsumerConfig, ProducerConfig};
pub use consumer::{ConsumerLoop, ConsumerStats, Step};
pub use error::PipelineError;
pub use producer::{BurstProducer, BurstSummary};
pub use tracker::{DeliveryTally, DeliveryTracker};
