//! Broker client seam.
//!
//! The pipeline talks to a broker only through [`ProducerClient`] and
//! [`ConsumerClient`]. Two backends implement them:
//! - [`MemoryBroker`]: in-process topics and consumer groups
//! - `KafkaProducer` / `KafkaConsumer` (feature `kafka`): librdkafka clients

pub mod backends;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "kafka")]
pub use backends::{KafkaConsumer, KafkaProducer};
pub use backends::{MemoryBroker, MemoryConsumer, MemoryProducer};
pub use client::{ConsumerClient, DeliveryEvents, ProducerClient};
pub use config::{Broker, BrokerConfig, KafkaConfig};
pub use error::{BrokerError, Result};
pub use types::{DeliveryOutcome, DeliveryReport, OffsetReset, Record};
