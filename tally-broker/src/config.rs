use std::{collections::BTreeMap, sync::Arc};

use serde::Deserialize;

use crate::{
    ConsumerClient, MemoryBroker, OffsetReset, ProducerClient, Result,
    backends::default_queue_capacity,
};

fn default_bootstrap_servers() -> String {
    "localhost".to_string()
}

/// Which broker the pipeline talks to.
///
/// # Examples
///
/// In-process broker:
/// ```ron
/// broker: Memory(queue_capacity: 100000),
/// ```
///
/// Kafka (needs the `kafka` feature):
/// ```ron
/// broker: Kafka(
///     bootstrap_servers: "localhost:9092",
///     properties: { "security.protocol": "plaintext" },
/// ),
/// ```
#[derive(Debug, Clone, Deserialize)]
pub enum BrokerConfig {
    Memory {
        #[serde(default = "default_queue_capacity")]
        queue_capacity: usize,
    },
    Kafka {
        #[serde(default = "default_bootstrap_servers")]
        bootstrap_servers: String,
        /// Extra librdkafka properties, applied after the built-in ones.
        #[serde(default)]
        properties: BTreeMap<String, String>,
    },
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::Memory {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Connection settings for a Kafka cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub properties: BTreeMap<String, String>,
}

impl BrokerConfig {
    /// Resolve the configuration into a broker handle.
    ///
    /// # Errors
    /// If Kafka is selected but this build lacks the `kafka` feature
    pub fn connect(self) -> Result<Broker> {
        match self {
            Self::Memory { queue_capacity } => {
                Ok(Broker::Memory(MemoryBroker::with_queue_capacity(queue_capacity)))
            }
            #[cfg(feature = "kafka")]
            Self::Kafka {
                bootstrap_servers,
                properties,
            } => Ok(Broker::Kafka(KafkaConfig {
                bootstrap_servers,
                properties,
            })),
            #[cfg(not(feature = "kafka"))]
            Self::Kafka { .. } => Err(crate::BrokerError::Configuration(
                "Kafka broker selected, but tally was built without the `kafka` feature"
                    .to_string(),
            )),
        }
    }
}

/// A resolved broker from which clients are created.
#[derive(Debug, Clone)]
pub enum Broker {
    Memory(MemoryBroker),
    #[cfg(feature = "kafka")]
    Kafka(KafkaConfig),
}

impl Broker {
    /// # Errors
    /// If the underlying client cannot be created
    pub fn producer(&self) -> Result<Arc<dyn ProducerClient>> {
        match self {
            Self::Memory(broker) => Ok(Arc::new(broker.producer())),
            #[cfg(feature = "kafka")]
            Self::Kafka(config) => Ok(Arc::new(crate::KafkaProducer::new(config)?)),
        }
    }

    /// Create a consumer in `group`. The caller subscribes it.
    ///
    /// # Errors
    /// If the underlying client cannot be created
    pub fn consumer(&self, group: &str, reset: OffsetReset) -> Result<Box<dyn ConsumerClient>> {
        match self {
            Self::Memory(broker) => Ok(Box::new(broker.consumer(group, reset))),
            #[cfg(feature = "kafka")]
            Self::Kafka(config) => Ok(Box::new(crate::KafkaConsumer::new(config, group, reset)?)),
        }
    }
}
