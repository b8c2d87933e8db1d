#[cfg(feature = "kafka")]
mod kafka;
mod memory;

#[cfg(feature = "kafka")]
pub use kafka::{KafkaConsumer, KafkaProducer};
pub(crate) use memory::default_queue_capacity;
pub use memory::{MemoryBroker, MemoryConsumer, MemoryProducer};
