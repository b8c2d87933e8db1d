use std::time::Duration;

use serde::Deserialize;
use tally_broker::OffsetReset;

fn default_topic() -> String {
    "mytopic".to_string()
}

fn default_group_id() -> String {
    "myGroup".to_string()
}

const fn default_burst_size() -> usize {
    1000
}

const fn default_flush_timeout() -> u64 {
    15_000
}

const fn default_read_timeout() -> u64 {
    5_000
}

/// Producer side of the pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct ProducerConfig {
    /// Topic every message is published to
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Messages generated per burst
    ///
    /// Default: 1000
    #[serde(default = "default_burst_size")]
    pub burst_size: usize,

    /// How long to wait for outstanding deliveries to drain (in milliseconds)
    ///
    /// Default: 15000 (15 seconds)
    #[serde(default = "default_flush_timeout")]
    pub flush_timeout_ms: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            burst_size: default_burst_size(),
            flush_timeout_ms: default_flush_timeout(),
        }
    }
}

impl ProducerConfig {
    #[must_use]
    pub const fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

/// Consumer side of the pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Consumer group the broker tracks read progress for
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Starting point for a group without a committed offset
    #[serde(default)]
    pub offset_reset: OffsetReset,

    /// How long a read waits for a message before a report is produced
    /// (in milliseconds)
    ///
    /// Default: 5000 (5 seconds)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            group_id: default_group_id(),
            offset_reset: OffsetReset::default(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

impl ConsumerConfig {
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
