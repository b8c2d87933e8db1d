use serde::Deserialize;

const fn default_report_threshold() -> usize {
    10
}

/// Configuration for the aggregate store
///
/// ```ron
/// store: (
///     report_threshold: 10,
/// ),
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Fewest messages for which a report is emitted
    ///
    /// Default: 10
    #[serde(default = "default_report_threshold")]
    pub report_threshold: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            report_threshold: default_report_threshold(),
        }
    }
}
