use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tally_broker::BrokerConfig;
use tally_pipeline::{ConsumerConfig, ProducerConfig};
use tally_store::StoreConfig;

pub const CONFIG_ENV: &str = "TALLY_CONFIG";

/// Top-level configuration, read from `tally.config.ron`.
///
/// ```ron
/// Tally(
///     broker: Memory(queue_capacity: 100000),
///     producer: (topic: "mytopic", burst_size: 1000),
///     consumer: (group_id: "myGroup", offset_reset: Earliest),
///     store: (report_threshold: 10),
/// )
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Tally {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Tally {
    /// # Errors
    /// If the file cannot be read or is not valid configuration
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        ron::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Locate and load the configuration file.
    ///
    /// # Errors
    /// If no configuration file can be found or loaded
    pub fn load() -> anyhow::Result<Self> {
        let path = find_config_file()?;
        Self::from_file(&path)
    }
}

/// Find the configuration file using the following precedence:
/// 1. `TALLY_CONFIG` environment variable
/// 2. ./tally.config.ron (current working directory)
/// 3. /etc/tally/tally.config.ron (system-wide config)
///
/// # Errors
/// If `TALLY_CONFIG` names a missing file, or none of the defaults exist
pub fn find_config_file() -> anyhow::Result<PathBuf> {
    locate(
        std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        &[
            PathBuf::from("./tally.config.ron"),
            PathBuf::from("/etc/tally/tally.config.ron"),
        ],
    )
}

fn locate(from_env: Option<PathBuf>, default_paths: &[PathBuf]) -> anyhow::Result<PathBuf> {
    if let Some(path) = from_env {
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!("{CONFIG_ENV} points to non-existent file: {}", path.display());
    }

    if let Some(path) = default_paths.iter().find(|path| path.exists()) {
        return Ok(path.clone());
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn env_path_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let from_env = dir.path().join("env.ron");
        let fallback = dir.path().join("fallback.ron");
        fs::write(&from_env, "()").expect("write");
        fs::write(&fallback, "()").expect("write");

        let found = locate(Some(from_env.clone()), &[fallback]).expect("found");
        assert_eq!(found, from_env);
    }

    #[test]
    fn missing_env_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fallback = dir.path().join("fallback.ron");
        fs::write(&fallback, "()").expect("write");

        let err = locate(Some(dir.path().join("absent.ron")), &[fallback]).unwrap_err();
        assert!(err.to_string().contains("non-existent"));
    }

    #[test]
    fn first_existing_default_is_used() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.ron");
        let present = dir.path().join("present.ron");
        fs::write(&present, "()").expect("write");

        let found = locate(None, &[missing, present.clone()]).expect("found");
        assert_eq!(found, present);
    }

    #[test]
    fn nothing_found_lists_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.ron");

        let err = locate(None, std::slice::from_ref(&missing)).unwrap_err();
        assert!(err.to_string().contains(&missing.display().to_string()));
    }
}
