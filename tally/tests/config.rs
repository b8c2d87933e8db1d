use std::fs;

use pretty_assertions::assert_eq;
use tally::Tally;
use tally_broker::{BrokerConfig, OffsetReset};

#[test]
fn sample_config_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../tally.config.ron");
    let tally = Tally::from_file(&path).expect("sample config");

    assert!(matches!(
        tally.broker,
        BrokerConfig::Memory {
            queue_capacity: 100_000
        }
    ));
    assert_eq!(tally.producer.topic, "mytopic");
    assert_eq!(tally.producer.burst_size, 1000);
    assert_eq!(tally.consumer.group_id, "myGroup");
    assert_eq!(tally.consumer.offset_reset, OffsetReset::Earliest);
    assert_eq!(tally.store.report_threshold, 10);
}

#[test]
fn empty_config_uses_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tally.config.ron");
    fs::write(&path, "()").expect("write");

    let tally = Tally::from_file(&path).expect("config");
    assert!(matches!(tally.broker, BrokerConfig::Memory { .. }));
    assert_eq!(tally.producer.flush_timeout_ms, 15_000);
    assert_eq!(tally.consumer.read_timeout_ms, 5_000);
    assert_eq!(tally.consumer.topic, tally.producer.topic);
}

#[test]
fn partial_sections_keep_other_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tally.config.ron");
    fs::write(
        &path,
        r#"Tally(producer: (topic: "audit", burst_size: 5), consumer: (topic: "audit"))"#,
    )
    .expect("write");

    let tally = Tally::from_file(&path).expect("config");
    assert_eq!(tally.producer.topic, "audit");
    assert_eq!(tally.producer.burst_size, 5);
    assert_eq!(tally.consumer.topic, "audit");
    assert_eq!(tally.consumer.group_id, "myGroup");
}

#[test]
fn unreadable_config_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tally.config.ron");
    fs::write(&path, "Tally(producer: (burst_size: \"many\"))").expect("write");

    let err = Tally::from_file(&path).expect_err("invalid config");
    assert!(err.to_string().contains("Failed to parse config"));

    let err = Tally::from_file(&dir.path().join("absent.ron")).expect_err("missing config");
    assert!(err.to_string().contains("Failed to read config"));
}
