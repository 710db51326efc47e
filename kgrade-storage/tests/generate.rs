use anyhow::Result;
use kgrade_common::constants::{
    CLUSTER_METADATA_DIRECTORY, KAFKA_CLEAN_SHUTDOWN_FILE_NAME, LOG_FILE_NAME,
    META_PROPERTIES_FILE_NAME, PARTITION_METADATA_FILE_NAME,
};
use kgrade_protocol::ClusterMetadataRecord;
use kgrade_storage::*;
use tempfile::TempDir;
use uuid::Uuid;

fn config(dir: &TempDir, topics: Vec<TopicGenerationConfig>) -> LogDirectoryConfig {
    LogDirectoryConfig {
        root: dir.path().join("kraft-combined-logs"),
        server_properties_path: dir.path().join("server.properties"),
        topics,
    }
}

fn sample_topics() -> Vec<TopicGenerationConfig> {
    vec![
        TopicGenerationConfig::new(
            "foo",
            Uuid::from_u128(0x71),
            vec![PartitionGenerationConfig::new(
                0,
                vec!["Hello Earth!".to_string(), "Hello World!".to_string()],
            )],
        ),
        TopicGenerationConfig::new(
            "bar",
            Uuid::from_u128(0x72),
            vec![
                PartitionGenerationConfig::empty(0),
                PartitionGenerationConfig::new(1, vec!["Hello Universe!".to_string()]),
            ],
        ),
    ]
}

#[test]
fn test_layout() -> Result<()> {
    let dir = TempDir::new()?;
    let config = config(&dir, sample_topics());
    generate(&config)?;

    let server_properties = std::fs::read_to_string(&config.server_properties_path)?;
    assert!(server_properties.contains(&format!("log.dirs={}", config.root.display())));

    let meta = std::fs::read_to_string(config.root.join(META_PROPERTIES_FILE_NAME))?;
    assert!(meta.contains("directory.id=EAAAAAAAQACAAAAAAAAAAQ==\n"));
    assert!(meta.ends_with("node.id=1\nversion=1\n"));

    let shutdown = std::fs::read_to_string(config.root.join(KAFKA_CLEAN_SHUTDOWN_FILE_NAME))?;
    assert_eq!(shutdown, r#"{"version":0,"brokerEpoch":10}"#);

    for name in ["foo-0", "bar-0", "bar-1", CLUSTER_METADATA_DIRECTORY] {
        assert!(config.root.join(name).join(LOG_FILE_NAME).is_file(), "{name}");
        assert!(config.root.join(name).join(PARTITION_METADATA_FILE_NAME).is_file(), "{name}");
    }

    let partition_metadata =
        std::fs::read_to_string(config.root.join("foo-0").join(PARTITION_METADATA_FILE_NAME))?;
    assert_eq!(
        partition_metadata,
        format!("version: 0\ntopic_id: {}", uuid_to_base64(&Uuid::from_u128(0x71)))
    );
    Ok(())
}

#[test]
fn test_partition_logs_match_returned_batches() -> Result<()> {
    let dir = TempDir::new()?;
    let config = config(&dir, sample_topics());
    let generated = generate(&config)?;

    let foo = generated.topic("foo").unwrap().partition(0).unwrap();
    assert_eq!(foo.record_batches.len(), 2);
    let on_disk = read_record_batches(&config.partition_dir("foo", 0))?;
    assert_eq!(on_disk, foo.record_batches);
    assert_eq!(on_disk[1].records[0].value.as_deref(), Some(&b"Hello World!"[..]));

    let empty = read_log_file(&config.partition_dir("bar", 0))?;
    assert!(empty.is_empty());
    Ok(())
}

#[test]
fn test_cluster_metadata_describes_topics() -> Result<()> {
    let dir = TempDir::new()?;
    let config = config(&dir, sample_topics());
    generate(&config)?;

    let payloads = read_cluster_metadata(&config.root)?;
    let summary: Vec<String> = payloads
        .iter()
        .map(|p| match &p.data {
            ClusterMetadataRecord::FeatureLevel(r) => format!("feature {} {}", r.name, r.feature_level),
            ClusterMetadataRecord::Topic(r) => format!("topic {}", r.topic_name),
            ClusterMetadataRecord::Partition(r) => format!("partition {} {}", r.topic_uuid, r.partition_id),
            other => format!("{other:?}"),
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            "feature metadata.version 20".to_string(),
            "topic foo".to_string(),
            format!("partition {} 0", Uuid::from_u128(0x71)),
            "topic bar".to_string(),
            format!("partition {} 0", Uuid::from_u128(0x72)),
            format!("partition {} 1", Uuid::from_u128(0x72)),
        ]
    );
    Ok(())
}

#[test]
fn test_regenerate_replaces_topics() -> Result<()> {
    let dir = TempDir::new()?;
    generate(&config(&dir, sample_topics()))?;

    let config = config(
        &dir,
        vec![TopicGenerationConfig::new("baz", Uuid::from_u128(0x73), vec![PartitionGenerationConfig::empty(0)])],
    );
    generate(&config)?;
    let partitions = read_partitions(&config.root)?;
    assert_eq!(partitions.keys().cloned().collect::<Vec<_>>(), vec![("baz".to_string(), 0)]);
    Ok(())
}
