//! The `__cluster_metadata-0` partition a KRaft broker loads its topics from.

use std::path::Path;

use anyhow::{Context, Result};
use kgrade_common::constants::{
    CLUSTER_METADATA_TOPIC_ID, DIRECTORY_UUID, LOG_FILE_NAME, NODE_ID,
    PARTITION_METADATA_FILE_NAME,
};
use kgrade_protocol::builder::RecordBatchBuilder;
use kgrade_protocol::{
    encode_record_batches, ClusterMetadataPayload, PartitionRecord, Record, RecordBatch,
};
use tracing::debug;
use uuid::Uuid;

use crate::config::TopicGenerationConfig;

pub const FEATURE_LEVEL_TIMESTAMP: i64 = 1726045943832;
pub const TOPIC_TIMESTAMP: i64 = 1726045957397;
pub const METADATA_VERSION_FEATURE_LEVEL: i16 = 20;

fn payload_record(payload: &ClusterMetadataPayload) -> Record {
    Record {
        value: Some(payload.encode()),
        ..Default::default()
    }
}

fn partition_record(topic_uuid: Uuid, partition_id: i32, directory: Uuid) -> PartitionRecord {
    PartitionRecord {
        partition_id,
        topic_uuid,
        replicas: vec![NODE_ID],
        isr: vec![NODE_ID],
        removing_replicas: Vec::new(),
        adding_replicas: Vec::new(),
        leader: NODE_ID,
        leader_epoch: 0,
        partition_epoch: 0,
        directories: vec![directory],
    }
}

/// A feature-level batch, then one batch per topic holding its `TopicRecord` followed by
/// a `PartitionRecord` per partition. Base offsets run on across batches.
pub fn cluster_metadata_batches(topics: &[TopicGenerationConfig]) -> Result<Vec<RecordBatch>> {
    let directory: Uuid = DIRECTORY_UUID.parse()?;
    let mut batches = Vec::with_capacity(topics.len() + 1);

    let feature_level = RecordBatchBuilder::new()
        .partition_leader_epoch(1)
        .timestamp(FEATURE_LEVEL_TIMESTAMP)
        .record(payload_record(&ClusterMetadataPayload::feature_level(
            "metadata.version",
            METADATA_VERSION_FEATURE_LEVEL,
        )))
        .build();
    let mut base_offset = feature_level.records.len() as i64;
    batches.push(feature_level);

    for topic in topics {
        let mut builder = RecordBatchBuilder::new()
            .base_offset(base_offset)
            .partition_leader_epoch(1)
            .timestamp(TOPIC_TIMESTAMP)
            .record(payload_record(&ClusterMetadataPayload::topic(&topic.name, topic.uuid)));
        for partition in &topic.partitions {
            let record = partition_record(topic.uuid, partition.partition_id, directory);
            builder = builder.record(payload_record(&ClusterMetadataPayload::partition(record)));
        }
        let batch = builder.build();
        base_offset += batch.records.len() as i64;
        batches.push(batch);
    }
    Ok(batches)
}

pub fn write_cluster_metadata(dir: &Path, topics: &[TopicGenerationConfig]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create cluster metadata directory: {:?}", dir))?;

    let log_path = dir.join(LOG_FILE_NAME);
    let batches = cluster_metadata_batches(topics)?;
    std::fs::write(&log_path, encode_record_batches(&batches))
        .with_context(|| format!("Failed to write cluster metadata log: {:?}", log_path))?;

    let metadata_path = dir.join(PARTITION_METADATA_FILE_NAME);
    let content = format!("version: 0\ntopic_id: {CLUSTER_METADATA_TOPIC_ID}");
    std::fs::write(&metadata_path, content).with_context(|| {
        format!("Failed to write cluster metadata partition metadata: {:?}", metadata_path)
    })?;

    debug!("Wrote cluster metadata for {} topics to {}", topics.len(), log_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartitionGenerationConfig;
    use kgrade_protocol::ClusterMetadataRecord;

    #[test]
    fn test_batch_layout() {
        let topics = vec![
            TopicGenerationConfig::new(
                "foo",
                Uuid::from_u128(1),
                vec![PartitionGenerationConfig::empty(0), PartitionGenerationConfig::empty(1)],
            ),
            TopicGenerationConfig::new("bar", Uuid::from_u128(2), vec![PartitionGenerationConfig::empty(0)]),
        ];
        let batches = cluster_metadata_batches(&topics).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].records.len(), 1);
        assert_eq!(batches[1].base_offset, 1);
        assert_eq!(batches[1].records.len(), 3);
        assert_eq!(batches[2].base_offset, 4);
        assert!(batches.iter().all(|b| b.partition_leader_epoch == 1));
        assert!(batches.iter().all(|b| b.records.iter().all(|r| r.key.is_none())));

        let value = batches[1].records[2].value.clone().unwrap();
        let payload = ClusterMetadataPayload::decode(&value).unwrap();
        match payload.data {
            ClusterMetadataRecord::Partition(record) => {
                assert_eq!(record.partition_id, 1);
                assert_eq!(record.topic_uuid, Uuid::from_u128(1));
                assert_eq!(record.directories[0].to_string(), DIRECTORY_UUID);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
}
