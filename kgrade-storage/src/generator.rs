//! Writes a complete KRaft log directory and reports what went into it.

use std::collections::HashSet;

use anyhow::{Context, Result};
use kgrade_common::constants::CLUSTER_METADATA_DIRECTORY;
use kgrade_common::Error;
use kgrade_protocol::RecordBatch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cluster_metadata::write_cluster_metadata;
use crate::config::LogDirectoryConfig;
use crate::partition::write_partition;
use crate::server_config::{write_clean_shutdown, write_meta_properties, write_server_properties};

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPartitionData {
    pub partition_id: i32,
    /// Batches written to the partition's log, in file order.
    pub record_batches: Vec<RecordBatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTopicData {
    pub name: String,
    pub uuid: Uuid,
    pub partitions: Vec<GeneratedPartitionData>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedLogDirectoryData {
    pub topics: Vec<GeneratedTopicData>,
}

impl GeneratedLogDirectoryData {
    pub fn topic(&self, name: &str) -> Option<&GeneratedTopicData> {
        self.topics.iter().find(|t| t.name == name)
    }

    pub fn topic_by_uuid(&self, uuid: &Uuid) -> Option<&GeneratedTopicData> {
        self.topics.iter().find(|t| t.uuid == *uuid)
    }
}

impl GeneratedTopicData {
    pub fn partition(&self, partition_id: i32) -> Option<&GeneratedPartitionData> {
        self.partitions.iter().find(|p| p.partition_id == partition_id)
    }
}

fn validate(config: &LogDirectoryConfig) -> kgrade_common::Result<()> {
    let mut names = HashSet::new();
    for topic in &config.topics {
        if topic.name.is_empty() {
            return Err(Error::InvalidArgument("topic name must not be empty".to_string()));
        }
        if !names.insert(topic.name.as_str()) {
            return Err(Error::InvalidArgument(format!("duplicate topic {}", topic.name)));
        }
        let mut ids = HashSet::new();
        for partition in &topic.partitions {
            if partition.partition_id < 0 || !ids.insert(partition.partition_id) {
                return Err(Error::InvalidArgument(format!(
                    "invalid or duplicate partition {} for topic {}",
                    partition.partition_id, topic.name
                )));
            }
        }
    }
    Ok(())
}

/// Clears `config.root`, then writes the broker files, every topic partition and the
/// cluster metadata log describing them.
pub fn generate(config: &LogDirectoryConfig) -> Result<GeneratedLogDirectoryData> {
    validate(config)?;

    if config.root.exists() {
        std::fs::remove_dir_all(&config.root)
            .with_context(|| format!("Failed to remove log directory: {:?}", config.root))?;
    }
    std::fs::create_dir_all(&config.root)
        .with_context(|| format!("Failed to create log directory: {:?}", config.root))?;

    write_server_properties(&config.server_properties_path, &config.root)?;
    write_meta_properties(&config.root)?;
    write_clean_shutdown(&config.root)?;

    let mut data = GeneratedLogDirectoryData::default();
    for topic in &config.topics {
        let mut partitions = Vec::with_capacity(topic.partitions.len());
        for partition in &topic.partitions {
            let dir = config.partition_dir(&topic.name, partition.partition_id);
            let record_batches = write_partition(&dir, &topic.uuid, partition)?;
            partitions.push(GeneratedPartitionData {
                partition_id: partition.partition_id,
                record_batches,
            });
        }
        debug!("Generated topic {} ({}) with {} partitions", topic.name, topic.uuid, partitions.len());
        data.topics.push(GeneratedTopicData {
            name: topic.name.clone(),
            uuid: topic.uuid,
            partitions,
        });
    }

    write_cluster_metadata(&config.root.join(CLUSTER_METADATA_DIRECTORY), &config.topics)?;

    info!("Generated log directory at {}", config.root.display());
    Ok(data)
}
