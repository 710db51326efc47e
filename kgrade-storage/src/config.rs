use std::path::PathBuf;

use kgrade_common::constants::{KRAFT_LOG_DIRECTORY, SERVER_PROPERTIES_FILE_PATH};
use uuid::Uuid;

/// One partition to write: each log string becomes its own single-record batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionGenerationConfig {
    pub partition_id: i32,
    pub logs: Vec<String>,
}

impl PartitionGenerationConfig {
    pub fn new(partition_id: i32, logs: Vec<String>) -> Self {
        Self { partition_id, logs }
    }

    /// A partition with no messages.
    pub fn empty(partition_id: i32) -> Self {
        Self::new(partition_id, Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicGenerationConfig {
    pub name: String,
    pub uuid: Uuid,
    pub partitions: Vec<PartitionGenerationConfig>,
}

impl TopicGenerationConfig {
    pub fn new(name: impl Into<String>, uuid: Uuid, partitions: Vec<PartitionGenerationConfig>) -> Self {
        Self {
            name: name.into(),
            uuid,
            partitions,
        }
    }
}

/// Where to write and what to put there.
#[derive(Debug, Clone)]
pub struct LogDirectoryConfig {
    /// Removed and recreated on every generation.
    pub root: PathBuf,
    pub server_properties_path: PathBuf,
    pub topics: Vec<TopicGenerationConfig>,
}

impl Default for LogDirectoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(KRAFT_LOG_DIRECTORY),
            server_properties_path: PathBuf::from(SERVER_PROPERTIES_FILE_PATH),
            topics: Vec::new(),
        }
    }
}

impl LogDirectoryConfig {
    pub fn with_topics(topics: Vec<TopicGenerationConfig>) -> Self {
        Self {
            topics,
            ..Default::default()
        }
    }

    pub fn partition_dir(&self, topic: &str, partition_id: i32) -> PathBuf {
        self.root.join(format!("{topic}-{partition_id}"))
    }
}
