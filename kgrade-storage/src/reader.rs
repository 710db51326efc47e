//! Reads a generated log directory back through the protocol codec.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use kgrade_common::constants::{CLUSTER_METADATA_DIRECTORY, LOG_FILE_NAME};
use kgrade_protocol::{decode_record_batches, ClusterMetadataPayload, RecordBatch};
use tracing::warn;

/// Splits `topic-partition` at the last dash.
pub fn parse_partition_dir_name(name: &str) -> Option<(&str, i32)> {
    let idx = name.rfind('-')?;
    let topic = &name[..idx];
    if topic.is_empty() {
        return None;
    }
    let partition = name[idx + 1..].parse::<i32>().ok()?;
    (partition >= 0).then_some((topic, partition))
}

/// Raw bytes of a partition's first segment.
pub fn read_log_file(dir: &Path) -> Result<Vec<u8>> {
    let path = dir.join(LOG_FILE_NAME);
    std::fs::read(&path).with_context(|| format!("Failed to read log file: {:?}", path))
}

pub fn read_record_batches(dir: &Path) -> Result<Vec<RecordBatch>> {
    let bytes = read_log_file(dir)?;
    decode_record_batches(&bytes).with_context(|| format!("Failed to decode record batches in {:?}", dir))
}

/// Every payload in the cluster metadata log, in offset order.
pub fn read_cluster_metadata(root: &Path) -> Result<Vec<ClusterMetadataPayload>> {
    let dir = root.join(CLUSTER_METADATA_DIRECTORY);
    let mut payloads = Vec::new();
    for batch in read_record_batches(&dir)? {
        for record in &batch.records {
            let Some(value) = &record.value else {
                continue;
            };
            let offset = batch.base_offset + record.offset_delta as i64;
            let payload = ClusterMetadataPayload::decode(value).with_context(|| {
                format!("Failed to decode cluster metadata record at offset {offset}")
            })?;
            payloads.push(payload);
        }
    }
    Ok(payloads)
}

/// Record batches of every `topic-partition` directory under `root`, keyed by
/// `(topic, partition)`. The cluster metadata partition is skipped.
pub fn read_partitions(root: &Path) -> Result<BTreeMap<(String, i32), Vec<RecordBatch>>> {
    let mut partitions = BTreeMap::new();
    let entries =
        std::fs::read_dir(root).with_context(|| format!("Failed to list log directory: {:?}", root))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name == CLUSTER_METADATA_DIRECTORY {
            continue;
        }
        match parse_partition_dir_name(name) {
            Some((topic, partition)) => {
                let batches = read_record_batches(&entry.path())?;
                partitions.insert((topic.to_string(), partition), batches);
            }
            None => warn!("Skipping unrecognized directory {}", entry.path().display()),
        }
    }
    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partition_dir_name() {
        assert_eq!(parse_partition_dir_name("foo-0"), Some(("foo", 0)));
        assert_eq!(parse_partition_dir_name("my-topic-12"), Some(("my-topic", 12)));
        assert_eq!(parse_partition_dir_name("foo"), None);
        assert_eq!(parse_partition_dir_name("-1"), None);
        assert_eq!(parse_partition_dir_name("foo-bar"), None);
    }
}
