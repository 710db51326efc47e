//! Generates the on-disk KRaft log directory a broker under test boots from.

pub mod cluster_metadata;
pub mod config;
pub mod generator;
pub mod partition;
pub mod reader;
pub mod server_config;


use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

pub use config::{LogDirectoryConfig, PartitionGenerationConfig, TopicGenerationConfig};
pub use generator::{generate, GeneratedLogDirectoryData, GeneratedPartitionData, GeneratedTopicData};
pub use reader::{read_cluster_metadata, read_log_file, read_partitions, read_record_batches};

/// Padded standard base64 of the UUID's 16 bytes, as the broker expects in metadata files.
pub fn uuid_to_base64(uuid: &Uuid) -> String {
    STANDARD.encode(uuid.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_to_base64() {
        let uuid: Uuid = "10000000-0000-4000-8000-000000000001".parse().unwrap();
        assert_eq!(uuid_to_base64(&uuid), "EAAAAAAAQACAAAAAAAAAAQ==");
    }
}
