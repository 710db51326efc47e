//! Fixed identities written into the generated KRaft log directory.
//!
//! The broker under test reads these back, so they never change between runs.

/// Root of the generated log directory.
pub const KRAFT_LOG_DIRECTORY: &str = "/tmp/kraft-combined-logs";

/// Location of the generated broker configuration.
pub const SERVER_PROPERTIES_FILE_PATH: &str = "/tmp/server.properties";

/// Name of every segment file the generator writes.
pub const LOG_FILE_NAME: &str = "00000000000000000000.log";

/// Directory holding the cluster metadata partition.
pub const CLUSTER_METADATA_DIRECTORY: &str = "__cluster_metadata-0";

/// Per-partition metadata file name.
pub const PARTITION_METADATA_FILE_NAME: &str = "partition.metadata";

/// Clean shutdown sentinel file name.
pub const KAFKA_CLEAN_SHUTDOWN_FILE_NAME: &str = ".kafka_cleanshutdown";

/// Broker identity file name.
pub const META_PROPERTIES_FILE_NAME: &str = "meta.properties";

/// Log directory id, also listed in every partition record.
pub const DIRECTORY_UUID: &str = "10000000-0000-4000-8000-000000000001";

/// Topic id of `__cluster_metadata`, already base64 encoded.
pub const CLUSTER_METADATA_TOPIC_ID: &str = "AAAAAAAAAAAAAAAAAAAAAQ";

/// Cluster id, already base64 encoded.
pub const CLUSTER_ID: &str = "IAAAAAAAQACAAAAAAAAAAQ";

/// Node id of the single broker/controller.
pub const NODE_ID: i32 = 1;

/// `version` written to meta.properties.
pub const META_VERSION: i32 = 1;

/// Port the broker under test must listen on.
pub const BROKER_PORT: u16 = 9092;
