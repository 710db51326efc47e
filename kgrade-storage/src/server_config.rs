//! Broker-level files: `server.properties`, `meta.properties` and the clean shutdown sentinel.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use kgrade_common::constants::{
    CLUSTER_ID, DIRECTORY_UUID, KAFKA_CLEAN_SHUTDOWN_FILE_NAME, META_PROPERTIES_FILE_NAME,
    META_VERSION, NODE_ID,
};
use serde::Serialize;
use tracing::debug;

use crate::uuid_to_base64;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanShutdown {
    version: i32,
    broker_epoch: i64,
}

/// KRaft combined-mode configuration for a single broker/controller node.
pub fn server_properties(log_dir: &Path) -> String {
    [
        "process.roles=broker,controller".to_string(),
        format!("node.id={NODE_ID}"),
        format!("controller.quorum.voters={NODE_ID}@localhost:9093"),
        "listeners=PLAINTEXT://:9092,CONTROLLER://:9093".to_string(),
        "controller.listener.names=CONTROLLER".to_string(),
        "listener.security.protocol.map=CONTROLLER:PLAINTEXT,PLAINTEXT:PLAINTEXT,SSL:SSL,SASL_PLAINTEXT:SASL_PLAINTEXT,SASL_SSL:SASL_SSL".to_string(),
        format!("log.dirs={}", log_dir.display()),
    ]
    .join("\n")
}

pub fn write_server_properties(path: &Path, log_dir: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    std::fs::write(path, server_properties(log_dir))
        .with_context(|| format!("Failed to write server properties: {:?}", path))?;
    debug!("Wrote server properties to {}", path.display());
    Ok(())
}

/// `meta.properties` identifies the cluster, the log directory and the node.
pub fn meta_properties(generated_at: SystemTime) -> Result<String> {
    let millis = generated_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let directory_id = uuid_to_base64(&DIRECTORY_UUID.parse()?);
    Ok(format!(
        "#\n#{millis}\ncluster.id={CLUSTER_ID}\ndirectory.id={directory_id}\nnode.id={NODE_ID}\nversion={META_VERSION}\n"
    ))
}

pub fn write_meta_properties(log_dir: &Path) -> Result<()> {
    let path = log_dir.join(META_PROPERTIES_FILE_NAME);
    std::fs::write(&path, meta_properties(SystemTime::now())?)
        .with_context(|| format!("Failed to write meta properties: {:?}", path))?;
    debug!("Wrote meta properties to {}", path.display());
    Ok(())
}

pub fn clean_shutdown() -> Result<String> {
    Ok(serde_json::to_string(&CleanShutdown {
        version: 0,
        broker_epoch: 10,
    })?)
}

pub fn write_clean_shutdown(log_dir: &Path) -> Result<()> {
    let path = log_dir.join(KAFKA_CLEAN_SHUTDOWN_FILE_NAME);
    std::fs::write(&path, clean_shutdown()?)
        .with_context(|| format!("Failed to write clean shutdown file: {:?}", path))?;
    debug!("Wrote kafka clean shutdown to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_shutdown_json() {
        assert_eq!(clean_shutdown().unwrap(), r#"{"version":0,"brokerEpoch":10}"#);
    }

    #[test]
    fn test_meta_properties() {
        let content = meta_properties(UNIX_EPOCH).unwrap();
        assert_eq!(
            content,
            "#\n#0\ncluster.id=IAAAAAAAQACAAAAAAAAAAQ\ndirectory.id=EAAAAAAAQACAAAAAAAAAAQ==\nnode.id=1\nversion=1\n"
        );
    }

    #[test]
    fn test_server_properties_points_at_log_dir() {
        let content = server_properties(Path::new("/tmp/kraft-combined-logs"));
        assert_eq!(content.lines().count(), 7);
        assert!(content.starts_with("process.roles=broker,controller\nnode.id=1\n"));
        assert!(content.ends_with("log.dirs=/tmp/kraft-combined-logs"));
    }
}
