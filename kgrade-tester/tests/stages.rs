//! Runs every stage against a small in-process broker that serves the generated log
//! directory, then checks a misbehaving broker is caught.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use kgrade_client::ClientConfig;
use kgrade_common::constants::{CLUSTER_METADATA_DIRECTORY, LOG_FILE_NAME};
use kgrade_protocol::primitives::pack_as_message;
use kgrade_protocol::*;
use kgrade_storage::{read_cluster_metadata, read_record_batches, LogDirectoryConfig};
use kgrade_tester::{find, StageContext, STAGES};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

const SUPPORTED_API_KEYS: &[(i16, i16, i16)] = &[(0, 0, 11), (1, 0, 16), (18, 0, 4), (75, 0, 0)];

#[derive(Debug, Clone, Copy, Default)]
struct Quirks {
    /// Answers with the request's correlation id plus one.
    wrong_correlation_id: bool,
    /// Counts the size prefix in the message size.
    size_includes_prefix: bool,
}

struct KnownTopic {
    name: String,
    uuid: Uuid,
    partitions: Vec<i32>,
}

#[derive(Clone)]
struct FakeBroker {
    root: PathBuf,
    quirks: Quirks,
}

impl FakeBroker {
    async fn start(root: PathBuf, quirks: Quirks) -> Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let broker = FakeBroker { root, quirks };
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let broker = broker.clone();
                tokio::spawn(async move {
                    let _ = broker.serve(stream).await;
                });
            }
        });
        Ok(addr)
    }

    async fn serve(&self, mut stream: TcpStream) -> Result<()> {
        loop {
            let mut size = [0u8; 4];
            if stream.read_exact(&mut size).await.is_err() {
                return Ok(());
            }
            let mut payload = vec![0u8; i32::from_be_bytes(size) as usize];
            stream.read_exact(&mut payload).await?;

            let response = self.handle(&payload)?;
            let mut framed = pack_as_message(&response).to_vec();
            if self.quirks.size_includes_prefix {
                framed[..4].copy_from_slice(&(response.len() as i32 + 4).to_be_bytes());
            }
            stream.write_all(&framed).await?;
        }
    }

    fn handle(&self, payload: &[u8]) -> Result<bytes::Bytes> {
        let header = decode_request_header(payload)?;
        let correlation_id = if self.quirks.wrong_correlation_id {
            header.correlation_id.wrapping_add(1)
        } else {
            header.correlation_id
        };
        let response_header = ResponseHeader { correlation_id };

        let encoded = match ApiKey::from_i16(header.api_key) {
            Some(ApiKey::ApiVersions) => Response {
                header: response_header,
                body: api_versions(header.api_version),
            }
            .encode(),
            Some(ApiKey::DescribeTopicPartitions) => {
                let request = DescribeTopicPartitionsRequest::decode(payload)?;
                Response {
                    header: response_header,
                    body: self.describe(&request.body)?,
                }
                .encode()
            }
            Some(ApiKey::Fetch) => {
                let request = FetchRequest::decode(payload)?;
                Response {
                    header: response_header,
                    body: self.fetch(&request.body)?,
                }
                .encode()
            }
            Some(ApiKey::Produce) => {
                let request = ProduceRequest::decode(payload)?;
                Response {
                    header: response_header,
                    body: self.produce(&request.body)?,
                }
                .encode()
            }
            _ => anyhow::bail!("unsupported api key {}", header.api_key),
        };
        Ok(encoded)
    }

    fn known_topics(&self) -> Result<Vec<KnownTopic>> {
        let mut topics: Vec<KnownTopic> = Vec::new();
        if !self.root.join(CLUSTER_METADATA_DIRECTORY).exists() {
            return Ok(topics);
        }
        for payload in read_cluster_metadata(&self.root)? {
            match payload.data {
                ClusterMetadataRecord::Topic(record) => topics.push(KnownTopic {
                    name: record.topic_name,
                    uuid: record.topic_uuid,
                    partitions: Vec::new(),
                }),
                ClusterMetadataRecord::Partition(record) => {
                    if let Some(topic) = topics.iter_mut().find(|t| t.uuid == record.topic_uuid) {
                        topic.partitions.push(record.partition_id);
                    }
                }
                _ => {}
            }
        }
        Ok(topics)
    }

    fn partition_dir(&self, topic: &str, partition: i32) -> PathBuf {
        self.root.join(format!("{topic}-{partition}"))
    }

    fn describe(&self, request: &DescribeTopicPartitionsRequestBody) -> Result<DescribeTopicPartitionsResponseBody> {
        let known = self.known_topics()?;
        let mut names = request.topic_names.clone();
        names.sort();
        let topics = names
            .into_iter()
            .map(|name| match known.iter().find(|t| t.name == name) {
                Some(topic) => DescribeTopicPartitionsResponseTopic {
                    error_code: 0,
                    name: Some(name),
                    topic_uuid: topic.uuid,
                    is_internal: false,
                    partitions: topic
                        .partitions
                        .iter()
                        .map(|&partition_index| DescribeTopicPartitionsResponsePartition {
                            partition_index,
                            leader_id: 1,
                            replica_nodes: vec![1],
                            isr_nodes: vec![1],
                            ..Default::default()
                        })
                        .collect(),
                    topic_authorized_operations: 0x0df8,
                },
                None => DescribeTopicPartitionsResponseTopic {
                    error_code: ErrorCode::UnknownTopicOrPartition.code(),
                    name: Some(name),
                    topic_uuid: Uuid::nil(),
                    is_internal: false,
                    partitions: Vec::new(),
                    topic_authorized_operations: 0x0df8,
                },
            })
            .collect();
        Ok(DescribeTopicPartitionsResponseBody {
            throttle_time_ms: 0,
            topics,
            next_cursor: None,
        })
    }

    fn fetch(&self, request: &FetchRequestBody) -> Result<FetchResponseBody> {
        let known = self.known_topics()?;
        let mut topics = Vec::new();
        for requested in &request.topics {
            let topic = known.iter().find(|t| t.uuid == requested.topic_uuid);
            let mut partitions = Vec::new();
            for partition in &requested.partitions {
                partitions.push(match topic {
                    Some(topic) => FetchResponsePartition {
                        id: partition.id,
                        record_batches: read_record_batches(&self.partition_dir(&topic.name, partition.id))?,
                        ..Default::default()
                    },
                    None => FetchResponsePartition {
                        id: partition.id,
                        error_code: ErrorCode::UnknownTopicId.code(),
                        ..Default::default()
                    },
                });
            }
            topics.push(FetchResponseTopic {
                topic_uuid: requested.topic_uuid,
                partitions,
            });
        }
        Ok(FetchResponseBody {
            topics,
            ..Default::default()
        })
    }

    fn produce(&self, request: &ProduceRequestBody) -> Result<ProduceResponseBody> {
        let known = self.known_topics()?;
        let mut topics = Vec::new();
        for requested in &request.topics {
            let topic = known.iter().find(|t| t.name == requested.name);
            let mut partitions = Vec::new();
            for partition in &requested.partitions {
                let exists = topic.is_some_and(|t| t.partitions.contains(&partition.id));
                partitions.push(if exists {
                    let base_offset = append(&self.partition_dir(&requested.name, partition.id), &partition.record_batches)?;
                    ProduceResponsePartition {
                        id: partition.id,
                        base_offset,
                        log_append_time_ms: -1,
                        log_start_offset: 0,
                        ..Default::default()
                    }
                } else {
                    ProduceResponsePartition {
                        id: partition.id,
                        error_code: ErrorCode::UnknownTopicOrPartition.code(),
                        base_offset: -1,
                        log_append_time_ms: -1,
                        log_start_offset: -1,
                        ..Default::default()
                    }
                });
            }
            topics.push(ProduceResponseTopic {
                name: requested.name.clone(),
                partitions,
            });
        }
        Ok(ProduceResponseBody {
            topics,
            throttle_time_ms: 0,
        })
    }
}

fn api_versions(api_version: i16) -> ApiVersionsResponseBody {
    if !(0..=4).contains(&api_version) {
        return ApiVersionsResponseBody {
            error_code: ErrorCode::UnsupportedVersion.code(),
            ..Default::default()
        };
    }
    ApiVersionsResponseBody {
        error_code: 0,
        api_keys: SUPPORTED_API_KEYS
            .iter()
            .map(|&(api_key, min_version, max_version)| ApiKeyVersions {
                api_key,
                min_version,
                max_version,
            })
            .collect(),
        throttle_time_ms: 0,
    }
}

/// Appends `batches` at the end of the log, returning the first new offset.
fn append(dir: &Path, batches: &[RecordBatch]) -> Result<i64> {
    let mut log = read_record_batches(dir)?;
    let base_offset = log
        .last()
        .map_or(0, |b| b.base_offset + b.last_offset_delta as i64 + 1);
    let mut next = base_offset;
    for batch in batches {
        log.push(RecordBatch {
            base_offset: next,
            ..batch.clone()
        });
        next += batch.last_offset_delta as i64 + 1;
    }
    let path = dir.join(LOG_FILE_NAME);
    std::fs::write(&path, encode_record_batches(&log)).with_context(|| format!("writing {path:?}"))?;
    Ok(base_offset)
}

async fn context(dir: &TempDir, quirks: Quirks) -> Result<StageContext> {
    let log_config = LogDirectoryConfig {
        root: dir.path().join("kraft-combined-logs"),
        server_properties_path: dir.path().join("server.properties"),
        topics: Vec::new(),
    };
    let addr = FakeBroker::start(log_config.root.clone(), quirks).await?;
    let mut ctx = StageContext::new(addr.to_string(), log_config);
    ctx.client_config = ClientConfig {
        connect_retries: 2,
        retry_interval: Duration::from_millis(10),
        read_timeout: Duration::from_millis(500),
        write_timeout: Duration::from_millis(500),
        ..ClientConfig::default()
    };
    Ok(ctx)
}

#[tokio::test]
async fn test_every_stage_passes_against_a_correct_broker() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = context(&dir, Quirks::default()).await?;
    for stage in STAGES {
        stage
            .run(&ctx)
            .await
            .with_context(|| format!("stage {} failed", stage.slug))?;
    }
    Ok(())
}

#[tokio::test]
async fn test_wrong_correlation_id_is_caught() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = context(
        &dir,
        Quirks {
            wrong_correlation_id: true,
            ..Quirks::default()
        },
    )
    .await?;

    let stage = find("nv3").context("missing stage")?;
    let err = stage.run(&ctx).await.unwrap_err();
    assert_eq!(err.to_string(), "Expected CorrelationID to be 7, got 8");

    let stage = find("pv1").context("missing stage")?;
    let err = stage.run(&ctx).await.unwrap_err();
    assert!(err.to_string().starts_with("Expected CorrelationID to be "));
    Ok(())
}

#[tokio::test]
async fn test_message_size_counting_itself_is_caught() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = context(
        &dir,
        Quirks {
            size_includes_prefix: true,
            ..Quirks::default()
        },
    )
    .await?;

    // The correlation id stages read raw bytes and do not look at the size.
    find("nv3").context("missing stage")?.run(&ctx).await?;

    let err = find("pv1").context("missing stage")?.run(&ctx).await.unwrap_err();
    assert!(err
        .to_string()
        .ends_with("Hint: The Message Size field should not count itself."));
    Ok(())
}

#[tokio::test]
async fn test_bind_fails_without_a_broker() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let mut ctx = StageContext::new(addr.to_string(), LogDirectoryConfig {
        root: dir.path().join("logs"),
        server_properties_path: dir.path().join("server.properties"),
        topics: Vec::new(),
    });
    ctx.client_config.connect_retries = 1;
    ctx.client_config.retry_interval = Duration::from_millis(10);

    let err = find("vi6").context("missing stage")?.run(&ctx).await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to connect to broker"));
    Ok(())
}
