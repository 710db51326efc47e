//! End-to-end scenarios run against a broker that is already listening.
//!
//! Each stage regenerates the log directory it needs, so a broker under test must read
//! its topics from disk when a request arrives, not once at startup.

mod base;
mod concurrent;
mod describe_topic_partitions;
mod fetch;
pub mod fixtures;
mod produce;

use anyhow::{Context, Result};
use futures::future::LocalBoxFuture;
use kgrade_client::{Client, ClientConfig};
use kgrade_storage::{generate, GeneratedLogDirectoryData, LogDirectoryConfig, TopicGenerationConfig};
use tracing::{info, info_span, Instrument};

/// Where the broker listens and where stages write its log directory.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub broker_addr: String,
    pub log_config: LogDirectoryConfig,
    pub client_config: ClientConfig,
}

impl StageContext {
    pub fn new(broker_addr: impl Into<String>, log_config: LogDirectoryConfig) -> Self {
        Self {
            broker_addr: broker_addr.into(),
            log_config,
            client_config: ClientConfig::default(),
        }
    }

    pub async fn connect(&self) -> Result<Client> {
        Client::connect_with_config(self.broker_addr.as_str(), self.client_config.clone()).await
    }

    /// Rewrites the log directory with exactly `topics`.
    pub fn generate(&self, topics: Vec<TopicGenerationConfig>) -> Result<GeneratedLogDirectoryData> {
        let config = self.log_config_with(topics);
        generate(&config).with_context(|| format!("Failed to generate log directory at {:?}", config.root))
    }

    pub fn log_config_with(&self, topics: Vec<TopicGenerationConfig>) -> LogDirectoryConfig {
        LogDirectoryConfig {
            topics,
            ..self.log_config.clone()
        }
    }
}

pub type StageFn = for<'a> fn(&'a StageContext) -> LocalBoxFuture<'a, Result<()>>;

pub struct Stage {
    pub slug: &'static str,
    pub title: &'static str,
    run: StageFn,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("slug", &self.slug)
            .field("title", &self.title)
            .finish()
    }
}

impl Stage {
    pub async fn run(&self, ctx: &StageContext) -> Result<()> {
        info!("Running stage {}: {}", self.slug, self.title);
        (self.run)(ctx)
            .instrument(info_span!("stage", slug = self.slug))
            .await
    }
}

macro_rules! stage {
    ($slug:literal, $title:literal, $run:path) => {
        Stage {
            slug: $slug,
            title: $title,
            run: $run,
        }
    };
}

pub static STAGES: &[Stage] = &[
    stage!("vi6", "Bind to a port", base::bind),
    stage!("nv3", "Send Correlation ID", base::hardcoded_correlation_id),
    stage!("wa6", "Parse Correlation ID", base::parse_correlation_id),
    stage!("nc5", "Parse API Version", base::unsupported_api_version),
    stage!("pv1", "Handle APIVersions requests", base::api_versions),
    stage!("nh4", "Serial requests", concurrent::serial_requests),
    stage!("sk0", "Concurrent requests", concurrent::concurrent_clients),
    stage!("yk1", "Include DescribeTopicPartitions in APIVersions", describe_topic_partitions::api_versions),
    stage!("vt6", "List for an unknown topic", describe_topic_partitions::unknown_topic),
    stage!("ea7", "List for a single partition", describe_topic_partitions::single_partition),
    stage!("ku4", "List for multiple partitions", describe_topic_partitions::multiple_partitions),
    stage!("wq2", "List for multiple topics", describe_topic_partitions::multiple_topics),
    stage!("gs0", "Include Fetch in APIVersions", fetch::api_versions),
    stage!("dh6", "Fetch with no topics", fetch::no_topics),
    stage!("hn6", "Fetch with an unknown topic", fetch::unknown_topic),
    stage!("cm4", "Fetch with an empty topic", fetch::empty_topic),
    stage!("eg2", "Fetch single message from disk", fetch::single_message),
    stage!("fd8", "Fetch multiple messages from disk", fetch::multiple_messages),
    stage!("xz1", "Include Produce in APIVersions", produce::api_versions),
    stage!("zf2", "Produce to an invalid topic", produce::unknown_topic),
    stage!("gg1", "Produce to an invalid partition", produce::unknown_partition),
    stage!("ls8", "Produce a single record", produce::single_record),
    stage!("yd8", "Produce multiple records", produce::multiple_records),
    stage!("ct4", "Produce to multiple partitions", produce::multiple_partitions),
    stage!("ov0", "Produce to multiple topics", produce::multiple_topics),
];

pub fn find(slug: &str) -> Option<&'static Stage> {
    STAGES.iter().find(|stage| stage.slug == slug)
}
