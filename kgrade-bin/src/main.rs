use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use kgrade_common::constants::{BROKER_PORT, KRAFT_LOG_DIRECTORY, SERVER_PROPERTIES_FILE_PATH};
use kgrade_storage::{generate, LogDirectoryConfig, TopicGenerationConfig};
use kgrade_tester::stages::fixtures::{random_int, random_topic, random_topic_names};
use kgrade_tester::{find, Stage, StageContext, STAGES};
use tracing::{error, info, Level};

/// Grades a Kafka broker over the wire
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info", value_parser = parse_log_level)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct LogDirectoryArgs {
    /// Log directory the broker reads its topics from
    #[arg(long, default_value = KRAFT_LOG_DIRECTORY)]
    root: PathBuf,

    /// Where to write the broker's server.properties
    #[arg(long, default_value = SERVER_PROPERTIES_FILE_PATH)]
    server_properties: PathBuf,
}

impl LogDirectoryArgs {
    fn config(&self, topics: Vec<TopicGenerationConfig>) -> LogDirectoryConfig {
        LogDirectoryConfig {
            root: self.root.clone(),
            server_properties_path: self.server_properties.clone(),
            topics,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a log directory with a few random topics
    Generate {
        #[command(flatten)]
        dirs: LogDirectoryArgs,
    },
    /// Run stages against a broker that is already listening
    Run {
        /// Broker address
        #[arg(short, long, default_value_t = format!("localhost:{BROKER_PORT}"))]
        broker: String,

        /// Stage slugs to run, in order (default: all)
        #[arg(short, long = "stage")]
        stages: Vec<String>,

        #[command(flatten)]
        dirs: LogDirectoryArgs,
    },
    /// List stage slugs and titles
    List,
}

fn parse_log_level(name: &str) -> std::result::Result<Level, String> {
    kgrade_common::logging::parse_level(name).map_err(|e| e.to_string())
}

fn demo_topics() -> Vec<TopicGenerationConfig> {
    random_topic_names(3)
        .iter()
        .map(|name| {
            let partition_ids: Vec<i32> = (0..random_int(1, 3)).collect();
            random_topic(name, &partition_ids, random_int(1, 3) as usize)
        })
        .collect()
}

fn select_stages(slugs: &[String]) -> Result<Vec<&'static Stage>> {
    if slugs.is_empty() {
        return Ok(STAGES.iter().collect());
    }
    let mut selected = Vec::with_capacity(slugs.len());
    for slug in slugs {
        match find(slug) {
            Some(stage) => selected.push(stage),
            None => bail!("Unknown stage: {slug}"),
        }
    }
    Ok(selected)
}

async fn run(broker: String, slugs: &[String], dirs: &LogDirectoryArgs) -> Result<bool> {
    let stages = select_stages(slugs)?;
    let config = dirs.config(demo_topics());
    generate(&config)?;
    info!("Generated log directory at {:?}", config.root);

    let ctx = StageContext::new(broker, config);
    for stage in stages {
        if let Err(e) = stage.run(&ctx).await {
            error!("{e:#}");
            error!("Test failed ({})", stage.slug);
            return Ok(false);
        }
        info!("Test passed.");
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    kgrade_common::logging::init_logging(cli.log_level);

    match cli.command {
        Command::Generate { dirs } => {
            let config = dirs.config(demo_topics());
            let generated = generate(&config)?;
            for topic in &generated.topics {
                info!(
                    "Generated topic {} ({}) with {} partitions",
                    topic.name,
                    topic.uuid,
                    topic.partitions.len()
                );
            }
        }
        Command::Run { broker, stages, dirs } => {
            if !run(broker, &stages, &dirs).await? {
                std::process::exit(1);
            }
        }
        Command::List => {
            for stage in STAGES {
                println!("{}\t{}", stage.slug, stage.title);
            }
        }
    }
    Ok(())
}
