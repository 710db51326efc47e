use anyhow::{Context, Result};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use kgrade_protocol::DescribeTopicPartitionsRequestBuilder;
use kgrade_storage::GeneratedLogDirectoryData;

use super::base::check_api_versions;
use super::fixtures::{random_correlation_id, random_int, random_topic, random_topic_names};
use super::StageContext;
use crate::asserter::ResponseAsserter;
use crate::assertions::{
    expected_topics_from_generated, DescribeTopicPartitionsResponseAssertion, ExpectedTopic,
};

pub(super) fn api_versions(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    check_api_versions(ctx, &[(18, 0, 4), (75, 0, 0)]).boxed_local()
}

pub(super) fn unknown_topic(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let names = random_topic_names(2);
        ctx.generate(vec![random_topic(&names[0], &[0], 0)])?;

        let unknown = &names[1];
        let expected = vec![ExpectedTopic::unknown(unknown.as_str())];
        describe(ctx, vec![unknown.clone()], 1, expected).await
    }
    .boxed_local()
}

pub(super) fn single_partition(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let name = random_topic_names(1).remove(0);
        let data = ctx.generate(vec![random_topic(&name, &[0], 1)])?;
        describe_generated(ctx, &data, vec![name], 1).await
    }
    .boxed_local()
}

pub(super) fn multiple_partitions(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let name = random_topic_names(1).remove(0);
        let partition_count = random_int(2, 3);
        let partition_ids: Vec<i32> = (0..partition_count).collect();
        let data = ctx.generate(vec![random_topic(&name, &partition_ids, 1)])?;
        describe_generated(ctx, &data, vec![name], partition_count).await
    }
    .boxed_local()
}

pub(super) fn multiple_topics(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let names = random_topic_names(3);
        let topics = names.iter().map(|name| random_topic(name, &[0], 1)).collect();
        let data = ctx.generate(topics)?;
        describe_generated(ctx, &data, names, 4).await
    }
    .boxed_local()
}

async fn describe_generated(
    ctx: &StageContext,
    data: &GeneratedLogDirectoryData,
    names: Vec<String>,
    partition_limit: i32,
) -> Result<()> {
    let mut topics = Vec::with_capacity(names.len());
    for name in &names {
        topics.push(
            data.topic(name)
                .with_context(|| format!("Internal Error: topic {name} was not generated"))?,
        );
    }
    describe(ctx, names, partition_limit, expected_topics_from_generated(topics)).await
}

async fn describe(
    ctx: &StageContext,
    names: Vec<String>,
    partition_limit: i32,
    expected: Vec<ExpectedTopic>,
) -> Result<()> {
    let mut client = ctx.connect().await?;
    let correlation_id = random_correlation_id();
    let request = DescribeTopicPartitionsRequestBuilder::new()
        .correlation_id(correlation_id)
        .topic_names(names)
        .response_partition_limit(partition_limit)
        .build();
    let response = client.send_and_receive(&request).await?;

    let assertion = DescribeTopicPartitionsResponseAssertion::new()
        .correlation_id(correlation_id)
        .topics(expected);
    ResponseAsserter::new(&assertion).decode_and_assert(&response)?;
    client.close().await
}
