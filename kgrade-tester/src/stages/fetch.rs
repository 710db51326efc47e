use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use kgrade_protocol::{ErrorCode, FetchRequestBuilder};
use kgrade_storage::read_record_batches;
use uuid::Uuid;

use super::base::check_api_versions;
use super::fixtures::{random_correlation_id, random_int, random_topic, random_topic_name, random_uuid};
use super::StageContext;
use crate::asserter::ResponseAsserter;
use crate::assertions::{ExpectedFetchPartition, ExpectedFetchTopic, FetchResponseAssertion};

pub(super) fn api_versions(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    check_api_versions(ctx, &[(18, 0, 4), (1, 0, 16)]).boxed_local()
}

pub(super) fn no_topics(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let mut client = ctx.connect().await?;
        let correlation_id = random_correlation_id();
        let request = FetchRequestBuilder::new().correlation_id(correlation_id).build();
        let response = client.send_and_receive(&request).await?;

        let assertion = FetchResponseAssertion::new().correlation_id(correlation_id);
        ResponseAsserter::new(&assertion).decode_and_assert(&response)?;
        client.close().await
    }
    .boxed_local()
}

pub(super) fn unknown_topic(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        ctx.generate(vec![random_topic(&random_topic_name(), &[0], 1)])?;
        let unknown = random_uuid();
        let expected = ExpectedFetchPartition::error(0, ErrorCode::UnknownTopicId.code());
        fetch_one(ctx, unknown, expected).await
    }
    .boxed_local()
}

pub(super) fn empty_topic(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    fetch_from_disk(ctx, 0).boxed_local()
}

pub(super) fn single_message(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    fetch_from_disk(ctx, 1).boxed_local()
}

pub(super) fn multiple_messages(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move { fetch_from_disk(ctx, random_int(2, 4) as usize).await }.boxed_local()
}

/// Writes one partition holding `message_count` messages and expects them back verbatim.
async fn fetch_from_disk(ctx: &StageContext, message_count: usize) -> Result<()> {
    let topic = random_topic(&random_topic_name(), &[0], message_count);
    let uuid = topic.uuid;
    let dir = ctx.log_config.partition_dir(&topic.name, 0);
    ctx.generate(vec![topic])?;

    let on_disk = read_record_batches(&dir)?;
    fetch_one(ctx, uuid, ExpectedFetchPartition::with_batches(0, on_disk)).await
}

async fn fetch_one(ctx: &StageContext, topic_uuid: Uuid, expected: ExpectedFetchPartition) -> Result<()> {
    let mut client = ctx.connect().await?;
    let correlation_id = random_correlation_id();
    let request = FetchRequestBuilder::new()
        .correlation_id(correlation_id)
        .topic(topic_uuid, &[expected.id])
        .build();
    let response = client.send_and_receive(&request).await?;

    let assertion = FetchResponseAssertion::new()
        .correlation_id(correlation_id)
        .topic(ExpectedFetchTopic {
            uuid: topic_uuid,
            partitions: vec![expected],
        });
    ResponseAsserter::new(&assertion).decode_and_assert(&response)?;
    client.close().await
}
