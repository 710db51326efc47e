use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use kgrade_protocol::{ErrorCode, ProduceRequestBuilder, Record, RecordBatch, RecordBatchBuilder};

use super::base::check_api_versions;
use super::fixtures::{random_correlation_id, random_int, random_messages, random_topic, random_topic_names};
use super::StageContext;
use crate::asserter::ResponseAsserter;
use crate::assertions::{
    assert_files_on_disk, ExpectedPartitionLog, ExpectedProducePartition, ExpectedProduceTopic,
    ProduceResponseAssertion,
};

/// Produced batches carry the time they were built.
fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

/// A batch as a non-idempotent producer sends it: offsets start at 0, no producer id.
pub(crate) fn produced_batch(messages: &[String]) -> RecordBatch {
    messages
        .iter()
        .enumerate()
        .fold(
            RecordBatchBuilder::new()
                .timestamp(now_ms())
                .producer(-1, -1, -1),
            |builder, (i, message)| {
                builder.record(Record {
                    offset_delta: i as i32,
                    value: Some(message.clone().into()),
                    ..Default::default()
                })
            },
        )
        .build()
}

/// The batch as the broker stores it at `base_offset`.
fn stored_at(batch: &RecordBatch, base_offset: i64) -> RecordBatch {
    RecordBatch {
        base_offset,
        ..batch.clone()
    }
}

pub(super) fn api_versions(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    check_api_versions(ctx, &[(18, 0, 4), (0, 0, 11)]).boxed_local()
}

pub(super) fn unknown_topic(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let names = random_topic_names(2);
        ctx.generate(vec![random_topic(&names[0], &[0], 0)])?;

        let batch = produced_batch(&random_messages(1));
        let expected = ExpectedProduceTopic::new(
            names[1].as_str(),
            vec![ExpectedProducePartition::error(0, ErrorCode::UnknownTopicOrPartition.code())],
        );
        produce(ctx, &[(names[1].as_str(), 0, batch)], vec![expected]).await
    }
    .boxed_local()
}

pub(super) fn unknown_partition(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let name = random_topic_names(1).remove(0);
        ctx.generate(vec![random_topic(&name, &[0], 0)])?;

        let partition = random_int(4, 10);
        let batch = produced_batch(&random_messages(1));
        let expected = ExpectedProduceTopic::new(
            name.as_str(),
            vec![ExpectedProducePartition::error(partition, ErrorCode::UnknownTopicOrPartition.code())],
        );
        produce(ctx, &[(name.as_str(), partition, batch)], vec![expected]).await
    }
    .boxed_local()
}

/// Two requests, one record each, over one connection: base offsets 0 then 1.
pub(super) fn single_record(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let name = random_topic_names(1).remove(0);
        ctx.generate(vec![random_topic(&name, &[0], 0)])?;

        let mut client = ctx.connect().await?;
        let mut on_disk = Vec::new();
        for base_offset in 0..2 {
            let batch = produced_batch(&random_messages(1));
            let correlation_id = random_correlation_id();
            let request = ProduceRequestBuilder::new()
                .correlation_id(correlation_id)
                .batches(&name, 0, vec![batch.clone()])
                .build();
            let response = client.send_and_receive(&request).await?;

            let assertion = ProduceResponseAssertion::new().correlation_id(correlation_id).topic(
                ExpectedProduceTopic::new(name.as_str(), vec![ExpectedProducePartition::success(0, base_offset)]),
            );
            ResponseAsserter::new(&assertion).decode_and_assert(&response)?;
            on_disk.push(stored_at(&batch, base_offset));
        }
        client.close().await?;

        assert_files_on_disk(&ctx.log_config, &[ExpectedPartitionLog::new(name, 0, on_disk)])?;
        Ok(())
    }
    .boxed_local()
}

pub(super) fn multiple_records(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let name = random_topic_names(1).remove(0);
        ctx.generate(vec![random_topic(&name, &[0], 0)])?;

        let batch = produced_batch(&random_messages(random_int(2, 4) as usize));
        let expected = ExpectedProduceTopic::new(name.as_str(), vec![ExpectedProducePartition::success(0, 0)]);
        produce(ctx, &[(name.as_str(), 0, batch)], vec![expected]).await
    }
    .boxed_local()
}

pub(super) fn multiple_partitions(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let name = random_topic_names(1).remove(0);
        ctx.generate(vec![random_topic(&name, &[0, 1, 2], 0)])?;

        let targets = [
            (name.as_str(), 0, produced_batch(&random_messages(1))),
            (name.as_str(), 1, produced_batch(&random_messages(1))),
        ];
        let expected = ExpectedProduceTopic::new(
            name.as_str(),
            vec![ExpectedProducePartition::success(0, 0), ExpectedProducePartition::success(1, 0)],
        );
        produce(ctx, &targets, vec![expected]).await
    }
    .boxed_local()
}

pub(super) fn multiple_topics(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let names = random_topic_names(2);
        ctx.generate(
            names
                .iter()
                .map(|name| random_topic(name, &[0], 0))
                .collect(),
        )?;

        let targets: Vec<(&str, i32, RecordBatch)> = names
            .iter()
            .map(|name| (name.as_str(), 0, produced_batch(&random_messages(1))))
            .collect();
        let expected = names
            .iter()
            .map(|name| ExpectedProduceTopic::new(name.as_str(), vec![ExpectedProducePartition::success(0, 0)]))
            .collect();
        produce(ctx, &targets, expected).await
    }
    .boxed_local()
}

/// Sends one request with a batch per `(topic, partition)` and checks the response, then
/// checks that every accepted batch landed on disk at offset 0.
async fn produce(
    ctx: &StageContext,
    targets: &[(&str, i32, RecordBatch)],
    expected: Vec<ExpectedProduceTopic>,
) -> Result<()> {
    let mut client = ctx.connect().await?;
    let correlation_id = random_correlation_id();
    let request = targets
        .iter()
        .fold(
            ProduceRequestBuilder::new().correlation_id(correlation_id),
            |builder, (topic, partition, batch)| builder.batches(topic, *partition, vec![batch.clone()]),
        )
        .build();
    let response = client.send_and_receive(&request).await?;

    let assertion = expected
        .iter()
        .cloned()
        .fold(ProduceResponseAssertion::new().correlation_id(correlation_id), |a, topic| a.topic(topic));
    ResponseAsserter::new(&assertion).decode_and_assert(&response)?;
    client.close().await?;

    let accepted: Vec<ExpectedPartitionLog> = targets
        .iter()
        .filter(|(topic, partition, _)| {
            expected.iter().any(|t| {
                t.name == *topic && t.partitions.iter().any(|p| p.id == *partition && p.error_code == 0)
            })
        })
        .map(|(topic, partition, batch)| ExpectedPartitionLog::new(*topic, *partition, vec![stored_at(batch, 0)]))
        .collect();
    assert_files_on_disk(&ctx.log_config, &accepted)?;
    Ok(())
}

