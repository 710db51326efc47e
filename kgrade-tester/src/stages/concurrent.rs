use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use kgrade_protocol::{ApiVersionsRequestBody, ApiVersionsRequestBuilder};
use tracing::info;

use super::base::api_keys_assertion;
use super::fixtures::{random_correlation_id, random_int};
use super::StageContext;
use crate::asserter::ResponseAsserter;

const API_KEYS: &[(i16, i16, i16)] = &[(18, 0, 4)];

/// Several requests over one connection, each answered before the next is sent.
pub(super) fn serial_requests(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let mut client = ctx.connect().await?;
        let count = random_int(2, 4);
        for i in 0..count {
            let correlation_id = random_correlation_id();
            let request = ApiVersionsRequestBuilder::new().correlation_id(correlation_id).build();
            let response = client.send_and_receive(&request).await?;
            ResponseAsserter::new(&api_keys_assertion(correlation_id, API_KEYS)).decode_and_assert(&response)?;
            info!("✓ Request {} of {} answered", i + 1, count);
        }
        client.close().await
    }
    .boxed_local()
}

/// Every client sends before any response is read; responses are then read in reverse.
pub(super) fn concurrent_clients(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let count = random_int(2, 4) as usize;
        let mut clients = Vec::with_capacity(count);
        for _ in 0..count {
            clients.push(ctx.connect().await?);
        }

        let mut correlation_ids = Vec::with_capacity(count);
        for (i, client) in clients.iter_mut().enumerate() {
            let correlation_id = random_correlation_id();
            let request = ApiVersionsRequestBuilder::new().correlation_id(correlation_id).build();
            info!("client-{}: sending request", i + 1);
            client.send_request(&request).await?;
            correlation_ids.push(correlation_id);
        }

        for (i, client) in clients.iter_mut().enumerate().rev() {
            let response = client.receive_response::<ApiVersionsRequestBody>().await?;
            info!("client-{}: received response", i + 1);
            ResponseAsserter::new(&api_keys_assertion(correlation_ids[i], API_KEYS)).decode_and_assert(&response)?;
        }

        for client in clients {
            client.close().await?;
        }
        Ok(())
    }
    .boxed_local()
}
