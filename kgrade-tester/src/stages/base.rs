use anyhow::{bail, Result};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use kgrade_protocol::{ApiVersionsRequestBuilder, DecodeError, ErrorCode, FieldDecoder, FieldTreePrinter};
use tracing::{info, info_span};

use super::fixtures::random_correlation_id;
use super::StageContext;
use crate::asserter::{log_received_bytes, ResponseAsserter};
use crate::assertions::ApiVersionsResponseAssertion;

const UNSUPPORTED_API_VERSION: i16 = 1234;
const HARDCODED_CORRELATION_ID: i32 = 7;

pub(super) fn bind(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        info!("Connecting to broker at {}", ctx.broker_addr);
        let client = ctx.connect().await?;
        info!("Connection to broker at {} successful", ctx.broker_addr);
        client.close().await
    }
    .boxed_local()
}

pub(super) fn hardcoded_correlation_id(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    check_correlation_id(ctx, HARDCODED_CORRELATION_ID).boxed_local()
}

pub(super) fn parse_correlation_id(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    check_correlation_id(ctx, random_correlation_id()).boxed_local()
}

pub(super) fn unsupported_api_version(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    async move {
        let mut client = ctx.connect().await?;
        let correlation_id = random_correlation_id();
        let request = ApiVersionsRequestBuilder::new()
            .correlation_id(correlation_id)
            .api_version(UNSUPPORTED_API_VERSION)
            .build();
        let response = client.send_and_receive(&request).await?;

        let assertion = ApiVersionsResponseAssertion::new()
            .correlation_id(correlation_id)
            .error_code(ErrorCode::UnsupportedVersion.code());
        ResponseAsserter::new(&assertion).decode_and_assert(&response)?;
        client.close().await
    }
    .boxed_local()
}

pub(super) fn api_versions(ctx: &StageContext) -> LocalBoxFuture<'_, Result<()>> {
    check_api_versions(ctx, &[(18, 0, 4)]).boxed_local()
}

/// Sends one ApiVersions v4 request and expects every `(key, min, max)` to be supported.
pub(super) async fn check_api_versions(ctx: &StageContext, api_keys: &[(i16, i16, i16)]) -> Result<()> {
    let mut client = ctx.connect().await?;
    let correlation_id = random_correlation_id();
    let request = ApiVersionsRequestBuilder::new().correlation_id(correlation_id).build();
    let response = client.send_and_receive(&request).await?;

    let assertion = api_keys_assertion(correlation_id, api_keys);
    ResponseAsserter::new(&assertion).decode_and_assert(&response)?;
    client.close().await
}

pub(super) fn api_keys_assertion(correlation_id: i32, api_keys: &[(i16, i16, i16)]) -> ApiVersionsResponseAssertion {
    api_keys.iter().fold(
        ApiVersionsResponseAssertion::new().correlation_id(correlation_id).error_code(0),
        |assertion, &(key, min, max)| assertion.api_key(key, min, max),
    )
}

/// Only the size prefix and the correlation id are checked; the body may be anything.
async fn check_correlation_id(ctx: &StageContext, correlation_id: i32) -> Result<()> {
    let mut client = ctx.connect().await?;
    let request = ApiVersionsRequestBuilder::new().correlation_id(correlation_id).build();
    client.send_request(&request).await?;
    let response = client.receive_raw().await?;
    assert_correlation_id(&response.raw_bytes, correlation_id)?;
    client.close().await
}

fn decode_correlation_id(decoder: &mut FieldDecoder<'_>) -> std::result::Result<i32, DecodeError> {
    let mut root = decoder.scope("ApiVersionsResponse");
    root.read_int32("MessageLength")?;
    let mut header = root.scope("Header");
    header.read_int32("CorrelationID")
}

fn assert_correlation_id(raw_bytes: &[u8], expected: i32) -> Result<()> {
    let mut decoder = FieldDecoder::new(raw_bytes);
    let decoded = decode_correlation_id(&mut decoder);
    let fields = decoder.into_decoded_fields();

    let _span = info_span!("Decoder").entered();
    let printer = FieldTreePrinter::new(&fields);
    match decoded {
        Err(err) => {
            printer.log_for_decode_error(&err.path);
            log_received_bytes(raw_bytes, err.start_offset, err.end_offset);
            Err(err.into())
        }
        Ok(actual) if actual != expected => {
            let Some(field) = fields.last() else {
                bail!("Internal Error: CorrelationID decoded without a field");
            };
            printer.log_for_field_assertion_error(&field.path);
            log_received_bytes(raw_bytes, field.start_offset, field.end_offset);
            bail!("Expected CorrelationID to be {expected}, got {actual}")
        }
        Ok(actual) => {
            printer.log_for_debug();
            info!("✓ CorrelationID: {actual}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_in_raw_frame() {
        let raw = [0, 0, 0, 8, 0, 0, 0, 7, 0, 0, 0, 0];
        assert!(assert_correlation_id(&raw, 7).is_ok());
        let err = assert_correlation_id(&raw, 9).unwrap_err();
        assert_eq!(err.to_string(), "Expected CorrelationID to be 9, got 7");
    }

    #[test]
    fn test_correlation_id_truncated() {
        let err = assert_correlation_id(&[0, 0, 0, 8, 0, 0], 7).unwrap_err();
        assert!(err.downcast_ref::<DecodeError>().is_some());
    }

    #[test]
    fn test_api_keys_assertion_collects_keys() {
        let assertion = api_keys_assertion(3, &[(18, 0, 4), (75, 0, 0)]);
        let debug = format!("{assertion:?}");
        assert!(debug.contains("api_key: 75"));
    }
}
