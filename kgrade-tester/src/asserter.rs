//! Decodes a response and checks it field by field.
//!
//! Single-field assertions run over every decoded field in wire order, so a failure is
//! rendered in the middle of the field tree, right at the offending value. Checks that
//! need the whole response run afterwards, and only when decoding and every single-field
//! assertion succeeded.

use std::marker::PhantomData;

use kgrade_client::Response as RawResponse;
use kgrade_protocol::{
    Field, FieldDecoder, FieldTreePrinter, InspectableHexDump, Response, ResponseBody, TAG_BUFFER,
};
use tracing::{error, info_span};

use crate::error::{AssertionError, Result, TesterError};

/// The outcome of checking one field: `Err` holds the message shown to the candidate.
pub type FieldResult = std::result::Result<(), String>;

pub trait ResponseAssertion<B: ResponseBody> {
    /// Called for every decoded field except tag buffers.
    ///
    /// Implementations must return `Ok` for paths they have no expectation about and
    /// panic with `Internal Error` for paths they do not know at all.
    fn assert_single_field(&self, field: &Field) -> FieldResult;

    /// Checks spanning several fields. Errors are rendered after the whole tree.
    fn assert_across_fields(&self, response: &Response<B>) -> Result<()>;
}

/// Checks that the size prefix matches the payload that was received.
pub fn assert_message_length(response: &RawResponse) -> Result<()> {
    if response.raw_bytes.len() < 4 {
        return Err(TesterError::MessageLength(format!(
            "Expected 4-byte integer (message size), only found {} bytes",
            response.raw_bytes.len()
        )));
    }

    let mut size = [0u8; 4];
    size.copy_from_slice(&response.raw_bytes[..4]);
    let declared = i32::from_be_bytes(size) as i64;
    let actual = response.payload.len() as i64;
    if declared == actual {
        return Ok(());
    }

    let mut message = format!("Expected the first four bytes be {actual} (message size), got {declared}");
    if declared == actual + 4 {
        message.push_str("\nHint: The Message Size field should not count itself.");
    }
    Err(TesterError::MessageLength(message))
}

pub struct ResponseAsserter<'a, B, A> {
    assertion: &'a A,
    ignore_message_length: bool,
    _body: PhantomData<B>,
}

impl<'a, B, A> ResponseAsserter<'a, B, A>
where
    B: ResponseBody,
    A: ResponseAssertion<B>,
{
    pub fn new(assertion: &'a A) -> Self {
        Self {
            assertion,
            ignore_message_length: false,
            _body: PhantomData,
        }
    }

    pub fn ignore_message_length(mut self) -> Self {
        self.ignore_message_length = true;
        self
    }

    /// Decodes the payload and runs the single-field assertions.
    ///
    /// An assertion failure is preferred over a decode error, since it points at a value
    /// the candidate wrote rather than at where the bytes ran out. When several fields
    /// fail, the last one in wire order is reported.
    pub fn decode_and_assert_single_fields(&self, response: &RawResponse) -> Result<Response<B>> {
        if !self.ignore_message_length {
            assert_message_length(response)?;
        }

        let payload = &response.payload[..];
        let mut decoder = FieldDecoder::new(payload);
        let decoded = Response::<B>::decode(&mut decoder);
        let fields = decoder.into_decoded_fields();

        let mut assertion_error = None;
        for field in &fields {
            if field.path.last_segment() == TAG_BUFFER {
                continue;
            }
            if let Err(message) = self.assertion.assert_single_field(field) {
                assertion_error = Some(AssertionError {
                    path: field.path.clone(),
                    start_offset: field.start_offset,
                    end_offset: field.end_offset,
                    message,
                });
            }
        }

        let _span = info_span!("Decoder").entered();
        let printer = FieldTreePrinter::new(&fields);

        if let Some(err) = assertion_error {
            printer.log_for_field_assertion_error(&err.path);
            log_received_bytes(payload, err.start_offset, err.end_offset);
            return Err(err.into());
        }

        match decoded {
            Ok(response) => {
                printer.log_for_debug();
                Ok(response)
            }
            Err(err) => {
                printer.log_for_decode_error(&err.path);
                log_received_bytes(payload, err.start_offset, err.end_offset);
                Err(err.into())
            }
        }
    }

    pub fn decode_and_assert(&self, response: &RawResponse) -> Result<Response<B>> {
        let decoded = self.decode_and_assert_single_fields(response)?;
        self.assertion.assert_across_fields(&decoded)?;
        Ok(decoded)
    }
}

/// Dumps `payload` with the half-open range `start..end` underlined.
pub(crate) fn log_received_bytes(payload: &[u8], start: usize, end: usize) {
    let last_byte = end.saturating_sub(1).max(start);
    error!("Received bytes:");
    for line in InspectableHexDump::new(payload)
        .format_with_highlighted_range(start, last_byte)
        .lines()
    {
        error!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use kgrade_protocol::{
        ApiKeyVersions, ApiVersionsResponse, ApiVersionsResponseBody, ErrorCode, ResponseHeader,
    };
    use kgrade_protocol::primitives::pack_as_message;

    use crate::assertions::ApiVersionsResponseAssertion;

    fn raw(payload: &[u8]) -> RawResponse {
        RawResponse::from_raw(pack_as_message(payload))
    }

    fn api_versions_payload(correlation_id: i32, error_code: i16) -> Bytes {
        ApiVersionsResponse {
            header: ResponseHeader { correlation_id },
            body: ApiVersionsResponseBody {
                error_code,
                api_keys: vec![ApiKeyVersions {
                    api_key: 18,
                    min_version: 0,
                    max_version: 4,
                }],
                throttle_time_ms: 0,
            },
        }
        .encode()
    }

    #[test]
    fn test_message_length_too_short() {
        let response = RawResponse::from_raw(Bytes::from_static(&[0, 0]));
        let err = assert_message_length(&response).unwrap_err();
        assert_eq!(err.to_string(), "Expected 4-byte integer (message size), only found 2 bytes");
    }

    #[test]
    fn test_message_length_counting_itself() {
        let response = RawResponse::from_raw(Bytes::from_static(&[0, 0, 0, 6, 0, 0]));
        let err = assert_message_length(&response).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected the first four bytes be 2 (message size), got 6\nHint: The Message Size field should not count itself."
        );
    }

    #[test]
    fn test_correlation_id_mismatch_is_reported_at_the_field() {
        let assertion = ApiVersionsResponseAssertion::new().correlation_id(7);
        let response = raw(&api_versions_payload(8, 0));
        let err = ResponseAsserter::new(&assertion)
            .decode_and_assert(&response)
            .unwrap_err();
        match err {
            TesterError::Assertion(err) => {
                assert!(err.path.is("ApiVersionsResponse.Header.CorrelationID"));
                assert_eq!((err.start_offset, err.end_offset), (0, 4));
                assert_eq!(err.message, "Expected CorrelationID to be 7, got 8");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_last_failing_field_wins() {
        let assertion = ApiVersionsResponseAssertion::new()
            .correlation_id(7)
            .error_code(ErrorCode::UnsupportedVersion.code());
        let response = raw(&api_versions_payload(8, 0));
        let err = ResponseAsserter::new(&assertion)
            .decode_and_assert(&response)
            .unwrap_err();
        match err {
            TesterError::Assertion(err) => assert!(err.path.is("ApiVersionsResponse.Body.ErrorCode")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_assertion_error_preferred_over_decode_error() {
        let assertion = ApiVersionsResponseAssertion::new().correlation_id(7);
        let payload = api_versions_payload(8, 0);
        let truncated = &payload[..payload.len() - 3];
        let err = ResponseAsserter::new(&assertion)
            .decode_and_assert(&raw(truncated))
            .unwrap_err();
        assert!(matches!(err, TesterError::Assertion(_)));
    }

    #[test]
    fn test_decode_error_when_fields_match() {
        let assertion = ApiVersionsResponseAssertion::new().correlation_id(7);
        let payload = api_versions_payload(7, 0);
        let truncated = &payload[..payload.len() - 3];
        let err = ResponseAsserter::new(&assertion)
            .decode_and_assert(&raw(truncated))
            .unwrap_err();
        match err {
            TesterError::Decode(err) => {
                assert!(err.path.is("ApiVersionsResponse.Body.ThrottleTimeMs"));
                // The two bytes left of the int32 are blamed, not an empty range.
                assert_eq!(err.end_offset, truncated.len());
                assert_eq!(err.end_offset - err.start_offset, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_ignore_message_length() {
        let assertion = ApiVersionsResponseAssertion::new()
            .correlation_id(7)
            .api_key(18, 0, 4);
        let payload = api_versions_payload(7, 0);
        let mut raw_bytes = vec![0, 0, 0, 0];
        raw_bytes.extend_from_slice(&payload);
        let response = RawResponse::from_raw(Bytes::from(raw_bytes));

        assert!(ResponseAsserter::new(&assertion).decode_and_assert(&response).is_err());
        let decoded = ResponseAsserter::new(&assertion)
            .ignore_message_length()
            .decode_and_assert(&response)
            .unwrap();
        assert_eq!(decoded.header.correlation_id, 7);
    }
}
