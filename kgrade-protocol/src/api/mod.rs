//! Message layouts for the APIs a broker is graded on.
//!
//! Every message is addressed from a root segment named after the API and direction, e.g.
//! `FetchResponse.Header.CorrelationID` or `ProduceRequest.Body.Acks`.

use bytes::Bytes;

use crate::api_keys::ApiKey;
use crate::error::{CodecError, DecodeError};
use crate::field::Field;
use crate::field_decoder::FieldDecoder;
use crate::field_encoder::FieldEncoder;
use crate::primitives::pack_as_message;

pub mod api_versions;
pub mod describe_topic_partitions;
pub mod fetch;
pub mod headers;
pub mod produce;

pub use api_versions::*;
pub use describe_topic_partitions::*;
pub use fetch::*;
pub use headers::*;
pub use produce::*;

/// The body of a request. Implementations push `Body` themselves.
pub trait RequestBody: Sized {
    const API_KEY: ApiKey;

    fn encode(&self, e: &mut FieldEncoder);
    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError>;
}

/// The body of a response. Implementations push `Body` themselves.
pub trait ResponseBody: Sized {
    const API_KEY: ApiKey;
    const HEADER_VERSION: ResponseHeaderVersion;

    fn encode(&self, e: &mut FieldEncoder);
    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError>;

    /// Whether bytes left after the body are expected and should not fail decoding.
    fn ignores_trailing_bytes(&self) -> bool {
        false
    }
}

fn trailing_bytes_error(d: &FieldDecoder<'_>, root: &str) -> DecodeError {
    d.error_over_remaining(CodecError::InvalidLength(format!(
        "unexpected {} bytes remaining in decoder after decoding {root}",
        d.remaining_bytes_count()
    )))
}

// --- Request ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<B> {
    pub header: RequestHeader,
    pub body: B,
}

/// A framed request plus the fields recorded while encoding it.
#[derive(Debug, Clone)]
pub struct EncodedRequest {
    pub message: Bytes,
    pub fields: Vec<Field>,
}

impl<B: RequestBody> Request<B> {
    pub fn root_name() -> String {
        format!("{}Request", B::API_KEY.name())
    }

    pub fn encode(&self) -> EncodedRequest {
        let mut encoder = FieldEncoder::new();
        {
            let mut root = encoder.scope(Self::root_name());
            self.header.encode(&mut root);
            self.body.encode(&mut root);
        }
        let (payload, fields) = encoder.into_parts();
        EncodedRequest {
            message: pack_as_message(&payload),
            fields,
        }
    }

    /// Decodes an unframed request payload.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let root_name = Self::root_name();
        let mut decoder = FieldDecoder::new(payload);
        let mut root = decoder.scope(root_name.as_str());
        let header = RequestHeader::decode(&mut root)?;
        let body = B::decode(&mut root)?;
        if root.remaining_bytes_count() != 0 {
            return Err(trailing_bytes_error(&root, &root_name));
        }
        Ok(Self { header, body })
    }
}

/// Reads just the request header, for dispatching on the API key.
pub fn decode_request_header(payload: &[u8]) -> Result<RequestHeader, DecodeError> {
    let mut decoder = FieldDecoder::new(payload);
    let mut root = decoder.scope("Request");
    RequestHeader::decode(&mut root)
}

// --- Response ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<B> {
    pub header: ResponseHeader,
    pub body: B,
}

impl<B: ResponseBody> Response<B> {
    pub fn root_name() -> String {
        format!("{}Response", B::API_KEY.name())
    }

    /// Encodes the unframed payload.
    pub fn encode(&self) -> Bytes {
        let mut encoder = FieldEncoder::new();
        {
            let mut root = encoder.scope(Self::root_name());
            self.header.encode(&mut root, B::HEADER_VERSION);
            self.body.encode(&mut root);
        }
        encoder.into_bytes()
    }

    pub fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let root_name = Self::root_name();
        let mut root = d.scope(root_name.as_str());
        let header = ResponseHeader::decode(&mut root, B::HEADER_VERSION)?;
        let body = B::decode(&mut root)?;
        if !body.ignores_trailing_bytes() && root.remaining_bytes_count() != 0 {
            return Err(trailing_bytes_error(&root, &root_name));
        }
        Ok(Self { header, body })
    }

    /// Decodes a standalone payload, returning the fields alongside the response.
    pub fn decode_payload(payload: &[u8]) -> Result<(Self, Vec<Field>), DecodeError> {
        let mut decoder = FieldDecoder::new(payload);
        let response = Self::decode(&mut decoder)?;
        Ok((response, decoder.into_decoded_fields()))
    }
}

pub type ApiVersionsRequest = Request<ApiVersionsRequestBody>;
pub type ApiVersionsResponse = Response<ApiVersionsResponseBody>;
pub type DescribeTopicPartitionsRequest = Request<DescribeTopicPartitionsRequestBody>;
pub type DescribeTopicPartitionsResponse = Response<DescribeTopicPartitionsResponseBody>;
pub type FetchRequest = Request<FetchRequestBody>;
pub type FetchResponse = Response<FetchResponseBody>;
pub type ProduceRequest = Request<ProduceRequestBody>;
pub type ProduceResponse = Response<ProduceResponseBody>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_names() {
        assert_eq!(ApiVersionsRequest::root_name(), "ApiVersionsRequest");
        assert_eq!(FetchResponse::root_name(), "FetchResponse");
        assert_eq!(
            DescribeTopicPartitionsResponse::root_name(),
            "DescribeTopicPartitionsResponse"
        );
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let response = ApiVersionsResponse {
            header: ResponseHeader { correlation_id: 1 },
            body: ApiVersionsResponseBody::default(),
        };
        let mut payload = response.encode().to_vec();
        payload.extend_from_slice(&[0xde, 0xad]);

        let err = ApiVersionsResponse::decode_payload(&payload).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected 2 bytes remaining in decoder after decoding ApiVersionsResponse"
        );
        assert!(err.path.is("ApiVersionsResponse"));
        assert_eq!((err.start_offset, err.end_offset), (payload.len() - 2, payload.len()));
    }
}
