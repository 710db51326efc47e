use crate::error::DecodeError;
use crate::field_decoder::FieldDecoder;
use crate::field_encoder::FieldEncoder;

pub const DEFAULT_CLIENT_ID: &str = "kafka-tester";

/// Request header v2: the flexible header every API here uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

impl RequestHeader {
    pub fn encode(&self, e: &mut FieldEncoder) {
        let mut header = e.scope("Header");
        header.write_int16("APIKey", self.api_key);
        header.write_int16("APIVersion", self.api_version);
        header.write_int32("CorrelationID", self.correlation_id);
        header.write_string("ClientID", self.client_id.as_deref());
        header.write_empty_tag_buffer();
    }

    pub fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let mut header = d.scope("Header");
        let api_key = header.read_int16("APIKey")?;
        let api_version = header.read_int16("APIVersion")?;
        let correlation_id = header.read_int32("CorrelationID")?;
        let client_id = header.read_string("ClientID")?;
        header.consume_tag_buffer()?;
        Ok(Self {
            api_key,
            api_version,
            correlation_id,
            client_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseHeaderVersion {
    /// Correlation id only.
    V0,
    /// Correlation id and a tag buffer.
    V1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub correlation_id: i32,
}

impl ResponseHeader {
    pub fn encode(&self, e: &mut FieldEncoder, version: ResponseHeaderVersion) {
        let mut header = e.scope("Header");
        header.write_int32("CorrelationID", self.correlation_id);
        if version == ResponseHeaderVersion::V1 {
            header.write_empty_tag_buffer();
        }
    }

    pub fn decode(
        d: &mut FieldDecoder<'_>,
        version: ResponseHeaderVersion,
    ) -> Result<Self, DecodeError> {
        let mut header = d.scope("Header");
        let correlation_id = header.read_int32("CorrelationID")?;
        if version == ResponseHeaderVersion::V1 {
            header.consume_tag_buffer()?;
        }
        Ok(Self { correlation_id })
    }
}
