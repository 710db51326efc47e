use crate::api::{RequestBody, ResponseBody, ResponseHeaderVersion};
use crate::api_keys::ApiKey;
use crate::error::DecodeError;
use crate::error_codes::ErrorCode;
use crate::field_decoder::FieldDecoder;
use crate::field_encoder::FieldEncoder;

// --- Request ---

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiVersionsRequestBody {
    pub client_software_name: String,
    pub client_software_version: String,
}

impl RequestBody for ApiVersionsRequestBody {
    const API_KEY: ApiKey = ApiKey::ApiVersions;

    fn encode(&self, e: &mut FieldEncoder) {
        let mut body = e.scope("Body");
        body.write_compact_string("ClientSoftwareName", &self.client_software_name);
        body.write_compact_string("ClientSoftwareVersion", &self.client_software_version);
        body.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let mut body = d.scope("Body");
        let client_software_name = body.read_compact_string("ClientSoftwareName")?;
        let client_software_version = body.read_compact_string("ClientSoftwareVersion")?;
        body.consume_tag_buffer()?;
        Ok(Self {
            client_software_name,
            client_software_version,
        })
    }
}

// --- Response ---

/// The version range a broker supports for one API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiKeyVersions {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiVersionsResponseBody {
    pub error_code: i16,
    pub api_keys: Vec<ApiKeyVersions>,
    pub throttle_time_ms: i32,
}

impl ApiVersionsResponseBody {
    pub fn api_key(&self, key: ApiKey) -> Option<&ApiKeyVersions> {
        self.api_keys.iter().find(|entry| entry.api_key == key.code())
    }

    fn is_unsupported_version(&self) -> bool {
        self.error_code == ErrorCode::UnsupportedVersion.code()
    }
}

impl ResponseBody for ApiVersionsResponseBody {
    const API_KEY: ApiKey = ApiKey::ApiVersions;
    // ApiVersions responses keep the v0 header so old clients can parse them.
    const HEADER_VERSION: ResponseHeaderVersion = ResponseHeaderVersion::V0;

    fn encode(&self, e: &mut FieldEncoder) {
        let mut body = e.scope("Body");
        body.write_int16("ErrorCode", self.error_code);
        body.write_compact_array("ApiKeys", &self.api_keys, |e, entry| {
            e.write_int16("APIKey", entry.api_key);
            e.write_int16("MinVersion", entry.min_version);
            e.write_int16("MaxVersion", entry.max_version);
            e.write_empty_tag_buffer();
        });
        body.write_int32("ThrottleTimeMs", self.throttle_time_ms);
        body.write_empty_tag_buffer();
    }

    /// With UNSUPPORTED_VERSION the body ends after `ErrorCode`, whatever follows.
    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let mut body = d.scope("Body");
        let error_code = body.read_int16("ErrorCode")?;
        if error_code == ErrorCode::UnsupportedVersion.code() {
            return Ok(Self {
                error_code,
                ..Default::default()
            });
        }

        let api_keys = body.read_compact_array("ApiKeys", |d| {
            let api_key = d.read_int16("APIKey")?;
            let min_version = d.read_int16("MinVersion")?;
            let max_version = d.read_int16("MaxVersion")?;
            d.consume_tag_buffer()?;
            Ok(ApiKeyVersions {
                api_key,
                min_version,
                max_version,
            })
        })?;
        let throttle_time_ms = body.read_int32("ThrottleTimeMs")?;
        body.consume_tag_buffer()?;
        Ok(Self {
            error_code,
            api_keys,
            throttle_time_ms,
        })
    }

    fn ignores_trailing_bytes(&self) -> bool {
        self.is_unsupported_version()
    }
}
