use kgrade_protocol::error_codes::describe_error_code;
use kgrade_protocol::{ApiKey, ApiKeyVersions, ApiVersionsResponse, ApiVersionsResponseBody, Field};
use tracing::info;

use super::{expect_int16, expect_int32, matches_path, unhandled_path};
use crate::asserter::{FieldResult, ResponseAssertion};
use crate::error::{Result, TesterError};

fn api_key_name(key: i16) -> &'static str {
    ApiKey::from_i16(key).map_or("Unknown", ApiKey::name)
}

/// Expects a correlation id, an error code and a set of supported version ranges.
#[derive(Debug, Clone, Default)]
pub struct ApiVersionsResponseAssertion {
    correlation_id: i32,
    error_code: i16,
    api_keys: Vec<ApiKeyVersions>,
}

impl ApiVersionsResponseAssertion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: i32) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn error_code(mut self, error_code: i16) -> Self {
        self.error_code = error_code;
        self
    }

    /// The broker must list `api_key` with a range covering `min_version..=max_version`.
    pub fn api_key(mut self, api_key: i16, min_version: i16, max_version: i16) -> Self {
        self.api_keys.push(ApiKeyVersions {
            api_key,
            min_version,
            max_version,
        });
        self
    }
}

impl ResponseAssertion<ApiVersionsResponseBody> for ApiVersionsResponseAssertion {
    fn assert_single_field(&self, field: &Field) -> FieldResult {
        let path = &field.path;
        if path.is("ApiVersionsResponse.Header.CorrelationID") {
            return expect_int32(field, self.correlation_id);
        }
        if path.is("ApiVersionsResponse.Body.ErrorCode") {
            return expect_int16(field, self.error_code);
        }
        if path.is("ApiVersionsResponse.Body.ThrottleTimeMs")
            || path.is("ApiVersionsResponse.Body.ApiKeys.Length")
            || matches_path(path, "ApiVersionsResponse.Body.ApiKeys.ApiKeys[*].APIKey")
            || matches_path(path, "ApiVersionsResponse.Body.ApiKeys.ApiKeys[*].MinVersion")
            || matches_path(path, "ApiVersionsResponse.Body.ApiKeys.ApiKeys[*].MaxVersion")
        {
            return Ok(());
        }
        unhandled_path(field)
    }

    fn assert_across_fields(&self, response: &ApiVersionsResponse) -> Result<()> {
        info!("✓ CorrelationID: {}", self.correlation_id);
        info!("✓ ErrorCode: {}", describe_error_code(self.error_code));
        if self.error_code != 0 {
            return Ok(());
        }

        let actual_keys = &response.body.api_keys;
        if actual_keys.len() < self.api_keys.len() {
            return Err(TesterError::composite(format!(
                "Expected ApiKeys array to include at least {} keys, got {}",
                self.api_keys.len(),
                actual_keys.len()
            )));
        }
        if !self.api_keys.is_empty() {
            info!("✓ API keys array length: {}", actual_keys.len());
        }

        for expected in &self.api_keys {
            let name = api_key_name(expected.api_key);
            let Some(actual) = actual_keys.iter().find(|k| k.api_key == expected.api_key) else {
                return Err(TesterError::composite(format!(
                    "Expected ApiKeys array to include API key {} ({name})",
                    expected.api_key
                )));
            };

            if actual.min_version > expected.min_version {
                return Err(TesterError::composite(format!(
                    "Expected API version {} to be supported for {name}, got min version {}",
                    expected.min_version, actual.min_version
                )));
            }
            info!("✓ MinVersion for {name} is <= {}", expected.min_version);

            if actual.max_version < expected.max_version {
                return Err(TesterError::composite(format!(
                    "Expected API version {} to be supported for {name}, got max version {}",
                    expected.max_version, actual.max_version
                )));
            }
            info!("✓ MaxVersion for {name} is >= {}", expected.max_version);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgrade_protocol::ResponseHeader;

    fn response(api_keys: Vec<ApiKeyVersions>) -> ApiVersionsResponse {
        ApiVersionsResponse {
            header: ResponseHeader { correlation_id: 1 },
            body: ApiVersionsResponseBody {
                error_code: 0,
                api_keys,
                throttle_time_ms: 0,
            },
        }
    }

    fn versions(api_key: i16, min_version: i16, max_version: i16) -> ApiKeyVersions {
        ApiKeyVersions {
            api_key,
            min_version,
            max_version,
        }
    }

    #[test]
    fn test_missing_api_key() {
        let assertion = ApiVersionsResponseAssertion::new().api_key(18, 0, 4).api_key(75, 0, 0);
        let err = assertion
            .assert_across_fields(&response(vec![versions(18, 0, 4), versions(1, 0, 16)]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected ApiKeys array to include API key 75 (DescribeTopicPartitions)"
        );
    }

    #[test]
    fn test_max_version_too_low() {
        let assertion = ApiVersionsResponseAssertion::new().api_key(1, 0, 16);
        let err = assertion
            .assert_across_fields(&response(vec![versions(1, 0, 12)]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected API version 16 to be supported for Fetch, got max version 12"
        );
    }

    #[test]
    fn test_wider_range_passes() {
        let assertion = ApiVersionsResponseAssertion::new().api_key(18, 0, 4);
        assert!(assertion
            .assert_across_fields(&response(vec![versions(18, 0, 5)]))
            .is_ok());
    }

    #[test]
    #[should_panic(expected = "Internal Error: Unhandled field path")]
    fn test_unknown_path_panics() {
        let field = Field {
            path: "ApiVersionsResponse.Body.Nope".into(),
            value: kgrade_protocol::Value::Int32(0),
            start_offset: 0,
            end_offset: 4,
        };
        let _ = ApiVersionsResponseAssertion::new().assert_single_field(&field);
    }
}
