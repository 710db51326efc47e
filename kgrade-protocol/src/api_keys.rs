use std::fmt;

use num_derive::{FromPrimitive, ToPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(i16)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ApiVersions = 18,
    CreateTopics = 19,
    DescribeTopicPartitions = 75,
}

impl ApiKey {
    pub fn from_i16(key: i16) -> Option<Self> {
        num_traits::FromPrimitive::from_i16(key)
    }

    pub fn code(self) -> i16 {
        self as i16
    }

    /// The name used for message roots and log lines, e.g. `ApiVersions`.
    pub fn name(self) -> &'static str {
        match self {
            ApiKey::Produce => "Produce",
            ApiKey::Fetch => "Fetch",
            ApiKey::ApiVersions => "ApiVersions",
            ApiKey::CreateTopics => "CreateTopics",
            ApiKey::DescribeTopicPartitions => "DescribeTopicPartitions",
        }
    }

    /// The upper-case name Kafka uses in documentation, e.g. `API_VERSIONS`.
    pub fn constant_name(self) -> &'static str {
        match self {
            ApiKey::Produce => "PRODUCE",
            ApiKey::Fetch => "FETCH",
            ApiKey::ApiVersions => "API_VERSIONS",
            ApiKey::CreateTopics => "CREATE_TOPICS",
            ApiKey::DescribeTopicPartitions => "DESCRIBE_TOPIC_PARTITIONS",
        }
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_i16() {
        assert_eq!(ApiKey::from_i16(75), Some(ApiKey::DescribeTopicPartitions));
        assert_eq!(ApiKey::from_i16(18).map(ApiKey::constant_name), Some("API_VERSIONS"));
        assert_eq!(ApiKey::from_i16(3), None);
        assert_eq!(ApiKey::Fetch.code(), 1);
    }
}
