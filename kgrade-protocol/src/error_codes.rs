//! Kafka protocol error codes

use num_derive::{FromPrimitive, ToPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive, ToPrimitive)]
#[repr(i16)]
pub enum ErrorCode {
    UnknownServerError = -1,
    #[default]
    None = 0,
    OffsetOutOfRange = 1,
    CorruptMessage = 2,
    UnknownTopicOrPartition = 3,
    InvalidFetchSize = 4,
    LeaderNotAvailable = 5,
    NotLeaderOrFollower = 6,
    RequestTimedOut = 7,
    InvalidTopicException = 17,
    InvalidRequiredAcks = 21,
    UnsupportedVersion = 35,
    InvalidRequest = 42,
    UnknownTopicId = 100,
}

impl ErrorCode {
    pub fn from_i16(code: i16) -> Option<Self> {
        num_traits::FromPrimitive::from_i16(code)
    }

    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::UnknownServerError => "UNKNOWN_SERVER_ERROR",
            ErrorCode::None => "NO_ERROR",
            ErrorCode::OffsetOutOfRange => "OFFSET_OUT_OF_RANGE",
            ErrorCode::CorruptMessage => "CORRUPT_MESSAGE",
            ErrorCode::UnknownTopicOrPartition => "UNKNOWN_TOPIC_OR_PARTITION",
            ErrorCode::InvalidFetchSize => "INVALID_FETCH_SIZE",
            ErrorCode::LeaderNotAvailable => "LEADER_NOT_AVAILABLE",
            ErrorCode::NotLeaderOrFollower => "NOT_LEADER_OR_FOLLOWER",
            ErrorCode::RequestTimedOut => "REQUEST_TIMED_OUT",
            ErrorCode::InvalidTopicException => "INVALID_TOPIC_EXCEPTION",
            ErrorCode::InvalidRequiredAcks => "INVALID_REQUIRED_ACKS",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::UnknownTopicId => "UNKNOWN_TOPIC_ID",
        }
    }
}

/// Formats a raw code as `3 (UNKNOWN_TOPIC_OR_PARTITION)`, or just the number when the
/// code is not one this crate knows.
pub fn describe_error_code(code: i16) -> String {
    match ErrorCode::from_i16(code) {
        Some(known) => format!("{code} ({})", known.name()),
        None => code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_error_code() {
        assert_eq!(describe_error_code(35), "35 (UNSUPPORTED_VERSION)");
        assert_eq!(describe_error_code(100), "100 (UNKNOWN_TOPIC_ID)");
        assert_eq!(describe_error_code(999), "999");
        assert_eq!(ErrorCode::default().code(), 0);
    }
}
