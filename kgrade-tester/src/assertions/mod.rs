//! Expectations for each API response, plus the on-disk checks run after a Produce.

mod api_versions;
mod describe_topic_partitions;
mod fetch;
mod on_disk;
mod produce;

pub use api_versions::ApiVersionsResponseAssertion;
pub use describe_topic_partitions::{
    expected_topics_from_generated, DescribeTopicPartitionsResponseAssertion, ExpectedPartition,
    ExpectedTopic,
};
pub use fetch::{ExpectedFetchPartition, ExpectedFetchTopic, FetchResponseAssertion};
pub use on_disk::{assert_files_on_disk, count_differing_bytes, ExpectedPartitionLog};
pub use produce::{ExpectedProducePartition, ExpectedProduceTopic, ProduceResponseAssertion};

use kgrade_protocol::{Field, FieldPath};

use crate::asserter::FieldResult;

// --- Path matching ---

/// Matches a dotted pattern where `Name[*]` stands for any `Name[i]` and a trailing `**`
/// for one or more further segments.
pub(crate) fn matches_path(path: &FieldPath, pattern: &str) -> bool {
    let segments = path.segments();
    let mut i = 0;
    for expected in pattern.split('.') {
        if expected == "**" {
            return i < segments.len();
        }
        match segments.get(i) {
            Some(segment) if segment_matches(segment, expected) => i += 1,
            _ => return false,
        }
    }
    i == segments.len()
}

fn segment_matches(segment: &str, pattern: &str) -> bool {
    match pattern.strip_suffix("[*]") {
        Some(name) => segment
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('['))
            .and_then(|rest| rest.strip_suffix(']'))
            .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())),
        None => segment == pattern,
    }
}

pub(crate) fn unhandled_path(field: &Field) -> ! {
    panic!("Internal Error: Unhandled field path: {}", field.path)
}

// --- Value assertions ---

fn mismatch(field: &Field, expected: impl std::fmt::Display) -> FieldResult {
    Err(format!(
        "Expected {} to be {}, got {}",
        field.path.last_segment(),
        expected,
        field.value
    ))
}

pub(crate) fn expect_int8(field: &Field, expected: i8) -> FieldResult {
    if field.value.as_int8() == expected {
        Ok(())
    } else {
        mismatch(field, expected)
    }
}

pub(crate) fn expect_int16(field: &Field, expected: i16) -> FieldResult {
    if field.value.as_int16() == expected {
        Ok(())
    } else {
        mismatch(field, expected)
    }
}

pub(crate) fn expect_int32(field: &Field, expected: i32) -> FieldResult {
    if field.value.as_int32() == expected {
        Ok(())
    } else {
        mismatch(field, expected)
    }
}

/// `expected_len` is the element count; the wire value is one more.
pub(crate) fn expect_compact_array_length(field: &Field, expected_len: usize) -> FieldResult {
    let expected = kgrade_protocol::Value::CompactArrayLength(expected_len as u64 + 1);
    if field.value == expected {
        Ok(())
    } else {
        mismatch(field, expected)
    }
}
