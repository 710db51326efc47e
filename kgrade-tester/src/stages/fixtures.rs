//! Random names, ids and messages so a broker cannot hardcode its answers.

use kgrade_storage::{PartitionGenerationConfig, TopicGenerationConfig};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

const WORDS: &[&str] = &[
    "apple", "banana", "blueberry", "cherry", "grape", "lemon", "mango", "orange", "pear",
    "pineapple", "raspberry", "strawberry", "bar", "baz", "foo", "pax", "paz", "qux", "quz",
    "saz",
];

pub fn random_int(min: i32, max_inclusive: i32) -> i32 {
    rand::thread_rng().gen_range(min..=max_inclusive)
}

pub fn random_correlation_id() -> i32 {
    rand::thread_rng().gen_range(0..i32::MAX)
}

pub fn random_uuid() -> Uuid {
    Uuid::new_v4()
}

/// `n` distinct words. `n` must not exceed the word list.
pub fn random_words(n: usize) -> Vec<String> {
    WORDS
        .choose_multiple(&mut rand::thread_rng(), n)
        .map(|w| w.to_string())
        .collect()
}

pub fn random_topic_names(n: usize) -> Vec<String> {
    random_words(n)
}

pub fn random_topic_name() -> String {
    random_words(1).remove(0)
}

pub fn random_messages(n: usize) -> Vec<String> {
    random_words(n).into_iter().map(|w| format!("Hello {w}!")).collect()
}

/// A topic with a fresh UUID whose partitions each hold `messages_per_partition` messages.
pub fn random_topic(name: &str, partition_ids: &[i32], messages_per_partition: usize) -> TopicGenerationConfig {
    TopicGenerationConfig::new(
        name,
        random_uuid(),
        partition_ids
            .iter()
            .map(|&id| PartitionGenerationConfig::new(id, random_messages(messages_per_partition)))
            .collect(),
    )
}
