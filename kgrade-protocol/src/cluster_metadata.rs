//! KRaft cluster-metadata records, carried as the `Value` of records in
//! `__cluster_metadata-0`.
//!
//! Every payload starts with three single-byte headers: frame version, record type and
//! record version.

use bytes::Bytes;
use uuid::Uuid;

use crate::error::CodecError;
use crate::primitives::{Decoder, Encoder};

pub const FRAME_VERSION: i8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLevelRecord {
    pub name: String,
    pub feature_level: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRecord {
    pub topic_name: String,
    pub topic_uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRecord {
    pub partition_id: i32,
    pub topic_uuid: Uuid,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
    pub removing_replicas: Vec<i32>,
    pub adding_replicas: Vec<i32>,
    pub leader: i32,
    pub leader_epoch: i32,
    pub partition_epoch: i32,
    pub directories: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterMetadataRecord {
    FeatureLevel(FeatureLevelRecord),
    Topic(TopicRecord),
    Partition(PartitionRecord),
    ZkMigrationState { migration_state: i8 },
    BeginTransaction { name: Option<String> },
    EndTransaction,
}

impl ClusterMetadataRecord {
    pub fn record_type(&self) -> i8 {
        match self {
            ClusterMetadataRecord::Topic(_) => 2,
            ClusterMetadataRecord::Partition(_) => 3,
            ClusterMetadataRecord::FeatureLevel(_) => 12,
            ClusterMetadataRecord::ZkMigrationState { .. } => 21,
            ClusterMetadataRecord::BeginTransaction { .. } => 23,
            ClusterMetadataRecord::EndTransaction => 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMetadataPayload {
    pub frame_version: i8,
    pub version: i8,
    pub data: ClusterMetadataRecord,
}

fn write_int32_array(e: &mut Encoder, items: &[i32]) {
    e.write_unsigned_varint(items.len() as u64 + 1);
    for item in items {
        e.write_int32(*item);
    }
}

fn read_int32_array(d: &mut Decoder<'_>) -> Result<Vec<i32>, CodecError> {
    let length = d.read_unsigned_varint()?;
    (0..length.saturating_sub(1)).map(|_| d.read_int32()).collect()
}

impl ClusterMetadataPayload {
    pub fn feature_level(name: impl Into<String>, feature_level: i16) -> Self {
        Self {
            frame_version: FRAME_VERSION,
            version: 0,
            data: ClusterMetadataRecord::FeatureLevel(FeatureLevelRecord {
                name: name.into(),
                feature_level,
            }),
        }
    }

    pub fn topic(topic_name: impl Into<String>, topic_uuid: Uuid) -> Self {
        Self {
            frame_version: FRAME_VERSION,
            version: 0,
            data: ClusterMetadataRecord::Topic(TopicRecord {
                topic_name: topic_name.into(),
                topic_uuid,
            }),
        }
    }

    pub fn partition(record: PartitionRecord) -> Self {
        Self {
            frame_version: FRAME_VERSION,
            version: 1,
            data: ClusterMetadataRecord::Partition(record),
        }
    }

    pub fn record_type(&self) -> i8 {
        self.data.record_type()
    }

    pub fn encode(&self) -> Bytes {
        let mut e = Encoder::new();
        e.write_int8(self.frame_version);
        e.write_int8(self.record_type());
        e.write_int8(self.version);

        match &self.data {
            ClusterMetadataRecord::FeatureLevel(record) => {
                e.write_compact_string(&record.name);
                e.write_int16(record.feature_level);
                e.write_empty_tag_buffer();
            }
            ClusterMetadataRecord::Topic(record) => {
                e.write_compact_string(&record.topic_name);
                e.write_uuid(&record.topic_uuid);
                e.write_empty_tag_buffer();
            }
            ClusterMetadataRecord::Partition(record) => {
                e.write_int32(record.partition_id);
                e.write_uuid(&record.topic_uuid);
                write_int32_array(&mut e, &record.replicas);
                write_int32_array(&mut e, &record.isr);
                write_int32_array(&mut e, &record.removing_replicas);
                write_int32_array(&mut e, &record.adding_replicas);
                e.write_int32(record.leader);
                e.write_int32(record.leader_epoch);
                e.write_int32(record.partition_epoch);
                e.write_unsigned_varint(record.directories.len() as u64 + 1);
                for directory in &record.directories {
                    e.write_uuid(directory);
                }
                e.write_empty_tag_buffer();
            }
            ClusterMetadataRecord::ZkMigrationState { migration_state } => {
                e.write_int8(*migration_state);
                e.write_empty_tag_buffer();
            }
            ClusterMetadataRecord::BeginTransaction { name } => match name {
                Some(name) => {
                    let mut tagged = Encoder::new();
                    tagged.write_compact_string(name);
                    e.write_unsigned_varint(1);
                    e.write_unsigned_varint(0);
                    e.write_unsigned_varint(tagged.len() as u64);
                    e.write_raw_bytes(tagged.bytes());
                }
                None => e.write_empty_tag_buffer(),
            },
            ClusterMetadataRecord::EndTransaction => e.write_empty_tag_buffer(),
        }
        e.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut d = Decoder::new(bytes);
        let frame_version = d.read_int8()?;
        let record_type = d.read_int8()?;
        let version = d.read_int8()?;

        let data = match record_type {
            2 => {
                let topic_name = d.read_compact_string()?;
                let topic_uuid = d.read_uuid()?;
                d.consume_tag_buffer()?;
                ClusterMetadataRecord::Topic(TopicRecord {
                    topic_name,
                    topic_uuid,
                })
            }
            3 => {
                let partition_id = d.read_int32()?;
                let topic_uuid = d.read_uuid()?;
                let replicas = read_int32_array(&mut d)?;
                let isr = read_int32_array(&mut d)?;
                let removing_replicas = read_int32_array(&mut d)?;
                let adding_replicas = read_int32_array(&mut d)?;
                let leader = d.read_int32()?;
                let leader_epoch = d.read_int32()?;
                let partition_epoch = d.read_int32()?;
                let directory_count = d.read_unsigned_varint()?.saturating_sub(1);
                let directories = (0..directory_count)
                    .map(|_| d.read_uuid())
                    .collect::<Result<Vec<_>, _>>()?;
                d.consume_tag_buffer()?;
                ClusterMetadataRecord::Partition(PartitionRecord {
                    partition_id,
                    topic_uuid,
                    replicas,
                    isr,
                    removing_replicas,
                    adding_replicas,
                    leader,
                    leader_epoch,
                    partition_epoch,
                    directories,
                })
            }
            12 => {
                let name = d.read_compact_string()?;
                let feature_level = d.read_int16()?;
                d.consume_tag_buffer()?;
                ClusterMetadataRecord::FeatureLevel(FeatureLevelRecord {
                    name,
                    feature_level,
                })
            }
            21 => {
                let migration_state = d.read_int8()?;
                d.consume_tag_buffer()?;
                ClusterMetadataRecord::ZkMigrationState { migration_state }
            }
            23 => {
                let mut name = None;
                let tagged_field_count = d.read_unsigned_varint()?;
                for _ in 0..tagged_field_count {
                    let tag = d.read_unsigned_varint()?;
                    let size = d.read_unsigned_varint()? as usize;
                    if tag == 0 {
                        name = Some(d.read_compact_string()?);
                    } else {
                        d.read_raw_bytes(size)?;
                    }
                }
                ClusterMetadataRecord::BeginTransaction { name }
            }
            24 => {
                d.consume_tag_buffer()?;
                ClusterMetadataRecord::EndTransaction
            }
            other => {
                return Err(CodecError::InvalidValue(format!(
                    "Unknown cluster metadata record type: {other}"
                )))
            }
        };

        if d.remaining_bytes_count() != 0 {
            return Err(CodecError::InvalidLength(format!(
                "unexpected {} bytes remaining after decoding cluster metadata record",
                d.remaining_bytes_count()
            )));
        }

        Ok(Self {
            frame_version,
            version,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn assert_roundtrip(sample: &str, expected: ClusterMetadataPayload) {
        let bytes = hex(sample);
        let decoded = ClusterMetadataPayload::decode(&bytes).unwrap();
        assert_eq!(decoded, expected);
        assert_eq!(decoded.encode().as_ref(), bytes.as_slice());
    }

    #[test]
    fn test_feature_level_record() {
        assert_roundtrip(
            "010c00116d657461646174612e76657273696f6e001400",
            ClusterMetadataPayload::feature_level("metadata.version", 20),
        );
    }

    #[test]
    fn test_topic_record() {
        assert_roundtrip(
            "01020004666f6fbfd99e5e3235455281f8d4af1741970c00",
            ClusterMetadataPayload::topic(
                "foo",
                Uuid::parse_str("bfd99e5e-3235-4552-81f8-d4af1741970c").unwrap(),
            ),
        );
    }

    #[test]
    fn test_partition_record() {
        let topic_uuid = Uuid::parse_str("bfd99e5e-3235-4552-81f8-d4af1741970c").unwrap();
        let directory = Uuid::parse_str("0224973c-badd-44cf-8744-45a99619da34").unwrap();
        assert_roundtrip(
            "01030100000000bfd99e5e3235455281f8d4af1741970c020000000102000000010101000000010000000000000000020224973cbadd44cf874445a99619da3400",
            ClusterMetadataPayload::partition(PartitionRecord {
                partition_id: 0,
                topic_uuid,
                replicas: vec![1],
                isr: vec![1],
                removing_replicas: vec![],
                adding_replicas: vec![],
                leader: 1,
                leader_epoch: 0,
                partition_epoch: 0,
                directories: vec![directory],
            }),
        );
    }

    #[test]
    fn test_transaction_and_migration_records() {
        assert_roundtrip(
            "0115000000",
            ClusterMetadataPayload {
                frame_version: 1,
                version: 0,
                data: ClusterMetadataRecord::ZkMigrationState { migration_state: 0 },
            },
        );
        assert_roundtrip(
            "01180000",
            ClusterMetadataPayload {
                frame_version: 1,
                version: 0,
                data: ClusterMetadataRecord::EndTransaction,
            },
        );
        assert_roundtrip(
            "01170001001212426f6f747374726170207265636f726473",
            ClusterMetadataPayload {
                frame_version: 1,
                version: 0,
                data: ClusterMetadataRecord::BeginTransaction {
                    name: Some("Bootstrap records".to_string()),
                },
            },
        );
    }

    #[test]
    fn test_unknown_record_type() {
        let err = ClusterMetadataPayload::decode(&[0x01, 0x63, 0x00]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown cluster metadata record type: 99");
    }
}
