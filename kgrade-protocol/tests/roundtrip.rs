use anyhow::Result;
use bytes::Bytes;
use kgrade_protocol::*;
use uuid::Uuid;

fn decoded_paths(fields: &[Field]) -> Vec<String> {
    fields.iter().map(|f| f.path.to_string()).collect()
}

#[test]
fn test_api_versions_request_wire_bytes() -> Result<()> {
    let request = ApiVersionsRequestBuilder::new()
        .correlation_id(7)
        .client_id(Some("kafka-cli"))
        .build();
    let encoded = request.encode();

    let expected: &[u8] = &[
        0x00, 0x00, 0x00, 0x23, // message size
        0x00, 0x12, // api key 18
        0x00, 0x04, // api version 4
        0x00, 0x00, 0x00, 0x07, // correlation id
        0x00, 0x09, b'k', b'a', b'f', b'k', b'a', b'-', b'c', b'l', b'i', // client id
        0x00, // header tag buffer
        0x0a, b'k', b'a', b'f', b'k', b'a', b'-', b'c', b'l', b'i', // software name
        0x04, b'0', b'.', b'1', // software version
        0x00, // body tag buffer
    ];
    assert_eq!(&encoded.message[..], expected);

    let decoded = ApiVersionsRequest::decode(&encoded.message[4..])?;
    assert_eq!(decoded, request);
    Ok(())
}

#[test]
fn test_request_encoder_fields_match_decoder_fields() -> Result<()> {
    let request = FetchRequestBuilder::new()
        .correlation_id(99)
        .topic(Uuid::from_u128(0xabcdef), &[0])
        .build();
    let encoded = request.encode();

    let mut decoder = FieldDecoder::new(&encoded.message[4..]);
    {
        let mut root = decoder.scope(FetchRequest::root_name());
        RequestHeader::decode(&mut root)?;
        <FetchRequestBody as RequestBody>::decode(&mut root)?;
    }
    let decoded = decoder.into_decoded_fields();
    assert_eq!(decoded_paths(&decoded), decoded_paths(&encoded.fields));
    // Both offset spaces start after the size prefix.
    assert_eq!(decoded, encoded.fields);
    Ok(())
}

#[test]
fn test_describe_topic_partitions_unknown_topic_response() -> Result<()> {
    let response = DescribeTopicPartitionsResponse {
        header: ResponseHeader { correlation_id: 12 },
        body: DescribeTopicPartitionsResponseBody {
            throttle_time_ms: 0,
            topics: vec![DescribeTopicPartitionsResponseTopic {
                error_code: ErrorCode::UnknownTopicOrPartition.code(),
                name: Some("unknown".to_string()),
                topic_uuid: Uuid::nil(),
                is_internal: false,
                partitions: Vec::new(),
                topic_authorized_operations: 0x0df8,
            }],
            next_cursor: None,
        },
    };
    let payload = response.encode();
    let (decoded, fields) = DescribeTopicPartitionsResponse::decode_payload(&payload)?;
    assert_eq!(decoded, response);

    let paths = decoded_paths(&fields);
    assert_eq!(paths[0], "DescribeTopicPartitionsResponse.Header.CorrelationID");
    assert_eq!(paths[1], "DescribeTopicPartitionsResponse.Header.TAG_BUFFER");
    assert!(paths.contains(
        &"DescribeTopicPartitionsResponse.Body.Topics.Topics[0].TopicUUID".to_string()
    ));
    assert!(paths.contains(&"DescribeTopicPartitionsResponse.Body.Cursor.IsCursorPresent".to_string()));
    Ok(())
}

#[test]
fn test_fetch_response_truncated_inside_record_batch() -> Result<()> {
    let batch = RecordBatchBuilder::new().value("msg1").build();
    let response = FetchResponse {
        header: ResponseHeader { correlation_id: 1 },
        body: FetchResponseBody {
            topics: vec![FetchResponseTopic {
                topic_uuid: Uuid::from_u128(5),
                partitions: vec![FetchResponsePartition {
                    record_batches: vec![batch],
                    ..Default::default()
                }],
            }],
            ..Default::default()
        },
    };
    let payload = response.encode();
    let truncated = &payload[..payload.len() - 10];

    let err = FetchResponse::decode_payload(truncated).unwrap_err();
    assert!(err.path.is_descendant_of(&FieldPath::parse(
        "FetchResponse.Body.Topics.Topics[0].Partitions.Partitions[0].RecordBatches"
    )));
    assert!(err.start_offset <= truncated.len());
    Ok(())
}

#[test]
fn test_produce_response_round_trip() -> Result<()> {
    let response = ProduceResponse {
        header: ResponseHeader { correlation_id: 4 },
        body: ProduceResponseBody {
            topics: vec![ProduceResponseTopic {
                name: "orders".to_string(),
                partitions: vec![ProduceResponsePartition {
                    id: 2,
                    base_offset: 3,
                    log_append_time_ms: -1,
                    log_start_offset: 0,
                    ..Default::default()
                }],
            }],
            throttle_time_ms: 0,
        },
    };
    let (decoded, _) = ProduceResponse::decode_payload(&response.encode())?;
    assert_eq!(decoded, response);
    Ok(())
}

#[test]
fn test_cluster_metadata_records_inside_batches() -> Result<()> {
    let topic_uuid = Uuid::parse_str("bfd99e5e-3235-4552-81f8-d4af1741970c")?;
    let payloads = [
        ClusterMetadataPayload::feature_level("metadata.version", 20),
        ClusterMetadataPayload::topic("foo", topic_uuid),
    ];
    let batch = RecordBatchBuilder::new()
        .partition_leader_epoch(1)
        .record(Record {
            value: Some(payloads[0].encode()),
            ..Default::default()
        })
        .record(Record {
            value: Some(payloads[1].encode()),
            ..Default::default()
        })
        .build();

    let bytes = encode_record_batches(&[batch]);
    let decoded = decode_record_batches(&bytes)?;
    let values: Vec<Bytes> = decoded[0]
        .records
        .iter()
        .filter_map(|r| r.value.clone())
        .collect();
    assert_eq!(values.len(), 2);
    for (value, expected) in values.iter().zip(&payloads) {
        assert_eq!(&ClusterMetadataPayload::decode(value)?, expected);
    }
    Ok(())
}
