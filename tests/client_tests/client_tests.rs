//! Client Tests
//!
//! These tests verify:
//! - Each operation's request shape and result handling
//! - Error surfacing (server errors, timeouts, truncation)
//! - Streaming behavior of scan and search

use std::sync::Arc;

use rochefort::protocol::Endpoint;
use rochefort::transport::{Fault, MemoryEngine};
use rochefort::{
    AppendRequest, Client, ClientConfig, DeleteRequest, GetMultiRequest, GetRequest,
    LoopbackTransport, ModifyRequest, Offset, OffsetEncoding, Position, Query, RochefortError,
    ScanRequest, SearchRequest, StatsRequest,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_client() -> Client<LoopbackTransport> {
    Client::with_transport(ClientConfig::default(), LoopbackTransport::new())
}

fn setup_recording_client() -> Client<LoopbackTransport> {
    Client::with_transport(
        ClientConfig::default(),
        LoopbackTransport::new().with_recording(),
    )
}

fn setup_chunked_client(chunk_size: usize) -> Client<LoopbackTransport> {
    Client::with_transport(
        ClientConfig::default(),
        LoopbackTransport::new().with_chunk_size(chunk_size),
    )
}

fn append(client: &Client<LoopbackTransport>, ns: &str, data: &[u8]) -> Offset {
    client
        .append(&AppendRequest::new(ns, data.to_vec()))
        .unwrap()
}

// =============================================================================
// Append / Get Tests
// =============================================================================

#[test]
fn test_append_then_get() {
    let client = setup_client();

    let offset = append(&client, "ns", b"hello");
    let data = client.get(&GetRequest::new("ns", offset)).unwrap();

    assert_eq!(&data[..], b"hello");
}

#[test]
fn test_offsets_are_distinct_and_increasing() {
    let client = setup_client();

    let a = append(&client, "ns", b"a");
    let b = append(&client, "ns", b"bb");
    let c = append(&client, "ns", b"");

    assert!(a < b && b < c);
}

#[test]
fn test_namespaces_are_isolated() {
    let client = setup_client();

    let offset = append(&client, "left", b"left data");
    append(&client, "right", b"right data");

    let result = client.get(&GetRequest::new("right", offset));
    assert_eq!(&result.unwrap()[..], b"right data");

    let records: Vec<_> = client
        .scan(&ScanRequest::new("left"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_default_namespace() {
    let client = setup_client();

    let offset = append(&client, "", b"in default");
    let data = client.get(&GetRequest::new("", offset)).unwrap();
    assert_eq!(&data[..], b"in default");
}

#[test]
fn test_get_unknown_offset_is_server_error() {
    let client = setup_client();

    match client.get(&GetRequest::new("ns", Offset(12345))) {
        Err(RochefortError::ServerError { status, body }) => {
            assert_eq!(status, 404);
            assert!(body.contains("12345"));
        }
        other => panic!("Expected ServerError, got {:?}", other),
    }
}

#[test]
fn test_negative_append_offset_is_invalid() {
    let client = setup_client();
    client
        .transport()
        .inject(Fault::Status(200, r#"{"offset":-1,"file":""}"#.to_string()));

    let result = client.append(&AppendRequest::new("ns", &b"x"[..]));
    assert!(matches!(result, Err(RochefortError::InvalidOffset(-1))));
}

#[test]
fn test_malformed_append_response() {
    let client = setup_client();
    client.transport().inject(Fault::Status(200, "not json".to_string()));

    let result = client.append(&AppendRequest::new("ns", &b"x"[..]));
    assert!(matches!(result, Err(RochefortError::Serialization(_))));
}

// =============================================================================
// Modify Tests
// =============================================================================

#[test]
fn test_modify_in_place() {
    let client = setup_client();
    let offset = append(&client, "ns", b"abcdef");

    let ok = client
        .modify(&ModifyRequest::new("ns", offset, Position::At(2), &b"XY"[..]))
        .unwrap();

    assert!(ok);
    let data = client.get(&GetRequest::new("ns", offset)).unwrap();
    assert_eq!(&data[..], b"abXYef");
}

#[test]
fn test_modify_gap_is_zero_filled() {
    let client = setup_client();
    let offset = client
        .append(&AppendRequest::new("ns", &b"ab"[..]).alloc_size(8))
        .unwrap();

    assert!(client
        .modify(&ModifyRequest::new("ns", offset, Position::At(5), &b"z"[..]))
        .unwrap());

    let data = client.get(&GetRequest::new("ns", offset)).unwrap();
    assert_eq!(&data[..], b"ab\0\0\0z");
}

#[test]
fn test_modify_beyond_allocation_rejected() {
    let client = setup_client();
    let offset = client
        .append(&AppendRequest::new("ns", &b"abcd"[..]).alloc_size(6))
        .unwrap();

    let ok = client
        .modify(&ModifyRequest::new("ns", offset, Position::End, &b"123"[..]))
        .unwrap();

    assert!(!ok);
    let data = client.get(&GetRequest::new("ns", offset)).unwrap();
    assert_eq!(&data[..], b"abcd");
}

#[test]
fn test_modify_reset_length() {
    let client = setup_client();
    let offset = append(&client, "ns", b"abcdef");

    let request = ModifyRequest::new("ns", offset, Position::At(1), &b"Z"[..]).reset_length(true);
    assert!(client.modify(&request).unwrap());

    let data = client.get(&GetRequest::new("ns", offset)).unwrap();
    assert_eq!(&data[..], b"aZ");
}

#[test]
fn test_modify_unknown_offset() {
    let client = setup_client();
    append(&client, "ns", b"x");

    let ok = client
        .modify(&ModifyRequest::new("ns", Offset(999), Position::At(0), &b"y"[..]))
        .unwrap();
    assert!(!ok);
}

// =============================================================================
// GetMulti Tests
// =============================================================================

#[test]
fn test_get_multi_in_request_order() {
    let client = setup_chunked_client(3);
    let a = append(&client, "ns", b"alpha");
    let b = append(&client, "ns", b"beta");
    let c = append(&client, "ns", b"");

    let payloads = client
        .get_multi(&GetMultiRequest::new("ns", vec![c, a, b]))
        .unwrap();

    assert_eq!(payloads.len(), 3);
    assert!(payloads[0].is_empty());
    assert_eq!(&payloads[1][..], b"alpha");
    assert_eq!(&payloads[2][..], b"beta");
}

#[test]
fn test_get_multi_csv_encoding() {
    let config = ClientConfig::builder()
        .offset_encoding(OffsetEncoding::Csv)
        .build();
    let client = Client::with_transport(config, LoopbackTransport::new().with_recording());
    let a = append(&client, "ns", b"one");
    let b = append(&client, "ns", b"two");

    let payloads = client.get_multi(&GetMultiRequest::new("ns", vec![b, a])).unwrap();
    assert_eq!(&payloads[0][..], b"two");
    assert_eq!(&payloads[1][..], b"one");

    let sent = client.transport().requests();
    let last = sent.last().unwrap();
    assert_eq!(last.endpoint, Endpoint::GetMulti);
    assert_eq!(last.query_param("encoding"), Some("csv"));
}

#[test]
fn test_get_multi_empty_skips_request() {
    let client = setup_recording_client();

    let payloads = client.get_multi(&GetMultiRequest::new("ns", Vec::new())).unwrap();

    assert!(payloads.is_empty());
    assert!(client.transport().requests().is_empty());
}

#[test]
fn test_get_multi_truncated_fails_as_a_unit() {
    let client = setup_client();
    let a = append(&client, "ns", b"complete");
    let b = append(&client, "ns", b"cut short");
    client.transport().inject(Fault::TruncateAfter(4 + 8 + 4 + 2));

    let result = client.get_multi(&GetMultiRequest::new("ns", vec![a, b]));
    assert!(matches!(result, Err(RochefortError::TruncatedStream { .. })));
}

#[test]
fn test_get_multi_respects_max_payload() {
    let config = ClientConfig::builder().max_payload_size(4).build();
    let client = Client::with_transport(config, LoopbackTransport::new());
    let offset = append(&client, "ns", b"too large");

    let result = client.get_multi(&GetMultiRequest::new("ns", vec![offset]));
    assert!(matches!(result, Err(RochefortError::Protocol(_))));
}

// =============================================================================
// Scan / Search Tests
// =============================================================================

#[test]
fn test_scan_frames_carry_offsets() {
    let client = setup_chunked_client(5);
    let offsets: Vec<Offset> = (0..4)
        .map(|i| append(&client, "ns", format!("record-{}", i).as_bytes()))
        .collect();

    let frames: Vec<_> = client
        .scan(&ScanRequest::new("ns"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(frames.len(), 4);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.offset, Some(offsets[i]));
        assert_eq!(&frame.payload[..], format!("record-{}", i).as_bytes());
    }
}

#[test]
fn test_scan_empty_namespace() {
    let client = setup_client();
    let mut frames = client.scan(&ScanRequest::new("nothing-here")).unwrap();
    assert!(frames.next().is_none());
}

#[test]
fn test_scan_timeout_mid_stream_keeps_earlier_frames() {
    let client = setup_client();
    append(&client, "ns", b"first");
    append(&client, "ns", b"second");
    client.transport().inject(Fault::TimeoutAfter(12 + 5 + 3));

    let mut frames = client.scan(&ScanRequest::new("ns")).unwrap();

    let first = frames.next().unwrap().unwrap();
    assert_eq!(&first.payload[..], b"first");
    assert!(matches!(frames.next(), Some(Err(RochefortError::Timeout(_)))));
    assert!(frames.next().is_none());
}

#[test]
fn test_transport_timeout_surfaces() {
    let client = setup_client();
    client.transport().inject(Fault::Timeout);

    let result = client.scan(&ScanRequest::new("ns"));
    assert!(matches!(result, Err(RochefortError::Timeout(_))));
}

#[test]
fn test_server_error_status() {
    let client = setup_client();
    client
        .transport()
        .inject(Fault::Status(500, "disk on fire".to_string()));

    match client.scan(&ScanRequest::new("ns")) {
        Err(RochefortError::ServerError { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "disk on fire");
        }
        Err(e) => panic!("Expected ServerError, got {:?}", e),
        Ok(_) => panic!("Expected ServerError, got a stream"),
    }
}

#[test]
fn test_each_scan_is_a_fresh_stream() {
    let client = setup_client();
    append(&client, "ns", b"x");

    let first = client.scan(&ScanRequest::new("ns")).unwrap();
    append(&client, "ns", b"y");
    let second = client.scan(&ScanRequest::new("ns")).unwrap();

    assert_eq!(first.count(), 1);
    assert_eq!(second.count(), 2);
}

#[test]
fn test_search_invalid_query_not_sent() {
    let client = setup_recording_client();

    let result = client.search(&SearchRequest::new("ns", Query::And(vec![])));

    assert!(matches!(result, Err(RochefortError::SearchQueryInvalid(_))));
    assert!(client.transport().requests().is_empty());
}

#[test]
fn test_search_single_tag() {
    let client = setup_client();
    let tagged = client
        .append(&AppendRequest::new("ns", &b"tagged"[..]).tag("t"))
        .unwrap();
    append(&client, "ns", b"untagged");

    let frames: Vec<_> = client
        .search(&SearchRequest::new("ns", Query::tag("t")))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].offset, Some(tagged));
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_namespace() {
    let client = setup_client();
    let offset = append(&client, "doomed", b"bye");

    assert!(client.delete(&DeleteRequest::new("doomed")).unwrap());
    assert!(!client.delete(&DeleteRequest::new("doomed")).unwrap());
    assert!(client.get(&GetRequest::new("doomed", offset)).is_err());
}

// =============================================================================
// Stats Tests
// =============================================================================

#[test]
fn test_stats_counts_records_bytes_and_tags() {
    let client = setup_client();
    client
        .append(&AppendRequest::new("ns", &b"abc"[..]).tags(["a", "b"]))
        .unwrap();
    client
        .append(&AppendRequest::new("ns", &b"de"[..]).alloc_size(10).tag("a"))
        .unwrap();
    append(&client, "other", b"elsewhere");

    let stats = client.stats(&StatsRequest::new("ns")).unwrap();

    assert_eq!(stats.records, 2);
    assert_eq!(stats.bytes, 5);
    assert_eq!(stats.tags.get("a"), Some(&2));
    assert_eq!(stats.tags.get("b"), Some(&1));

    // The next append lands where stats said it would
    let next = append(&client, "ns", b"f");
    assert_eq!(next, Offset(stats.offset));
}

#[test]
fn test_stats_tracks_modify_and_delete() {
    let client = setup_client();
    let offset = client
        .append(&AppendRequest::new("ns", &b"ab"[..]).alloc_size(8))
        .unwrap();
    client
        .modify(&ModifyRequest::new("ns", offset, Position::End, &b"cd"[..]))
        .unwrap();

    assert_eq!(client.stats(&StatsRequest::new("ns")).unwrap().bytes, 4);

    client.delete(&DeleteRequest::new("ns")).unwrap();
    let stats = client.stats(&StatsRequest::new("ns")).unwrap();
    assert_eq!(stats.records, 0);
    assert!(stats.tags.is_empty());
}

#[test]
fn test_stats_tolerates_partial_response() {
    let client = setup_client();
    client
        .transport()
        .inject(Fault::Status(200, r#"{"tags":{"x":3}}"#.to_string()));

    let stats = client.stats(&StatsRequest::new("ns")).unwrap();
    assert_eq!(stats.records, 0);
    assert_eq!(stats.tags.get("x"), Some(&3));
}

// =============================================================================
// Request Log Tests
// =============================================================================

#[test]
fn test_requests_not_recorded_by_default() {
    let client = setup_client();
    append(&client, "ns", b"x");

    assert!(client.transport().requests().is_empty());
}

#[test]
fn test_take_requests_drains_log() {
    let client = setup_recording_client();
    append(&client, "ns", b"x");
    client.scan(&ScanRequest::new("ns")).unwrap().for_each(drop);

    let taken = client.transport().take_requests();
    assert_eq!(taken.len(), 2);
    assert_eq!(taken[0].endpoint, Endpoint::Append);
    assert_eq!(taken[1].endpoint, Endpoint::Scan);
    assert!(client.transport().requests().is_empty());

    append(&client, "ns", b"y");
    assert_eq!(client.transport().take_requests().len(), 1);
}

// =============================================================================
// Sharing Tests
// =============================================================================

#[test]
fn test_client_shared_across_threads() {
    let engine = Arc::new(MemoryEngine::new());
    let client = Arc::new(Client::with_transport(
        ClientConfig::default(),
        LoopbackTransport::with_engine(Arc::clone(&engine)),
    ));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let client = Arc::clone(&client);
            std::thread::spawn(move || {
                for i in 0..25 {
                    let data = format!("{}-{}", t, i);
                    client
                        .append(&AppendRequest::new("shared", data.into_bytes()))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.scan(&"shared".into()).len(), 100);
}
