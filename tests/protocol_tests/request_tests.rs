//! Request Tests
//!
//! Lowering typed requests into transport requests.

use std::time::Duration;

use rochefort::protocol::{decode_offsets, Endpoint, Method, Position};
use rochefort::{
    AppendRequest, CallOptions, ClientConfig, GetMultiRequest, ModifyRequest, Namespace, Offset,
    OffsetEncoding, Query, RochefortError, SearchRequest, StatsRequest,
};

#[test]
fn test_endpoint_paths_and_methods() {
    assert_eq!(Endpoint::Append.path(), "append");
    assert_eq!(Endpoint::GetMulti.path(), "getMulti");
    assert_eq!(Endpoint::Query.path(), "query");
    assert_eq!(Endpoint::Append.method(), Method::Post);
    assert_eq!(Endpoint::Modify.method(), Method::Post);
    assert_eq!(Endpoint::Scan.method(), Method::Get);
    assert_eq!(Endpoint::GetMulti.method(), Method::Get);
    assert_eq!(Endpoint::Stats.path(), "stat");
    assert_eq!(Endpoint::Stats.method(), Method::Post);
}

#[test]
fn test_stats_request() {
    let request = StatsRequest::new("ns").to_http(&ClientConfig::default());

    assert_eq!(request.endpoint, Endpoint::Stats);
    assert_eq!(request.query, vec![("namespace", "ns".to_string())]);
    assert!(request.body.is_empty());
}

#[test]
fn test_append_params() {
    let config = ClientConfig::default();
    let request = AppendRequest::new("ns", &b"data"[..])
        .alloc_size(64)
        .tag("a")
        .tag("b")
        .to_http(&config);

    assert_eq!(request.endpoint, Endpoint::Append);
    assert_eq!(request.query_param("namespace"), Some("ns"));
    assert_eq!(request.query_param("allocSize"), Some("64"));
    assert_eq!(request.query_params("tags").collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(&request.body[..], b"data");
}

#[test]
fn test_default_namespace_sent_empty() {
    let request = AppendRequest::new(Namespace::default(), &b""[..]).to_http(&ClientConfig::default());

    assert_eq!(request.query_param("namespace"), Some(""));
    assert_eq!(request.query_param("allocSize"), None);
    assert!(request.namespace().is_default());
}

#[test]
fn test_modify_position_wire_values() {
    let config = ClientConfig::default();

    let at = ModifyRequest::new("ns", Offset(16), Position::At(3), &b"x"[..]).to_http(&config);
    assert_eq!(at.query_param("offset"), Some("16"));
    assert_eq!(at.query_param("pos"), Some("3"));
    assert_eq!(at.query_param("resetLength"), None);

    let end = ModifyRequest::new("ns", Offset(16), Position::End, &b"x"[..])
        .reset_length(true)
        .to_http(&config);
    assert_eq!(end.query_param("pos"), Some("-1"));
    assert_eq!(end.query_param("resetLength"), Some("true"));
}

#[test]
fn test_position_from_wire() {
    assert_eq!(Position::from_wire(-1).unwrap(), Position::End);
    assert_eq!(Position::from_wire(0).unwrap(), Position::At(0));
    assert!(matches!(Position::from_wire(-2), Err(RochefortError::Protocol(_))));
}

#[test]
fn test_get_multi_uses_config_encoding() {
    let offsets = vec![Offset(1), Offset(2)];

    let binary = GetMultiRequest::new("ns", offsets.clone()).to_http(&ClientConfig::default());
    assert_eq!(binary.query_param("encoding"), None);
    assert_eq!(binary.body.len(), 16);
    assert_eq!(decode_offsets(&binary.body, OffsetEncoding::Binary).unwrap(), offsets);

    let csv_config = ClientConfig::builder().offset_encoding(OffsetEncoding::Csv).build();
    let csv = GetMultiRequest::new("ns", offsets.clone()).to_http(&csv_config);
    assert_eq!(csv.query_param("encoding"), Some("csv"));
    assert_eq!(&csv.body[..], b"1,2");

    let overridden = GetMultiRequest::new("ns", offsets)
        .encoding(OffsetEncoding::Binary)
        .to_http(&csv_config);
    assert_eq!(overridden.query_param("encoding"), None);
}

#[test]
fn test_search_body_is_query_json() {
    let query = Query::or([Query::tag("a"), Query::tag("b")]);
    let request = SearchRequest::new("ns", query.clone())
        .to_http(&ClientConfig::default())
        .unwrap();

    assert_eq!(request.endpoint, Endpoint::Query);
    assert_eq!(Query::from_json(&request.body).unwrap(), query);
}

#[test]
fn test_search_rejects_invalid_query() {
    let result = SearchRequest::new("ns", Query::Or(vec![])).to_http(&ClientConfig::default());
    assert!(matches!(result, Err(RochefortError::SearchQueryInvalid(_))));
}

#[test]
fn test_call_options_override_config() {
    let config = ClientConfig::builder().read_timeout_ms(250).build();

    let defaulted = AppendRequest::new("ns", &b""[..]).to_http(&config);
    assert_eq!(defaulted.timeouts.read, Duration::from_millis(250));
    assert_eq!(defaulted.timeouts.connect, Duration::from_millis(1000));

    let options = CallOptions::default().with_read_timeout(Duration::from_secs(5));
    let overridden = AppendRequest::new("ns", &b""[..]).options(options).to_http(&config);
    assert_eq!(overridden.timeouts.read, Duration::from_secs(5));
}
