//! Full client pipeline: handshake negotiation followed by hub messages
//! routed through the cluster, asserted at the wire level.

use bytes::BytesMut;
use hub_cluster::HubLifetimeManager;
use hub_codec::{
    parse_handshake_request, write_handshake_response, HubProtocol, JsonHubProtocol,
    ProtocolResolver, RECORD_SEPARATOR,
};
use hub_types::{HandshakeRequest, HandshakeResponse, HubMessage, SendTarget};
use hubmesh_e2e_tests::framework::{received_messages, TestCluster};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn handshake_then_invocation_end_to_end() {
    let cluster = TestCluster::start(2).await.unwrap();

    // What a client writes first, possibly split across reads.
    let handshake_bytes = br#"{"protocol":"json","version":1}"#
        .iter()
        .copied()
        .chain([RECORD_SEPARATOR])
        .collect::<Vec<u8>>();
    assert!(parse_handshake_request(&handshake_bytes[..10])
        .unwrap()
        .is_none());
    let (request, consumed) = parse_handshake_request(&handshake_bytes)
        .unwrap()
        .expect("complete handshake");
    assert_eq!(consumed, handshake_bytes.len());

    let resolver = ProtocolResolver::new()
        .with_protocol(Arc::new(JsonHubProtocol::new()) as Arc<dyn HubProtocol>);
    let protocol = resolver.resolve(&request).unwrap();
    assert_eq!(protocol.name(), "json");

    let mut response = BytesMut::new();
    write_handshake_response(&HandshakeResponse::ok(), &mut response).unwrap();
    assert_eq!(response.last(), Some(&RECORD_SEPARATOR));

    // Connection accepted on server 1; server 0 invokes a method on it.
    let sink = cluster.connect(1, "c1").await.unwrap();
    let message = HubMessage::invocation("receiveMessage", vec![json!("alice"), json!("hi")]);
    cluster
        .server(0)
        .send(&SendTarget::connection("c1"), &message)
        .await
        .unwrap();
    cluster.settle().await;

    let frames = sink.payloads();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].last(), Some(&RECORD_SEPARATOR));
    assert_eq!(received_messages(&sink), vec![message]);
}

#[tokio::test]
async fn unsupported_protocol_is_rejected_before_any_routing() {
    let resolver = ProtocolResolver::new()
        .with_protocol(Arc::new(JsonHubProtocol::new()) as Arc<dyn HubProtocol>);
    assert_eq!(resolver.names(), vec!["json"]);

    let err = resolver
        .resolve(&HandshakeRequest::new("messagepack", 1))
        .unwrap_err();
    let mut response = BytesMut::new();
    write_handshake_response(&HandshakeResponse::error(err.to_string()), &mut response).unwrap();

    let (parsed, _) = hub_codec::parse_handshake_response(&response)
        .unwrap()
        .expect("complete response");
    assert!(!parsed.is_ok());
}
