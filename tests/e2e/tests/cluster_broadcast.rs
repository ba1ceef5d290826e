//! Cross-server broadcast delivery.
//!
//! Every physical connection must receive a broadcast exactly once, no
//! matter which server it lives on: the origin writes its local
//! connections directly and suppresses the echo of its own envelope.

use hub_cluster::HubLifetimeManager;
use hub_types::{HubMessage, SendTarget};
use hubmesh_e2e_tests::framework::{received_messages, TestCluster};
use serde_json::json;

#[tokio::test]
async fn broadcast_reaches_every_server_exactly_once() {
    let cluster = TestCluster::start(3).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();
    let c = cluster.connect(2, "c").await.unwrap();

    let message = HubMessage::invocation("notify", vec![json!("hello")]);
    let outcome = cluster
        .server(0)
        .send(&SendTarget::all(), &message)
        .await
        .unwrap();
    // Local delivery only; a is the one connection on server 0.
    assert_eq!(outcome.delivered, 1);

    cluster.settle().await;
    for sink in [&a, &b, &c] {
        let messages = received_messages(sink);
        assert_eq!(messages.len(), 1, "exactly one copy per connection");
        assert_eq!(messages[0], message);
    }
}

#[tokio::test]
async fn all_except_skips_excluded_remote_connection() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();

    cluster
        .server(0)
        .send(&SendTarget::all_except(vec!["b".into()]), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(a.payload_count(), 1);
    assert_eq!(b.payload_count(), 0);
}

#[tokio::test]
async fn others_excludes_only_the_caller() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    let a2 = cluster.connect(0, "a2").await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();

    cluster
        .server(0)
        .send(&SendTarget::others("a"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(a.payload_count(), 0);
    assert_eq!(a2.payload_count(), 1);
    assert_eq!(b.payload_count(), 1);
}

#[tokio::test]
async fn connection_target_routes_to_the_owning_server() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();

    cluster
        .server(0)
        .send(&SendTarget::connection("b"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(a.payload_count(), 0);
    assert_eq!(b.payload_count(), 1);
}

#[tokio::test]
async fn unknown_connection_everywhere_is_a_silent_no_op() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();

    let outcome = cluster
        .server(0)
        .send(&SendTarget::connection("ghost"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(outcome.recipients(), 0);
    assert_eq!(a.payload_count(), 0);
}

#[tokio::test]
async fn broken_sink_on_one_server_never_blocks_the_rest() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();
    a.fail_next_send();

    let outcome = cluster
        .server(0)
        .send(&SendTarget::all(), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(outcome.failed, 1);
    assert_eq!(b.payload_count(), 1);
}
