//! Behavior while the backplane is down and after it recovers.
//!
//! Outage semantics: publishes fail fast with a transient error, they are
//! never queued; once the transport is back every server re-establishes
//! its channel subscriptions before cross-server traffic resumes.

use hub_cluster::{ClusterError, HubLifetimeManager};
use hub_types::{HubMessage, SendTarget};
use hubmesh_e2e_tests::framework::{TestCluster, ACK_TIMEOUT};

#[tokio::test]
async fn sends_fail_fast_while_the_backplane_is_down() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    cluster.backplane.set_down(true);

    let err = cluster
        .server(0)
        .send(&SendTarget::all(), &HubMessage::Ping)
        .await
        .unwrap_err();
    match err {
        ClusterError::Backplane(inner) => assert!(inner.is_transient()),
        other => panic!("expected backplane error, got {other:?}"),
    }
    // Local delivery ran before the failed publish.
    assert_eq!(a.payload_count(), 1);
}

#[tokio::test]
async fn group_ops_fail_fast_rather_than_waiting_out_the_timeout() {
    let cluster = TestCluster::start(2).await.unwrap();
    cluster.connect(1, "b").await.unwrap();
    cluster.backplane.set_down(true);

    let err = cluster
        .server(0)
        .add_to_group(&"b".into(), "room", ACK_TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::Backplane(_)));
}

#[tokio::test]
async fn resubscribe_restores_cross_server_delivery() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();

    cluster.backplane.set_down(true);
    let _ = cluster
        .server(0)
        .send(&SendTarget::all(), &HubMessage::Ping)
        .await;
    cluster.backplane.set_down(false);

    for server in &cluster.servers {
        server.resubscribe_all().await.unwrap();
    }

    cluster
        .server(0)
        .send(&SendTarget::all(), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    // One local delivery from the failed attempt plus the successful send.
    assert_eq!(a.payload_count(), 2);
    assert_eq!(b.payload_count(), 1);
}
