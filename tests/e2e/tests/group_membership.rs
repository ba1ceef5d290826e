//! Distributed group membership.
//!
//! Group ops on connections owned by another server travel over the
//! owning connection's channel and are ack-correlated; a missing ack
//! within the timeout means the outcome is unknown, never silently ok.

use hub_cluster::{ClusterError, HubLifetimeManager};
use hub_types::{HubMessage, SendTarget};
use hubmesh_e2e_tests::framework::{TestCluster, ACK_TIMEOUT};
use std::time::Duration;

#[tokio::test]
async fn remote_group_add_is_acknowledged_and_effective() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();

    // Server 0 adds server 1's connection.
    cluster
        .server(0)
        .add_to_group(&"b".into(), "room", ACK_TIMEOUT)
        .await
        .unwrap();

    cluster
        .server(0)
        .send(&SendTarget::group("room"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(a.payload_count(), 0, "a never joined the group");
    assert_eq!(b.payload_count(), 1);
}

#[tokio::test]
async fn remote_group_remove_stops_delivery() {
    let cluster = TestCluster::start(2).await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();

    cluster
        .server(0)
        .add_to_group(&"b".into(), "room", ACK_TIMEOUT)
        .await
        .unwrap();
    cluster
        .server(0)
        .remove_from_group(&"b".into(), "room", ACK_TIMEOUT)
        .await
        .unwrap();

    cluster
        .server(0)
        .send(&SendTarget::group("room"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;
    assert_eq!(b.payload_count(), 0);
}

#[tokio::test]
async fn group_add_for_unowned_connection_times_out() {
    let cluster = TestCluster::start(2).await.unwrap();
    let err = cluster
        .server(0)
        .add_to_group(&"ghost".into(), "room", Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::AckTimeout { .. }));
}

#[tokio::test]
async fn others_in_group_spans_servers_but_skips_the_caller() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();

    cluster
        .server(0)
        .add_to_group(&"a".into(), "room", ACK_TIMEOUT)
        .await
        .unwrap();
    cluster
        .server(0)
        .add_to_group(&"b".into(), "room", ACK_TIMEOUT)
        .await
        .unwrap();

    cluster
        .server(0)
        .send(
            &SendTarget::others_in_group("room", "a"),
            &HubMessage::Ping,
        )
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(a.payload_count(), 0);
    assert_eq!(b.payload_count(), 1);
}

#[tokio::test]
async fn duplicate_add_and_unknown_remove_are_idempotent() {
    let cluster = TestCluster::start(2).await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();

    for _ in 0..2 {
        cluster
            .server(0)
            .add_to_group(&"b".into(), "room", ACK_TIMEOUT)
            .await
            .unwrap();
    }
    // Removing from a group it never joined succeeds as a no-op.
    cluster
        .server(0)
        .remove_from_group(&"b".into(), "other", ACK_TIMEOUT)
        .await
        .unwrap();

    cluster
        .server(0)
        .send(&SendTarget::group("room"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;
    assert_eq!(b.payload_count(), 1, "duplicate add never double-delivers");
}

#[tokio::test]
async fn disconnect_purges_group_membership() {
    let cluster = TestCluster::start(2).await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();
    cluster
        .server(1)
        .add_to_group(&"b".into(), "room", ACK_TIMEOUT)
        .await
        .unwrap();
    cluster.server(1).on_disconnected(&"b".into()).await.unwrap();

    let outcome = cluster
        .server(0)
        .send(&SendTarget::group("room"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(outcome.recipients(), 0);
    assert_eq!(b.payload_count(), 0);
}

#[tokio::test]
async fn member_of_two_targeted_groups_gets_one_copy() {
    let cluster = TestCluster::start(2).await.unwrap();
    let a = cluster.connect(0, "a").await.unwrap();
    let b = cluster.connect(1, "b").await.unwrap();
    cluster
        .server(0)
        .add_to_group(&"a".into(), "g1", ACK_TIMEOUT)
        .await
        .unwrap();
    for group in ["g1", "g2"] {
        cluster
            .server(0)
            .add_to_group(&"b".into(), group, ACK_TIMEOUT)
            .await
            .unwrap();
    }

    cluster
        .server(0)
        .send(
            &SendTarget::groups(vec!["g1".into(), "g2".into()]),
            &HubMessage::Ping,
        )
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(a.payload_count(), 1);
    assert_eq!(b.payload_count(), 1, "overlap must not double-deliver");
}
