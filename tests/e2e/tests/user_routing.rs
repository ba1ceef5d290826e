//! User-targeted delivery across servers.
//!
//! A user message reaches every connection the user currently holds,
//! wherever those connections live; unknown users are silently skipped.

use hub_cluster::HubLifetimeManager;
use hub_types::{HubMessage, SendTarget};
use hubmesh_e2e_tests::framework::TestCluster;

#[tokio::test]
async fn user_send_reaches_all_of_the_users_connections() {
    let cluster = TestCluster::start(2).await.unwrap();
    let laptop = cluster.connect_user(0, "c-laptop", "alice").await.unwrap();
    let phone = cluster.connect_user(1, "c-phone", "alice").await.unwrap();
    let other = cluster.connect_user(1, "c-bob", "bob").await.unwrap();

    cluster
        .server(0)
        .send(&SendTarget::user("alice"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(laptop.payload_count(), 1);
    assert_eq!(phone.payload_count(), 1);
    assert_eq!(other.payload_count(), 0);
}

#[tokio::test]
async fn users_send_covers_each_listed_user_once() {
    let cluster = TestCluster::start(2).await.unwrap();
    let alice = cluster.connect_user(0, "c-alice", "alice").await.unwrap();
    let bob = cluster.connect_user(1, "c-bob", "bob").await.unwrap();
    let carol = cluster.connect_user(1, "c-carol", "carol").await.unwrap();

    cluster
        .server(1)
        .send(
            &SendTarget::users(vec!["alice".into(), "bob".into()]),
            &HubMessage::Ping,
        )
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(alice.payload_count(), 1);
    assert_eq!(bob.payload_count(), 1);
    assert_eq!(carol.payload_count(), 0);
}

#[tokio::test]
async fn unknown_user_is_a_silent_no_op() {
    let cluster = TestCluster::start(2).await.unwrap();
    let alice = cluster.connect_user(0, "c-alice", "alice").await.unwrap();

    let outcome = cluster
        .server(0)
        .send(&SendTarget::user("nobody"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(outcome.recipients(), 0);
    assert_eq!(alice.payload_count(), 0);
}

#[tokio::test]
async fn disconnect_of_one_device_keeps_the_user_reachable() {
    let cluster = TestCluster::start(2).await.unwrap();
    let laptop = cluster.connect_user(0, "c-laptop", "alice").await.unwrap();
    let phone = cluster.connect_user(1, "c-phone", "alice").await.unwrap();

    cluster
        .server(0)
        .on_disconnected(&"c-laptop".into())
        .await
        .unwrap();

    cluster
        .server(0)
        .send(&SendTarget::user("alice"), &HubMessage::Ping)
        .await
        .unwrap();
    cluster.settle().await;

    assert_eq!(laptop.payload_count(), 0);
    assert_eq!(phone.payload_count(), 1);
}
