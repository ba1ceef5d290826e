//! Multi-server cluster fixture.

use anyhow::{Context, Result};
use hub_cluster::{
    Backplane, ClusterConfig, ClusterLifetimeManager, HubLifetimeManager, InMemoryBackplane,
};
use hub_codec::{HubProtocol, JsonHubProtocol, NullBinder};
use hub_registry::test_utils::CollectorSink;
use hub_registry::{ConnectionRegistry, ConnectionSink, HubConnection};
use hub_types::HubMessage;
use std::sync::Arc;
use std::time::Duration;

/// How long tests wait for backplane fan-out to settle. The in-memory
/// backplane delivers on spawned tasks, so this only needs to cover a few
/// scheduler hops.
pub const SETTLE: Duration = Duration::from_millis(50);

/// Default ack timeout for group operations in tests.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(1);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// N servers sharing one in-memory backplane, each with its own registry.
pub struct TestCluster {
    pub backplane: Arc<InMemoryBackplane>,
    pub servers: Vec<Arc<ClusterLifetimeManager>>,
}

impl TestCluster {
    pub async fn start(server_count: usize) -> Result<Self> {
        init_tracing();
        let backplane = Arc::new(InMemoryBackplane::new());
        let mut servers = Vec::with_capacity(server_count);
        for i in 0..server_count {
            let config = ClusterConfig {
                server_name: Some(format!("server-{i}")),
                ..ClusterConfig::default()
            };
            let manager = ClusterLifetimeManager::start(
                &config,
                Arc::new(ConnectionRegistry::new()),
                Arc::new(JsonHubProtocol::new()),
                Arc::clone(&backplane) as Arc<dyn Backplane>,
            )
            .await
            .with_context(|| format!("starting server {i}"))?;
            servers.push(manager);
        }
        Ok(Self { backplane, servers })
    }

    pub fn server(&self, index: usize) -> &Arc<ClusterLifetimeManager> {
        &self.servers[index]
    }

    /// Attach a collector-backed connection to one server.
    pub async fn connect(&self, server: usize, id: &str) -> Result<Arc<CollectorSink>> {
        let sink = Arc::new(CollectorSink::new());
        let connection = Arc::new(HubConnection::new(
            id,
            "json",
            Arc::clone(&sink) as Arc<dyn ConnectionSink>,
        ));
        self.servers[server]
            .on_connected(connection)
            .await
            .with_context(|| format!("connecting {id} to server {server}"))?;
        Ok(sink)
    }

    /// Attach a connection and register its authenticated user.
    pub async fn connect_user(
        &self,
        server: usize,
        id: &str,
        user: &str,
    ) -> Result<Arc<CollectorSink>> {
        let sink = self.connect(server, id).await?;
        self.servers[server]
            .set_user(&id.into(), user)
            .await
            .with_context(|| format!("registering user {user} for {id}"))?;
        Ok(sink)
    }

    /// Wait for in-flight backplane deliveries to land.
    pub async fn settle(&self) {
        tokio::time::sleep(SETTLE).await;
    }
}

/// Reassemble the hub messages a sink received, across all of its writes.
pub fn received_messages(sink: &CollectorSink) -> Vec<HubMessage> {
    let protocol = JsonHubProtocol::new();
    let binder = NullBinder;
    let buffer: Vec<u8> = sink
        .payloads()
        .iter()
        .flat_map(|payload| payload.iter().copied())
        .collect();
    let mut messages = Vec::new();
    let mut offset = 0;
    while let Ok(Some((message, consumed))) = protocol.try_parse(&buffer[offset..], &binder) {
        messages.push(message);
        offset += consumed;
    }
    messages
}
